use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::HttpTimeouts;
use crate::error::{FetchError, Result};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// `reqwest`-backed transport.
///
/// Connect and read timeouts are client settings in reqwest, so one client
/// is kept per timeout profile and reused for every request using it.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    user_agent: Option<String>,
    clients: Arc<Mutex<HashMap<HttpTimeouts, Client>>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn client(&self, timeouts: HttpTimeouts) -> Result<Client> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| FetchError::Network("HTTP client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(&timeouts) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build()?;
        clients.insert(timeouts, client.clone());

        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client(request.timeouts)?;

        let mut outgoing = client.request(request.method.clone(), &request.url);
        if let Some(content_type) = request.content_type {
            outgoing = outgoing.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            outgoing = outgoing.body(body);
        }

        let res = outgoing.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;

        Ok(HttpResponse { status, body })
    }
}
