pub mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use reqwest::Method;

use crate::config::HttpTimeouts;
use crate::error::Result;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// One outgoing HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<&'static str>,
    pub timeouts: HttpTimeouts,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, timeouts: HttpTimeouts) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
            content_type: None,
            timeouts,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>, timeouts: HttpTimeouts) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body.into()),
            content_type: None,
            timeouts,
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking-with-timeout HTTP primitive used by the fetcher.
///
/// Implementations resolve with a response for any status code and only
/// fail for transport problems (connect, timeout, unreadable body).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
