use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::config::FetchOptions;
use crate::error::{FetchError, Result};
use crate::http::{HttpRequest, HttpTransport, CONTENT_TYPE_TEXT};
use crate::ice::{has_turn_server, has_usable_turn_credentials, ice_servers_from_pc_config};
use crate::models::SignalingParameters;
use crate::signaling::parse_room_response;
use crate::turn::{credentials_for_turn_servers, request_turn_servers};

/// Receiver of the single outcome of a room-join attempt
pub trait RoomParametersEvents: Send + Sync {
    fn on_signaling_parameters_ready(&self, params: SignalingParameters);

    fn on_signaling_parameters_error(&self, description: String);
}

/// Turns a room-join URL into the signaling parameters for that room.
///
/// Each call to [`fetch`](Self::fetch) is an independent attempt with at most
/// two sequential HTTP exchanges: the room join, then an optional TURN
/// credential request. Nothing is retried.
#[derive(Clone)]
pub struct RoomParametersFetcher {
    transport: Arc<dyn HttpTransport>,
    room_url: String,
    room_message: String,
    options: FetchOptions,
}

impl RoomParametersFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        room_url: impl Into<String>,
        room_message: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            room_url: room_url.into(),
            room_message: room_message.into(),
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one attempt and return the complete bundle or the first failure.
    pub async fn fetch(&self) -> Result<SignalingParameters> {
        tracing::debug!(url = %self.room_url, "Connecting to room");

        let request = HttpRequest::post(
            self.room_url.as_str(),
            self.room_message.as_str(),
            self.options.room_timeouts,
        )
        .with_content_type(CONTENT_TYPE_TEXT);

        let res = self.transport.send(request).await.map_err(|e| {
            tracing::error!(error = %e, "Room connection error");
            e
        })?;
        if !res.is_ok() {
            tracing::error!(status = res.status, "Room connection error");
            return Err(FetchError::unexpected_status(res.status, &self.room_url));
        }
        tracing::debug!(response = %res.body, "Room response");

        let room = parse_room_response(&res.body)?;
        let mut ice_servers = ice_servers_from_pc_config(&room.pc_config)?;

        if self.options.request_turn_servers && !has_turn_server(&ice_servers) {
            if let Some(turn_url) = room.turn_url.as_deref() {
                let turn_servers =
                    request_turn_servers(&*self.transport, turn_url, self.options.turn_timeouts)
                        .await?;
                ice_servers = ice_servers.into_iter().chain(turn_servers).collect();
            }
        }

        if !has_usable_turn_credentials(&ice_servers) {
            let Some(url) = room.turn_time_limited_ltc_url.as_deref() else {
                return Err(FetchError::Config(
                    "no credentials available for TURN server(s)".to_string(),
                ));
            };
            ice_servers = credentials_for_turn_servers(
                &*self.transport,
                url,
                &ice_servers,
                self.options.turn_timeouts,
            )
            .await?;
        }

        tracing::info!(
            room_id = %room.room_id,
            client_id = %room.client_id,
            initiator = room.initiator,
            ice_servers = ice_servers.len(),
            "Signaling parameters ready"
        );

        Ok(SignalingParameters {
            ice_servers,
            initiator: room.initiator,
            client_id: room.client_id,
            wss_url: room.wss_url,
            wss_post_url: room.wss_post_url,
            offer_sdp: room.offer_sdp,
            ice_candidates: room.ice_candidates,
        })
    }

    /// Run one attempt and report it through exactly one callback.
    pub async fn make_request(&self, events: &dyn RoomParametersEvents) {
        deliver(self.fetch().await, events);
    }

    /// Run one attempt on the tokio runtime.
    ///
    /// Must be called from within a runtime. The returned handle can abandon
    /// the attempt, in which case neither callback fires. Callbacks run while
    /// the attempt state is locked, so they must not call back into the handle.
    pub fn spawn(self, events: Arc<dyn RoomParametersEvents>) -> FetchHandle {
        let state = Arc::new(Mutex::new(AttemptState::Pending));
        let shared = state.clone();

        let task = tokio::spawn(async move {
            let outcome = self.fetch().await;

            let mut state = lock_state(&shared);
            if *state == AttemptState::Abandoned {
                tracing::debug!(url = %self.room_url, "Attempt abandoned, dropping outcome");
                return;
            }
            deliver(outcome, events.as_ref());
            *state = AttemptState::Delivered;
        });

        FetchHandle { task, state }
    }
}

fn deliver(outcome: Result<SignalingParameters>, events: &dyn RoomParametersEvents) {
    match outcome {
        Ok(params) => events.on_signaling_parameters_ready(params),
        Err(e) => {
            tracing::warn!(error = %e, "Signaling parameters error");
            events.on_signaling_parameters_error(e.to_string());
        }
    }
}

/// Delivery and abandonment both happen under this lock, so exactly one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptState {
    Pending,
    Delivered,
    Abandoned,
}

fn lock_state(state: &Mutex<AttemptState>) -> MutexGuard<'_, AttemptState> {
    // The guarded value is a plain enum; a panicking callback cannot leave it torn.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to an attempt started with [`RoomParametersFetcher::spawn`]
pub struct FetchHandle {
    task: JoinHandle<()>,
    state: Arc<Mutex<AttemptState>>,
}

impl FetchHandle {
    /// Abandon the attempt, closing any in-flight connection.
    ///
    /// Once this returns no callback fires. An outcome delivered before the
    /// call stays delivered.
    pub fn abort(&self) {
        {
            let mut state = lock_state(&self.state);
            if *state == AttemptState::Pending {
                *state = AttemptState::Abandoned;
            }
        }
        self.task.abort();
    }

    /// Wait for the attempt. Returns `true` if a callback fired.
    pub async fn join(self) -> bool {
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "Room fetch task failed");
            }
        }
        *lock_state(&self.state) == AttemptState::Delivered
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::config::HttpTimeouts;
    use crate::http::mock::MockTransport;
    use crate::http::reqwest_transport::tests::stalled_server;
    use crate::http::{HttpResponse, ReqwestTransport};
    use crate::models::IceServer;

    const ROOM_URL: &str = "https://rooms.example/join/abc";
    const LTC_URL: &str = "https://turn.example/ltc";

    #[derive(Debug, PartialEq)]
    enum Outcome {
        Ready(SignalingParameters),
        Error(String),
    }

    #[derive(Default)]
    struct RecordingEvents {
        outcomes: Mutex<Vec<Outcome>>,
    }

    impl RecordingEvents {
        fn take(&self) -> Vec<Outcome> {
            std::mem::take(&mut *self.outcomes.lock().unwrap())
        }
    }

    impl RoomParametersEvents for RecordingEvents {
        fn on_signaling_parameters_ready(&self, params: SignalingParameters) {
            self.outcomes.lock().unwrap().push(Outcome::Ready(params));
        }

        fn on_signaling_parameters_error(&self, description: String) {
            self.outcomes.lock().unwrap().push(Outcome::Error(description));
        }
    }

    /// Never answers.
    struct StalledTransport;

    #[async_trait]
    impl HttpTransport for StalledTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            std::future::pending::<Result<HttpResponse>>().await
        }
    }

    fn params(is_initiator: bool, ice_servers: Value, messages: Vec<Value>) -> Value {
        let encoded: Vec<String> = messages.iter().map(|m| m.to_string()).collect();
        json!({
            "room_id": "abc",
            "client_id": "73218",
            "wss_url": "wss://signal.example/ws",
            "wss_post_url": "https://signal.example",
            "is_initiator": is_initiator.to_string(),
            "pc_config": json!({"iceServers": ice_servers}).to_string(),
            "messages": json!(encoded).to_string(),
        })
    }

    fn success(params: Value) -> String {
        json!({"result": "SUCCESS", "params": params.to_string()}).to_string()
    }

    fn unauthenticated_turn() -> Value {
        json!([
            {"urls": "stun:stun.example:19302"},
            {"urls": "turn:relay.example:3478?transport=udp"},
            {"urls": "turn:relay.example:3478?transport=tcp"}
        ])
    }

    fn fetcher(transport: Arc<MockTransport>) -> RoomParametersFetcher {
        RoomParametersFetcher::new(transport, ROOM_URL, "")
    }

    #[tokio::test]
    async fn test_failure_result_reports_error_only() {
        let transport = Arc::new(MockTransport::new().respond(200, r#"{"result": "FAILURE"}"#));
        let events = RecordingEvents::default();

        fetcher(transport.clone()).make_request(&events).await;

        let outcomes = events.take();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Outcome::Error(description) => assert!(description.contains("FAILURE")),
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_non_initiator_bundle() {
        let body = success(params(
            false,
            json!([{"urls": "turn:relay.example:3478", "username": "u", "credential": "p"}]),
            vec![
                json!({"type": "offer", "sdp": "v=0\na=ice-ufrag:ab cd"}),
                json!({"type": "candidate", "id": "audio", "label": 0, "candidate": "candidate:1 ufrag a b"}),
                json!({"type": "candidate", "id": "video", "label": 1, "candidate": "candidate:2"}),
            ],
        ));
        let transport = Arc::new(MockTransport::new().respond(200, body));

        let bundle = fetcher(transport.clone()).fetch().await.unwrap();

        assert!(!bundle.initiator);
        assert_eq!(bundle.client_id, "73218");
        assert_eq!(bundle.wss_url, "wss://signal.example/ws");
        assert_eq!(bundle.offer_sdp.unwrap().sdp, "v=0\na=ice-ufrag:ab+cd");
        let candidates = bundle.ice_candidates.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].sdp, "candidate:1 ufrag a+b");
        assert_eq!(candidates[1].sdp_mid, "video");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url, ROOM_URL);
    }

    #[tokio::test]
    async fn test_missing_turn_credentials_without_url_is_config_error() {
        let body = success(params(true, unauthenticated_turn(), vec![]));
        let transport = Arc::new(MockTransport::new().respond(200, body));
        let events = RecordingEvents::default();

        fetcher(transport.clone()).make_request(&events).await;

        assert_eq!(
            events.take(),
            vec![Outcome::Error(
                "Configuration error: no credentials available for TURN server(s)".to_string()
            )]
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_turn_credentials_fetched() {
        let mut room = params(true, unauthenticated_turn(), vec![]);
        room["turn_time_limited_ltc_url"] = json!(LTC_URL);
        let transport = Arc::new(
            MockTransport::new()
                .respond(200, success(room))
                .respond(200, r#"{"username":"u","credential":"p"}"#),
        );

        let bundle = fetcher(transport.clone()).fetch().await.unwrap();

        assert_eq!(
            bundle.ice_servers,
            vec![
                IceServer::new("stun:stun.example:19302", "", ""),
                IceServer::new("turn:relay.example:3478?transport=udp", "u", "p"),
                IceServer::new("turn:relay.example:3478?transport=tcp", "u", "p"),
            ]
        );
        assert!(bundle.ice_candidates.is_none());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url, LTC_URL);
        assert_eq!(requests[1].timeouts, FetchOptions::default().turn_timeouts);
    }

    #[tokio::test]
    async fn test_existing_credentials_skip_turn_fetch() {
        let mut room = params(
            true,
            json!([{"urls": "turn:relay.example", "username": "u", "credential": "p"}]),
            vec![],
        );
        room["turn_time_limited_ltc_url"] = json!(LTC_URL);
        let transport = Arc::new(MockTransport::new().respond(200, success(room)));

        fetcher(transport.clone()).fetch().await.unwrap();
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_turn_fetch_failure_delivers_no_bundle() {
        let mut room = params(true, unauthenticated_turn(), vec![]);
        room["turn_time_limited_ltc_url"] = json!(LTC_URL);
        let transport = Arc::new(
            MockTransport::new()
                .respond(200, success(room))
                .respond(500, "oops"),
        );
        let events = RecordingEvents::default();

        fetcher(transport).make_request(&events).await;

        let outcomes = events.take();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Outcome::Error(description) => {
                assert!(description.contains("500"));
                assert!(description.contains(LTC_URL));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_room_connection_error() {
        let transport = Arc::new(
            MockTransport::new().fail(FetchError::Network("connection refused".to_string())),
        );
        let events = RecordingEvents::default();

        fetcher(transport).make_request(&events).await;

        assert_eq!(
            events.take(),
            vec![Outcome::Error("Room IO error: connection refused".to_string())]
        );
    }

    #[tokio::test]
    async fn test_room_timeout_reports_error_once() {
        let transport = Arc::new(MockTransport::new().fail(FetchError::Network(
            "request timed out: https://rooms.example/join/abc".to_string(),
        )));
        let events = RecordingEvents::default();

        fetcher(transport).make_request(&events).await;

        assert_eq!(
            events.take(),
            vec![Outcome::Error(
                "Room IO error: request timed out: https://rooms.example/join/abc".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_silent_room_server_times_out_into_error_callback() {
        let url = stalled_server().await;
        let options = FetchOptions {
            room_timeouts: HttpTimeouts::from_millis(1000, 200),
            ..FetchOptions::default()
        };
        let fetcher = RoomParametersFetcher::new(Arc::new(ReqwestTransport::new()), url, "")
            .with_options(options);
        let events = RecordingEvents::default();

        tokio::time::timeout(Duration::from_secs(5), fetcher.make_request(&events))
            .await
            .expect("room read timeout should end the attempt");

        let outcomes = events.take();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Outcome::Error(description) => assert!(description.starts_with("Room IO error")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_room_non_200_is_network_error() {
        // Only 200 counts, other 2xx codes included.
        for status in [502, 204, 201] {
            let transport = Arc::new(MockTransport::new().respond(status, "{}"));

            let err = fetcher(transport).fetch().await.unwrap_err();
            assert_eq!(err, FetchError::unexpected_status(status, ROOM_URL));
        }
    }

    #[tokio::test]
    async fn test_legacy_turn_servers_requested_when_enabled() {
        let mut room = params(true, json!([{"urls": "stun:stun.example"}]), vec![]);
        room["turn_url"] = json!("https://turn.example/servers");
        let transport = Arc::new(
            MockTransport::new()
                .respond(200, success(room))
                .respond(200, r#"{"username":"u","password":"p","uris":["turn:relay.example"]}"#),
        );
        let options = FetchOptions {
            request_turn_servers: true,
            ..FetchOptions::default()
        };

        let bundle = fetcher(transport.clone())
            .with_options(options)
            .fetch()
            .await
            .unwrap();

        assert_eq!(
            bundle.ice_servers,
            vec![
                IceServer::new("stun:stun.example", "", ""),
                IceServer::new("turn:relay.example", "u", "p"),
            ]
        );
        assert_eq!(transport.requests()[1].method, Method::GET);
    }

    #[tokio::test]
    async fn test_spawn_delivers_once() {
        let body = success(params(
            true,
            json!([{"urls": "turn:relay.example", "username": "u", "credential": "p"}]),
            vec![],
        ));
        let transport = Arc::new(MockTransport::new().respond(200, body));
        let events = Arc::new(RecordingEvents::default());

        let handle = fetcher(transport).spawn(events.clone());
        assert!(handle.join().await);

        let outcomes = events.take();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], Outcome::Ready(_)));
    }

    #[tokio::test]
    async fn test_abort_suppresses_callbacks() {
        let events = Arc::new(RecordingEvents::default());
        let handle =
            RoomParametersFetcher::new(Arc::new(StalledTransport), ROOM_URL, "").spawn(events.clone());

        tokio::task::yield_now().await;
        handle.abort();

        assert!(!handle.join().await);
        assert!(events.take().is_empty());
    }

    #[tokio::test]
    async fn test_abort_after_delivery_keeps_outcome() {
        let body = success(params(
            true,
            json!([{"urls": "turn:relay.example", "username": "u", "credential": "p"}]),
            vec![],
        ));
        let transport = Arc::new(MockTransport::new().respond(200, body));
        let events = Arc::new(RecordingEvents::default());

        let handle = fetcher(transport).spawn(events.clone());
        while events.outcomes.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        handle.abort();

        assert!(handle.join().await);
        assert_eq!(events.take().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abort_and_delivery_never_both_happen() {
        for _ in 0..50 {
            let body = success(params(
                true,
                json!([{"urls": "turn:relay.example", "username": "u", "credential": "p"}]),
                vec![],
            ));
            let transport = Arc::new(MockTransport::new().respond(200, body));
            let events = Arc::new(RecordingEvents::default());

            let handle = fetcher(transport).spawn(events.clone());
            handle.abort();
            let delivered_after_abort = events.outcomes.lock().unwrap().len();

            let delivered = handle.join().await;
            let outcomes = events.take();
            // Nothing may arrive once abort has returned.
            assert_eq!(outcomes.len(), delivered_after_abort);
            assert_eq!(delivered, outcomes.len() == 1);
        }
    }
}
