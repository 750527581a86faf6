//! Mock Atlas API built on wiremock.
//!
//! Every mounted route sits behind [`DigestGate`], so each call the
//! provisioner makes must complete a real digest handshake before the
//! scripted response is returned.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlas_client::digest::{compute_response, parse_params, DigestChallenge};
use atlas_client::{AtlasClient, Credentials, HttpTransport};
use atlas_provisioner::{ConvergencePoller, PollSettings, ProviderContext};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const USERNAME: &str = "ops@example.com";
pub const API_KEY: &str = "6f1c2a9e-0b7d-4c55-9e0f-3a2b1c0d9e8f";
pub const ORG_ID: &str = "org-1";

const REALM: &str = "MMS Public API";
const NONCE: &str = "wVnZ8Bq0cHqR6dyvS4n0mKxKqH2p3y9L";

/// Answers unauthenticated requests with a digest challenge and verifies the
/// response hash of authenticated ones before delegating to `inner`.
pub struct DigestGate<R> {
    inner: R,
}

impl<R: Respond> DigestGate<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn challenge() -> ResponseTemplate {
        let header = format!(
            r#"Digest realm="{REALM}", domain="", nonce="{NONCE}", algorithm=MD5, qop="auth", stale=false"#
        );
        ResponseTemplate::new(401).insert_header("WWW-Authenticate", header.as_str())
    }
}

impl<R: Respond> Respond for DigestGate<R> {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(header) = request
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
        else {
            return Self::challenge();
        };

        let params = parse_params(header);
        let field = |key: &str| params.get(key).cloned().unwrap_or_default();
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes()).unwrap();
        let expected = compute_response(
            &Credentials::new(USERNAME, API_KEY),
            &DigestChallenge {
                realm: REALM.to_string(),
                nonce: NONCE.to_string(),
                qop: "auth".to_string(),
            },
            &method,
            request.url.path(),
            &field("cnonce"),
        );

        if field("response") == expected && field("uri") == request.url.path() {
            self.inner.respond(request)
        } else {
            Self::challenge()
        }
    }
}

/// Returns scripted responses in order; the last one repeats.
#[derive(Clone)]
pub struct Sequence {
    responses: Arc<Mutex<VecDeque<ResponseTemplate>>>,
}

impl Sequence {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(
            !responses.is_empty(),
            "a sequence needs at least one response"
        );
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }
}

/// Install a fmt subscriber when `RUST_LOG` is set; later calls are no-ops.
pub fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

pub fn json(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_string(r#"{"errorCode":"RESOURCE_NOT_FOUND"}"#)
}

pub struct MockAtlas {
    server: MockServer,
}

impl MockAtlas {
    pub async fn start() -> Self {
        init_tracing();
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Context with millisecond polling and a short deadline.
    pub fn context(&self) -> ProviderContext {
        let transport: Arc<dyn HttpTransport> = Arc::new(reqwest::Client::new());
        let client = AtlasClient::with_transport(
            &self.uri(),
            Credentials::new(USERNAME, API_KEY),
            transport,
        )
        .unwrap();
        let poller = ConvergencePoller::new(PollSettings::new(
            Duration::from_millis(5),
            Some(Duration::from_secs(10)),
        ));
        ProviderContext::new(client, ORG_ID, poller)
    }

    /// Mount `responder` for one route behind the digest gate.
    pub async fn on(&self, verb: &str, route: &str, responder: impl Respond + 'static) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(DigestGate::new(responder))
            .mount(&self.server)
            .await;
    }

    /// Authenticated requests received with `verb`, in arrival order.
    pub async fn authenticated(&self, verb: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb)
            .filter(|r| r.headers.contains_key("Authorization"))
            .collect()
    }

    /// JSON bodies of authenticated `verb` requests to `route`.
    pub async fn bodies(&self, verb: &str, route: &str) -> Vec<Value> {
        self.authenticated(verb)
            .await
            .into_iter()
            .filter(|r| r.url.path() == route)
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}
