//! HTTP transport seam.
//!
//! `ApiRequest` / `ApiResponse` are plain values so a request can be
//! duplicated for the digest probe and replayed with an `Authorization`
//! header. `HttpTransport` is implemented for `reqwest::Client`; tests plug in
//! scripted transports instead.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::{AtlasClientError, AtlasClientResult};

const APPLICATION_JSON: &str = "application/json";

/// An outbound request: method, target, headers and optional body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Create a request that accepts JSON.
    pub fn new(method: Method, url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        Self {
            method,
            url,
            headers,
            body: None,
        }
    }

    /// Attach a JSON body and the matching `Content-Type`.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> AtlasClientResult<Self> {
        let encoded = serde_json::to_vec(body).map_err(|e| {
            AtlasClientError::parse("request encode", format!("failed to serialize body: {e}"))
        })?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.body = Some(encoded);
        Ok(self)
    }

    /// Set or replace a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Copy of this request with the body and any `Authorization` header removed.
    #[must_use]
    pub fn unauthenticated_probe(&self) -> Self {
        let mut headers = self.headers.clone();
        headers.remove(AUTHORIZATION);
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
            body: None,
        }
    }

    /// Request path as used in the digest `uri` field.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> AtlasClientResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| AtlasClientError::parse(context, format!("decode failed: {e}")))
    }

    /// Turn this response into a [`AtlasClientError::Request`].
    #[must_use]
    pub fn into_error(self, context: &str) -> AtlasClientError {
        AtlasClientError::Request {
            context: context.to_string(),
            status: self.status.as_u16(),
            body: self.body,
        }
    }
}

/// Sends one request and buffers the whole response.
///
/// Implementations never interpret status codes; any response the server
/// produces is `Ok`. Only failures to obtain a response are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> AtlasClientResult<ApiResponse>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn send(&self, request: ApiRequest) -> AtlasClientResult<ApiResponse> {
        let mut builder = self
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AtlasClientError::transport_with_source("http send", e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AtlasClientError::transport_with_source("http read body", e))?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://cloud.example.com{path}")).unwrap()
    }

    #[test]
    fn test_new_sets_accept() {
        let request = ApiRequest::new(Method::GET, url("/groups/g1"));
        assert_eq!(request.headers.get(ACCEPT).unwrap(), APPLICATION_JSON);
        assert!(request.headers.get(CONTENT_TYPE).is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn test_with_json_sets_content_type() {
        let request = ApiRequest::new(Method::POST, url("/groups"))
            .with_json(&serde_json::json!({ "name": "g1" }))
            .unwrap();
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(request.body.as_deref(), Some(&b"{\"name\":\"g1\"}"[..]));
    }

    #[test]
    fn test_probe_drops_body_and_authorization() {
        let request = ApiRequest::new(Method::PATCH, url("/groups/g1/clusters/c1"))
            .with_json(&serde_json::json!({ "diskSizeGB": 20 }))
            .unwrap()
            .with_header(AUTHORIZATION, HeaderValue::from_static("Digest stale"));

        let probe = request.unauthenticated_probe();
        assert_eq!(probe.method, Method::PATCH);
        assert_eq!(probe.url, request.url);
        assert!(probe.body.is_none());
        assert!(probe.headers.get(AUTHORIZATION).is_none());
        assert_eq!(probe.headers.get(ACCEPT).unwrap(), APPLICATION_JSON);

        // The original is untouched.
        assert!(request.body.is_some());
        assert!(request.headers.get(AUTHORIZATION).is_some());
    }

    #[test]
    fn test_path_excludes_query() {
        let request = ApiRequest::new(Method::GET, url("/groups/g1/peers?pageNum=1"));
        assert_eq!(request.path(), "/groups/g1/peers");
    }

    #[test]
    fn test_response_json_and_error() {
        let ok = ApiResponse::new(StatusCode::OK, r#"{"id":"abc"}"#);
        let value: serde_json::Value = ok.json("group lookup").unwrap();
        assert_eq!(value["id"], "abc");

        let bad = ApiResponse::new(StatusCode::OK, "not json");
        let err = bad.json::<serde_json::Value>("group lookup").unwrap_err();
        assert!(matches!(err, AtlasClientError::Parse { .. }));

        let failed = ApiResponse::new(StatusCode::BAD_GATEWAY, "upstream down");
        let err = failed.into_error("group lookup");
        assert_eq!(
            err.to_string(),
            "group lookup: bad status 502 upstream down"
        );
    }
}
