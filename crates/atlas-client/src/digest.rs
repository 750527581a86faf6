//! HTTP Digest authentication (RFC 2617, `qop=auth`, MD5).
//!
//! Each call performs the full handshake: an unauthenticated probe to obtain
//! a fresh server nonce, then the real request with an `Authorization`
//! header. Nothing is cached between calls, so the nonce count is always
//! `00000001`.

use std::collections::HashMap;

use reqwest::header::{HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::Method;
use tracing::debug;

use crate::config::Credentials;
use crate::error::{AtlasClientError, AtlasClientResult};
use crate::token;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Nonce count sent with every authenticated request.
pub const NONCE_COUNT: &str = "00000001";

/// Length of the client nonce.
pub const CNONCE_LENGTH: usize = 32;

/// The fields of a `WWW-Authenticate: Digest ...` challenge this client uses.
///
/// Parsing is lenient: malformed pairs are skipped and missing fields are
/// left empty, in which case the server simply rejects the response hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: String,
}

impl DigestChallenge {
    /// Parse a challenge header value.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let params = parse_params(header);
        let field = |key: &str| params.get(key).cloned().unwrap_or_default();

        // A server may offer several protection modes; use the first.
        let qop = params
            .get("qop")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        Self {
            realm: field("realm"),
            nonce: field("nonce"),
            qop,
        }
    }
}

/// Split a digest parameter list into lower-cased keys and unquoted values.
///
/// Commas inside quoted values do not split. A leading `Digest` scheme token
/// is dropped.
pub fn parse_params(header: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    let trimmed = header.trim();
    let list = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
        _ => trimmed,
    };

    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in list.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    for item in items {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"').to_string();
        params.insert(key, value);
    }

    params
}

/// Lower-case hex MD5 of `input`.
#[must_use]
pub fn hex_md5(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Compute the digest `response` value:
/// `MD5(MD5(user:realm:key):nonce:nc:cnonce:qop:MD5(method:uri))`.
#[must_use]
pub fn compute_response(
    credentials: &Credentials,
    challenge: &DigestChallenge,
    method: &Method,
    uri: &str,
    cnonce: &str,
) -> String {
    let a1 = hex_md5(&format!(
        "{}:{}:{}",
        credentials.username(),
        challenge.realm,
        credentials.api_key()
    ));
    let a2 = hex_md5(&format!("{}:{}", method.as_str(), uri));
    hex_md5(&format!(
        "{a1}:{}:{NONCE_COUNT}:{cnonce}:{}:{a2}",
        challenge.nonce, challenge.qop
    ))
}

/// Build the `Authorization` header value for one request.
#[must_use]
pub fn authorization_value(
    credentials: &Credentials,
    challenge: &DigestChallenge,
    method: &Method,
    uri: &str,
    cnonce: &str,
) -> String {
    let response = compute_response(credentials, challenge, method, uri, cnonce);
    format!(
        r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", cnonce="{}", nc={}, qop="{}", response="{}", algorithm="MD5""#,
        credentials.username(),
        challenge.realm,
        challenge.nonce,
        uri,
        cnonce,
        NONCE_COUNT,
        challenge.qop,
        response,
    )
}

/// Digest authentication handler bound to one set of credentials.
#[derive(Debug, Clone)]
pub struct DigestAuth {
    credentials: Credentials,
}

impl DigestAuth {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Send `request` through the two-step digest handshake.
    ///
    /// The probe carries the original headers but no body. The returned
    /// response is whatever the authenticated send produced, whatever its
    /// status; only transport failures are errors.
    pub async fn send(
        &self,
        transport: &dyn HttpTransport,
        request: ApiRequest,
    ) -> AtlasClientResult<ApiResponse> {
        debug!(method = %request.method, path = request.path(), "Digest probe");
        let probe = transport
            .send(request.unauthenticated_probe())
            .await
            .map_err(|e| e.context("digest probe"))?;

        let challenge_header = probe
            .header_str(WWW_AUTHENTICATE.as_str())
            .unwrap_or_default();
        let challenge = DigestChallenge::parse(challenge_header);
        let cnonce = token::generate(CNONCE_LENGTH)?;

        let header = authorization_value(
            &self.credentials,
            &challenge,
            &request.method,
            request.path(),
            &cnonce,
        );
        let value = HeaderValue::from_str(&header).map_err(|e| {
            AtlasClientError::parse("digest header", format!("invalid header value: {e}"))
        })?;

        let request = request.with_header(AUTHORIZATION, value);
        transport
            .send(request)
            .await
            .map_err(|e| e.context("digest request"))
    }
}
