//! Atlas control-plane REST client.
//!
//! Every call goes through [`DigestAuth`]; this layer only builds requests and
//! classifies status codes. `404` on reads is an absent object, never an
//! error, and `404` on deletes counts as already deleted.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::config::{AtlasConfig, Credentials};
use crate::digest::DigestAuth;
use crate::error::{AtlasClientError, AtlasClientResult};
use crate::models::{
    Cluster, ClusterCreate, ClusterUpdate, Container, DatabaseUser, DatabaseUserCreate,
    DatabaseUserUpdate, Group, GroupCreate, ListResponse, Peer, PeerCreate, PeerUpdate,
    WhitelistEntry, WhitelistEntryCreate,
};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Auth database every managed database user is created in.
pub const ADMIN_DATABASE: &str = "admin";

/// Digest-authenticated client for the Atlas API.
///
/// Cheap to clone; clones share one transport.
#[derive(Clone)]
pub struct AtlasClient {
    base_url: String,
    auth: DigestAuth,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for AtlasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl AtlasClient {
    /// Build a client with its own `reqwest` transport from configuration.
    pub fn new(config: &AtlasConfig) -> AtlasClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("atlas-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AtlasClientError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;

        Self::with_transport(
            &config.base_url,
            config.credentials.clone(),
            Arc::new(http_client),
        )
    }

    /// Build a client over an explicit transport.
    pub fn with_transport(
        base_url: &str,
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> AtlasClientResult<Self> {
        // Normalize base URL: strip trailing slash.
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| AtlasClientError::InvalidConfig(format!("invalid base URL: {e}")))?;

        Ok(Self {
            base_url,
            auth: DigestAuth::new(credentials),
            transport,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// Look a group up by name (GET /groups/byName/{name}).
    ///
    /// A `401` is treated like `404`: the API answers that way for names that
    /// exist but are outside the caller's organization.
    pub async fn get_group_by_name(&self, name: &str) -> AtlasClientResult<Option<Group>> {
        const CONTEXT: &str = "group lookup";
        let path = format!("/groups/byName/{}", seg(name));
        let response = self.send(Method::GET, &path, CONTEXT).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        optional(response, CONTEXT)
    }

    /// Create a group (POST /groups).
    pub async fn create_group(&self, group: &GroupCreate) -> AtlasClientResult<Group> {
        const CONTEXT: &str = "group create";
        let response = self
            .send_json(Method::POST, "/groups", group, CONTEXT)
            .await?;
        expect(response, &[StatusCode::CREATED], CONTEXT)
    }

    /// Delete a group (DELETE /groups/{groupId}).
    pub async fn delete_group(&self, group_id: &str) -> AtlasClientResult<()> {
        const CONTEXT: &str = "group delete";
        let path = format!("/groups/{}", seg(group_id));
        let response = self.send(Method::DELETE, &path, CONTEXT).await?;
        deleted(response, CONTEXT)
    }

    // ── Clusters ──────────────────────────────────────────────────────

    /// GET /groups/{groupId}/clusters/{name}
    pub async fn get_cluster(
        &self,
        group_id: &str,
        name: &str,
    ) -> AtlasClientResult<Option<Cluster>> {
        const CONTEXT: &str = "cluster lookup";
        let path = format!("/groups/{}/clusters/{}", seg(group_id), seg(name));
        let response = self.send(Method::GET, &path, CONTEXT).await?;
        optional(response, CONTEXT)
    }

    /// POST /groups/{groupId}/clusters
    pub async fn create_cluster(
        &self,
        group_id: &str,
        cluster: &ClusterCreate,
    ) -> AtlasClientResult<Cluster> {
        const CONTEXT: &str = "cluster create";
        let path = format!("/groups/{}/clusters", seg(group_id));
        let response = self.send_json(Method::POST, &path, cluster, CONTEXT).await?;
        expect(response, &[StatusCode::CREATED], CONTEXT)
    }

    /// PATCH /groups/{groupId}/clusters/{name}. `None` when the cluster is gone.
    pub async fn update_cluster(
        &self,
        group_id: &str,
        name: &str,
        cluster: &ClusterUpdate,
    ) -> AtlasClientResult<Option<Cluster>> {
        const CONTEXT: &str = "cluster update";
        let path = format!("/groups/{}/clusters/{}", seg(group_id), seg(name));
        let response = self
            .send_json(Method::PATCH, &path, cluster, CONTEXT)
            .await?;
        optional(response, CONTEXT)
    }

    /// DELETE /groups/{groupId}/clusters/{name}
    pub async fn delete_cluster(&self, group_id: &str, name: &str) -> AtlasClientResult<()> {
        const CONTEXT: &str = "cluster delete";
        let path = format!("/groups/{}/clusters/{}", seg(group_id), seg(name));
        let response = self.send(Method::DELETE, &path, CONTEXT).await?;
        deleted(response, CONTEXT)
    }

    // ── Network containers ────────────────────────────────────────────

    /// GET /groups/{groupId}/containers. A response without `results` is malformed.
    pub async fn list_containers(&self, group_id: &str) -> AtlasClientResult<Vec<Container>> {
        const CONTEXT: &str = "container list";
        let path = format!("/groups/{}/containers", seg(group_id));
        let response = self.send(Method::GET, &path, CONTEXT).await?;
        let list: ListResponse<Container> = expect(response, &[StatusCode::OK], CONTEXT)?;
        list.results
            .ok_or_else(|| AtlasClientError::parse(CONTEXT, "response has no results"))
    }

    // ── Network peers ─────────────────────────────────────────────────

    /// GET /groups/{groupId}/peers
    pub async fn list_peers(&self, group_id: &str) -> AtlasClientResult<Vec<Peer>> {
        const CONTEXT: &str = "peer list";
        let path = format!("/groups/{}/peers", seg(group_id));
        let response = self.send(Method::GET, &path, CONTEXT).await?;
        let list: ListResponse<Peer> = expect(response, &[StatusCode::OK], CONTEXT)?;
        Ok(list.results.unwrap_or_default())
    }

    /// GET /groups/{groupId}/peers/{id}
    pub async fn get_peer(&self, group_id: &str, peer_id: &str) -> AtlasClientResult<Option<Peer>> {
        const CONTEXT: &str = "peer lookup";
        let path = format!("/groups/{}/peers/{}", seg(group_id), seg(peer_id));
        let response = self.send(Method::GET, &path, CONTEXT).await?;
        optional(response, CONTEXT)
    }

    /// POST /groups/{groupId}/peers
    pub async fn create_peer(&self, group_id: &str, peer: &PeerCreate) -> AtlasClientResult<Peer> {
        const CONTEXT: &str = "peer create";
        let path = format!("/groups/{}/peers", seg(group_id));
        let response = self.send_json(Method::POST, &path, peer, CONTEXT).await?;
        expect(response, &[StatusCode::CREATED], CONTEXT)
    }

    /// PATCH /groups/{groupId}/peers/{id}. `None` when the peer is gone.
    pub async fn update_peer(
        &self,
        group_id: &str,
        peer_id: &str,
        peer: &PeerUpdate,
    ) -> AtlasClientResult<Option<Peer>> {
        const CONTEXT: &str = "peer update";
        let path = format!("/groups/{}/peers/{}", seg(group_id), seg(peer_id));
        let response = self.send_json(Method::PATCH, &path, peer, CONTEXT).await?;
        optional(response, CONTEXT)
    }

    /// DELETE /groups/{groupId}/peers/{id}
    pub async fn delete_peer(&self, group_id: &str, peer_id: &str) -> AtlasClientResult<()> {
        const CONTEXT: &str = "peer delete";
        let path = format!("/groups/{}/peers/{}", seg(group_id), seg(peer_id));
        let response = self.send(Method::DELETE, &path, CONTEXT).await?;
        deleted(response, CONTEXT)
    }

    // ── Database users ────────────────────────────────────────────────

    /// GET /groups/{groupId}/databaseUsers/admin/{name}
    pub async fn get_database_user(
        &self,
        group_id: &str,
        username: &str,
    ) -> AtlasClientResult<Option<DatabaseUser>> {
        const CONTEXT: &str = "database user lookup";
        let response = self
            .send(Method::GET, &user_path(group_id, username), CONTEXT)
            .await?;
        optional(response, CONTEXT)
    }

    /// POST /groups/{groupId}/databaseUsers
    pub async fn create_database_user(
        &self,
        group_id: &str,
        user: &DatabaseUserCreate,
    ) -> AtlasClientResult<DatabaseUser> {
        const CONTEXT: &str = "database user create";
        let path = format!("/groups/{}/databaseUsers", seg(group_id));
        let response = self.send_json(Method::POST, &path, user, CONTEXT).await?;
        expect(response, &[StatusCode::CREATED], CONTEXT)
    }

    /// PATCH /groups/{groupId}/databaseUsers/admin/{name}. `None` when the user is gone.
    pub async fn update_database_user(
        &self,
        group_id: &str,
        username: &str,
        user: &DatabaseUserUpdate,
    ) -> AtlasClientResult<Option<DatabaseUser>> {
        const CONTEXT: &str = "database user update";
        let response = self
            .send_json(Method::PATCH, &user_path(group_id, username), user, CONTEXT)
            .await?;
        optional(response, CONTEXT)
    }

    /// DELETE /groups/{groupId}/databaseUsers/admin/{name}
    pub async fn delete_database_user(
        &self,
        group_id: &str,
        username: &str,
    ) -> AtlasClientResult<()> {
        const CONTEXT: &str = "database user delete";
        let response = self
            .send(Method::DELETE, &user_path(group_id, username), CONTEXT)
            .await?;
        deleted(response, CONTEXT)
    }

    // ── IP whitelist ──────────────────────────────────────────────────

    /// GET /groups/{groupId}/whitelist/{address}
    pub async fn get_whitelist_entry(
        &self,
        group_id: &str,
        address: &str,
    ) -> AtlasClientResult<Option<WhitelistEntry>> {
        const CONTEXT: &str = "whitelist lookup";
        let path = format!("/groups/{}/whitelist/{}", seg(group_id), seg(address));
        let response = self.send(Method::GET, &path, CONTEXT).await?;
        optional(response, CONTEXT)
    }

    /// POST /groups/{groupId}/whitelist with a batch of entries.
    pub async fn create_whitelist_entries(
        &self,
        group_id: &str,
        entries: &[WhitelistEntryCreate],
    ) -> AtlasClientResult<()> {
        const CONTEXT: &str = "whitelist create";
        let path = format!("/groups/{}/whitelist", seg(group_id));
        let response = self.send_json(Method::POST, &path, entries, CONTEXT).await?;
        if response.status == StatusCode::CREATED {
            Ok(())
        } else {
            Err(response.into_error(CONTEXT))
        }
    }

    /// DELETE /groups/{groupId}/whitelist/{address}
    pub async fn delete_whitelist_entry(
        &self,
        group_id: &str,
        address: &str,
    ) -> AtlasClientResult<()> {
        const CONTEXT: &str = "whitelist delete";
        let path = format!("/groups/{}/whitelist/{}", seg(group_id), seg(address));
        let response = self.send(Method::DELETE, &path, CONTEXT).await?;
        deleted(response, CONTEXT)
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    fn url(&self, path: &str) -> AtlasClientResult<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| AtlasClientError::InvalidConfig(format!("bad request URL {path}: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        context: &str,
    ) -> AtlasClientResult<ApiResponse> {
        let request = ApiRequest::new(method, self.url(path)?);
        self.dispatch(request, context).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        context: &str,
    ) -> AtlasClientResult<ApiResponse> {
        let request = ApiRequest::new(method, self.url(path)?)
            .with_json(body)
            .map_err(|e| e.context(context))?;
        self.dispatch(request, context).await
    }

    async fn dispatch(&self, request: ApiRequest, context: &str) -> AtlasClientResult<ApiResponse> {
        debug!("Atlas {} {}", request.method, request.path());
        let response = self
            .auth
            .send(self.transport.as_ref(), request)
            .await
            .map_err(|e| e.context(context))?;
        debug!(
            status = response.status.as_u16(),
            "Atlas {context} answered"
        );
        Ok(response)
    }
}

// ── Response Handling ─────────────────────────────────────────────────

fn expect<T: DeserializeOwned>(
    response: ApiResponse,
    accepted: &[StatusCode],
    context: &str,
) -> AtlasClientResult<T> {
    if accepted.contains(&response.status) {
        response.json(context)
    } else {
        Err(response.into_error(context))
    }
}

fn optional<T: DeserializeOwned>(
    response: ApiResponse,
    context: &str,
) -> AtlasClientResult<Option<T>> {
    match response.status {
        StatusCode::NOT_FOUND => Ok(None),
        StatusCode::OK => response.json(context).map(Some),
        _ => Err(response.into_error(context)),
    }
}

fn deleted(response: ApiResponse, context: &str) -> AtlasClientResult<()> {
    match response.status {
        StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
            Ok(())
        }
        _ => Err(response.into_error(context)),
    }
}

/// Escape one path segment (whitelist addresses carry `/`).
fn seg(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

fn user_path(group_id: &str, username: &str) -> String {
    format!(
        "/groups/{}/databaseUsers/{ADMIN_DATABASE}/{}",
        seg(group_id),
        seg(username)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seg_escapes_cidr() {
        assert_eq!(seg("10.0.0.0/16"), "10.0.0.0%2F16");
        assert_eq!(seg("c1"), "c1");
    }

    #[test]
    fn test_user_path() {
        assert_eq!(user_path("g1", "app"), "/groups/g1/databaseUsers/admin/app");
    }

    #[test]
    fn test_optional_classification() {
        let absent: Option<Group> =
            optional(ApiResponse::new(StatusCode::NOT_FOUND, "nope"), "x").unwrap();
        assert!(absent.is_none());

        let present: Option<Group> = optional(
            ApiResponse::new(StatusCode::OK, r#"{"id":"g1","name":"prod"}"#),
            "x",
        )
        .unwrap();
        assert_eq!(present.unwrap().id, "g1");

        let forbidden = ApiResponse::new(StatusCode::FORBIDDEN, "denied");
        let err = optional::<Group>(forbidden, "group lookup").unwrap_err();
        assert_eq!(err.to_string(), "group lookup: bad status 403 denied");
    }

    #[test]
    fn test_deleted_accepts_success_family_and_not_found() {
        for status in [
            StatusCode::OK,
            StatusCode::ACCEPTED,
            StatusCode::NO_CONTENT,
            StatusCode::NOT_FOUND,
        ] {
            assert!(deleted(ApiResponse::new(status, ""), "x").is_ok());
        }
        let conflict = ApiResponse::new(StatusCode::CONFLICT, "busy");
        let err = deleted(conflict, "peer delete").unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_expect_rejects_unlisted_status() {
        let ok = ApiResponse::new(StatusCode::OK, "{}");
        let err = expect::<Group>(ok, &[StatusCode::CREATED], "group create").unwrap_err();
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn test_base_url_normalized() {
        let transport: Arc<dyn HttpTransport> = Arc::new(reqwest::Client::new());
        let client = AtlasClient::with_transport(
            "http://localhost:8080/api/",
            Credentials::new("u", "k"),
            transport,
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(
            client.url("/groups").unwrap().as_str(),
            "http://localhost:8080/api/groups"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let transport: Arc<dyn HttpTransport> = Arc::new(reqwest::Client::new());
        let err = AtlasClient::with_transport("::not a url", Credentials::new("u", "k"), transport)
            .unwrap_err();
        assert!(matches!(err, AtlasClientError::InvalidConfig(_)));
    }
}
