//! Wire models for the Atlas control-plane API.
//!
//! Read models default every field so partial responses still decode.

use serde::{Deserialize, Serialize};

// ── Groups ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub org_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreate {
    pub name: String,
    pub org_id: String,
}

// ── Clusters ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub region_name: String,
    #[serde(default)]
    pub instance_size_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScaling {
    #[serde(rename = "diskGBEnabled", default)]
    pub disk_gb_enabled: bool,
}

/// Body of `POST /groups/{groupId}/clusters`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreate {
    pub auto_scaling: AutoScaling,
    pub name: String,
    #[serde(rename = "mongoDBMajorVersion")]
    pub mongo_db_major_version: String,
    pub replication_factor: u32,
    pub backup_enabled: bool,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: u32,
    pub provider_settings: ProviderSettings,
}

/// Body of `PATCH /groups/{groupId}/clusters/{name}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdate {
    pub auto_scaling: AutoScaling,
    #[serde(rename = "mongoDBMajorVersion")]
    pub mongo_db_major_version: String,
    pub replication_factor: u32,
    pub backup_enabled: bool,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: u32,
    pub provider_settings: ProviderSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub state_name: String,
    #[serde(rename = "mongoURI", default)]
    pub mongo_uri: String,
    #[serde(rename = "mongoURIWithOptions", default)]
    pub mongo_uri_with_options: String,
    #[serde(rename = "mongoDBMajorVersion", default)]
    pub mongo_db_major_version: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub provider_settings: ProviderSettings,
}

// ── Network containers ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub region_name: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub atlas_cidr_block: String,
    #[serde(default)]
    pub provisioned: bool,
}

/// Paged list envelope used by collection endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub results: Option<Vec<T>>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

// ── Network peers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub aws_account_id: String,
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub route_table_cidr_block: String,
    #[serde(default)]
    pub container_id: String,
    #[serde(default)]
    pub status_name: String,
    #[serde(default)]
    pub error_state_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerCreate {
    pub vpc_id: String,
    pub aws_account_id: String,
    pub route_table_cidr_block: String,
    pub container_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerUpdate {
    pub vpc_id: String,
    pub aws_account_id: String,
    pub route_table_cidr_block: String,
}

// ── Database users ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    #[serde(default)]
    pub database_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub collection_name: String,
    #[serde(default)]
    pub role_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUserCreate {
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub group_id: String,
    pub roles: Vec<UserRole>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUserUpdate {
    pub password: String,
    pub roles: Vec<UserRole>,
}

impl std::fmt::Debug for DatabaseUserCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseUserCreate")
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("group_id", &self.group_id)
            .field("roles", &self.roles)
            .finish()
    }
}

impl std::fmt::Debug for DatabaseUserUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseUserUpdate")
            .field("password", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish()
    }
}

// ── IP whitelist ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEntry {
    #[serde(default)]
    pub cidr_block: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEntryCreate {
    pub cidr_block: String,
    pub comment: String,
}
