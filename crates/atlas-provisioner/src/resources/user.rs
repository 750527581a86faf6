//! Database users.
//!
//! Users live in the `admin` auth database of a group and are granted
//! `readWrite` on one database. A user change makes Atlas reconfigure the
//! owning cluster, so writes wait for that cluster to settle again. The
//! output is the cluster connection string carrying the user's credentials.

use async_trait::async_trait;
use atlas_client::client::ADMIN_DATABASE;
use atlas_client::models::{Cluster, DatabaseUser, DatabaseUserCreate, DatabaseUserUpdate, UserRole};
use atlas_client::AtlasClient;
use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, ProvisionResult};
use crate::poller::ConvergencePoller;
use crate::reconciler::{ManagedResource, Settled};
use crate::resources::cluster::cluster_state;

/// Role granted on the user's database.
pub const USER_ROLE: &str = "readWrite";

/// Desired database user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub group_id: String,
    pub cluster_name: String,
    pub name: String,
    pub password: String,
    pub database_name: String,
}

impl std::fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSpec")
            .field("group_id", &self.group_id)
            .field("cluster_name", &self.cluster_name)
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .field("database_name", &self.database_name)
            .finish()
    }
}

impl UserSpec {
    fn roles(&self) -> Vec<UserRole> {
        vec![UserRole {
            database_name: self.database_name.clone(),
            collection_name: String::new(),
            role_name: USER_ROLE.to_string(),
        }]
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UserOutputs {
    /// Connection string including the user's password.
    pub mongodb_uri: String,
}

impl std::fmt::Debug for UserOutputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserOutputs")
            .field("mongodb_uri", &"[REDACTED]")
            .finish()
    }
}

/// Insert `username:password@` into a connection string and point its path
/// at the user's own database name.
///
/// Handles multi-host authorities (`h1:27017,h2:27017`). Existing user-info
/// is replaced and the query string is kept.
pub fn weave_credentials(uri: &str, username: &str, password: &str) -> ProvisionResult<String> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| ProvisionError::InvalidConnectionUri(format!("missing scheme in {uri:?}")))?;
    if scheme.is_empty() {
        return Err(ProvisionError::InvalidConnectionUri(format!(
            "missing scheme in {uri:?}"
        )));
    }

    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let hosts = authority
        .rsplit_once('@')
        .map_or(authority, |(_, hosts)| hosts);
    if hosts.is_empty() {
        return Err(ProvisionError::InvalidConnectionUri(format!(
            "missing host in {uri:?}"
        )));
    }

    let query = tail.split_once('?').map(|(_, query)| query);

    let mut woven = format!(
        "{scheme}://{}:{}@{hosts}/{}",
        urlencoding::encode(username),
        urlencoding::encode(password),
        urlencoding::encode(username),
    );
    if let Some(query) = query {
        woven.push('?');
        woven.push_str(query);
    }
    Ok(woven)
}

#[derive(Debug, Clone)]
pub struct UserResource {
    client: AtlasClient,
}

impl UserResource {
    #[must_use]
    pub fn new(client: AtlasClient) -> Self {
        Self { client }
    }

    async fn owning_cluster(&self, desired: &UserSpec) -> ProvisionResult<Cluster> {
        self.client
            .get_cluster(&desired.group_id, &desired.cluster_name)
            .await?
            .ok_or_else(|| self.missing_cluster(desired))
    }

    fn missing_cluster(&self, desired: &UserSpec) -> ProvisionError {
        ProvisionError::DependencyNotFound {
            kind: Self::KIND,
            what: format!("cluster {}", desired.cluster_name),
        }
    }
}

#[async_trait]
impl ManagedResource for UserResource {
    type Desired = UserSpec;
    type Record = DatabaseUser;
    type Outputs = UserOutputs;

    const KIND: &'static str = "database user";

    fn name<'a>(&self, desired: &'a UserSpec) -> &'a str {
        &desired.name
    }

    async fn read(&self, desired: &UserSpec) -> ProvisionResult<Option<DatabaseUser>> {
        self.owning_cluster(desired).await?;
        Ok(self
            .client
            .get_database_user(&desired.group_id, &desired.name)
            .await?)
    }

    async fn create(&self, desired: &UserSpec) -> ProvisionResult<Option<DatabaseUser>> {
        let payload = DatabaseUserCreate {
            database_name: ADMIN_DATABASE.to_string(),
            username: desired.name.clone(),
            password: desired.password.clone(),
            group_id: desired.group_id.clone(),
            roles: desired.roles(),
        };
        let user = self
            .client
            .create_database_user(&desired.group_id, &payload)
            .await?;
        Ok(Some(user))
    }

    async fn update(&self, desired: &UserSpec) -> ProvisionResult<Option<DatabaseUser>> {
        self.owning_cluster(desired).await?;
        let payload = DatabaseUserUpdate {
            password: desired.password.clone(),
            roles: desired.roles(),
        };
        Ok(self
            .client
            .update_database_user(&desired.group_id, &desired.name, &payload)
            .await?)
    }

    async fn delete(&self, desired: &UserSpec) -> ProvisionResult<()> {
        Ok(self
            .client
            .delete_database_user(&desired.group_id, &desired.name)
            .await?)
    }

    async fn after_write(
        &self,
        desired: &UserSpec,
        poller: &ConvergencePoller,
    ) -> ProvisionResult<()> {
        let client = &self.client;
        let group_id = desired.group_id.as_str();
        let cluster_name = desired.cluster_name.as_str();

        poller
            .wait_until_settled(
                "cluster",
                cluster_name,
                move || async move {
                    client
                        .get_cluster(group_id, cluster_name)
                        .await
                        .map_err(ProvisionError::from)
                },
                |cluster: &Cluster| cluster_state(&cluster.state_name),
            )
            .await?
            .map(|_| ())
            .ok_or_else(|| self.missing_cluster(desired))
    }

    async fn settle(
        &self,
        desired: &UserSpec,
        _record: DatabaseUser,
    ) -> ProvisionResult<Settled<UserOutputs>> {
        let cluster = self.owning_cluster(desired).await?;
        let mongodb_uri = weave_credentials(
            &cluster.mongo_uri_with_options,
            &desired.name,
            &desired.password,
        )?;
        Ok(Settled {
            id: desired.name.clone(),
            outputs: UserOutputs { mongodb_uri },
        })
    }
}
