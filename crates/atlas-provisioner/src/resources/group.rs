//! Groups (projects). Created synchronously and looked up by name.

use async_trait::async_trait;
use atlas_client::models::{Group, GroupCreate};
use atlas_client::AtlasClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProvisionResult;
use crate::reconciler::{ManagedResource, Settled};

/// Desired group. `id` is the identifier from a previous reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutputs {
    pub group_id: String,
    pub org_id: String,
}

#[derive(Debug, Clone)]
pub struct GroupResource {
    client: AtlasClient,
    org_id: String,
}

impl GroupResource {
    #[must_use]
    pub fn new(client: AtlasClient, org_id: impl Into<String>) -> Self {
        Self {
            client,
            org_id: org_id.into(),
        }
    }
}

#[async_trait]
impl ManagedResource for GroupResource {
    type Desired = GroupSpec;
    type Record = Group;
    type Outputs = GroupOutputs;

    const KIND: &'static str = "group";

    fn name<'a>(&self, desired: &'a GroupSpec) -> &'a str {
        &desired.name
    }

    async fn read(&self, desired: &GroupSpec) -> ProvisionResult<Option<Group>> {
        Ok(self.client.get_group_by_name(&desired.name).await?)
    }

    async fn create(&self, desired: &GroupSpec) -> ProvisionResult<Option<Group>> {
        let payload = GroupCreate {
            name: desired.name.clone(),
            org_id: self.org_id.clone(),
        };
        Ok(Some(self.client.create_group(&payload).await?))
    }

    // Nothing on a group is mutable through this API; report its current state.
    async fn update(&self, desired: &GroupSpec) -> ProvisionResult<Option<Group>> {
        self.read(desired).await
    }

    async fn delete(&self, desired: &GroupSpec) -> ProvisionResult<()> {
        let id = match &desired.id {
            Some(id) => id.clone(),
            None => match self.read(desired).await? {
                Some(group) => group.id,
                None => {
                    debug!(name = %desired.name, "Group already absent");
                    return Ok(());
                }
            },
        };
        Ok(self.client.delete_group(&id).await?)
    }

    async fn settle(
        &self,
        _desired: &GroupSpec,
        record: Group,
    ) -> ProvisionResult<Settled<GroupOutputs>> {
        Ok(Settled {
            id: record.id.clone(),
            outputs: GroupOutputs {
                group_id: record.id,
                org_id: record.org_id,
            },
        })
    }
}
