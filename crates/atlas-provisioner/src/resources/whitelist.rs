//! IP access list entries.

use async_trait::async_trait;
use atlas_client::models::{WhitelistEntry, WhitelistEntryCreate};
use atlas_client::AtlasClient;
use serde::{Deserialize, Serialize};

use crate::error::ProvisionResult;
use crate::reconciler::{ManagedResource, Settled};

/// Desired entry. `address` is a single IP or a CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistSpec {
    pub group_id: String,
    pub address: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhitelistOutputs {
    pub cidr_block: String,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct WhitelistResource {
    client: AtlasClient,
}

impl WhitelistResource {
    #[must_use]
    pub fn new(client: AtlasClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManagedResource for WhitelistResource {
    type Desired = WhitelistSpec;
    type Record = WhitelistEntry;
    type Outputs = WhitelistOutputs;

    const KIND: &'static str = "whitelist entry";

    fn name<'a>(&self, desired: &'a WhitelistSpec) -> &'a str {
        &desired.address
    }

    async fn read(&self, desired: &WhitelistSpec) -> ProvisionResult<Option<WhitelistEntry>> {
        Ok(self
            .client
            .get_whitelist_entry(&desired.group_id, &desired.address)
            .await?)
    }

    async fn create(&self, desired: &WhitelistSpec) -> ProvisionResult<Option<WhitelistEntry>> {
        let entry = WhitelistEntryCreate {
            cidr_block: desired.address.clone(),
            comment: desired.comment.clone(),
        };
        self.client
            .create_whitelist_entries(&desired.group_id, std::slice::from_ref(&entry))
            .await?;

        // The create response lists the whole access list; the entry itself
        // is exactly what was sent.
        Ok(Some(WhitelistEntry {
            cidr_block: entry.cidr_block,
            ip_address: String::new(),
            group_id: desired.group_id.clone(),
            comment: entry.comment,
        }))
    }

    // Entries are immutable; report the current state.
    async fn update(&self, desired: &WhitelistSpec) -> ProvisionResult<Option<WhitelistEntry>> {
        self.read(desired).await
    }

    async fn delete(&self, desired: &WhitelistSpec) -> ProvisionResult<()> {
        Ok(self
            .client
            .delete_whitelist_entry(&desired.group_id, &desired.address)
            .await?)
    }

    async fn settle(
        &self,
        desired: &WhitelistSpec,
        record: WhitelistEntry,
    ) -> ProvisionResult<Settled<WhitelistOutputs>> {
        let cidr_block = if record.cidr_block.is_empty() {
            desired.address.clone()
        } else {
            record.cidr_block
        };
        Ok(Settled {
            id: desired.address.clone(),
            outputs: WhitelistOutputs {
                cidr_block,
                comment: record.comment,
            },
        })
    }
}
