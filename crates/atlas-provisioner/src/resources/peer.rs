//! VPC peering connections between an Atlas network container and a
//! customer VPC.

use async_trait::async_trait;
use atlas_client::models::{Peer, PeerCreate, PeerUpdate};
use atlas_client::AtlasClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProvisionResult;
use crate::poller::Convergence;
use crate::reconciler::{ManagedResource, Settled};

/// Desired peering connection.
///
/// `id` is the identifier recorded by a previous reconciliation, if any.
/// Without it the peer is found by `vpc_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSpec {
    pub group_id: String,
    pub container_id: String,
    pub aws_account_id: String,
    pub vpc_id: String,
    pub vpc_cidr: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl PeerSpec {
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerOutputs {
    pub connection_id: String,
}

/// Classify a peer by `statusName` and `errorStateName`.
#[must_use]
pub fn peer_state(peer: &Peer) -> Convergence {
    if let Some(error_state) = peer.error_state_name.as_deref().filter(|s| !s.is_empty()) {
        return Convergence::Failed {
            state: error_state.to_string(),
        };
    }
    match peer.status_name.as_str() {
        "PENDING_ACCEPTANCE" | "FINALIZING" | "AVAILABLE" => Convergence::Ready,
        "FAILED" | "TERMINATING" => Convergence::Failed {
            state: peer.status_name.clone(),
        },
        _ => Convergence::Converging,
    }
}

#[derive(Debug, Clone)]
pub struct PeerResource {
    client: AtlasClient,
}

impl PeerResource {
    #[must_use]
    pub fn new(client: AtlasClient) -> Self {
        Self { client }
    }

    async fn find_by_vpc(&self, desired: &PeerSpec) -> ProvisionResult<Option<Peer>> {
        let peers = self.client.list_peers(&desired.group_id).await?;
        debug!(group_id = %desired.group_id, count = peers.len(), "Listed peers");
        Ok(peers.into_iter().find(|p| p.vpc_id == desired.vpc_id))
    }
}

#[async_trait]
impl ManagedResource for PeerResource {
    type Desired = PeerSpec;
    type Record = Peer;
    type Outputs = PeerOutputs;

    const KIND: &'static str = "peer";
    const ASYNC: bool = true;
    const DELETE_FAILED_ON_READ: bool = true;

    fn name<'a>(&self, desired: &'a PeerSpec) -> &'a str {
        desired.id.as_deref().unwrap_or(&desired.vpc_id)
    }

    async fn read(&self, desired: &PeerSpec) -> ProvisionResult<Option<Peer>> {
        match &desired.id {
            Some(id) => Ok(self.client.get_peer(&desired.group_id, id).await?),
            None => self.find_by_vpc(desired).await,
        }
    }

    async fn create(&self, desired: &PeerSpec) -> ProvisionResult<Option<Peer>> {
        let payload = PeerCreate {
            vpc_id: desired.vpc_id.clone(),
            aws_account_id: desired.aws_account_id.clone(),
            route_table_cidr_block: desired.vpc_cidr.clone(),
            container_id: desired.container_id.clone(),
        };
        let peer = self.client.create_peer(&desired.group_id, &payload).await?;
        Ok(Some(peer))
    }

    async fn update(&self, desired: &PeerSpec) -> ProvisionResult<Option<Peer>> {
        let Some(id) = &desired.id else {
            return Ok(None);
        };
        let payload = PeerUpdate {
            vpc_id: desired.vpc_id.clone(),
            aws_account_id: desired.aws_account_id.clone(),
            route_table_cidr_block: desired.vpc_cidr.clone(),
        };
        Ok(self
            .client
            .update_peer(&desired.group_id, id, &payload)
            .await?)
    }

    async fn delete(&self, desired: &PeerSpec) -> ProvisionResult<()> {
        match &desired.id {
            Some(id) => Ok(self.client.delete_peer(&desired.group_id, id).await?),
            None => Ok(()),
        }
    }

    fn classify(&self, record: &Peer) -> Convergence {
        peer_state(record)
    }

    async fn refresh(&self, desired: &PeerSpec, seed: &Peer) -> ProvisionResult<Option<Peer>> {
        Ok(self.client.get_peer(&desired.group_id, &seed.id).await?)
    }

    async fn discard(&self, desired: &PeerSpec, record: &Peer) -> ProvisionResult<()> {
        Ok(self
            .client
            .delete_peer(&desired.group_id, &record.id)
            .await?)
    }

    async fn settle(
        &self,
        _desired: &PeerSpec,
        record: Peer,
    ) -> ProvisionResult<Settled<PeerOutputs>> {
        Ok(Settled {
            id: record.id,
            outputs: PeerOutputs {
                connection_id: record.connection_id,
            },
        })
    }
}
