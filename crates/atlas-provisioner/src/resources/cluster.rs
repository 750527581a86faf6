//! Database clusters.
//!
//! Clusters provision asynchronously. Once a cluster is ready its network
//! container for the configured region is resolved and reported as output.

use async_trait::async_trait;
use atlas_client::models::{
    AutoScaling, Cluster, ClusterCreate, ClusterUpdate, Container, ProviderSettings,
};
use atlas_client::AtlasClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProvisionError, ProvisionResult};
use crate::poller::Convergence;
use crate::reconciler::{ManagedResource, Settled};

pub const DEFAULT_SERVICE_PROVIDER: &str = "AWS";
pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_SIZE: &str = "M10";
pub const DEFAULT_DISK_SIZE_GB: u32 = 10;
pub const DEFAULT_REPLICATION_FACTOR: u32 = 3;
pub const DEFAULT_MONGODB_VERSION: &str = "3.6";

/// Desired cluster attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub group_id: String,
    pub name: String,
    #[serde(default = "default_service_provider")]
    pub service_provider: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_disk_size_gb")]
    pub disk_size_gb: u32,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    #[serde(default = "default_mongodb_version")]
    pub mongodb_version: String,
}

fn default_service_provider() -> String {
    DEFAULT_SERVICE_PROVIDER.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_size() -> String {
    DEFAULT_SIZE.to_string()
}

fn default_disk_size_gb() -> u32 {
    DEFAULT_DISK_SIZE_GB
}

fn default_replication_factor() -> u32 {
    DEFAULT_REPLICATION_FACTOR
}

fn default_mongodb_version() -> String {
    DEFAULT_MONGODB_VERSION.to_string()
}

impl ClusterSpec {
    /// A cluster with default provider, region, size and version.
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            service_provider: default_service_provider(),
            region: default_region(),
            size: default_size(),
            disk_size_gb: DEFAULT_DISK_SIZE_GB,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            mongodb_version: default_mongodb_version(),
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Region in API form, e.g. `US_EAST_2`.
    #[must_use]
    pub fn api_region(&self) -> String {
        normalize_region(&self.region)
    }

    fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            provider_name: self.service_provider.to_uppercase(),
            region_name: self.api_region(),
            instance_size_name: self.size.to_uppercase(),
        }
    }

    fn create_payload(&self) -> ClusterCreate {
        ClusterCreate {
            auto_scaling: AutoScaling {
                disk_gb_enabled: true,
            },
            name: self.name.clone(),
            mongo_db_major_version: self.mongodb_version.clone(),
            replication_factor: self.replication_factor,
            backup_enabled: true,
            disk_size_gb: self.disk_size_gb,
            provider_settings: self.provider_settings(),
        }
    }

    fn update_payload(&self) -> ClusterUpdate {
        ClusterUpdate {
            auto_scaling: AutoScaling {
                disk_gb_enabled: true,
            },
            mongo_db_major_version: self.mongodb_version.clone(),
            replication_factor: self.replication_factor,
            backup_enabled: true,
            disk_size_gb: self.disk_size_gb,
            provider_settings: self.provider_settings(),
        }
    }
}

/// Network placement of a settled cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterOutputs {
    pub container_id: String,
    pub atlas_vpc_id: String,
    pub atlas_cidr: String,
}

/// `us-east-2` -> `US_EAST_2`.
#[must_use]
pub fn normalize_region(region: &str) -> String {
    region.to_uppercase().replace('-', "_")
}

/// Classify a cluster `stateName`.
#[must_use]
pub fn cluster_state(state_name: &str) -> Convergence {
    match state_name {
        "IDLE" | "REPAIRING" => Convergence::Ready,
        "DELETING" | "DELETED" => Convergence::Failed {
            state: state_name.to_string(),
        },
        _ => Convergence::Converging,
    }
}

/// First provisioned container in `region` (already normalized).
#[must_use]
pub fn select_container<'a>(containers: &'a [Container], region: &str) -> Option<&'a Container> {
    containers
        .iter()
        .find(|c| c.provisioned && c.region_name == region)
}

#[derive(Debug, Clone)]
pub struct ClusterResource {
    client: AtlasClient,
}

impl ClusterResource {
    #[must_use]
    pub fn new(client: AtlasClient) -> Self {
        Self { client }
    }

    /// Resolve the provisioned network container for the cluster's region.
    pub async fn find_container(&self, desired: &ClusterSpec) -> ProvisionResult<Container> {
        let region = desired.api_region();
        let containers = self.client.list_containers(&desired.group_id).await?;
        debug!(
            group_id = %desired.group_id,
            region = %region,
            count = containers.len(),
            "Listed network containers"
        );

        select_container(&containers, &region)
            .cloned()
            .ok_or_else(|| ProvisionError::DependencyNotFound {
                kind: Self::KIND,
                what: format!("network container for region {region}"),
            })
    }
}

#[async_trait]
impl ManagedResource for ClusterResource {
    type Desired = ClusterSpec;
    type Record = Cluster;
    type Outputs = ClusterOutputs;

    const KIND: &'static str = "cluster";
    const ASYNC: bool = true;

    fn name<'a>(&self, desired: &'a ClusterSpec) -> &'a str {
        &desired.name
    }

    async fn read(&self, desired: &ClusterSpec) -> ProvisionResult<Option<Cluster>> {
        Ok(self
            .client
            .get_cluster(&desired.group_id, &desired.name)
            .await?)
    }

    async fn create(&self, desired: &ClusterSpec) -> ProvisionResult<Option<Cluster>> {
        let cluster = self
            .client
            .create_cluster(&desired.group_id, &desired.create_payload())
            .await?;
        Ok(Some(cluster))
    }

    async fn update(&self, desired: &ClusterSpec) -> ProvisionResult<Option<Cluster>> {
        Ok(self
            .client
            .update_cluster(&desired.group_id, &desired.name, &desired.update_payload())
            .await?)
    }

    async fn delete(&self, desired: &ClusterSpec) -> ProvisionResult<()> {
        Ok(self
            .client
            .delete_cluster(&desired.group_id, &desired.name)
            .await?)
    }

    fn classify(&self, record: &Cluster) -> Convergence {
        cluster_state(&record.state_name)
    }

    async fn settle(
        &self,
        desired: &ClusterSpec,
        _record: Cluster,
    ) -> ProvisionResult<Settled<ClusterOutputs>> {
        let container = self.find_container(desired).await?;
        Ok(Settled {
            id: desired.name.clone(),
            outputs: ClusterOutputs {
                container_id: container.id,
                atlas_vpc_id: container.vpc_id,
                atlas_cidr: container.atlas_cidr_block,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn container(id: &str, region: &str, provisioned: bool) -> Container {
        Container {
            id: id.to_string(),
            region_name: region.to_string(),
            provisioned,
            ..Container::default()
        }
    }

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("us-east-2"), "US_EAST_2");
        assert_eq!(normalize_region("EU_WEST_1"), "EU_WEST_1");
        assert_eq!(normalize_region("ap-southeast-2"), "AP_SOUTHEAST_2");
    }

    #[test]
    fn test_cluster_state_vocabulary() {
        assert_eq!(cluster_state("IDLE"), Convergence::Ready);
        assert_eq!(cluster_state("REPAIRING"), Convergence::Ready);
        assert_eq!(cluster_state("CREATING"), Convergence::Converging);
        assert_eq!(cluster_state("UPDATING"), Convergence::Converging);
        assert_eq!(cluster_state(""), Convergence::Converging);
        assert_eq!(
            cluster_state("DELETING"),
            Convergence::Failed {
                state: "DELETING".to_string()
            }
        );
        assert!(matches!(cluster_state("DELETED"), Convergence::Failed { .. }));
    }

    #[test]
    fn test_select_container_skips_unprovisioned_and_other_regions() {
        let containers = vec![
            container("ct0", "US_EAST_2", false),
            container("ct1", "EU_WEST_1", true),
            container("ct2", "US_EAST_2", true),
            container("ct3", "US_EAST_2", true),
        ];
        let selected = select_container(&containers, "US_EAST_2").unwrap();
        assert_eq!(selected.id, "ct2");
        assert!(select_container(&containers, "AP_SOUTH_1").is_none());
    }

    #[test]
    fn test_spec_defaults_from_json() {
        let spec: ClusterSpec =
            serde_json::from_value(json!({ "group_id": "g1", "name": "c1" })).unwrap();
        assert_eq!(spec, ClusterSpec::new("g1", "c1"));
        assert_eq!(spec.service_provider, "AWS");
        assert_eq!(spec.region, "us-east-2");
        assert_eq!(spec.size, "M10");
        assert_eq!(spec.disk_size_gb, 10);
        assert_eq!(spec.replication_factor, 3);
        assert_eq!(spec.mongodb_version, "3.6");
    }

    #[test]
    fn test_payloads() {
        let spec = ClusterSpec {
            size: "m30".into(),
            ..ClusterSpec::new("g1", "c1").with_region("eu-west-1")
        };

        let create = serde_json::to_value(spec.create_payload()).unwrap();
        assert_eq!(create["name"], "c1");
        assert_eq!(create["backupEnabled"], true);
        assert_eq!(create["autoScaling"]["diskGBEnabled"], true);
        assert_eq!(
            create["providerSettings"],
            json!({ "providerName": "AWS", "regionName": "EU_WEST_1", "instanceSizeName": "M30" })
        );

        let update = serde_json::to_value(spec.update_payload()).unwrap();
        assert!(update.get("name").is_none());
        assert_eq!(update["diskSizeGB"], 10);
        assert_eq!(update["mongoDBMajorVersion"], "3.6");
    }
}
