//! Shared provisioning context.
//!
//! Holds the one HTTP client, the organization id and the poller every
//! reconciler uses. Construct it once per process and hand out reconcilers.

use atlas_client::{AtlasClient, AtlasConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::ProvisionResult;
use crate::poller::{ConvergencePoller, PollSettings};
use crate::reconciler::{ManagedResource, Reconciler};
use crate::resources::{
    ClusterResource, GroupResource, PeerResource, UserResource, WhitelistResource,
};

#[derive(Debug, Clone)]
pub struct ProviderContext {
    client: AtlasClient,
    org_id: String,
    poller: ConvergencePoller,
}

impl ProviderContext {
    #[must_use]
    pub fn new(client: AtlasClient, org_id: impl Into<String>, poller: ConvergencePoller) -> Self {
        Self {
            client,
            org_id: org_id.into(),
            poller,
        }
    }

    /// Build the client and poller from configuration.
    pub fn from_config(config: &AtlasConfig) -> ProvisionResult<Self> {
        let client = AtlasClient::new(config)?;
        let settings = PollSettings::from_config(config);
        info!(
            base_url = %config.base_url,
            org_id = %config.org_id,
            poll_interval_secs = config.poll_interval_secs,
            convergence_timeout_secs = config.convergence_timeout_secs,
            "Provider context configured"
        );
        let poller = ConvergencePoller::new(settings);
        Ok(Self::new(client, config.org_id.clone(), poller))
    }

    /// Build from `ATLAS_*` environment variables.
    pub fn from_env() -> ProvisionResult<Self> {
        let config = AtlasConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Replace the cancellation token of every wait started from this context.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(token);
        self
    }

    #[must_use]
    pub fn client(&self) -> &AtlasClient {
        &self.client
    }

    #[must_use]
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    #[must_use]
    pub fn poller(&self) -> &ConvergencePoller {
        &self.poller
    }

    #[must_use]
    pub fn groups(&self) -> Reconciler<GroupResource> {
        self.reconciler(GroupResource::new(self.client.clone(), self.org_id.clone()))
    }

    #[must_use]
    pub fn clusters(&self) -> Reconciler<ClusterResource> {
        self.reconciler(ClusterResource::new(self.client.clone()))
    }

    #[must_use]
    pub fn peers(&self) -> Reconciler<PeerResource> {
        self.reconciler(PeerResource::new(self.client.clone()))
    }

    #[must_use]
    pub fn users(&self) -> Reconciler<UserResource> {
        self.reconciler(UserResource::new(self.client.clone()))
    }

    #[must_use]
    pub fn whitelist(&self) -> Reconciler<WhitelistResource> {
        self.reconciler(WhitelistResource::new(self.client.clone()))
    }

    fn reconciler<R: ManagedResource>(&self, resource: R) -> Reconciler<R> {
        Reconciler::new(resource, self.poller.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_client::Credentials;

    #[test]
    fn test_from_config() {
        let config = AtlasConfig::new(Credentials::new("ops", "key"), "org-1")
            .with_base_url("http://localhost:9/api/atlas/v1.0/");
        let ctx = ProviderContext::from_config(&config).unwrap();

        assert_eq!(ctx.org_id(), "org-1");
        assert_eq!(
            ctx.client().base_url(),
            "http://localhost:9/api/atlas/v1.0"
        );
        assert_eq!(
            ctx.poller().settings(),
            &PollSettings::from_config(&config)
        );
    }

    #[test]
    fn test_cancellation_is_shared_by_reconcilers() {
        let config = AtlasConfig::new(Credentials::new("ops", "key"), "org-1");
        let token = CancellationToken::new();
        let ctx = ProviderContext::from_config(&config)
            .unwrap()
            .with_cancellation(token.clone());

        token.cancel();
        assert!(ctx.poller().cancellation_token().is_cancelled());
    }
}
