//! Shared reconciliation lifecycle.
//!
//! Every managed object type implements [`ManagedResource`]; [`Reconciler`]
//! drives the common create/read/update/delete flow over it:
//! read first, write only when absent, poll asynchronous types until they
//! settle, then derive outputs.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::poller::{Convergence, ConvergencePoller};

/// Stable identifier plus derived output fields of a settled object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<O> {
    pub id: String,
    pub outputs: O,
}

/// Result of one lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled<O> {
    /// The object exists and has settled.
    Present { id: String, outputs: O },
    /// The object does not exist; the caller should clear its identifier.
    Absent,
}

impl<O> Reconciled<O> {
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Present { id, .. } => Some(id),
            Self::Absent => None,
        }
    }

    #[must_use]
    pub fn outputs(&self) -> Option<&O> {
        match self {
            Self::Present { outputs, .. } => Some(outputs),
            Self::Absent => None,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<O> From<Settled<O>> for Reconciled<O> {
    fn from(settled: Settled<O>) -> Self {
        Self::Present {
            id: settled.id,
            outputs: settled.outputs,
        }
    }
}

/// Remote operations and state vocabulary for one object type.
///
/// Reads and writes return `Ok(None)` when the object does not exist.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Caller-declared attributes.
    type Desired: Send + Sync;
    /// Server representation.
    type Record: Send + Sync + std::fmt::Debug;
    /// Fields derived from a settled record.
    type Outputs: Send + std::fmt::Debug;

    /// Short name used in logs and errors.
    const KIND: &'static str;

    /// Whether the object transitions through provisioning states after a write.
    const ASYNC: bool = false;

    /// Whether a read that finds the object failed removes it.
    const DELETE_FAILED_ON_READ: bool = false;

    /// Name identifying the desired object in logs and errors.
    fn name<'a>(&self, desired: &'a Self::Desired) -> &'a str;

    async fn read(&self, desired: &Self::Desired) -> ProvisionResult<Option<Self::Record>>;

    /// Issue the create call. `None` means the API gave no representation back.
    async fn create(&self, desired: &Self::Desired) -> ProvisionResult<Option<Self::Record>>;

    /// Issue the update call. `None` means the object is gone.
    async fn update(&self, desired: &Self::Desired) -> ProvisionResult<Option<Self::Record>>;

    /// Remove the object. Already-absent objects are not an error.
    async fn delete(&self, desired: &Self::Desired) -> ProvisionResult<()>;

    fn classify(&self, _record: &Self::Record) -> Convergence {
        Convergence::Ready
    }

    /// Re-read during a convergence wait. `seed` is the last record seen.
    async fn refresh(
        &self,
        desired: &Self::Desired,
        _seed: &Self::Record,
    ) -> ProvisionResult<Option<Self::Record>> {
        self.read(desired).await
    }

    /// Remove an object that a read found in a failed state.
    async fn discard(
        &self,
        desired: &Self::Desired,
        _record: &Self::Record,
    ) -> ProvisionResult<()> {
        self.delete(desired).await
    }

    /// Wait for side effects of a create or update on related objects.
    async fn after_write(
        &self,
        _desired: &Self::Desired,
        _poller: &ConvergencePoller,
    ) -> ProvisionResult<()> {
        Ok(())
    }

    /// Derive the identifier and outputs of a settled record.
    async fn settle(
        &self,
        desired: &Self::Desired,
        record: Self::Record,
    ) -> ProvisionResult<Settled<Self::Outputs>>;
}

/// Lifecycle driver for one resource type.
#[derive(Debug, Clone)]
pub struct Reconciler<R> {
    resource: R,
    poller: ConvergencePoller,
}

impl<R: ManagedResource> Reconciler<R> {
    #[must_use]
    pub fn new(resource: R, poller: ConvergencePoller) -> Self {
        Self { resource, poller }
    }

    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Ensure the object exists and has settled.
    ///
    /// No write is issued when a read already finds the object.
    pub async fn create(&self, desired: &R::Desired) -> ProvisionResult<Reconciled<R::Outputs>> {
        let name = self.resource.name(desired);

        let record = match self.resource.read(desired).await? {
            Some(existing) => {
                info!(
                    kind = R::KIND,
                    name,
                    "Object already exists, skipping create"
                );
                existing
            }
            None => {
                info!(kind = R::KIND, name, "Creating object");
                let created = self.resource.create(desired).await?;
                self.resource.after_write(desired, &self.poller).await?;
                match created {
                    Some(record) => record,
                    None => self
                        .resource
                        .read(desired)
                        .await?
                        .ok_or_else(|| vanished::<R>(name, "create"))?,
                }
            }
        };

        let record = if R::ASYNC {
            self.converge(desired, record)
                .await?
                .ok_or_else(|| vanished::<R>(name, "create"))?
        } else {
            record
        };

        self.settle(desired, record).await
    }

    /// Report the object's current identity and outputs.
    pub async fn read(&self, desired: &R::Desired) -> ProvisionResult<Reconciled<R::Outputs>> {
        let name = self.resource.name(desired);

        let Some(record) = self.resource.read(desired).await? else {
            debug!(kind = R::KIND, name, "Object absent");
            return Ok(Reconciled::Absent);
        };

        if R::DELETE_FAILED_ON_READ {
            if let Convergence::Failed { state } = self.resource.classify(&record) {
                warn!(kind = R::KIND, name, state = %state, "Removing object in failed state");
                self.resource.discard(desired, &record).await?;
                return Ok(Reconciled::Absent);
            }
        }

        self.settle(desired, record).await
    }

    /// Apply the desired attributes to an existing object.
    ///
    /// An object that is gone, before or during convergence, is reported as
    /// absent rather than an error.
    pub async fn update(&self, desired: &R::Desired) -> ProvisionResult<Reconciled<R::Outputs>> {
        let name = self.resource.name(desired);

        info!(kind = R::KIND, name, "Updating object");
        let Some(record) = self.resource.update(desired).await? else {
            info!(kind = R::KIND, name, "Object gone, nothing to update");
            return Ok(Reconciled::Absent);
        };
        self.resource.after_write(desired, &self.poller).await?;

        let record = if R::ASYNC {
            match self.converge(desired, record).await? {
                Some(record) => record,
                None => return Ok(Reconciled::Absent),
            }
        } else {
            record
        };

        self.settle(desired, record).await
    }

    /// Remove the object.
    pub async fn delete(&self, desired: &R::Desired) -> ProvisionResult<Reconciled<R::Outputs>> {
        info!(
            kind = R::KIND,
            name = self.resource.name(desired),
            "Deleting object"
        );
        self.resource.delete(desired).await?;
        Ok(Reconciled::Absent)
    }

    async fn converge(
        &self,
        desired: &R::Desired,
        seed: R::Record,
    ) -> ProvisionResult<Option<R::Record>> {
        let resource = &self.resource;
        let seed = &seed;
        self.poller
            .wait_until_settled(
                R::KIND,
                resource.name(desired),
                move || resource.refresh(desired, seed),
                |record| resource.classify(record),
            )
            .await
    }

    async fn settle(
        &self,
        desired: &R::Desired,
        record: R::Record,
    ) -> ProvisionResult<Reconciled<R::Outputs>> {
        let settled = self.resource.settle(desired, record).await?;
        debug!(kind = R::KIND, id = %settled.id, outputs = ?settled.outputs, "Object settled");
        Ok(settled.into())
    }
}

fn vanished<R: ManagedResource>(name: &str, operation: &'static str) -> ProvisionError {
    warn!(kind = R::KIND, name, operation, "Object disappeared");
    ProvisionError::Vanished {
        kind: R::KIND,
        name: name.to_string(),
        operation,
    }
}
