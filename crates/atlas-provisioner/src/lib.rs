//! Convergence-driven provisioning of Atlas resources.
//!
//! Each resource type implements [`reconciler::ManagedResource`]; a
//! [`reconciler::Reconciler`] drives it through create, read, update and
//! delete, waiting on [`poller::ConvergencePoller`] for asynchronously
//! provisioned objects. [`context::ProviderContext`] wires the shared client
//! and poller into one reconciler per type.

pub mod context;
pub mod error;
pub mod poller;
pub mod reconciler;
pub mod resources;

pub use context::ProviderContext;
pub use error::{ProvisionError, ProvisionResult};
pub use poller::{Convergence, ConvergencePoller, PollSettings};
pub use reconciler::{ManagedResource, Reconciled, Reconciler, Settled};
