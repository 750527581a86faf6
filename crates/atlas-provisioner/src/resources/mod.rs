//! The managed resource types.

pub mod cluster;
pub mod group;
pub mod peer;
pub mod user;
pub mod whitelist;

pub use cluster::{ClusterOutputs, ClusterResource, ClusterSpec};
pub use group::{GroupOutputs, GroupResource, GroupSpec};
pub use peer::{PeerOutputs, PeerResource, PeerSpec};
pub use user::{UserOutputs, UserResource, UserSpec};
pub use whitelist::{WhitelistOutputs, WhitelistResource, WhitelistSpec};
