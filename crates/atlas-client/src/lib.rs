//! Digest-authenticated client for the Atlas control-plane REST API.
//!
//! [`client::AtlasClient`] exposes one typed method per endpoint the
//! provisioner touches. Every request is sent through the two-step HTTP
//! Digest handshake in [`digest`].

pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod models;
pub mod token;
pub mod transport;

pub use client::AtlasClient;
pub use config::{AtlasConfig, ConfigError, Credentials};
pub use error::{AtlasClientError, AtlasClientResult};
pub use transport::{ApiRequest, ApiResponse, HttpTransport};
