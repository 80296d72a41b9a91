//! Hemmer provider for the SingleStore Management API.
//!
//! The provider exposes SingleStore organization objects to Hemmer:
//!
//! - **Resources**: `singlestoredb_team`, `singlestoredb_invitation`,
//!   `singlestoredb_workspace_group`, `singlestoredb_workspace`
//! - **Data sources**: single lookups and lists for each of the above, plus
//!   `singlestoredb_regions`
//!
//! Team membership is reconciled by diffing the member lists in prior state
//! against the plan and sending only the additions and removals (see
//! [`membership`] and [`resources::team`]).
//!
//! # Handshake Protocol
//!
//! The binary is spawned by Hemmer and prints one line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! after which the host talks gRPC (`hemmer.provider.v1.Provider`) to that
//! address. Logs go to stderr so they never corrupt the handshake.
//!
//! # Layout
//!
//! - [`server`]: the [`ProviderService`] trait and the gRPC adapter
//! - [`provider`]: [`SingleStoreProvider`], dispatching to [`resources`]
//! - [`client`]: the Management API client and state-transition polling
//! - [`schema`], [`validation`], [`plan`]: schema-driven validation and planning

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod marshal;
pub mod membership;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

/// Types generated from `proto/provider.proto`.
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::SingleStoreProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
