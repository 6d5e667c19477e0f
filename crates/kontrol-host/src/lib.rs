//! kontrol-host — the container-host management API surface.
//!
//! The pipeline interpreter dispatches `HostCommand`s through the
//! [`HostApi`] trait, a fixed, enumerable set of lifecycle operations.
//! [`docker::DockerHost`] implements it against the Docker Engine REST
//! API over the local Unix socket; [`testing::InMemoryHost`] is the test
//! double used across the workspace.
//!
//! Objects returned by the host (container summaries, inspect results)
//! are carried as opaque `serde_json::Value`s — the pipeline threads
//! them between steps without interpreting their shape beyond field
//! lookups.

pub mod api;
pub mod docker;
pub mod error;
pub mod testing;

pub use api::HostApi;
pub use docker::DockerHost;
pub use error::{HostError, HostResult};
