//! The host capability trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HostResult;

/// The fixed set of container lifecycle operations the remediation
/// pipeline may invoke.
///
/// Non-destructive calls (`list_containers`, `get_container`) are safe to
/// issue concurrently from any number of jobs. Destructive calls (`stop`,
/// `restart`, `remove`) are not serialized across jobs; the design relies
/// on the host API's own idempotence for concurrent calls against
/// distinct targets (see DESIGN.md, known limitations).
#[async_trait]
pub trait HostApi: Send + Sync {
    /// List all containers (running and stopped) as summary objects.
    async fn list_containers(&self) -> HostResult<Vec<Value>>;

    /// Fetch the full inspect object for one container by id.
    async fn get_container(&self, id: &str) -> HostResult<Value>;

    /// Stop a running container.
    async fn stop(&self, id: &str) -> HostResult<()>;

    /// Restart a container.
    async fn restart(&self, id: &str) -> HostResult<()>;

    /// Remove a container.
    async fn remove(&self, id: &str) -> HostResult<()>;
}
