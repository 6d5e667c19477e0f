//! In-memory host double for tests across the workspace.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::HostApi;
use crate::error::{HostError, HostResult};

/// A scriptable `HostApi` backed by a plain vector of container objects.
///
/// Records every call in order; `fail_on` makes one operation return an
/// API error to exercise abort paths.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    containers: Mutex<Vec<Value>>,
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<&'static str>>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the host with container summary objects.
    pub fn with_containers(containers: Vec<Value>) -> Self {
        Self {
            containers: Mutex::new(containers),
            ..Self::default()
        }
    }

    /// Make the named operation ("stop", "remove", ...) fail.
    pub fn fail_on(&self, op: &'static str) {
        *self.fail_on.lock().unwrap() = Some(op);
    }

    /// Every call made so far, e.g. `["list_containers", "stop abc123"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Ids still present on the host.
    pub fn container_ids(&self) -> Vec<String> {
        self.containers
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.get("Id").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn maybe_fail(&self, op: &str) -> HostResult<()> {
        if self.fail_on.lock().unwrap().is_some_and(|f| f == op) {
            return Err(HostError::Api {
                status: 500,
                message: format!("injected failure for {op}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HostApi for InMemoryHost {
    async fn list_containers(&self) -> HostResult<Vec<Value>> {
        self.record("list_containers".to_string());
        self.maybe_fail("list_containers")?;
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn get_container(&self, id: &str) -> HostResult<Value> {
        self.record(format!("get_container {id}"));
        self.maybe_fail("get_container")?;
        self.containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.get("Id").and_then(Value::as_str) == Some(id))
            .cloned()
            .ok_or_else(|| HostError::NotFound(id.to_string()))
    }

    async fn stop(&self, id: &str) -> HostResult<()> {
        self.record(format!("stop {id}"));
        self.maybe_fail("stop")
    }

    async fn restart(&self, id: &str) -> HostResult<()> {
        self.record(format!("restart {id}"));
        self.maybe_fail("restart")
    }

    async fn remove(&self, id: &str) -> HostResult<()> {
        self.record(format!("remove {id}"));
        self.maybe_fail("remove")?;
        let mut containers = self.containers.lock().unwrap();
        let before = containers.len();
        containers.retain(|c| c.get("Id").and_then(Value::as_str) != Some(id));
        if containers.len() == before {
            return Err(HostError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
