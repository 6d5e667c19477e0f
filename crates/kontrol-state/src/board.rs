//! The health board — in-memory, per-job health records.
//!
//! The scheduler writes a job's record after every completed tick; the
//! status API reads a snapshot of all records. The board is `Clone` +
//! `Send` + `Sync` (backed by `Arc<RwLock<..>>`) and can be shared
//! across async tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::{HealthRecord, JobName};

/// Shared map of job name → last known health record.
///
/// A job registered but not yet probed has no record; the status surface
/// renders that as an empty object.
#[derive(Debug, Clone, Default)]
pub struct HealthBoard {
    inner: Arc<RwLock<HashMap<JobName, HealthRecord>>>,
}

impl HealthBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a job's latest tick.
    pub async fn set(&self, job: &str, record: HealthRecord) {
        let mut map = self.inner.write().await;
        map.insert(job.to_string(), record);
    }

    /// Last known record for one job.
    pub async fn get(&self, job: &str) -> Option<HealthRecord> {
        let map = self.inner.read().await;
        map.get(job).cloned()
    }

    /// Copy of every job's last known record.
    pub async fn snapshot(&self) -> HashMap<JobName, HealthRecord> {
        let map = self.inner.read().await;
        map.clone()
    }
}
