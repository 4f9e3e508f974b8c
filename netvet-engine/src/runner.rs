//! Engine settings and the catalog runner.

use futures::stream::{self, StreamExt};
use netvet_common::{CatalogEntry, ConfigError, EngineConfig, TestResult};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::catalog::{DynTest, TestRegistry};
use crate::device::Device;
use crate::safety::BlockList;

/// Settings shared by every instance an engine runs.
#[derive(Debug, Clone)]
pub struct Engine {
    block_list: BlockList,
    correlation_prefix: String,
    max_concurrency: usize,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let block_list =
            BlockList::new(&config.extra_blocked_patterns).map_err(|e| ConfigError::Validation {
                field: "extra_blocked_patterns",
                reason: e.to_string(),
            })?;
        Ok(Self {
            block_list,
            correlation_prefix: config.correlation_prefix.clone(),
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    /// Default configuration.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::new(&EngineConfig::default())
    }

    pub fn block_list(&self) -> &BlockList {
        &self.block_list
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// `{prefix}-{test}-{8 hex chars}`.
    pub fn correlation_id(&self, test: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", self.correlation_prefix, test, &id[..8])
    }

    /// Run `entries` against `device`.
    ///
    /// Entries whose tag filter does not match the device are left out.
    /// Results keep catalog order; at most `max_concurrency` instances are
    /// in flight at once.
    pub async fn run_catalog(
        &self,
        registry: &TestRegistry,
        entries: &[CatalogEntry],
        device: &dyn Device,
    ) -> Vec<TestResult> {
        let device_tags = device.tags();
        let mut pending: Vec<Result<Box<dyn DynTest>, TestResult>> = Vec::new();

        for entry in entries {
            // Malformed filters are reported by instance construction.
            if let Ok(filters) = entry.filters()
                && !filters.matches(&device_tags)
            {
                debug!(test = %entry.test, device = %device.name(), "Filtered out by tags");
                continue;
            }

            match registry.instantiate(entry, device) {
                Ok(instance) => pending.push(Ok(instance)),
                Err(err) => {
                    error!(test = %entry.test, device = %device.name(), "{err}");
                    let mut result = TestResult::new(device.name(), &entry.test, Vec::new(), "");
                    result.set_error(err.to_string());
                    pending.push(Err(result));
                }
            }
        }

        info!(
            device = %device.name(),
            tests = pending.len(),
            max_concurrency = self.max_concurrency,
            "Running catalog"
        );

        stream::iter(pending)
            .map(|item| async move {
                match item {
                    Ok(mut instance) => instance.run(self, device).await,
                    Err(result) => result,
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
