//! Job configuration document stored in the `config` node.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LifecycleError, LifecycleResult};

const CORE_CONFIG_SECTION: &str = "coreConfig";

/// The parts of a job's configuration the console reports on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCoreConfig {
    pub cron: String,
    pub sharding_total_count: u32,
    pub description: String,
}

impl JobCoreConfig {
    /// Parse the raw config node value.
    ///
    /// The core fields are read from the `coreConfig` section when there is
    /// one, otherwise from the top level of the document.
    pub fn from_json(job_name: &str, raw: &str) -> LifecycleResult<Self> {
        let invalid = |message: String| LifecycleError::InvalidConfig {
            job_name: job_name.to_string(),
            message,
        };
        let document: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        let core = match document.get(CORE_CONFIG_SECTION) {
            Some(section @ Value::Object(_)) => section.clone(),
            _ => document,
        };
        serde_json::from_value(core).map_err(|e| invalid(e.to_string()))
    }
}
