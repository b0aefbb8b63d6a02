// Core modules
mod config;
mod error;
mod job_config;
mod node_path;
mod types;
pub mod registry;

// Lifecycle control plane
mod operate;
pub mod statistics;

// Console surface
pub mod api;
pub mod auth;

#[cfg(test)]
mod testing;

// Re-export key types and functions
pub use config::{ConsoleConfig, load_console_config, parse_console_config, resolve_console_json_path};
pub use error::{LifecycleError, LifecycleResult};
pub use job_config::JobCoreConfig;
pub use node_path::{JobNodePath, ShardingNode, tenant_root};
pub use operate::{JobOperateApi, Selector};
pub use registry::{MemoryRegistry, RegistryCenter, RegistryConfig, SharedRegistry, SurrealRegistry};
pub use statistics::{
    JobBriefInfo, JobStatisticsApi, JobStatus, ServerBriefInfo, ServerStatisticsApi, ShardingInfo,
    ShardingStatisticsApi, ShardingStatus,
};
pub use types::{DISABLED_MARKER, INSTANCE_DELIMITER, InstanceId, JobName, ServerIp, TRIGGER_MARKER};

use anyhow::Result;
use api::ConsoleState;
use auth::AuthExtractor;
use std::sync::Arc;

/// Connect the registry described by `config`.
pub async fn connect(config: RegistryConfig) -> Result<SharedRegistry> {
    let registry = SurrealRegistry::connect(config).await?;
    Ok(Arc::new(registry))
}

/// Convenience function to build the console from its config.
///
/// Connects the registry and wires the operator, the statistics APIs and
/// the Basic auth extractor into an axum router.
pub async fn create_console(config: &ConsoleConfig) -> Result<axum::Router> {
    let registry = connect(config.registry.clone()).await?;
    let auth = AuthExtractor::new(&config.auth);
    tracing::info!("Console accepts {} login(s)", auth.account_count());
    Ok(api::create_console_router(ConsoleState::new(registry, auth)))
}
