//! Per-item sharding status.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LifecycleError, LifecycleResult};
use crate::node_path::{JobNodePath, ShardingNode};
use crate::registry::SharedRegistry;
use crate::types::{ServerIp, split_instance_id};

/// Status of one sharding item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardingStatus {
    Disabled,
    Running,
    ShardingFlag,
    Pending,
}

impl ShardingStatus {
    /// Precedence: disabled, then running, then sharding error, else pending.
    pub fn derive(disabled: bool, running: bool, sharding_error: bool) -> Self {
        if disabled {
            Self::Disabled
        } else if running {
            Self::Running
        } else if sharding_error {
            Self::ShardingFlag
        } else {
            Self::Pending
        }
    }
}

/// Assignment and status of one sharding item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardingInfo {
    pub item: u32,
    /// Server half of the assigned instance id
    pub server_ip: Option<ServerIp>,
    /// Pid half of the assigned instance id
    pub instance_id: Option<String>,
    pub status: ShardingStatus,
    pub failover: bool,
}

#[derive(Clone)]
pub struct ShardingStatisticsApi {
    registry: SharedRegistry,
}

impl ShardingStatisticsApi {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Every sharding item of the job, sorted by item index.
    pub async fn get_sharding_info(
        &self,
        job: &str,
        tenant: Option<&str>,
    ) -> LifecycleResult<Vec<ShardingInfo>> {
        let path = JobNodePath::new(job, tenant);
        let items = self.registry.get_children_keys(&path.sharding_path()).await?;
        let mut result = Vec::with_capacity(items.len());
        for each in &items {
            result.push(self.item_info(&path, each).await?);
        }
        result.sort_by_key(|info| info.item);
        debug!("Read {} sharding item(s) of job {}", result.len(), job);
        Ok(result)
    }

    async fn item_info(&self, path: &JobNodePath, item: &str) -> LifecycleResult<ShardingInfo> {
        let index: u32 = item
            .parse()
            .map_err(|_| LifecycleError::InvalidShardingItem(item.to_string()))?;
        let instance = self
            .registry
            .get(&path.sharding_item_path(item, ShardingNode::Instance))
            .await?
            .filter(|i| !i.is_empty());
        let disabled = self.marker(path, item, ShardingNode::Disabled).await?;
        let running = self.marker(path, item, ShardingNode::Running).await?;
        let failover = self.marker(path, item, ShardingNode::Failover).await?;

        let (server_ip, instance_id, sharding_error) = match &instance {
            Some(id) => {
                let (ip, pid) = split_instance_id(id)?;
                let alive = self.registry.is_existed(&path.instance_path(id)).await?;
                (Some(ServerIp::new(ip)), Some(pid.to_string()), !alive)
            }
            None => (None, None, false),
        };

        Ok(ShardingInfo {
            item: index,
            server_ip,
            instance_id,
            status: ShardingStatus::derive(disabled, running, sharding_error),
            failover,
        })
    }

    async fn marker(&self, path: &JobNodePath, item: &str, node: ShardingNode) -> LifecycleResult<bool> {
        Ok(self.registry.is_existed(&path.sharding_item_path(item, node)).await?)
    }
}
