//! Per-server counts and listings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::LifecycleResult;
use crate::node_path::{JobNodePath, tenant_root};
use crate::registry::SharedRegistry;
use crate::types::{InstanceId, JobName, ServerIp, is_disabled_marker};

/// Summary row for one server across all jobs of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerBriefInfo {
    pub server_ip: ServerIp,
    pub job_names: BTreeSet<JobName>,
    pub instances: BTreeSet<InstanceId>,
    pub jobs_num: usize,
    pub instances_num: usize,
    pub disabled_jobs_num: usize,
}

impl ServerBriefInfo {
    fn new(server_ip: &str) -> Self {
        Self {
            server_ip: ServerIp::new(server_ip),
            job_names: BTreeSet::new(),
            instances: BTreeSet::new(),
            jobs_num: 0,
            instances_num: 0,
            disabled_jobs_num: 0,
        }
    }
}

#[derive(Clone)]
pub struct ServerStatisticsApi {
    registry: SharedRegistry,
}

impl ServerStatisticsApi {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Distinct server IPs registered under any job of the tenant.
    pub async fn get_servers_total_count(&self, tenant: Option<&str>) -> LifecycleResult<usize> {
        let mut servers = BTreeSet::new();
        for job in self.registry.get_children_keys(&tenant_root(tenant)).await? {
            let path = JobNodePath::new(&job, tenant);
            servers.extend(self.registry.get_children_keys(&path.servers_path()).await?);
        }
        Ok(servers.len())
    }

    /// One row per registered server IP, sorted by IP.
    ///
    /// Instances whose IP has no server registration in the tenant are not
    /// reported.
    pub async fn get_all_servers_brief_info(
        &self,
        tenant: Option<&str>,
    ) -> LifecycleResult<Vec<ServerBriefInfo>> {
        let mut servers: BTreeMap<String, ServerBriefInfo> = BTreeMap::new();
        let mut instances: Vec<(String, InstanceId)> = Vec::new();
        for job in self.registry.get_children_keys(&tenant_root(tenant)).await? {
            let path = JobNodePath::new(&job, tenant);
            for ip in self.registry.get_children_keys(&path.servers_path()).await? {
                let disabled =
                    is_disabled_marker(self.registry.get(&path.server_path(&ip)).await?.as_deref());
                let info = servers
                    .entry(ip.clone())
                    .or_insert_with(|| ServerBriefInfo::new(&ip));
                info.job_names.insert(JobName::new(job.as_str()));
                if disabled {
                    info.disabled_jobs_num += 1;
                }
            }
            for each in self.registry.get_children_keys(&path.instances_path()).await? {
                let instance = InstanceId::new(each);
                let ip = instance.server_ip()?.to_string();
                instances.push((ip, instance));
            }
        }
        for (ip, instance) in instances {
            if let Some(info) = servers.get_mut(&ip) {
                info.instances.insert(instance);
            }
        }
        Ok(servers
            .into_values()
            .map(|mut info| {
                info.jobs_num = info.job_names.len();
                info.instances_num = info.instances.len();
                info
            })
            .collect())
    }
}
