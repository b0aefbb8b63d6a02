//! Per-job brief info and status.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::LifecycleResult;
use crate::job_config::JobCoreConfig;
use crate::node_path::{JobNodePath, ShardingNode, tenant_root};
use crate::registry::SharedRegistry;
use crate::types::{JobName, is_disabled_marker, split_instance_id};

/// Operator-facing status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Ok,
    Crashed,
    Disabled,
    ShardingFlag,
}

/// Counts read from the registry that decide a job's status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStatusFacts {
    /// Children of the instances root
    pub instance_count: usize,
    /// Children of the servers root
    pub server_count: usize,
    /// Server nodes carrying the disabled marker
    pub disabled_server_count: usize,
    /// Distinct instance ids referenced by sharding items
    pub sharded_instance_count: usize,
    /// Of those, ids with no live instance node
    pub orphaned_sharded_instance_count: usize,
}

impl JobStatus {
    /// Derive the status; the first matching rule wins.
    ///
    /// 1. no instances: `Crashed`
    /// 2. every server disabled, including when there are none: `Disabled`
    /// 3. sharding references a dead instance, or nothing is sharded:
    ///    `ShardingFlag`
    /// 4. otherwise `Ok`
    pub fn derive(facts: &JobStatusFacts) -> Self {
        if facts.instance_count == 0 {
            return Self::Crashed;
        }
        if facts.disabled_server_count == facts.server_count {
            return Self::Disabled;
        }
        if facts.orphaned_sharded_instance_count > 0 || facts.sharded_instance_count == 0 {
            return Self::ShardingFlag;
        }
        Self::Ok
    }
}

/// Summary row for one job.
///
/// Rows scoped to a single server only carry name, status and instance
/// count; the config fields stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobBriefInfo {
    pub job_name: JobName,
    pub status: JobStatus,
    pub description: Option<String>,
    pub cron: Option<String>,
    pub instance_count: usize,
    pub sharding_total_count: Option<u32>,
}

#[derive(Clone)]
pub struct JobStatisticsApi {
    registry: SharedRegistry,
}

impl JobStatisticsApi {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Number of nodes under the tenant root.
    ///
    /// This does not check for config nodes, so stray nodes are counted too.
    /// Use [`Self::get_all_jobs_brief_info`] for the jobs that really exist.
    pub async fn get_jobs_total_count(&self, tenant: Option<&str>) -> LifecycleResult<usize> {
        Ok(self.registry.get_children_keys(&tenant_root(tenant)).await?.len())
    }

    /// Brief info of every existing job of the tenant, sorted by name.
    pub async fn get_all_jobs_brief_info(
        &self,
        tenant: Option<&str>,
    ) -> LifecycleResult<Vec<JobBriefInfo>> {
        let job_names = self.registry.get_children_keys(&tenant_root(tenant)).await?;
        let mut result = Vec::with_capacity(job_names.len());
        for each in &job_names {
            if let Some(info) = self.get_job_brief_info(each, tenant).await? {
                result.push(info);
            }
        }
        result.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        debug!("Listed {} of {} job node(s)", result.len(), job_names.len());
        Ok(result)
    }

    /// Brief info of one job, `None` when its config node is absent or lacks
    /// the description, cron or sharding total count.
    pub async fn get_job_brief_info(
        &self,
        job: &str,
        tenant: Option<&str>,
    ) -> LifecycleResult<Option<JobBriefInfo>> {
        let path = JobNodePath::new(job, tenant);
        let Some(raw) = self.registry.get(&path.config_path()).await? else {
            return Ok(None);
        };
        let config = match JobCoreConfig::from_json(job, &raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("Skipping job {}: {}", job, e);
                return Ok(None);
            }
        };
        let facts = self.status_facts(&path).await?;
        Ok(Some(JobBriefInfo {
            job_name: JobName::new(job),
            status: JobStatus::derive(&facts),
            description: Some(config.description),
            cron: Some(config.cron),
            instance_count: facts.instance_count,
            sharding_total_count: Some(config.sharding_total_count),
        }))
    }

    /// Jobs the server is registered for, as seen from that server.
    ///
    /// Status is `Disabled` when the server's node carries the marker and
    /// `Ok` otherwise; the instance count only includes that server's
    /// instances.
    pub async fn get_jobs_brief_info(
        &self,
        server_ip: &str,
        tenant: Option<&str>,
    ) -> LifecycleResult<Vec<JobBriefInfo>> {
        let mut result = Vec::new();
        for job in self.registry.get_children_keys(&tenant_root(tenant)).await? {
            let path = JobNodePath::new(&job, tenant);
            let server_path = path.server_path(server_ip);
            if !self.registry.is_existed(&server_path).await? {
                continue;
            }
            let status = if is_disabled_marker(self.registry.get(&server_path).await?.as_deref()) {
                JobStatus::Disabled
            } else {
                JobStatus::Ok
            };
            let mut instance_count = 0;
            for each in self.registry.get_children_keys(&path.instances_path()).await? {
                let (ip, _) = split_instance_id(&each)?;
                if ip == server_ip {
                    instance_count += 1;
                }
            }
            result.push(JobBriefInfo {
                job_name: JobName::new(job),
                status,
                description: None,
                cron: None,
                instance_count,
                sharding_total_count: None,
            });
        }
        result.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        Ok(result)
    }

    /// Status of one job, regardless of whether its config exists.
    pub async fn get_job_status(&self, job: &str, tenant: Option<&str>) -> LifecycleResult<JobStatus> {
        let facts = self.status_facts(&JobNodePath::new(job, tenant)).await?;
        Ok(JobStatus::derive(&facts))
    }

    async fn status_facts(&self, path: &JobNodePath) -> LifecycleResult<JobStatusFacts> {
        let instances: HashSet<String> = self
            .registry
            .get_children_keys(&path.instances_path())
            .await?
            .into_iter()
            .collect();
        let mut facts = JobStatusFacts {
            instance_count: instances.len(),
            ..Default::default()
        };
        if instances.is_empty() {
            return Ok(facts);
        }

        let servers = self.registry.get_children_keys(&path.servers_path()).await?;
        facts.server_count = servers.len();
        for each in &servers {
            if is_disabled_marker(self.registry.get(&path.server_path(each)).await?.as_deref()) {
                facts.disabled_server_count += 1;
            }
        }
        if facts.disabled_server_count == facts.server_count {
            return Ok(facts);
        }

        let mut sharded = HashSet::new();
        for item in self.registry.get_children_keys(&path.sharding_path()).await? {
            let instance = self
                .registry
                .get(&path.sharding_item_path(&item, ShardingNode::Instance))
                .await?;
            if let Some(instance) = instance.filter(|i| !i.is_empty()) {
                sharded.insert(instance);
            }
        }
        facts.sharded_instance_count = sharded.len();
        facts.orphaned_sharded_instance_count =
            sharded.iter().filter(|id| !instances.contains(*id)).count();
        Ok(facts)
    }
}
