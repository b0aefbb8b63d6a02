//! Administrative fan-out operations over the job tree.
//!
//! Disable, enable, shutdown and remove all take a `(job?, server?)`
//! selector pair. At least one side must be present:
//!
//! - both present: exactly that job on that server
//! - job only: the job on every server registered under it
//! - server only: every job of the tenant the server is registered for
//!
//! Selector resolution happens before the first write, so a rejected
//! selector or a malformed instance id never leaves a partial mutation.
//! The writes themselves are not transactional but every one of them is
//! idempotent and safe to re-issue.

use tracing::{debug, info};

use crate::error::{LifecycleError, LifecycleResult};
use crate::node_path::{JobNodePath, tenant_root};
use crate::registry::SharedRegistry;
use crate::types::{DISABLED_MARKER, TRIGGER_MARKER, split_instance_id};

/// Resolved `(job?, server?)` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    JobOnServer { job: &'a str, server: &'a str },
    Job(&'a str),
    Server(&'a str),
}

impl<'a> Selector<'a> {
    /// Empty strings count as absent.
    pub fn from_options(job: Option<&'a str>, server: Option<&'a str>) -> LifecycleResult<Self> {
        let job = job.filter(|j| !j.is_empty());
        let server = server.filter(|s| !s.is_empty());
        match (job, server) {
            (Some(job), Some(server)) => Ok(Self::JobOnServer { job, server }),
            (Some(job), None) => Ok(Self::Job(job)),
            (None, Some(server)) => Ok(Self::Server(server)),
            (None, None) => Err(LifecycleError::MissingSelector),
        }
    }
}

/// Which node under a job a selector resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Server,
    Instance,
}

/// What to do with each resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeAction<'a> {
    Persist(&'a str),
    Remove,
}

/// Issues administrative mutations against the registry.
#[derive(Clone)]
pub struct JobOperateApi {
    registry: SharedRegistry,
}

impl JobOperateApi {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Ask every live instance of the job to run it once.
    ///
    /// Returns the number of instances marked. A job without instances, or
    /// one that does not exist, is a no-op.
    pub async fn trigger(&self, job: &str, tenant: Option<&str>) -> LifecycleResult<usize> {
        let path = JobNodePath::new(job, tenant);
        let instances = self.registry.get_children_keys(&path.instances_path()).await?;
        for each in &instances {
            self.registry
                .persist(&path.instance_path(each), TRIGGER_MARKER)
                .await?;
        }
        info!("Triggered job {} on {} instance(s)", job, instances.len());
        Ok(instances.len())
    }

    /// Mark the selected server nodes `DISABLED`.
    pub async fn disable(
        &self,
        job: Option<&str>,
        server: Option<&str>,
        tenant: Option<&str>,
    ) -> LifecycleResult<usize> {
        let selector = Selector::from_options(job, server)?;
        let count = self
            .fan_out(selector, tenant, NodeKind::Server, NodeAction::Persist(DISABLED_MARKER))
            .await?;
        info!("Disabled {:?} on {} server node(s)", selector, count);
        Ok(count)
    }

    /// Clear the disabled marker on the selected server nodes.
    pub async fn enable(
        &self,
        job: Option<&str>,
        server: Option<&str>,
        tenant: Option<&str>,
    ) -> LifecycleResult<usize> {
        let selector = Selector::from_options(job, server)?;
        let count = self
            .fan_out(selector, tenant, NodeKind::Server, NodeAction::Persist(""))
            .await?;
        info!("Enabled {:?} on {} server node(s)", selector, count);
        Ok(count)
    }

    /// Delete the selected instance nodes.
    ///
    /// The owning processes watch their own ephemeral node and stop once it
    /// is gone; this call only removes the registry record.
    pub async fn shutdown(
        &self,
        job: Option<&str>,
        server: Option<&str>,
        tenant: Option<&str>,
    ) -> LifecycleResult<usize> {
        let selector = Selector::from_options(job, server)?;
        let count = self
            .fan_out(selector, tenant, NodeKind::Instance, NodeAction::Remove)
            .await?;
        info!("Shut down {:?}: {} instance(s) removed", selector, count);
        Ok(count)
    }

    /// Shut down the selection, then delete its server registrations.
    ///
    /// Returns the number of server nodes removed.
    pub async fn remove(
        &self,
        job: Option<&str>,
        server: Option<&str>,
        tenant: Option<&str>,
    ) -> LifecycleResult<usize> {
        let selector = Selector::from_options(job, server)?;
        // Instances go before the server registrations they belong to.
        self.fan_out(selector, tenant, NodeKind::Instance, NodeAction::Remove)
            .await?;
        let count = self
            .fan_out(selector, tenant, NodeKind::Server, NodeAction::Remove)
            .await?;
        info!("Removed {:?}: {} server node(s) deleted", selector, count);
        Ok(count)
    }

    async fn fan_out(
        &self,
        selector: Selector<'_>,
        tenant: Option<&str>,
        kind: NodeKind,
        action: NodeAction<'_>,
    ) -> LifecycleResult<usize> {
        let nodes = match kind {
            NodeKind::Server => self.resolve_server_nodes(selector, tenant).await?,
            NodeKind::Instance => self.resolve_instance_nodes(selector, tenant).await?,
        };
        for node in &nodes {
            debug!("Applying {:?} to {}", action, node);
            match action {
                NodeAction::Persist(value) => self.registry.persist(node, value).await?,
                NodeAction::Remove => self.registry.remove(node).await?,
            }
        }
        Ok(nodes.len())
    }

    async fn resolve_server_nodes(
        &self,
        selector: Selector<'_>,
        tenant: Option<&str>,
    ) -> LifecycleResult<Vec<String>> {
        match selector {
            Selector::JobOnServer { job, server } => {
                Ok(vec![JobNodePath::new(job, tenant).server_path(server)])
            }
            Selector::Job(job) => {
                let path = JobNodePath::new(job, tenant);
                let servers = self.registry.get_children_keys(&path.servers_path()).await?;
                Ok(servers.iter().map(|each| path.server_path(each)).collect())
            }
            Selector::Server(server) => {
                let mut result = Vec::new();
                for job in self.registry.get_children_keys(&tenant_root(tenant)).await? {
                    let server_path = JobNodePath::new(&job, tenant).server_path(server);
                    if self.registry.is_existed(&server_path).await? {
                        result.push(server_path);
                    }
                }
                Ok(result)
            }
        }
    }

    async fn resolve_instance_nodes(
        &self,
        selector: Selector<'_>,
        tenant: Option<&str>,
    ) -> LifecycleResult<Vec<String>> {
        match selector {
            Selector::JobOnServer { job, server } => {
                self.instances_of(&JobNodePath::new(job, tenant), Some(server)).await
            }
            Selector::Job(job) => self.instances_of(&JobNodePath::new(job, tenant), None).await,
            Selector::Server(server) => {
                let mut result = Vec::new();
                for job in self.registry.get_children_keys(&tenant_root(tenant)).await? {
                    let path = JobNodePath::new(&job, tenant);
                    result.extend(self.instances_of(&path, Some(server)).await?);
                }
                Ok(result)
            }
        }
    }

    async fn instances_of(
        &self,
        path: &JobNodePath,
        server: Option<&str>,
    ) -> LifecycleResult<Vec<String>> {
        let mut result = Vec::new();
        for each in self.registry.get_children_keys(&path.instances_path()).await? {
            if let Some(server) = server {
                let (ip, _) = split_instance_id(&each)?;
                if ip != server {
                    continue;
                }
            }
            result.push(path.instance_path(&each));
        }
        Ok(result)
    }
}
