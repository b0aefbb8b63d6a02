//! Registry path layout for job nodes.
//!
//! Every job node lives under `/{tenant/}{job}/`. The tenant segment is
//! optional: an absent or empty tenant produces exactly the same string as
//! the untenanted layout. Leader election is the one path that never carries
//! a tenant.

const LEADER_HOST_NODE: &str = "leader/election/instance";
const CONFIG_NODE: &str = "config";
const SERVERS_NODE: &str = "servers";
const INSTANCES_NODE: &str = "instances";
const SHARDING_NODE: &str = "sharding";

/// Marker sub-nodes of a sharding item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardingNode {
    Instance,
    Disabled,
    Running,
    Failover,
}

impl ShardingNode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Disabled => "disabled",
            Self::Running => "running",
            Self::Failover => "failover",
        }
    }
}

/// Path of the node under which all jobs of a tenant are registered.
///
/// `/` for the default tenant, `/{tenant}` otherwise.
pub fn tenant_root(tenant: Option<&str>) -> String {
    match non_empty(tenant) {
        Some(tenant) => format!("/{}", tenant),
        None => "/".to_string(),
    }
}

fn non_empty(tenant: Option<&str>) -> Option<&str> {
    tenant.filter(|t| !t.is_empty())
}

/// Path builder for a single job, optionally namespaced by tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNodePath {
    job_name: String,
    // `/{tenant}/{job}` or `/{job}`
    base: String,
}

impl JobNodePath {
    pub fn new(job_name: &str, tenant: Option<&str>) -> Self {
        let base = match non_empty(tenant) {
            Some(tenant) => format!("/{}/{}", tenant, job_name),
            None => format!("/{}", job_name),
        };
        Self {
            job_name: job_name.to_string(),
            base,
        }
    }

    /// Full path of an arbitrary node under the job.
    pub fn full_path(&self, node: &str) -> String {
        format!("{}/{}", self.base, node)
    }

    pub fn config_path(&self) -> String {
        self.full_path(CONFIG_NODE)
    }

    /// Leader election node; ignores the tenant.
    pub fn leader_host_path(&self) -> String {
        format!("/{}/{}", self.job_name, LEADER_HOST_NODE)
    }

    pub fn servers_path(&self) -> String {
        self.full_path(SERVERS_NODE)
    }

    pub fn server_path(&self, server_ip: &str) -> String {
        format!("{}/{}", self.servers_path(), server_ip)
    }

    pub fn instances_path(&self) -> String {
        self.full_path(INSTANCES_NODE)
    }

    pub fn instance_path(&self, instance_id: &str) -> String {
        format!("{}/{}", self.instances_path(), instance_id)
    }

    pub fn sharding_path(&self) -> String {
        self.full_path(SHARDING_NODE)
    }

    pub fn sharding_item_path(&self, item: &str, node: ShardingNode) -> String {
        format!("{}/{}/{}", self.sharding_path(), item, node.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untenanted_paths() {
        let path = JobNodePath::new("myJob", None);
        assert_eq!(path.config_path(), "/myJob/config");
        assert_eq!(path.leader_host_path(), "/myJob/leader/election/instance");
        assert_eq!(path.servers_path(), "/myJob/servers");
        assert_eq!(path.server_path("10.0.0.5"), "/myJob/servers/10.0.0.5");
        assert_eq!(path.instances_path(), "/myJob/instances");
        assert_eq!(
            path.instance_path("10.0.0.5@-@123"),
            "/myJob/instances/10.0.0.5@-@123"
        );
        assert_eq!(path.sharding_path(), "/myJob/sharding");
        assert_eq!(
            path.sharding_item_path("3", ShardingNode::Instance),
            "/myJob/sharding/3/instance"
        );
        assert_eq!(path.full_path("custom"), "/myJob/custom");
    }

    #[test]
    fn test_tenanted_paths() {
        let path = JobNodePath::new("myJob", Some("alice"));
        assert_eq!(path.config_path(), "/alice/myJob/config");
        assert_eq!(path.servers_path(), "/alice/myJob/servers");
        assert_eq!(path.server_path("10.0.0.5"), "/alice/myJob/servers/10.0.0.5");
        assert_eq!(path.instances_path(), "/alice/myJob/instances");
        assert_eq!(
            path.instance_path("10.0.0.5@-@123"),
            "/alice/myJob/instances/10.0.0.5@-@123"
        );
        assert_eq!(path.sharding_path(), "/alice/myJob/sharding");
        assert_eq!(
            path.sharding_item_path("0", ShardingNode::Failover),
            "/alice/myJob/sharding/0/failover"
        );
    }

    #[test]
    fn test_leader_path_never_tenanted() {
        assert_eq!(
            JobNodePath::new("myJob", Some("alice")).leader_host_path(),
            JobNodePath::new("myJob", None).leader_host_path()
        );
    }

    #[test]
    fn test_empty_tenant_equals_no_tenant() {
        let empty = JobNodePath::new("myJob", Some(""));
        let none = JobNodePath::new("myJob", None);
        assert_eq!(empty, none);
        assert_eq!(empty.config_path(), none.config_path());
        assert_eq!(empty.server_path("1.1.1.1"), none.server_path("1.1.1.1"));
        assert_eq!(empty.instance_path("a@-@1"), none.instance_path("a@-@1"));
        assert_eq!(
            empty.sharding_item_path("1", ShardingNode::Running),
            none.sharding_item_path("1", ShardingNode::Running)
        );
        assert!(!empty.config_path().starts_with("//"));
    }

    #[test]
    fn test_instances_root_prefixes_instance_paths() {
        for tenant in [None, Some("alice")] {
            let path = JobNodePath::new("myJob", tenant);
            let root = path.instances_path();
            for id in ["10.0.0.1@-@1", "10.0.0.2@-@99"] {
                let instance = path.instance_path(id);
                assert!(instance.starts_with(&root));
                assert!(instance.len() > root.len());
            }
        }
    }

    #[test]
    fn test_tenant_inserts_single_leading_segment() {
        let plain = JobNodePath::new("myJob", None).instances_path();
        let tenanted = JobNodePath::new("myJob", Some("alice")).instances_path();
        assert_eq!(tenanted, format!("/alice{}", plain));
    }

    #[test]
    fn test_tenant_root() {
        assert_eq!(tenant_root(None), "/");
        assert_eq!(tenant_root(Some("")), "/");
        assert_eq!(tenant_root(Some("alice")), "/alice");
    }

    #[test]
    fn test_sharding_node_names() {
        assert_eq!(ShardingNode::Instance.as_str(), "instance");
        assert_eq!(ShardingNode::Disabled.as_str(), "disabled");
        assert_eq!(ShardingNode::Running.as_str(), "running");
        assert_eq!(ShardingNode::Failover.as_str(), "failover");
    }
}
