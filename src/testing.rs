//! Registry fixtures shared by unit tests.

use std::sync::Arc;

use crate::node_path::{JobNodePath, ShardingNode};
use crate::registry::{MemoryRegistry, RegistryCenter, SharedRegistry};

pub(crate) const CONFIG_JSON: &str = r#"{
    "jobName": "ignored",
    "coreConfig": {
        "cron": "0/5 * * * * ?",
        "shardingTotalCount": 3,
        "description": "demo job"
    }
}"#;

pub(crate) fn shared(registry: &MemoryRegistry) -> SharedRegistry {
    Arc::new(registry.clone())
}

pub(crate) async fn add_job(registry: &MemoryRegistry, tenant: Option<&str>, job: &str) {
    let path = JobNodePath::new(job, tenant);
    registry.persist(&path.config_path(), CONFIG_JSON).await.unwrap();
}

pub(crate) async fn add_server(
    registry: &MemoryRegistry,
    tenant: Option<&str>,
    job: &str,
    ip: &str,
    value: &str,
) {
    let path = JobNodePath::new(job, tenant);
    registry.persist(&path.server_path(ip), value).await.unwrap();
}

pub(crate) async fn add_instance(registry: &MemoryRegistry, tenant: Option<&str>, job: &str, id: &str) {
    let path = JobNodePath::new(job, tenant);
    registry.persist(&path.instance_path(id), "").await.unwrap();
}

pub(crate) async fn assign_item(
    registry: &MemoryRegistry,
    tenant: Option<&str>,
    job: &str,
    item: u32,
    instance: &str,
) {
    let path = JobNodePath::new(job, tenant);
    registry
        .persist(
            &path.sharding_item_path(&item.to_string(), ShardingNode::Instance),
            instance,
        )
        .await
        .unwrap();
}

pub(crate) async fn mark_item(
    registry: &MemoryRegistry,
    tenant: Option<&str>,
    job: &str,
    item: u32,
    node: ShardingNode,
) {
    let path = JobNodePath::new(job, tenant);
    registry
        .persist(&path.sharding_item_path(&item.to_string(), node), "")
        .await
        .unwrap();
}
