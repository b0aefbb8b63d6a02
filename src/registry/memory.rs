//! In-process registry tree.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{RegistryCenter, RegistryFuture, ancestors};

/// Registry kept in an ordered map from path to value.
///
/// Persisting a node creates any missing parents with an empty value, the
/// same way a coordination service client does. Children are listed in name
/// order.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    nodes: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes, parents included.
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}

impl RegistryCenter for MemoryRegistry {
    fn get<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.nodes.read().await.get(path).cloned()) })
    }

    fn persist<'a>(&'a self, path: &'a str, value: &'a str) -> RegistryFuture<'a, ()> {
        Box::pin(async move {
            let mut nodes = self.nodes.write().await;
            for parent in ancestors(path) {
                nodes.entry(parent.to_string()).or_default();
            }
            nodes.insert(path.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, ()> {
        Box::pin(async move {
            let mut nodes = self.nodes.write().await;
            if path == "/" {
                nodes.clear();
                return Ok(());
            }
            let prefix = child_prefix(path);
            nodes.retain(|key, _| key != path && !key.starts_with(&prefix));
            Ok(())
        })
    }

    fn get_children_keys<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, Vec<String>> {
        Box::pin(async move {
            let nodes = self.nodes.read().await;
            let prefix = child_prefix(path);
            let children = nodes
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .filter_map(|(key, _)| {
                    let rest = &key[prefix.len()..];
                    (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
                })
                .collect();
            Ok(children)
        })
    }

    fn is_existed<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, bool> {
        Box::pin(async move { Ok(path == "/" || self.nodes.read().await.contains_key(path)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persist_and_get() {
        let registry = MemoryRegistry::new();
        registry.persist("/myJob/servers/10.0.0.1", "DISABLED").await.unwrap();

        assert_eq!(
            registry.get("/myJob/servers/10.0.0.1").await.unwrap(),
            Some("DISABLED".to_string())
        );
        assert_eq!(registry.get("/myJob/servers/10.0.0.2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persist_creates_parents() {
        let registry = MemoryRegistry::new();
        registry.persist("/a/b/c", "v").await.unwrap();

        assert!(registry.is_existed("/a").await.unwrap());
        assert!(registry.is_existed("/a/b").await.unwrap());
        assert_eq!(registry.get("/a/b").await.unwrap(), Some(String::new()));
        assert_eq!(registry.len().await, 3);
    }

    #[tokio::test]
    async fn test_persist_keeps_existing_parent_values() {
        let registry = MemoryRegistry::new();
        registry.persist("/a", "keep").await.unwrap();
        registry.persist("/a/b", "v").await.unwrap();
        assert_eq!(registry.get("/a").await.unwrap(), Some("keep".to_string()));
    }

    #[tokio::test]
    async fn test_children_are_direct_and_ordered() {
        let registry = MemoryRegistry::new();
        registry.persist("/job/servers/10.0.0.2", "").await.unwrap();
        registry.persist("/job/servers/10.0.0.1", "").await.unwrap();
        registry.persist("/job/servers-extra", "").await.unwrap();
        registry.persist("/job/instances/10.0.0.1@-@1", "").await.unwrap();

        assert_eq!(
            registry.get_children_keys("/job/servers").await.unwrap(),
            vec!["10.0.0.1", "10.0.0.2"]
        );
        assert_eq!(
            registry.get_children_keys("/job").await.unwrap(),
            vec!["instances", "servers", "servers-extra"]
        );
        assert_eq!(registry.get_children_keys("/").await.unwrap(), vec!["job"]);
        assert!(registry.get_children_keys("/missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_recursive() {
        let registry = MemoryRegistry::new();
        registry.persist("/job/instances/a@-@1", "").await.unwrap();
        registry.persist("/job/instances/b@-@2", "").await.unwrap();
        registry.persist("/jobs/other", "").await.unwrap();

        registry.remove("/job/instances").await.unwrap();

        assert!(!registry.is_existed("/job/instances").await.unwrap());
        assert!(!registry.is_existed("/job/instances/a@-@1").await.unwrap());
        assert!(registry.is_existed("/job").await.unwrap());
        assert!(registry.is_existed("/jobs/other").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let registry = MemoryRegistry::new();
        registry.remove("/nothing/here").await.unwrap();
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_root_always_exists() {
        let registry = MemoryRegistry::new();
        assert!(registry.is_existed("/").await.unwrap());
        assert_eq!(registry.get("/").await.unwrap(), None);
    }
}
