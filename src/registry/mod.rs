//! Registry contract consumed by the lifecycle core.
//!
//! The registry is a hierarchical key/value tree addressed by `/`-separated
//! paths. Implementations must provide linearizable single-node reads and
//! writes, recursive delete, and child listing. Retries and timeouts are the
//! implementation's business; the core never retries.

mod memory;
mod surreal;

pub use memory::MemoryRegistry;
pub use surreal::{RegistryConfig, SurrealRegistry, connect_registry, ensure_schema};

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by registry operations.
pub type RegistryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Registry handle shared by the operator and the statistics APIs.
pub type SharedRegistry = Arc<dyn RegistryCenter>;

/// Client side of the coordination registry.
pub trait RegistryCenter: Send + Sync {
    /// Value of the node, `None` if it does not exist.
    fn get<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, Option<String>>;

    /// Create or update a persistent node, creating missing parents.
    fn persist<'a>(&'a self, path: &'a str, value: &'a str) -> RegistryFuture<'a, ()>;

    /// Delete the node and its whole subtree. Missing nodes are ignored.
    fn remove<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, ()>;

    /// Names of the direct children of the node, relative to it.
    fn get_children_keys<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, Vec<String>>;

    /// Whether the node exists.
    fn is_existed<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, bool>;
}

/// Parent path of `path`; `None` for the root.
pub(crate) fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last segment of `path`.
pub(crate) fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Proper ancestors of `path`, outermost first, excluding the root.
pub(crate) fn ancestors(path: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut current = parent_of(path);
    while let Some(parent) = current {
        if parent == "/" {
            break;
        }
        result.push(parent);
        current = parent_of(parent);
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("/a"), Some("/"));
        assert_eq!(parent_of("/a/b"), Some("/a"));
        assert_eq!(parent_of("/a/b/c"), Some("/a/b"));
    }

    #[test]
    fn test_name_of() {
        assert_eq!(name_of("/a"), "a");
        assert_eq!(name_of("/a/instances/10.0.0.1@-@7"), "10.0.0.1@-@7");
    }

    #[test]
    fn test_ancestors() {
        assert!(ancestors("/a").is_empty());
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b"]);
    }
}
