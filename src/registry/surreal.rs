//! Registry tree stored in SurrealDB.
//!
//! Each node is one record of the `node` table keyed by its full path, with
//! the parent path and the node name denormalized so child listing is a
//! single indexed query.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use tracing::debug;

use super::{RegistryCenter, RegistryFuture, ancestors, name_of, parent_of};

const NODE_TABLE: &str = "node";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: env::var("REGISTRY_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("REGISTRY_NAMESPACE").unwrap_or_else(|_| "elastic_job".to_string()),
            database: env::var("REGISTRY_DATABASE").unwrap_or_else(|_| "registry".to_string()),
            username: env::var("REGISTRY_USERNAME").ok(),
            password: env::var("REGISTRY_PASSWORD").ok(),
        }
    }
}

pub async fn connect_registry(config: RegistryConfig) -> Result<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Surreal<Any>) -> Result<()> {
    db.query(
        "DEFINE TABLE IF NOT EXISTS node SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS path ON TABLE node TYPE string;
         DEFINE FIELD IF NOT EXISTS parent ON TABLE node TYPE string;
         DEFINE FIELD IF NOT EXISTS name ON TABLE node TYPE string;
         DEFINE FIELD IF NOT EXISTS value ON TABLE node TYPE string;
         DEFINE INDEX IF NOT EXISTS node_parent ON TABLE node COLUMNS parent;",
    )
    .await?
    .check()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    path: String,
    parent: String,
    name: String,
    value: String,
}

impl NodeRecord {
    fn new(path: &str, value: &str) -> Self {
        Self {
            path: path.to_string(),
            parent: parent_of(path).unwrap_or("/").to_string(),
            name: name_of(path).to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NameRow {
    name: String,
}

/// Registry backed by a SurrealDB connection.
#[derive(Clone)]
pub struct SurrealRegistry {
    db: Surreal<Any>,
}

impl SurrealRegistry {
    /// Wrap an existing connection. The schema must already exist.
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Connect and make sure the `node` table is defined.
    pub async fn connect(config: RegistryConfig) -> Result<Self> {
        debug!("Connecting registry at {}", config.url);
        let db = connect_registry(config).await?;
        ensure_schema(&db).await?;
        Ok(Self::new(db))
    }

    async fn find(&self, path: &str) -> Result<Option<NodeRecord>> {
        let record: Option<NodeRecord> = self.db.select((NODE_TABLE, path.to_string())).await?;
        Ok(record)
    }
}

impl RegistryCenter for SurrealRegistry {
    fn get<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.find(path).await?.map(|node| node.value)) })
    }

    fn persist<'a>(&'a self, path: &'a str, value: &'a str) -> RegistryFuture<'a, ()> {
        Box::pin(async move {
            for parent in ancestors(path) {
                if self.find(parent).await?.is_none() {
                    let _: Option<NodeRecord> = self
                        .db
                        .upsert((NODE_TABLE, parent.to_string()))
                        .content(NodeRecord::new(parent, ""))
                        .await?;
                }
            }
            let _: Option<NodeRecord> = self
                .db
                .upsert((NODE_TABLE, path.to_string()))
                .content(NodeRecord::new(path, value))
                .await?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, ()> {
        Box::pin(async move {
            let prefix = if path == "/" {
                "/".to_string()
            } else {
                format!("{}/", path)
            };
            self.db
                .query("DELETE node WHERE path = $path OR string::starts_with(path, $prefix)")
                .bind(("path", path.to_string()))
                .bind(("prefix", prefix))
                .await?
                .check()?;
            Ok(())
        })
    }

    fn get_children_keys<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut res = self
                .db
                .query("SELECT name FROM node WHERE parent = $parent ORDER BY name ASC")
                .bind(("parent", path.to_string()))
                .await?;
            let rows: Vec<NameRow> = res.take(0)?;
            Ok(rows.into_iter().map(|row| row.name).collect())
        })
    }

    fn is_existed<'a>(&'a self, path: &'a str) -> RegistryFuture<'a, bool> {
        Box::pin(async move { Ok(path == "/" || self.find(path).await?.is_some()) })
    }
}
