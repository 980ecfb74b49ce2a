//! Storage drivers behind [`GraphStore`](crate::GraphStore).
//!
//! A driver only knows how to persist and query owner-partitioned nodes and
//! edges. Extraction, embedding, ranking and timeouts belong to the store.
//!
//! | Provider   | Driver                                  |
//! |------------|-----------------------------------------|
//! | `sqlite`   | [`SqliteBackend`], embedded             |
//! | `falkordb` | [`CypherBackend`] over `GRAPH.QUERY`    |
//! | `neo4j`    | [`CypherBackend`] over HTTP `tx/commit` |

pub mod cypher;
pub mod falkordb;
pub mod neo4j;
pub mod sqlite;

pub use cypher::{CypherBackend, CypherTransport, CypherValue, Dialect, Row};
pub use falkordb::FalkorDbTransport;
pub use neo4j::Neo4jTransport;
pub use sqlite::SqliteBackend;

use crate::config::{BackendConfig, NormalizedConfig, VectorIndexConfig};
use crate::error::{GraphError, GraphResult};
use crate::model::{Expansion, Relation, RelationKey, Seed, UpsertBatch};
use async_trait::async_trait;
use std::sync::Arc;

/// What `ensure_index` found in the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    /// The index did not exist and was created with the requested parameters
    Created,
    /// An index was already recorded with these parameters
    Existing(VectorIndexConfig),
}

/// Owner-partitioned graph storage with a vector index over entity nodes.
///
/// Every method except [`ensure_index`](Self::ensure_index) and
/// [`health_check`](Self::health_check) is scoped to one owner; nothing a
/// driver returns may cross that boundary.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Provider tag (e.g., "sqlite", "falkordb")
    fn name(&self) -> &str;

    /// Create the vector index if absent, else report the recorded parameters.
    async fn ensure_index(&self, requested: &VectorIndexConfig) -> GraphResult<IndexState>;

    /// Merge a batch of nodes and edges in one transaction or statement.
    async fn upsert(&self, owner: &str, batch: &UpsertBatch) -> GraphResult<()>;

    /// Up to `k` of the owner's nodes closest to `vector`, best first.
    async fn nearest(&self, owner: &str, vector: &[f32], k: usize) -> GraphResult<Vec<Seed>>;

    /// Outgoing edges of the given seed nodes, one row per edge.
    async fn expand(&self, owner: &str, seed_keys: &[String]) -> GraphResult<Vec<Expansion>>;

    /// The owner's edges in creation order, at most `limit`.
    async fn relations(&self, owner: &str, limit: usize) -> GraphResult<Vec<Relation>>;

    /// Remove one edge. `false` if it did not exist.
    async fn delete_relation(&self, owner: &str, key: &RelationKey) -> GraphResult<bool>;

    /// Remove one node with its incident edges. `false` if it did not exist.
    async fn delete_entity(&self, owner: &str, key: &str) -> GraphResult<bool>;

    /// Remove every node and edge of the owner.
    async fn delete_owner(&self, owner: &str) -> GraphResult<()>;

    /// Health check
    async fn health_check(&self) -> bool;
}

/// Build the driver selected by `config.backend`.
///
/// Drivers that open network connections do so here, bounded by
/// `config.timeout`.
pub async fn connect(config: &NormalizedConfig) -> GraphResult<Arc<dyn GraphBackend>> {
    let index = config.vector_index.clone();
    let backend: Arc<dyn GraphBackend> = match &config.backend {
        BackendConfig::Sqlite(sqlite) | BackendConfig::Kuzu(sqlite) => {
            Arc::new(SqliteBackend::open(sqlite, index)?)
        }
        BackendConfig::FalkorDb(falkordb) => {
            let transport = FalkorDbTransport::connect(falkordb, config.timeout).await?;
            Arc::new(CypherBackend::new(transport, Dialect::FalkorDb, index))
        }
        BackendConfig::Neo4j(neo4j) => {
            let transport = Neo4jTransport::connect(neo4j, config.timeout)?;
            Arc::new(
                CypherBackend::new(transport, Dialect::Neo4j, index)
                    .with_base_label(neo4j.base_label),
            )
        }
        BackendConfig::Memgraph(_) | BackendConfig::Neptune(_) => {
            return Err(GraphError::config(
                "provider",
                format!(
                    "no driver for `{}` is available; use sqlite, kuzu, falkordb or neo4j",
                    config.backend.provider()
                ),
            ));
        }
    };

    tracing::info!(
        backend = backend.name(),
        index = %config.vector_index,
        "Graph backend ready"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate;
    use serde_json::json;

    #[tokio::test]
    async fn connect_builds_in_memory_sqlite() {
        let config = validate(&json!({"provider": "sqlite", "config": {}})).unwrap();
        let backend = connect(&config).await.unwrap();
        assert_eq!(backend.name(), "sqlite");
        assert!(backend.health_check().await);
    }

    #[tokio::test]
    async fn connect_serves_kuzu_paths_with_sqlite() {
        let config = validate(&json!({"provider": "kuzu", "config": {"db": ":memory:"}})).unwrap();
        let backend = connect(&config).await.unwrap();
        assert_eq!(backend.name(), "sqlite");
    }

    #[tokio::test]
    async fn connect_rejects_providers_without_driver() {
        let config = validate(&json!({
            "provider": "memgraph",
            "config": {"url": "bolt://localhost:7687", "username": "memgraph", "password": "pw"}
        }))
        .unwrap();
        let err = connect(&config).await.err().unwrap();
        assert_eq!(err.field(), Some("provider"));
        assert!(err.to_string().contains("memgraph"));
    }

    #[tokio::test]
    async fn connect_rejects_neo4j_bolt_urls() {
        let config = validate(&json!({
            "provider": "neo4j",
            "config": {"url": "bolt://localhost:7687", "username": "neo4j", "password": "pw"}
        }))
        .unwrap();
        let err = connect(&config).await.err().unwrap();
        assert_eq!(err.field(), Some("config.url"));
    }
}
