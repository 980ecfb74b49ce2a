//! Embedded graph store on SQLite.
//!
//! Nodes and edges live in two tables keyed by their identity tuples, so
//! every merge is a single `INSERT .. ON CONFLICT DO UPDATE`. Nearest-neighbor
//! search is a brute-force scan over the owner's embeddings, which keeps the
//! driver dependency-free and is adequate for per-user graphs.
//!
//! Edges reference nodes with `ON DELETE CASCADE`; deleting a node removes
//! its incident edges.

use super::{GraphBackend, IndexState};
use crate::config::{Metric, SqliteConfig, VectorIndexConfig};
use crate::error::{GraphError, GraphResult};
use crate::model::{Attributes, Expansion, Relation, RelationKey, Seed, UpsertBatch};
use crate::vector::{bytes_to_vec, similarity, vec_to_bytes};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vector_index (
        label TEXT NOT NULL,
        property TEXT NOT NULL,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (label, property)
    );

    CREATE TABLE IF NOT EXISTS entities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        key TEXT NOT NULL,
        name TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (owner_id, key)
    );

    CREATE TABLE IF NOT EXISTS relations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        source_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
        relation TEXT NOT NULL,
        destination_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
        attributes TEXT NOT NULL DEFAULT '{}',
        mentions INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (owner_id, source_id, relation, destination_id)
    );

    CREATE INDEX IF NOT EXISTS idx_relations_source ON relations(owner_id, source_id);
    CREATE INDEX IF NOT EXISTS idx_relations_created ON relations(owner_id, created_at, id);
"#;

/// One-hop expansion of a single seed. Starts from the seed's unique
/// `(owner_id, key)` entry so edges are found through `idx_relations_source`.
const EXPAND_SQL: &str = "SELECT s.key, s.name, r.relation, d.name, r.created_at, r.id
     FROM entities s
     CROSS JOIN relations r
     JOIN entities d ON d.id = r.destination_id
     WHERE s.owner_id = ?1 AND s.key = ?2
       AND r.owner_id = ?1 AND r.source_id = s.id
       AND d.owner_id = ?1";

/// Set when the caller stops waiting for a write, e.g. on timeout.
struct Abandoned(Arc<AtomicBool>);

impl Drop for Abandoned {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn abandoned_write() -> GraphError {
    GraphError::Connection("sqlite write abandoned by the caller; rolled back".into())
}

/// SQLite graph backend. One serialized connection, driven from
/// `spawn_blocking`.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    index: VectorIndexConfig,
}

impl SqliteBackend {
    /// Open (or create) the database described by `config`.
    ///
    /// `:memory:` gives a private database that lives as long as the backend.
    pub fn open(config: &SqliteConfig, index: VectorIndexConfig) -> GraphResult<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            let path = Path::new(&config.path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GraphError::Connection(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            Connection::open(path)?
        };

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %config.path, "Opened SQLite graph");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            index,
        })
    }

    /// In-memory database for the given index.
    pub fn in_memory(index: VectorIndexConfig) -> GraphResult<Self> {
        Self::open(&SqliteConfig::default(), index)
    }

    async fn with_conn<T, F>(&self, f: F) -> GraphResult<T>
    where
        F: FnOnce(&mut Connection) -> GraphResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| GraphError::Backend("sqlite connection lock poisoned".into()))?;
            f(&mut guard)
        })
        .await?
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[async_trait]
impl GraphBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ensure_index(&self, requested: &VectorIndexConfig) -> GraphResult<IndexState> {
        let requested = requested.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO vector_index (label, property, dimension, metric, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(label, property) DO NOTHING",
                params![
                    requested.label,
                    requested.property,
                    requested.dimension as i64,
                    requested.metric.to_string(),
                    now_rfc3339()
                ],
            )?;
            if inserted == 1 {
                return Ok(IndexState::Created);
            }

            let (dimension, metric): (i64, String) = conn.query_row(
                "SELECT dimension, metric FROM vector_index WHERE label = ?1 AND property = ?2",
                params![requested.label, requested.property],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let metric: Metric = metric
                .parse()
                .map_err(|e: String| GraphError::Backend(format!("stored index metric: {e}")))?;
            Ok(IndexState::Existing(VectorIndexConfig {
                label: requested.label,
                property: requested.property,
                dimension: usize::try_from(dimension).unwrap_or_default(),
                metric,
            }))
        })
        .await
    }

    /// The blocking transaction outlives a dropped caller, so it checks
    /// whether the caller is still waiting before it starts and again right
    /// before `COMMIT`, and rolls back otherwise. Only a caller that gives up
    /// while the commit itself is running can see a timeout for a batch that
    /// was stored.
    async fn upsert(&self, owner: &str, batch: &UpsertBatch) -> GraphResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let owner = owner.to_string();
        let batch = batch.clone();
        let abandoned = Arc::new(AtomicBool::new(false));
        let _waiting = Abandoned(Arc::clone(&abandoned));

        self.with_conn(move |conn| {
            if abandoned.load(Ordering::SeqCst) {
                return Err(abandoned_write());
            }
            let tx = conn.transaction()?;
            let now = now_rfc3339();
            let mut ids: HashMap<String, i64> = HashMap::with_capacity(batch.nodes.len());

            {
                let mut merge_node = tx.prepare(
                    "INSERT INTO entities (owner_id, key, name, entity_type, embedding, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     ON CONFLICT(owner_id, key) DO UPDATE SET
                        name = excluded.name,
                        entity_type = excluded.entity_type,
                        embedding = excluded.embedding,
                        updated_at = excluded.updated_at
                     RETURNING id",
                )?;
                for node in &batch.nodes {
                    let id: i64 = merge_node.query_row(
                        params![
                            owner,
                            node.key,
                            node.name,
                            node.entity_type,
                            vec_to_bytes(&node.embedding),
                            now
                        ],
                        |row| row.get(0),
                    )?;
                    ids.insert(node.key.clone(), id);
                }

                let mut lookup = tx.prepare("SELECT id FROM entities WHERE owner_id = ?1 AND key = ?2")?;
                let mut merge_edge = tx.prepare(
                    "INSERT INTO relations
                        (owner_id, source_id, relation, destination_id, attributes, mentions, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)
                     ON CONFLICT(owner_id, source_id, relation, destination_id) DO UPDATE SET
                        attributes = excluded.attributes,
                        mentions = relations.mentions + 1,
                        updated_at = excluded.updated_at",
                )?;
                for edge in &batch.edges {
                    let mut node_id = |key: &str| -> GraphResult<i64> {
                        if let Some(id) = ids.get(key) {
                            return Ok(*id);
                        }
                        lookup
                            .query_row(params![owner, key], |row| row.get(0))
                            .optional()?
                            .ok_or_else(|| GraphError::NotFound(format!("entity `{key}`")))
                    };
                    let source_id = node_id(&edge.source_key)?;
                    let destination_id = node_id(&edge.destination_key)?;
                    let attributes = serde_json::to_string(&edge.attributes)
                        .map_err(|e| GraphError::Backend(format!("encode attributes: {e}")))?;

                    merge_edge.execute(params![
                        owner,
                        source_id,
                        edge.relation,
                        destination_id,
                        attributes,
                        edge.created_at,
                        now
                    ])?;
                }
            }

            if abandoned.load(Ordering::SeqCst) {
                // dropping `tx` rolls back
                return Err(abandoned_write());
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn nearest(&self, owner: &str, vector: &[f32], k: usize) -> GraphResult<Vec<Seed>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let owner = owner.to_string();
        let query = vector.to_vec();
        let metric = self.index.metric;

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, name, embedding FROM entities WHERE owner_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![owner], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?;

            let mut seeds = Vec::new();
            for row in rows {
                let (key, name, blob) = row?;
                let embedding = bytes_to_vec(&blob);
                if embedding.len() != query.len() {
                    continue;
                }
                let score = similarity(metric, &query, &embedding);
                seeds.push(Seed { key, name, score });
            }

            // Stable sort keeps insertion order among equal scores.
            seeds.sort_by(|a, b| b.score.total_cmp(&a.score));
            seeds.truncate(k);
            Ok(seeds)
        })
        .await
    }

    async fn expand(&self, owner: &str, seed_keys: &[String]) -> GraphResult<Vec<Expansion>> {
        if seed_keys.is_empty() {
            return Ok(Vec::new());
        }
        let owner = owner.to_string();
        let seed_keys = seed_keys.to_vec();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(EXPAND_SQL)?;

            let mut expansions = Vec::new();
            for key in &seed_keys {
                let rows = stmt.query_map(params![owner, key], |row| {
                    Ok(Expansion {
                        seed_key: row.get(0)?,
                        source: row.get(1)?,
                        relation: row.get(2)?,
                        destination: row.get(3)?,
                        created_at: row.get(4)?,
                        edge_id: row.get(5)?,
                    })
                })?;
                for row in rows {
                    expansions.push(row?);
                }
            }
            Ok(expansions)
        })
        .await
    }

    async fn relations(&self, owner: &str, limit: usize) -> GraphResult<Vec<Relation>> {
        let owner = owner.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.name, r.relation, d.name, r.mentions, r.attributes
                 FROM relations r
                 JOIN entities s ON s.id = r.source_id
                 JOIN entities d ON d.id = r.destination_id
                 WHERE r.owner_id = ?1
                 ORDER BY r.created_at, r.id
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![owner, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut relations = Vec::new();
            for row in rows {
                let (source, relation, destination, mentions, attributes) = row?;
                let attributes: Attributes = serde_json::from_str(&attributes)
                    .map_err(|e| GraphError::Backend(format!("stored attributes: {e}")))?;
                relations.push(Relation {
                    source,
                    relation,
                    destination,
                    mentions: u64::try_from(mentions).unwrap_or_default(),
                    attributes,
                });
            }
            Ok(relations)
        })
        .await
    }

    async fn delete_relation(&self, owner: &str, key: &RelationKey) -> GraphResult<bool> {
        let owner = owner.to_string();
        let key = key.clone();

        self.with_conn(move |conn| {
            let affected = conn.execute(
                "DELETE FROM relations
                 WHERE owner_id = ?1
                   AND relation = ?3
                   AND source_id = (SELECT id FROM entities WHERE owner_id = ?1 AND key = ?2)
                   AND destination_id = (SELECT id FROM entities WHERE owner_id = ?1 AND key = ?4)",
                params![owner, key.source_key, key.relation, key.destination_key],
            )?;
            Ok(affected > 0)
        })
        .await
    }

    async fn delete_entity(&self, owner: &str, key: &str) -> GraphResult<bool> {
        let owner = owner.to_string();
        let key = key.to_string();

        self.with_conn(move |conn| {
            let affected = conn.execute(
                "DELETE FROM entities WHERE owner_id = ?1 AND key = ?2",
                params![owner, key],
            )?;
            Ok(affected > 0)
        })
        .await
    }

    async fn delete_owner(&self, owner: &str) -> GraphResult<()> {
        let owner = owner.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let edges = tx.execute("DELETE FROM relations WHERE owner_id = ?1", params![owner])?;
            let nodes = tx.execute("DELETE FROM entities WHERE owner_id = ?1", params![owner])?;
            tx.commit()?;
            tracing::debug!(owner = %owner, nodes, edges, "Deleted owner graph");
            Ok(())
        })
        .await
    }

    async fn health_check(&self) -> bool {
        self.with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeUpsert, NodeUpsert};
    use tempfile::TempDir;

    fn backend() -> SqliteBackend {
        SqliteBackend::in_memory(VectorIndexConfig::new(2, Metric::Cosine)).unwrap()
    }

    fn node(key: &str, embedding: [f32; 2]) -> NodeUpsert {
        NodeUpsert {
            key: key.to_string(),
            name: key.to_uppercase(),
            entity_type: "Entity".into(),
            embedding: embedding.to_vec(),
        }
    }

    fn edge(source: &str, relation: &str, destination: &str, created_at: i64) -> EdgeUpsert {
        EdgeUpsert {
            source_key: source.into(),
            relation: relation.into(),
            destination_key: destination.into(),
            attributes: Attributes::new(),
            created_at,
        }
    }

    fn likes_batch() -> UpsertBatch {
        UpsertBatch {
            nodes: vec![node("alice", [1.0, 0.0]), node("coffee", [0.0, 1.0])],
            edges: vec![edge("alice", "LIKES", "coffee", 1)],
        }
    }

    #[tokio::test]
    async fn ensure_index_records_parameters_once() {
        let db = backend();
        let index = VectorIndexConfig::new(2, Metric::Cosine);
        assert_eq!(db.ensure_index(&index).await.unwrap(), IndexState::Created);
        assert_eq!(
            db.ensure_index(&index).await.unwrap(),
            IndexState::Existing(index.clone())
        );

        let other = VectorIndexConfig::new(3, Metric::Euclidean);
        assert_eq!(db.ensure_index(&other).await.unwrap(), IndexState::Existing(index));
    }

    #[tokio::test]
    async fn repeated_upsert_strengthens_instead_of_duplicating() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();
        db.upsert("u1", &likes_batch()).await.unwrap();

        let relations = db.relations("u1", 10).await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].mentions, 2);
        assert_eq!(relations[0].source, "ALICE");
    }

    #[tokio::test]
    async fn attributes_are_overwritten_on_merge() {
        let db = backend();
        let mut batch = likes_batch();
        batch.edges[0].attributes.insert("since".into(), 2019i64.into());
        db.upsert("u1", &batch).await.unwrap();

        batch.edges[0].attributes.insert("since".into(), 2021i64.into());
        db.upsert("u1", &batch).await.unwrap();

        let relations = db.relations("u1", 10).await.unwrap();
        assert_eq!(relations[0].attributes.get("since"), Some(&crate::model::AttributeValue::Int(2021)));
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();

        assert!(db.relations("u2", 10).await.unwrap().is_empty());
        assert!(db.nearest("u2", &[1.0, 0.0], 5).await.unwrap().is_empty());
        assert!(db
            .expand("u2", &["alice".to_string()])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn nearest_ranks_by_similarity() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();

        let seeds = db.nearest("u1", &[0.9, 0.1], 2).await.unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].key, "alice");
        assert!(seeds[0].score > seeds[1].score);

        let top = db.nearest("u1", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].key, "coffee");
        assert!((top[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn expand_starts_from_the_seed_and_its_source_index() {
        let db = backend();
        let conn = db.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!("EXPLAIN QUERY PLAN {EXPAND_SQL}"))
            .unwrap();
        let plan: Vec<String> = stmt
            .query_map(params!["u1", "alice"], |row| row.get::<_, String>(3))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(plan.iter().all(|step| step.starts_with("SEARCH")), "{plan:?}");
        assert!(
            plan.iter()
                .any(|step| step.starts_with("SEARCH r") && step.contains("source_id=?")),
            "{plan:?}"
        );
        assert!(plan.iter().all(|step| !step.contains("idx_relations_created")), "{plan:?}");
    }

    #[tokio::test]
    async fn expand_covers_many_seeds() {
        let db = backend();
        let nodes = (0..200).map(|i| node(&format!("n{i}"), [1.0, 0.0])).collect();
        let edges = (0..199)
            .map(|i| edge(&format!("n{i}"), "NEXT", &format!("n{}", i + 1), i))
            .collect();
        db.upsert("u1", &UpsertBatch { nodes, edges }).await.unwrap();

        let seeds: Vec<String> = (0..200).map(|i| format!("n{i}")).collect();
        let out = db.expand("u1", &seeds).await.unwrap();
        assert_eq!(out.len(), 199);
        assert!(db.expand("u2", &seeds).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn upsert_abandoned_by_its_caller_is_rolled_back() {
        let db = backend();

        // the write cannot start while the connection is held
        let held = db.conn.lock().unwrap();
        let outcome =
            tokio::time::timeout(Duration::from_millis(20), db.upsert("u1", &likes_batch())).await;
        assert!(outcome.is_err());
        drop(held);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(db.relations("u1", 10).await.unwrap().is_empty());
        assert!(db.nearest("u1", &[1.0, 0.0], 5).await.unwrap().is_empty());

        db.upsert("u1", &likes_batch()).await.unwrap();
        assert_eq!(db.relations("u1", 10).await.unwrap()[0].mentions, 1);
    }

    #[tokio::test]
    async fn expand_follows_outgoing_edges_only() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();

        let out = db.expand("u1", &["alice".to_string()]).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].relation, "LIKES");
        assert_eq!(out[0].destination, "COFFEE");

        assert!(db.expand("u1", &["coffee".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn relations_are_capped_and_in_creation_order() {
        let db = backend();
        let batch = UpsertBatch {
            nodes: vec![node("a", [1.0, 0.0]), node("b", [0.0, 1.0]), node("c", [1.0, 1.0])],
            edges: vec![edge("a", "KNOWS", "b", 20), edge("b", "KNOWS", "c", 10)],
        };
        db.upsert("u1", &batch).await.unwrap();

        let all = db.relations("u1", 10).await.unwrap();
        assert_eq!(all[0].source, "B");
        assert_eq!(all[1].source, "A");
        assert_eq!(db.relations("u1", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edge_to_unknown_node_rolls_back_batch() {
        let db = backend();
        let batch = UpsertBatch {
            nodes: vec![node("alice", [1.0, 0.0])],
            edges: vec![edge("alice", "LIKES", "ghost", 1)],
        };
        assert!(matches!(
            db.upsert("u1", &batch).await,
            Err(GraphError::NotFound(_))
        ));
        assert!(db.nearest("u1", &[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_relation_keeps_nodes() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();
        let key = RelationKey {
            source_key: "alice".into(),
            relation: "LIKES".into(),
            destination_key: "coffee".into(),
        };

        assert!(db.delete_relation("u1", &key).await.unwrap());
        assert!(!db.delete_relation("u1", &key).await.unwrap());
        assert!(db.relations("u1", 10).await.unwrap().is_empty());
        assert_eq!(db.nearest("u1", &[1.0, 0.0], 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_entity_cascades_to_edges() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();

        assert!(db.delete_entity("u1", "coffee").await.unwrap());
        assert!(!db.delete_entity("u1", "coffee").await.unwrap());
        assert!(db.relations("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_owner_is_scoped_and_idempotent() {
        let db = backend();
        db.upsert("u1", &likes_batch()).await.unwrap();
        db.upsert("u2", &likes_batch()).await.unwrap();

        db.delete_owner("u1").await.unwrap();
        db.delete_owner("u1").await.unwrap();

        assert!(db.relations("u1", 10).await.unwrap().is_empty());
        assert_eq!(db.relations("u2", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let config = SqliteConfig {
            path: tmp.path().join("nested/graph.db").to_string_lossy().into_owned(),
        };
        let index = VectorIndexConfig::new(2, Metric::Cosine);

        {
            let db = SqliteBackend::open(&config, index.clone()).unwrap();
            db.ensure_index(&index).await.unwrap();
            db.upsert("u1", &likes_batch()).await.unwrap();
        }

        let db = SqliteBackend::open(&config, index.clone()).unwrap();
        assert_eq!(db.ensure_index(&index).await.unwrap(), IndexState::Existing(index));
        assert_eq!(db.relations("u1", 10).await.unwrap().len(), 1);
        assert!(db.health_check().await);
    }
}
