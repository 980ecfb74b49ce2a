//! The graph memory store.
//!
//! `GraphStore` turns text into owner-scoped facts and answers hybrid
//! queries over them. It owns the pipeline around the backend:
//!
//! - **add**: extract → drop incomplete candidates → embed every distinct
//!   node once → one atomic batch upsert
//! - **search**: embed query → nearest seeds → one-hop expansion → rank
//!
//! Every backend call is bounded by the configured timeout. Nothing is
//! retried; an expired call surfaces as [`GraphError::Connection`]. The
//! embedded driver rolls back a write whose caller stopped waiting; a Cypher
//! engine may still apply a statement it already received.

use crate::backend::{self, GraphBackend, IndexState};
use crate::config::{Metric, NormalizedConfig, VectorIndexConfig, DEFAULT_TIMEOUT_MS};
use crate::error::{GraphError, GraphResult};
use crate::model::{
    normalize_name, normalize_relation, AddResult, Attributes, DeleteResult, EdgeUpsert,
    NodeUpsert, Relation, RelationKey, ScoredRelation, Triple, UpsertBatch, DEFAULT_ENTITY_TYPE,
};
use crate::ports::{EmbeddingProvider, ExtractedRelation, Extractor};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of index initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index was created by this call
    Created,
    /// A compatible index already existed
    Existing,
}

/// Owner-partitioned graph memory with hybrid vector + graph retrieval.
///
/// # Example
///
/// ```ignore
/// let raw = recall_common::load_store_config(&config_dir)?;
/// let config = recall_graph::validate(&raw)?;
/// let store = GraphStore::connect(&config, embedder, extractor).await?;
/// store.initialize().await?;
///
/// store.add("Alice likes coffee", "user-1").await?;
/// let rows = store.search("what does alice drink", "user-1", 5).await?;
/// ```
pub struct GraphStore {
    backend: Arc<dyn GraphBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn Extractor>,
    index: VectorIndexConfig,
    timeout: Duration,
    seed_fanout: usize,
}

/// Nodes and edges planned from one extraction, before embedding.
#[derive(Debug, Default)]
struct Plan {
    /// Distinct nodes in first-mention order: (key, name, type)
    nodes: Vec<(String, String, String)>,
    edges: Vec<(RelationKey, Attributes)>,
    relations: Vec<Triple>,
    skipped: usize,
}

impl Plan {
    fn from_extraction(candidates: Vec<ExtractedRelation>) -> Self {
        let mut plan = Self::default();
        let mut node_slots: HashMap<String, usize> = HashMap::new();
        let mut edge_slots: HashMap<RelationKey, usize> = HashMap::new();

        for candidate in candidates {
            let key = RelationKey {
                source_key: normalize_name(&candidate.source),
                relation: normalize_relation(&candidate.relation),
                destination_key: normalize_name(&candidate.destination),
            };
            if !key.is_complete() {
                plan.skipped += 1;
                continue;
            }

            let source_name = candidate.source.trim().to_string();
            let destination_name = candidate.destination.trim().to_string();
            plan.node(&mut node_slots, &key.source_key, &source_name, candidate.source_type);
            plan.node(
                &mut node_slots,
                &key.destination_key,
                &destination_name,
                candidate.destination_type,
            );

            let triple = Triple::new(source_name, key.relation.clone(), destination_name);
            match edge_slots.get(&key) {
                Some(&slot) => {
                    plan.edges[slot].1 = candidate.attributes;
                    plan.relations[slot] = triple;
                }
                None => {
                    edge_slots.insert(key.clone(), plan.edges.len());
                    plan.edges.push((key, candidate.attributes));
                    plan.relations.push(triple);
                }
            }
        }
        plan
    }

    /// Register a node mention; later mentions overwrite name and type.
    fn node(
        &mut self,
        slots: &mut HashMap<String, usize>,
        key: &str,
        name: &str,
        entity_type: Option<String>,
    ) {
        let entity_type = entity_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        match slots.get(key) {
            Some(&slot) => {
                let node = &mut self.nodes[slot];
                node.1 = name.to_string();
                if let Some(t) = entity_type {
                    node.2 = t;
                }
            }
            None => {
                slots.insert(key.to_string(), self.nodes.len());
                self.nodes.push((
                    key.to_string(),
                    name.to_string(),
                    entity_type.unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string()),
                ));
            }
        }
    }
}

fn require_owner(owner_id: &str) -> GraphResult<()> {
    if owner_id.trim().is_empty() {
        return Err(GraphError::validation("owner_id", "must not be empty"));
    }
    Ok(())
}

fn require_text(field: &'static str, text: &str) -> GraphResult<()> {
    if text.trim().is_empty() {
        return Err(GraphError::validation(field, "must not be empty"));
    }
    Ok(())
}

impl GraphStore {
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn Extractor>,
        index: VectorIndexConfig,
    ) -> Self {
        Self {
            backend,
            embedder,
            extractor,
            index,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            seed_fanout: 1,
        }
    }

    /// Connect the backend selected by `config` and build a store over it.
    ///
    /// Fails on `vector_index.dimension` when the embedder produces vectors
    /// of another length.
    pub async fn connect(
        config: &NormalizedConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn Extractor>,
    ) -> GraphResult<Self> {
        if embedder.dimensions() != config.vector_index.dimension {
            return Err(GraphError::config(
                "vector_index.dimension",
                format!(
                    "is {} but embedder `{}` produces {} dimensions",
                    config.vector_index.dimension,
                    embedder.name(),
                    embedder.dimensions()
                ),
            ));
        }

        let backend = tokio::time::timeout(config.timeout, backend::connect(config))
            .await
            .map_err(|_| {
                GraphError::Connection(format!(
                    "{} backend did not connect within {:?}",
                    config.backend.provider(),
                    config.timeout
                ))
            })??;

        Ok(Self::new(backend, embedder, extractor, config.vector_index.clone())
            .with_timeout(config.timeout)
            .with_seed_fanout(config.seed_fanout))
    }

    /// Upper bound for each backend call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Seeds fetched per requested search row (at least 1).
    pub fn with_seed_fanout(mut self, seed_fanout: usize) -> Self {
        self.seed_fanout = seed_fanout.max(1);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn index(&self) -> &VectorIndexConfig {
        &self.index
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = GraphResult<T>>,
    ) -> GraphResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Connection(format!(
                "{} {operation} timed out after {:?}",
                self.backend.name(),
                self.timeout
            ))),
        }
    }

    /// Ensure the configured vector index exists.
    pub async fn initialize(&self) -> GraphResult<IndexStatus> {
        self.initialize_index(self.index.dimension, self.index.metric)
            .await
    }

    /// Ensure an index with these parameters exists on the configured target.
    ///
    /// A recorded index with a different dimension or metric is an
    /// [`GraphError::IndexConflict`]; it is never altered.
    pub async fn initialize_index(&self, dimension: usize, metric: Metric) -> GraphResult<IndexStatus> {
        if dimension == 0 {
            return Err(GraphError::validation("dimension", "must be positive"));
        }
        let requested = VectorIndexConfig {
            dimension,
            metric,
            ..self.index.clone()
        };

        match self
            .bounded("ensure_index", self.backend.ensure_index(&requested))
            .await?
        {
            IndexState::Created => {
                tracing::info!(backend = self.backend.name(), index = %requested, "Created vector index");
                Ok(IndexStatus::Created)
            }
            IndexState::Existing(existing) if requested.is_compatible_with(&existing) => {
                Ok(IndexStatus::Existing)
            }
            IndexState::Existing(existing) => Err(GraphError::IndexConflict {
                existing,
                requested,
            }),
        }
    }

    async fn embed_all(&self, texts: &[&str]) -> GraphResult<Vec<Vec<f32>>> {
        let vectors = self
            .embedder
            .embed(texts)
            .await
            .map_err(|e| GraphError::Embedding(format!("{e:#}")))?;
        if vectors.len() != texts.len() {
            return Err(GraphError::Embedding(format!(
                "{} returned {} vectors for {} inputs",
                self.embedder.name(),
                vectors.len(),
                texts.len()
            )));
        }
        for vector in &vectors {
            self.check_dimension(vector)?;
        }
        Ok(vectors)
    }

    fn check_dimension(&self, vector: &[f32]) -> GraphResult<()> {
        if vector.len() != self.index.dimension {
            return Err(GraphError::Embedding(format!(
                "{} returned a {}-dimensional vector, index expects {}",
                self.embedder.name(),
                vector.len(),
                self.index.dimension
            )));
        }
        Ok(())
    }

    async fn extract(&self, text: &str) -> GraphResult<Vec<ExtractedRelation>> {
        self.extractor
            .extract(text)
            .await
            .map_err(|e| GraphError::Extraction(format!("{e:#}")))
    }

    /// Extract facts from `text` and merge them into the owner's graph.
    ///
    /// Every port call completes before the single backend write, so a
    /// failure leaves the graph untouched.
    pub async fn add(&self, text: &str, owner_id: &str) -> GraphResult<AddResult> {
        require_owner(owner_id)?;
        require_text("text", text)?;

        let plan = Plan::from_extraction(self.extract(text).await?);
        if plan.edges.is_empty() {
            tracing::debug!(owner = owner_id, skipped = plan.skipped, "No facts extracted");
            return Ok(AddResult {
                skipped: plan.skipped,
                ..AddResult::default()
            });
        }

        let names: Vec<&str> = plan.nodes.iter().map(|(_, name, _)| name.as_str()).collect();
        let embeddings = self.embed_all(&names).await?;

        let base = chrono::Utc::now().timestamp_micros();
        let batch = UpsertBatch {
            nodes: plan
                .nodes
                .iter()
                .zip(embeddings)
                .map(|((key, name, entity_type), embedding)| NodeUpsert {
                    key: key.clone(),
                    name: name.clone(),
                    entity_type: entity_type.clone(),
                    embedding,
                })
                .collect(),
            edges: plan
                .edges
                .into_iter()
                .enumerate()
                .map(|(i, (key, attributes))| EdgeUpsert {
                    source_key: key.source_key,
                    relation: key.relation,
                    destination_key: key.destination_key,
                    attributes,
                    created_at: base + i as i64,
                })
                .collect(),
        };

        self.bounded("upsert", self.backend.upsert(owner_id, &batch))
            .await?;

        tracing::debug!(
            owner = owner_id,
            entities = batch.nodes.len(),
            relations = batch.edges.len(),
            skipped = plan.skipped,
            "Merged facts"
        );
        Ok(AddResult {
            entities: plan.nodes.into_iter().map(|(_, name, _)| name).collect(),
            relations: plan.relations,
            skipped: plan.skipped,
        })
    }

    /// Additive re-ingestion; identical to [`add`](Self::add).
    pub async fn update(&self, text: &str, owner_id: &str) -> GraphResult<AddResult> {
        self.add(text, owner_id).await
    }

    /// Hybrid search: nearest seed nodes, expanded one hop along outgoing
    /// edges, ranked by seed similarity.
    ///
    /// Ties keep edge creation order. At most `limit` rows are returned.
    pub async fn search(
        &self,
        query: &str,
        owner_id: &str,
        limit: usize,
    ) -> GraphResult<Vec<ScoredRelation>> {
        require_owner(owner_id)?;
        require_text("query", query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed_one(query)
            .await
            .map_err(|e| GraphError::Embedding(format!("{e:#}")))?;
        self.check_dimension(&vector)?;

        let k = limit.saturating_mul(self.seed_fanout);
        let seeds = self
            .bounded("nearest", self.backend.nearest(owner_id, &vector, k))
            .await?;
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<&str, f32> = HashMap::with_capacity(seeds.len());
        let mut keys = Vec::with_capacity(seeds.len());
        for seed in &seeds {
            if scores.insert(seed.key.as_str(), seed.score).is_none() {
                keys.push(seed.key.clone());
            }
        }

        let expansions = self
            .bounded("expand", self.backend.expand(owner_id, &keys))
            .await?;

        let mut rows: Vec<(i64, i64, ScoredRelation)> = expansions
            .into_iter()
            .filter_map(|e| {
                let score = *scores.get(e.seed_key.as_str())?;
                Some((
                    e.created_at,
                    e.edge_id,
                    ScoredRelation {
                        source: e.source,
                        relation: e.relation,
                        destination: e.destination,
                        score,
                    },
                ))
            })
            .collect();

        rows.sort_by(|a, b| {
            b.2.score
                .total_cmp(&a.2.score)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });
        rows.truncate(limit);

        tracing::debug!(
            owner = owner_id,
            seeds = seeds.len(),
            rows = rows.len(),
            "Hybrid search"
        );
        Ok(rows.into_iter().map(|(_, _, row)| row).collect())
    }

    /// Every relation of the owner in creation order, at most `limit`.
    pub async fn get_all(&self, owner_id: &str, limit: usize) -> GraphResult<Vec<Relation>> {
        require_owner(owner_id)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.bounded("relations", self.backend.relations(owner_id, limit))
            .await
    }

    /// Remove every node and edge of the owner.
    pub async fn delete_all(&self, owner_id: &str) -> GraphResult<()> {
        require_owner(owner_id)?;
        self.bounded("delete_owner", self.backend.delete_owner(owner_id))
            .await
    }

    /// Retract the facts extracted from `text`.
    ///
    /// Only the matching edges are removed; their nodes stay. Facts that are
    /// not stored are skipped.
    pub async fn delete(&self, text: &str, owner_id: &str) -> GraphResult<DeleteResult> {
        require_owner(owner_id)?;
        require_text("text", text)?;

        let plan = Plan::from_extraction(self.extract(text).await?);
        let mut result = DeleteResult::default();
        for ((key, _), triple) in plan.edges.iter().zip(plan.relations) {
            if self
                .bounded("delete_relation", self.backend.delete_relation(owner_id, key))
                .await?
            {
                result.relations.push(triple);
            }
        }

        tracing::debug!(owner = owner_id, deleted = result.relations.len(), "Retracted facts");
        Ok(result)
    }

    /// Delete one relation by its display-name triple.
    pub async fn delete_relation(&self, triple: &Triple, owner_id: &str) -> GraphResult<bool> {
        require_owner(owner_id)?;
        let key = RelationKey::from_triple(triple);
        if !key.is_complete() {
            return Err(GraphError::validation(
                "triple",
                "source, relation and destination must not be empty",
            ));
        }
        self.bounded("delete_relation", self.backend.delete_relation(owner_id, &key))
            .await
    }

    /// Delete one entity and every relation touching it.
    pub async fn delete_entity(&self, name: &str, owner_id: &str) -> GraphResult<bool> {
        require_owner(owner_id)?;
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(GraphError::validation("name", "must not be empty"));
        }
        self.bounded("delete_entity", self.backend.delete_entity(owner_id, &key))
            .await
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        self.bounded("health_check", async { Ok(self.backend.health_check().await) })
            .await
            .unwrap_or(false)
    }
}
