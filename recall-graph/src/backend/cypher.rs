//! Graph backend for Cypher engines.
//!
//! [`CypherBackend`] owns every query the store needs and runs them through
//! a [`CypherTransport`], which only moves a query string plus parameters to
//! the engine and rows back. Engine differences that live inside the query
//! text (index DDL, vector literal, nearest-neighbor procedure, score scale)
//! are captured by [`Dialect`].
//!
//! Index parameters are recorded in a metadata node
//! `(:__RecallVectorIndex {label, property, dimension, metric})`, since the
//! engines do not expose them uniformly. An engine index created outside
//! this crate is read back from the engine catalog before anything is
//! recorded.

use super::{GraphBackend, IndexState};
use crate::config::{Metric, VectorIndexConfig};
use crate::error::{GraphError, GraphResult};
use crate::model::{Attributes, Expansion, Relation, RelationKey, Seed, UpsertBatch};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Label of the node recording vector index parameters.
pub const INDEX_META_LABEL: &str = "__RecallVectorIndex";

/// Extra label applied to every entity when `base_label` is set.
pub const BASE_LABEL: &str = "__Entity__";

/// Owner filtering happens after the index lookup, so ask for more.
const OWNER_OVERFETCH: usize = 4;

/// A Cypher parameter or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum CypherValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<CypherValue>),
    /// Keys are emitted in order
    Map(Vec<(String, CypherValue)>),
}

impl CypherValue {
    pub fn map(entries: impl IntoIterator<Item = (impl Into<String>, CypherValue)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, integral floats and numeric strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floats, integers and numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Entry of a map. Verbose FalkorDB replies encode maps as flat
    /// `[key, value, ...]` lists, which are accepted too.
    pub fn lookup(&self, key: &str) -> Option<&CypherValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Self::List(items) if items.len() % 2 == 0 => items
                .chunks(2)
                .find(|pair| pair[0].as_str() == Some(key))
                .map(|pair| &pair[1]),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for CypherValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for CypherValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for CypherValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for CypherValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for CypherValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for CypherValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&[f32]> for CypherValue {
    fn from(v: &[f32]) -> Self {
        Self::List(v.iter().map(|x| Self::Float(f64::from(*x))).collect())
    }
}

impl<T: Into<CypherValue>> From<Vec<T>> for CypherValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Named query parameters, in declaration order.
pub type Params = Vec<(&'static str, CypherValue)>;

/// One result row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, CypherValue>,
}

impl Row {
    pub fn new(columns: impl IntoIterator<Item = (String, CypherValue)>) -> Self {
        Self {
            values: columns.into_iter().collect(),
        }
    }

    pub fn get(&self, column: &str) -> GraphResult<&CypherValue> {
        self.values
            .get(column)
            .ok_or_else(|| GraphError::Backend(format!("result has no column `{column}`")))
    }

    pub fn get_str(&self, column: &str) -> GraphResult<String> {
        match self.get(column)? {
            CypherValue::String(s) => Ok(s.clone()),
            other => Err(unexpected(column, "string", other)),
        }
    }

    pub fn get_i64(&self, column: &str) -> GraphResult<i64> {
        let value = self.get(column)?;
        value.as_i64().ok_or_else(|| unexpected(column, "integer", value))
    }

    pub fn get_f64(&self, column: &str) -> GraphResult<f64> {
        let value = self.get(column)?;
        value.as_f64().ok_or_else(|| unexpected(column, "number", value))
    }
}

fn unexpected(column: &str, expected: &str, got: &CypherValue) -> GraphError {
    GraphError::Backend(format!("column `{column}`: expected {expected}, got {got:?}"))
}

/// Moves one parameterized Cypher query to the engine and rows back.
#[async_trait]
pub trait CypherTransport: Send + Sync {
    /// Provider tag of the engine
    fn name(&self) -> &str;

    async fn run(&self, query: &str, params: &Params) -> GraphResult<Vec<Row>>;

    async fn ping(&self) -> bool {
        self.run("RETURN 1 AS ok", &Vec::new()).await.is_ok()
    }
}

/// Engine-specific query fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    FalkorDb,
    Neo4j,
}

impl Dialect {
    /// Neo4j indexes are named; FalkorDB ones are addressed by label/property.
    pub fn index_name(index: &VectorIndexConfig) -> String {
        format!("{}_{}_vector", index.label.to_lowercase(), index.property.to_lowercase())
    }

    pub fn create_index(self, index: &VectorIndexConfig) -> String {
        let (label, property, dimension) = (&index.label, &index.property, index.dimension);
        match self {
            Self::FalkorDb => format!(
                "CREATE VECTOR INDEX FOR (e:{label}) ON (e.{property}) \
                 OPTIONS {{dimension: {dimension}, similarityFunction: '{}'}}",
                index.metric
            ),
            Self::Neo4j => format!(
                "CREATE VECTOR INDEX {} IF NOT EXISTS FOR (e:{label}) ON (e.{property}) \
                 OPTIONS {{indexConfig: {{`vector.dimensions`: {dimension}, \
                 `vector.similarity_function`: '{}'}}}}",
                Self::index_name(index),
                index.metric
            ),
        }
    }

    /// Expression storing a parameter list as an indexable vector.
    pub fn vector(self, expr: &str) -> String {
        match self {
            Self::FalkorDb => format!("vecf32({expr})"),
            Self::Neo4j => expr.to_string(),
        }
    }

    /// `CALL` clause yielding `node` and `score` for `$k` and `$vector`.
    pub fn nearest_call(self, index: &VectorIndexConfig) -> String {
        match self {
            Self::FalkorDb => format!(
                "CALL db.idx.vector.queryNodes('{}', '{}', $k, vecf32($vector)) YIELD node, score",
                index.label, index.property
            ),
            Self::Neo4j => format!(
                "CALL db.index.vector.queryNodes('{}', $k, $vector) YIELD node, score",
                Self::index_name(index)
            ),
        }
    }

    /// Map an engine score onto cosine similarity or `1 / (1 + distance)`.
    ///
    /// FalkorDB yields distances; Neo4j yields `(1 + cos) / 2` for cosine and
    /// `1 / (1 + d²)` for euclidean.
    pub fn normalize_score(self, metric: Metric, raw: f64) -> f32 {
        let score = match (self, metric) {
            (Self::FalkorDb, Metric::Cosine) => 1.0 - raw,
            (Self::FalkorDb, Metric::Euclidean) => 1.0 / (1.0 + raw.max(0.0)),
            (Self::Neo4j, Metric::Cosine) => 2.0 * raw - 1.0,
            (Self::Neo4j, Metric::Euclidean) => {
                if raw <= 0.0 {
                    0.0
                } else {
                    let distance = (1.0 / raw - 1.0).max(0.0).sqrt();
                    1.0 / (1.0 + distance)
                }
            }
        };
        score as f32
    }

    /// Catalog query describing engine vector indexes on the target.
    ///
    /// Neo4j yields `dimension` and `metric` columns, FalkorDB yields the
    /// raw `options` of every index on the label.
    pub fn describe_index(self) -> &'static str {
        match self {
            Self::FalkorDb => {
                "CALL db.indexes() YIELD label, properties, options \
                 WHERE label = $label AND $property IN properties \
                 RETURN options"
            }
            Self::Neo4j => {
                "SHOW VECTOR INDEXES YIELD name, labelsOrTypes, properties, options \
                 WHERE name = $name OR ($label IN labelsOrTypes AND $property IN properties) \
                 RETURN options.indexConfig['vector.dimensions'] AS dimension, \
                 options.indexConfig['vector.similarity_function'] AS metric"
            }
        }
    }

    /// Dimension and metric of a [`describe_index`](Self::describe_index)
    /// row, or `None` when the row is not a vector index on the property.
    pub fn described_index(
        self,
        row: &Row,
        index: &VectorIndexConfig,
    ) -> GraphResult<Option<(usize, Metric)>> {
        let (dimension, metric) = match self {
            Self::Neo4j => (row.get("dimension")?.clone(), row.get("metric")?.clone()),
            Self::FalkorDb => {
                let options = row.get("options")?;
                // per-property options, or one flat map
                let options = options.lookup(&index.property).unwrap_or(options);
                (
                    options.lookup("dimension").cloned().unwrap_or(CypherValue::Null),
                    options
                        .lookup("similarityFunction")
                        .cloned()
                        .unwrap_or(CypherValue::Null),
                )
            }
        };
        let Some(dimension) = dimension.as_i64() else {
            return Ok(None);
        };
        let dimension = usize::try_from(dimension)
            .map_err(|_| GraphError::Backend(format!("engine index dimension {dimension}")))?;
        let metric = match metric.as_str() {
            Some(raw) => raw
                .parse::<Metric>()
                .map_err(|e| GraphError::Backend(format!("engine index metric: {e}")))?,
            None => Metric::default(),
        };
        Ok(Some((dimension, metric)))
    }

    /// Whether an index DDL error only says the index is already there.
    pub fn is_existing_index_error(self, message: &str) -> bool {
        let message = message.to_lowercase();
        message.contains("already indexed") || message.contains("already exists")
    }
}

/// Queries for one label/property target, built once.
#[derive(Debug, Clone)]
struct Queries {
    read_meta: String,
    claim_meta: String,
    upsert: String,
    nearest: String,
    owner_nodes: String,
    expand: String,
    relations: String,
    delete_relation: String,
    delete_entity: String,
    delete_owner: String,
}

impl Queries {
    fn new(dialect: Dialect, index: &VectorIndexConfig, base_label: bool) -> Self {
        let label = &index.label;
        let property = &index.property;
        let merge_label = if base_label {
            format!("{label}:{BASE_LABEL}")
        } else {
            label.clone()
        };
        let embedding = dialect.vector("n.embedding");

        Self {
            read_meta: format!(
                "MATCH (m:{INDEX_META_LABEL} {{label: $label, property: $property}}) \
                 RETURN m.dimension AS dimension, m.metric AS metric"
            ),
            claim_meta: format!(
                "MERGE (m:{INDEX_META_LABEL} {{label: $label, property: $property}}) \
                 ON CREATE SET m.dimension = $dimension, m.metric = $metric \
                 RETURN m.dimension AS dimension, m.metric AS metric"
            ),
            upsert: format!(
                "UNWIND $nodes AS n \
                 MERGE (e:{merge_label} {{key: n.key, user_id: $owner}}) \
                 ON CREATE SET e.created_at = $now \
                 SET e.name = n.name, e.type = n.type, e.{property} = {embedding}, e.updated_at = $now \
                 WITH count(e) AS merged \
                 UNWIND $edges AS f \
                 MATCH (s:{label} {{key: f.source, user_id: $owner}}) \
                 MATCH (d:{label} {{key: f.destination, user_id: $owner}}) \
                 MERGE (s)-[r:RELATES {{type: f.relation, user_id: $owner}}]->(d) \
                 ON CREATE SET r.created_at = f.created_at, r.mentions = 0 \
                 SET r.mentions = r.mentions + 1, r.attributes = f.attributes, r.updated_at = $now \
                 RETURN count(r) AS edges"
            ),
            nearest: format!(
                "{} RETURN node.user_id AS owner, node.key AS key, node.name AS name, score",
                dialect.nearest_call(index)
            ),
            owner_nodes: format!("MATCH (n:{label} {{user_id: $owner}}) RETURN count(n) AS nodes"),
            expand: format!(
                "MATCH (s:{label} {{user_id: $owner}})-[r:RELATES {{user_id: $owner}}]->(d:{label} {{user_id: $owner}}) \
                 WHERE s.key IN $keys \
                 RETURN s.key AS seed, s.name AS source, r.type AS relation, d.name AS destination, \
                 r.created_at AS created_at, id(r) AS edge_id"
            ),
            relations: format!(
                "MATCH (s:{label} {{user_id: $owner}})-[r:RELATES {{user_id: $owner}}]->(d:{label} {{user_id: $owner}}) \
                 RETURN s.name AS source, r.type AS relation, d.name AS destination, \
                 r.mentions AS mentions, r.attributes AS attributes \
                 ORDER BY r.created_at, id(r) \
                 LIMIT $limit"
            ),
            delete_relation: format!(
                "MATCH (s:{label} {{key: $source, user_id: $owner}})\
                 -[r:RELATES {{type: $relation, user_id: $owner}}]->\
                 (d:{label} {{key: $destination, user_id: $owner}}) \
                 DELETE r \
                 RETURN count(r) AS deleted"
            ),
            delete_entity: format!(
                "MATCH (n:{label} {{key: $key, user_id: $owner}}) \
                 DETACH DELETE n \
                 RETURN count(n) AS deleted"
            ),
            delete_owner: format!("MATCH (n:{label} {{user_id: $owner}}) DETACH DELETE n"),
        }
    }
}

/// [`GraphBackend`] for any engine reachable through a [`CypherTransport`].
pub struct CypherBackend<T> {
    transport: T,
    dialect: Dialect,
    index: VectorIndexConfig,
    queries: Queries,
}

impl<T: CypherTransport> CypherBackend<T> {
    pub fn new(transport: T, dialect: Dialect, index: VectorIndexConfig) -> Self {
        let queries = Queries::new(dialect, &index, false);
        Self {
            transport,
            dialect,
            index,
            queries,
        }
    }

    /// Also label entities with `__Entity__`.
    pub fn with_base_label(mut self, base_label: bool) -> Self {
        self.queries = Queries::new(self.dialect, &self.index, base_label);
        self
    }

    async fn read_meta(&self, query: &str, params: &Params) -> GraphResult<Option<(usize, Metric)>> {
        let rows = self.transport.run(query, params).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let dimension = usize::try_from(row.get_i64("dimension")?)
            .map_err(|_| GraphError::Backend("negative index dimension recorded".into()))?;
        let metric = row
            .get_str("metric")?
            .parse::<Metric>()
            .map_err(|e| GraphError::Backend(format!("recorded index metric: {e}")))?;
        Ok(Some((dimension, metric)))
    }

    /// Parameters of the engine's own vector index on the target, if any.
    async fn engine_index(&self, requested: &VectorIndexConfig) -> GraphResult<Option<(usize, Metric)>> {
        let params: Params = vec![
            ("name", Dialect::index_name(requested).into()),
            ("label", requested.label.as_str().into()),
            ("property", requested.property.as_str().into()),
        ];
        let rows = self.transport.run(self.dialect.describe_index(), &params).await?;
        for row in &rows {
            if let Some(found) = self.dialect.described_index(row, requested)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn owner_node_count(&self, owner: &str) -> GraphResult<usize> {
        let params: Params = vec![("owner", owner.into())];
        let rows = self.transport.run(&self.queries.owner_nodes, &params).await?;
        let count = match rows.first() {
            Some(row) => row.get_i64("nodes")?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Record `(dimension, metric)` unless a record already exists; returns
    /// whatever is recorded afterwards.
    async fn claim_meta(&self, mut target: Params, (dimension, metric): (usize, Metric)) -> GraphResult<(usize, Metric)> {
        target.push(("dimension", dimension.into()));
        target.push(("metric", metric.to_string().into()));
        self.read_meta(&self.queries.claim_meta, &target)
            .await?
            .ok_or_else(|| GraphError::Backend("index metadata merge returned no row".into()))
    }

    async fn adopt(
        &self,
        requested: &VectorIndexConfig,
        target: Params,
        engine: (usize, Metric),
    ) -> GraphResult<IndexState> {
        let recorded = self.claim_meta(target, engine).await?;
        Ok(self.existing(requested, recorded))
    }

    fn existing(&self, requested: &VectorIndexConfig, (dimension, metric): (usize, Metric)) -> IndexState {
        IndexState::Existing(VectorIndexConfig {
            label: requested.label.clone(),
            property: requested.property.clone(),
            dimension,
            metric,
        })
    }
}

fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

fn batch_params(owner: &str, batch: &UpsertBatch) -> GraphResult<Params> {
    let nodes = batch
        .nodes
        .iter()
        .map(|node| {
            CypherValue::map([
                ("key", CypherValue::from(node.key.as_str())),
                ("name", node.name.as_str().into()),
                ("type", node.entity_type.as_str().into()),
                ("embedding", node.embedding.as_slice().into()),
            ])
        })
        .collect::<Vec<_>>();

    let mut edges = Vec::with_capacity(batch.edges.len());
    for edge in &batch.edges {
        let attributes = serde_json::to_string(&edge.attributes)
            .map_err(|e| GraphError::Backend(format!("encode attributes: {e}")))?;
        edges.push(CypherValue::map([
            ("source", CypherValue::from(edge.source_key.as_str())),
            ("relation", edge.relation.as_str().into()),
            ("destination", edge.destination_key.as_str().into()),
            ("attributes", attributes.into()),
            ("created_at", edge.created_at.into()),
        ]));
    }

    Ok(vec![
        ("owner", owner.into()),
        ("now", now_micros().into()),
        ("nodes", CypherValue::List(nodes)),
        ("edges", CypherValue::List(edges)),
    ])
}

#[async_trait]
impl<T: CypherTransport> GraphBackend for CypherBackend<T> {
    fn name(&self) -> &str {
        self.transport.name()
    }

    async fn ensure_index(&self, requested: &VectorIndexConfig) -> GraphResult<IndexState> {
        let target: Params = vec![
            ("label", requested.label.as_str().into()),
            ("property", requested.property.as_str().into()),
        ];
        if let Some(recorded) = self.read_meta(&self.queries.read_meta, &target).await? {
            return Ok(self.existing(requested, recorded));
        }

        // An engine index without metadata was made elsewhere; its real
        // parameters are what gets recorded.
        if let Some(engine) = self.engine_index(requested).await? {
            tracing::debug!(index = %requested, dimension = engine.0, "Adopting engine vector index");
            return self.adopt(requested, target, engine).await;
        }

        if let Err(e) = self
            .transport
            .run(&self.dialect.create_index(requested), &Vec::new())
            .await
        {
            if !self.dialect.is_existing_index_error(&e.to_string()) {
                return Err(e);
            }
            // Created concurrently since the catalog was read.
            let engine = self.engine_index(requested).await?.ok_or_else(|| {
                GraphError::Backend(format!(
                    "engine reports an index on {}.{} but does not describe it",
                    requested.label, requested.property
                ))
            })?;
            return self.adopt(requested, target, engine).await;
        }

        let recorded = self
            .claim_meta(target, (requested.dimension, requested.metric))
            .await?;
        if recorded == (requested.dimension, requested.metric) {
            tracing::debug!(backend = self.name(), index = %requested, "Created vector index");
            Ok(IndexState::Created)
        } else {
            Ok(self.existing(requested, recorded))
        }
    }

    async fn upsert(&self, owner: &str, batch: &UpsertBatch) -> GraphResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let params = batch_params(owner, batch)?;
        let rows = self.transport.run(&self.queries.upsert, &params).await?;

        // MATCH drops edges whose endpoints are missing; report instead of
        // silently writing a partial batch.
        let written = match rows.first() {
            Some(row) => row.get_i64("edges")?,
            None => 0,
        };
        if written != batch.edges.len() as i64 {
            return Err(GraphError::Backend(format!(
                "merged {written} of {} relations",
                batch.edges.len()
            )));
        }
        Ok(())
    }

    /// The index procedures cannot filter by owner, so pages of global
    /// neighbors are fetched and filtered here. A page that is full but
    /// holds too few of the owner's nodes is fetched again at twice the
    /// size, until `k` seeds are found, the owner has no more nodes, or the
    /// engine runs out of neighbors.
    async fn nearest(&self, owner: &str, vector: &[f32], k: usize) -> GraphResult<Vec<Seed>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut fetch = k.saturating_mul(OWNER_OVERFETCH);
        let mut wanted = k;
        let mut owner_nodes: Option<usize> = None;

        let mut seeds = loop {
            let params: Params = vec![
                ("k", fetch.into()),
                ("vector", vector.into()),
            ];
            let rows = self.transport.run(&self.queries.nearest, &params).await?;
            let full_page = rows.len() >= fetch;

            let mut seeds = Vec::with_capacity(rows.len().min(fetch));
            for row in &rows {
                if row.get("owner")?.as_str() != Some(owner) {
                    continue;
                }
                seeds.push(Seed {
                    key: row.get_str("key")?,
                    name: row.get_str("name")?,
                    score: self
                        .dialect
                        .normalize_score(self.index.metric, row.get_f64("score")?),
                });
            }

            if seeds.len() >= wanted || !full_page || fetch == usize::MAX {
                break seeds;
            }
            if owner_nodes.is_none() {
                let count = self.owner_node_count(owner).await?;
                owner_nodes = Some(count);
                wanted = wanted.min(count);
                if seeds.len() >= wanted {
                    break seeds;
                }
            }
            fetch = fetch.saturating_mul(2);
            tracing::debug!(owner, fetch, found = seeds.len(), "Widening owner-filtered neighbor search");
        };

        seeds.sort_by(|a, b| b.score.total_cmp(&a.score));
        seeds.truncate(k);
        Ok(seeds)
    }

    async fn expand(&self, owner: &str, seed_keys: &[String]) -> GraphResult<Vec<Expansion>> {
        if seed_keys.is_empty() {
            return Ok(Vec::new());
        }
        let params: Params = vec![
            ("owner", owner.into()),
            ("keys", seed_keys.to_vec().into()),
        ];
        let rows = self.transport.run(&self.queries.expand, &params).await?;

        rows.iter()
            .map(|row| {
                Ok(Expansion {
                    seed_key: row.get_str("seed")?,
                    source: row.get_str("source")?,
                    relation: row.get_str("relation")?,
                    destination: row.get_str("destination")?,
                    created_at: row.get_i64("created_at")?,
                    edge_id: row.get_i64("edge_id")?,
                })
            })
            .collect()
    }

    async fn relations(&self, owner: &str, limit: usize) -> GraphResult<Vec<Relation>> {
        let params: Params = vec![("owner", owner.into()), ("limit", limit.into())];
        let rows = self.transport.run(&self.queries.relations, &params).await?;

        rows.iter()
            .map(|row| {
                let attributes = match row.get("attributes")? {
                    CypherValue::Null => Attributes::new(),
                    CypherValue::String(raw) => serde_json::from_str(raw)
                        .map_err(|e| GraphError::Backend(format!("stored attributes: {e}")))?,
                    other => return Err(unexpected("attributes", "JSON string", other)),
                };
                Ok(Relation {
                    source: row.get_str("source")?,
                    relation: row.get_str("relation")?,
                    destination: row.get_str("destination")?,
                    mentions: u64::try_from(row.get_i64("mentions")?).unwrap_or_default(),
                    attributes,
                })
            })
            .collect()
    }

    async fn delete_relation(&self, owner: &str, key: &RelationKey) -> GraphResult<bool> {
        let params: Params = vec![
            ("owner", owner.into()),
            ("source", key.source_key.as_str().into()),
            ("relation", key.relation.as_str().into()),
            ("destination", key.destination_key.as_str().into()),
        ];
        let rows = self.transport.run(&self.queries.delete_relation, &params).await?;
        deleted_any(&rows)
    }

    async fn delete_entity(&self, owner: &str, key: &str) -> GraphResult<bool> {
        let params: Params = vec![("owner", owner.into()), ("key", key.into())];
        let rows = self.transport.run(&self.queries.delete_entity, &params).await?;
        deleted_any(&rows)
    }

    async fn delete_owner(&self, owner: &str) -> GraphResult<()> {
        let params: Params = vec![("owner", owner.into())];
        self.transport.run(&self.queries.delete_owner, &params).await?;
        tracing::debug!(backend = self.name(), owner, "Deleted owner graph");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.transport.ping().await
    }
}

fn deleted_any(rows: &[Row]) -> GraphResult<bool> {
    match rows.first() {
        Some(row) => Ok(row.get_i64("deleted")? > 0),
        None => Ok(false),
    }
}
