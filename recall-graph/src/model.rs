//! Graph data model: identity keys, query rows and backend batch types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node type used when the extractor does not supply one.
pub const DEFAULT_ENTITY_TYPE: &str = "Entity";

/// Identity key of an entity name: trimmed, lowercased, whitespace runs
/// collapsed to `_`.
///
/// `"  Alice  Smith "` and `"alice smith"` both map to `alice_smith`.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Relation types are upper snake case: `"works at"` → `WORKS_AT`.
pub fn normalize_relation(relation: &str) -> String {
    relation
        .replace('-', " ")
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Scalar edge attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Edge attributes. Ordered so the serialized form is stable.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// `(source, relation, destination)` using display names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub source: String,
    pub relation: String,
    pub destination: String,
}

impl Triple {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            destination: destination.into(),
        }
    }
}

/// One hybrid search row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRelation {
    pub source: String,
    pub relation: String,
    pub destination: String,
    /// Similarity of the seed node to the query
    pub score: f32,
}

impl ScoredRelation {
    pub fn triple(&self) -> Triple {
        Triple::new(&self.source, &self.relation, &self.destination)
    }
}

/// A stored edge as returned by `get_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub relation: String,
    pub destination: String,
    /// How many times the fact has been added
    pub mentions: u64,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Relation {
    pub fn triple(&self) -> Triple {
        Triple::new(&self.source, &self.relation, &self.destination)
    }
}

/// Outcome of `add` / `update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddResult {
    /// Distinct entities written, in first-mention order
    pub entities: Vec<String>,
    /// Relations written, in extraction order
    pub relations: Vec<Triple>,
    /// Candidates dropped because a part normalized to nothing
    pub skipped: usize,
}

/// Outcome of `delete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Relations that existed and were removed
    pub relations: Vec<Triple>,
}

/// Edge identity within one owner partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub source_key: String,
    pub relation: String,
    pub destination_key: String,
}

impl RelationKey {
    /// Normalize a display-name triple into its identity key.
    pub fn from_triple(triple: &Triple) -> Self {
        Self {
            source_key: normalize_name(&triple.source),
            relation: normalize_relation(&triple.relation),
            destination_key: normalize_name(&triple.destination),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.source_key.is_empty() && !self.relation.is_empty() && !self.destination_key.is_empty()
    }
}

/// Node write: merged by `(key, owner)`, remaining fields overwrite.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpsert {
    pub key: String,
    pub name: String,
    pub entity_type: String,
    pub embedding: Vec<f32>,
}

/// Edge write: merged by `(source_key, relation, destination_key, owner)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeUpsert {
    pub source_key: String,
    pub relation: String,
    pub destination_key: String,
    pub attributes: Attributes,
    /// Creation stamp (Unix micros) applied only when the edge is new
    pub created_at: i64,
}

/// Everything one text unit writes. Applied atomically by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertBatch {
    pub nodes: Vec<NodeUpsert>,
    pub edges: Vec<EdgeUpsert>,
}

impl UpsertBatch {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Node selected by nearest-neighbor search.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub key: String,
    pub name: String,
    pub score: f32,
}

/// One outgoing edge of a seed, with the ordering stamp used for ties.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub seed_key: String,
    pub source: String,
    pub relation: String,
    pub destination: String,
    pub created_at: i64,
    /// Backend-local edge id, breaks ties between equal `created_at`
    pub edge_id: i64,
}
