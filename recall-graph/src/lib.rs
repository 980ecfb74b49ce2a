//! Recall Graph - long-term memory as an owner-partitioned property graph.
//!
//! Every entity node carries a dense embedding, so retrieval can fuse
//! vector similarity with graph structure:
//!
//! ```text
//! Query → Embedding → Nearest seeds (owner-filtered) ──┐
//!                                                      ├── One-hop expansion → Ranked triples
//!                          Graph adjacency ────────────┘
//! ```
//!
//! Writes go the other way: text is turned into candidate triples by an
//! [`Extractor`], node names are embedded by an [`EmbeddingProvider`], and
//! the whole unit is merged into the backend in one batch.
//!
//! Backends are selected by a tagged configuration validated in [`config`]
//! and built once by [`backend::connect`].

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod ports;
pub mod store;
pub mod vector;

// Re-export commonly used types
pub use backend::{connect, GraphBackend};
pub use config::{validate, BackendConfig, Metric, NormalizedConfig, VectorIndexConfig};
pub use error::{GraphError, GraphResult};
pub use model::{
    normalize_name, normalize_relation, AddResult, AttributeValue, DeleteResult, Relation,
    ScoredRelation, Triple,
};
pub use ports::{EmbeddingProvider, ExtractedRelation, Extractor};
pub use store::{GraphStore, IndexStatus};
