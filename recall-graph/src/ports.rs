//! Capabilities the store consumes but does not implement.
//!
//! Both ports return `anyhow::Result`; the store converts failures into
//! [`GraphError::Embedding`](crate::GraphError::Embedding) and
//! [`GraphError::Extraction`](crate::GraphError::Extraction) at its boundary.

use crate::model::Attributes;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text → fixed-dimension vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "ollama")
    fn name(&self) -> &str;

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input in input order.
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embed(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("{} returned no embedding", self.name()))
    }
}

/// A candidate fact found in text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub destination: String,
    #[serde(alias = "relationship")]
    pub relation: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub destination_type: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ExtractedRelation {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            relation: relation.into(),
            source_type: None,
            destination_type: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_types(mut self, source_type: impl Into<String>, destination_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self.destination_type = Some(destination_type.into());
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::model::AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Raw text → candidate triples.
///
/// Finding no facts is an empty list, not an error.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, text: &str) -> anyhow::Result<Vec<ExtractedRelation>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedding;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedding {
        fn name(&self) -> &str {
            "fixed"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct EmptyEmbedding;

    #[async_trait]
    impl EmbeddingProvider for EmptyEmbedding {
        fn name(&self) -> &str {
            "empty"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn embed_one_uses_batch_call() {
        let v = FixedEmbedding.embed_one("abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn embed_one_errors_on_empty_batch() {
        let err = EmptyEmbedding.embed_one("abc").await.unwrap_err();
        assert!(err.to_string().contains("empty returned no embedding"));
    }

    #[test]
    fn extracted_relation_accepts_relationship_alias() {
        let rel: ExtractedRelation = serde_json::from_str(
            r#"{"source":"alice","destination":"coffee","relationship":"likes","source_type":"Person"}"#,
        )
        .unwrap();
        assert_eq!(rel.relation, "likes");
        assert_eq!(rel.source_type.as_deref(), Some("Person"));
        assert!(rel.destination_type.is_none());
        assert!(rel.attributes.is_empty());
    }

    #[test]
    fn builder_helpers() {
        let rel = ExtractedRelation::new("Bob", "works at", "Acme")
            .with_types("Person", "Company")
            .with_attribute("since", 2020i64);
        assert_eq!(rel.destination_type.as_deref(), Some("Company"));
        assert_eq!(rel.attributes.len(), 1);
    }
}
