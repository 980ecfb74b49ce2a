//! Backend configuration registry.
//!
//! A raw configuration names a `provider` tag and a provider-specific
//! `config` object. The tag selects exactly one variant of [`BackendConfig`];
//! keys that belong to other variants are ignored. Validation is pure: it
//! never touches the network, the filesystem or the environment, and every
//! failure names the offending field path.
//!
//! ```json
//! {
//!   "provider": "falkordb",
//!   "config": { "host": "localhost", "port": 6379 },
//!   "vector_index": { "dimension": 1024, "metric": "cosine" },
//!   "timeout_ms": 10000
//! }
//! ```

use crate::error::{GraphError, GraphResult};
use recall_common::Secret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Every provider tag the registry understands.
pub const PROVIDERS: &[&str] = &["neo4j", "memgraph", "neptune", "kuzu", "falkordb", "sqlite"];

pub const DEFAULT_LABEL: &str = "Entity";
pub const DEFAULT_PROPERTY: &str = "embedding";
pub const DEFAULT_DIMENSION: usize = 1024;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_GRAPH_NAME: &str = "knowledge_graph";
pub const DEFAULT_NEO4J_DATABASE: &str = "neo4j";
pub const DEFAULT_NEPTUNE_APP_ID: &str = "Recall";
pub const IN_MEMORY_PATH: &str = ":memory:";

const MAX_DIMENSION: u64 = 65_536;

/// Similarity metric of a vector index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            other => Err(format!("unknown metric `{other}` (expected cosine or euclidean)")),
        }
    }
}

/// Vector index identity and parameters. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorIndexConfig {
    /// Node label the index covers
    pub label: String,
    /// Node property holding the embedding
    pub property: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl VectorIndexConfig {
    /// Index over the default `Entity.embedding` target.
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            property: DEFAULT_PROPERTY.to_string(),
            dimension,
            metric,
        }
    }

    /// Whether an existing index can serve requests made with `self`.
    pub fn is_compatible_with(&self, existing: &Self) -> bool {
        self.dimension == existing.dimension && self.metric == existing.metric
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION, Metric::Cosine)
    }
}

impl fmt::Display for VectorIndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}(dimension={}, metric={})",
            self.label, self.property, self.dimension, self.metric
        )
    }
}

/// `url` + credentials triple for Neo4j.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub url: url::Url,
    pub username: String,
    pub password: Secret,
    pub database: String,
    /// Label every entity with a shared base label
    pub base_label: bool,
}

/// `url` + credentials triple for Memgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemgraphConfig {
    pub url: url::Url,
    pub username: String,
    pub password: Secret,
}

/// Neptune Analytics endpoint, `neptune-graph://<graph id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeptuneConfig {
    pub endpoint: String,
    /// Derived from the endpoint; always starts with `g-`
    pub graph_identifier: String,
    pub app_id: String,
    pub base_label: bool,
}

/// `host` + `port` pair for FalkorDB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FalkorDbConfig {
    pub host: String,
    pub port: u16,
    pub graph_name: String,
    pub username: Option<String>,
    pub password: Option<Secret>,
}

/// Embedded store: a database file path or `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub path: String,
}

impl SqliteConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
        }
    }
}

/// One variant per provider tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Neo4j(Neo4jConfig),
    Memgraph(MemgraphConfig),
    Neptune(NeptuneConfig),
    FalkorDb(FalkorDbConfig),
    /// Embedded path shape under its `kuzu { db }` name; served by the SQLite driver
    Kuzu(SqliteConfig),
    Sqlite(SqliteConfig),
}

impl BackendConfig {
    /// The provider tag this variant was selected by.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Neo4j(_) => "neo4j",
            Self::Memgraph(_) => "memgraph",
            Self::Neptune(_) => "neptune",
            Self::FalkorDb(_) => "falkordb",
            Self::Kuzu(_) => "kuzu",
            Self::Sqlite(_) => "sqlite",
        }
    }
}

/// Validated configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConfig {
    pub backend: BackendConfig,
    pub vector_index: VectorIndexConfig,
    /// Upper bound for every backend call
    pub timeout: Duration,
    /// Seeds fetched per requested result row
    pub seed_fanout: usize,
}

impl NormalizedConfig {
    /// In-memory embedded store with default index settings.
    pub fn in_memory(vector_index: VectorIndexConfig) -> Self {
        Self {
            backend: BackendConfig::Sqlite(SqliteConfig::default()),
            vector_index,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            seed_fanout: 1,
        }
    }
}

/// A configuration leaf as written.
///
/// Deserializing never fails on the value's type, so type errors are
/// reported by [`Field`] together with their path.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

/// One raw leaf and the path it is reported under.
struct Field<'a> {
    path: String,
    value: Option<&'a RawValue>,
}

impl<'a> Field<'a> {
    fn new(prefix: &str, key: &str, value: &'a Option<RawValue>) -> Self {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        Self {
            path,
            value: value.as_ref(),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> GraphError {
        GraphError::config(self.path.as_str(), reason)
    }

    fn optional_str(&self) -> GraphResult<Option<String>> {
        match self.value {
            None => Ok(None),
            Some(RawValue::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(RawValue::Text(s)) => Ok(Some(s.trim().to_string())),
            Some(_) => Err(self.invalid("must be a string")),
        }
    }

    fn required_str(&self) -> GraphResult<String> {
        self.optional_str()?
            .ok_or_else(|| self.invalid("is required"))
    }

    /// Secrets are taken verbatim; surrounding whitespace may be meaningful.
    fn optional_secret(&self) -> GraphResult<Option<Secret>> {
        match self.value {
            None => Ok(None),
            Some(RawValue::Text(s)) if s.is_empty() => Ok(None),
            Some(RawValue::Text(s)) => Ok(Some(Secret::new(s.as_str()))),
            Some(_) => Err(self.invalid("must be a string")),
        }
    }

    fn required_secret(&self) -> GraphResult<Secret> {
        self.optional_secret()?
            .ok_or_else(|| self.invalid("is required"))
    }

    fn optional_bool(&self, default: bool) -> GraphResult<bool> {
        match self.value {
            None => Ok(default),
            Some(RawValue::Bool(b)) => Ok(*b),
            Some(RawValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.invalid("must be a boolean")),
            },
            Some(_) => Err(self.invalid("must be a boolean")),
        }
    }

    /// Integers may arrive as strings after `${VAR}` expansion.
    fn optional_u64(&self) -> GraphResult<Option<u64>> {
        let invalid = || self.invalid("must be a non-negative integer");
        match self.value {
            None => Ok(None),
            Some(RawValue::Number(n)) => n.as_u64().map(Some).ok_or_else(invalid),
            Some(RawValue::Text(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    fn required_port(&self) -> GraphResult<u16> {
        let port = self
            .optional_u64()?
            .ok_or_else(|| self.invalid("is required"))?;
        match u16::try_from(port) {
            Ok(p) if p > 0 => Ok(p),
            _ => Err(self.invalid(format!(
                "invalid port {port}: must be between 1 and 65535"
            ))),
        }
    }

    fn required_url(&self) -> GraphResult<url::Url> {
        let raw = self.required_str()?;
        let parsed = url::Url::parse(&raw).map_err(|e| self.invalid(format!("invalid URL: {e}")))?;
        if parsed.host_str().is_none() {
            return Err(self.invalid("URL must include a host"));
        }
        Ok(parsed)
    }
}

/// Field of the provider-specific `config` object.
fn config_field<'a>(key: &str, value: &'a Option<RawValue>) -> Field<'a> {
    Field::new("config", key, value)
}

/// Deserialize an optional object section; absent or null gives the default.
fn section<T: DeserializeOwned + Default>(value: Option<&Value>, field: &str) -> GraphResult<T> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v @ Value::Object(_)) => {
            T::deserialize(v).map_err(|e| GraphError::config(field, e.to_string()))
        }
        Some(_) => Err(GraphError::config(field, "must be an object")),
    }
}

/// Checks applied on top of a deserialized raw section.
trait Validate {
    type Output;

    fn validate(&self) -> GraphResult<Self::Output>;
}

/// Plain identifier: letter or underscore, then letters, digits, underscores.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNeo4j {
    url: Option<RawValue>,
    username: Option<RawValue>,
    password: Option<RawValue>,
    database: Option<RawValue>,
    base_label: Option<RawValue>,
}

impl Validate for RawNeo4j {
    type Output = Neo4jConfig;

    fn validate(&self) -> GraphResult<Neo4jConfig> {
        Ok(Neo4jConfig {
            url: config_field("url", &self.url).required_url()?,
            username: config_field("username", &self.username).required_str()?,
            password: config_field("password", &self.password).required_secret()?,
            database: config_field("database", &self.database)
                .optional_str()?
                .unwrap_or_else(|| DEFAULT_NEO4J_DATABASE.to_string()),
            base_label: config_field("base_label", &self.base_label).optional_bool(false)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMemgraph {
    url: Option<RawValue>,
    username: Option<RawValue>,
    password: Option<RawValue>,
}

impl Validate for RawMemgraph {
    type Output = MemgraphConfig;

    fn validate(&self) -> GraphResult<MemgraphConfig> {
        Ok(MemgraphConfig {
            url: config_field("url", &self.url).required_url()?,
            username: config_field("username", &self.username).required_str()?,
            password: config_field("password", &self.password).required_secret()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNeptune {
    endpoint: Option<RawValue>,
    app_id: Option<RawValue>,
    base_label: Option<RawValue>,
}

impl Validate for RawNeptune {
    type Output = NeptuneConfig;

    fn validate(&self) -> GraphResult<NeptuneConfig> {
        let field = config_field("endpoint", &self.endpoint);
        let endpoint = field
            .optional_str()?
            .ok_or_else(|| field.invalid("is required, as 'neptune-graph://<graphid>'"))?;

        if endpoint.starts_with("neptune-db://") {
            return Err(field.invalid("neptune-db servers are not supported"));
        }
        let Some(graph_identifier) = endpoint.strip_prefix("neptune-graph://") else {
            return Err(field.invalid("must use the neptune-graph://<graphid> scheme"));
        };
        if !graph_identifier.starts_with("g-") {
            return Err(field.invalid(format!(
                "invalid graph identifier `{graph_identifier}`: must start with `g-`"
            )));
        }

        Ok(NeptuneConfig {
            graph_identifier: graph_identifier.to_string(),
            endpoint: endpoint.clone(),
            app_id: config_field("app_id", &self.app_id)
                .optional_str()?
                .unwrap_or_else(|| DEFAULT_NEPTUNE_APP_ID.to_string()),
            base_label: config_field("base_label", &self.base_label).optional_bool(false)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFalkorDb {
    host: Option<RawValue>,
    port: Option<RawValue>,
    graph_name: Option<RawValue>,
    username: Option<RawValue>,
    password: Option<RawValue>,
}

impl Validate for RawFalkorDb {
    type Output = FalkorDbConfig;

    fn validate(&self) -> GraphResult<FalkorDbConfig> {
        let name_field = config_field("graph_name", &self.graph_name);
        let graph_name = name_field
            .optional_str()?
            .unwrap_or_else(|| DEFAULT_GRAPH_NAME.to_string());
        if graph_name.chars().any(char::is_whitespace) {
            return Err(name_field.invalid("must not contain whitespace"));
        }

        Ok(FalkorDbConfig {
            host: config_field("host", &self.host).required_str()?,
            port: config_field("port", &self.port).required_port()?,
            graph_name,
            username: config_field("username", &self.username).optional_str()?,
            password: config_field("password", &self.password).optional_secret()?,
        })
    }
}

/// Embedded path shape. `sqlite` names it `path`, `kuzu` names it `db`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEmbedded {
    path: Option<RawValue>,
    db: Option<RawValue>,
}

impl RawEmbedded {
    fn validate_as(&self, key: &str) -> GraphResult<SqliteConfig> {
        let value = if key == "db" { &self.db } else { &self.path };
        Ok(SqliteConfig {
            path: config_field(key, value)
                .optional_str()?
                .unwrap_or_else(|| IN_MEMORY_PATH.to_string()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVectorIndex {
    label: Option<RawValue>,
    property: Option<RawValue>,
    dimension: Option<RawValue>,
    metric: Option<RawValue>,
}

impl Validate for RawVectorIndex {
    type Output = VectorIndexConfig;

    fn validate(&self) -> GraphResult<VectorIndexConfig> {
        let mut index = VectorIndexConfig::default();

        let label = Field::new("vector_index", "label", &self.label);
        if let Some(value) = label.optional_str()? {
            if !is_identifier(&value) {
                return Err(label.invalid("must be a plain identifier"));
            }
            index.label = value;
        }
        let property = Field::new("vector_index", "property", &self.property);
        if let Some(value) = property.optional_str()? {
            if !is_identifier(&value) {
                return Err(property.invalid("must be a plain identifier"));
            }
            index.property = value;
        }
        let dimension = Field::new("vector_index", "dimension", &self.dimension);
        if let Some(value) = dimension.optional_u64()? {
            if value == 0 || value > MAX_DIMENSION {
                return Err(dimension.invalid(format!("must be between 1 and {MAX_DIMENSION}")));
            }
            index.dimension = value as usize;
        }
        let metric = Field::new("vector_index", "metric", &self.metric);
        if let Some(value) = metric.optional_str()? {
            index.metric = value
                .parse()
                .map_err(|reason: String| metric.invalid(reason))?;
        }

        Ok(index)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStoreConfig {
    provider: Option<RawValue>,
    config: Option<Value>,
    vector_index: Option<Value>,
    timeout_ms: Option<RawValue>,
    seed_fanout: Option<RawValue>,
}

/// Validate a raw configuration object.
pub fn validate(raw: &Value) -> GraphResult<NormalizedConfig> {
    if !raw.is_object() {
        return Err(GraphError::config("$", "must be an object"));
    }
    let top = RawStoreConfig::deserialize(raw).map_err(|e| GraphError::config("$", e.to_string()))?;

    let provider = Field::new("", "provider", &top.provider)
        .required_str()?
        .to_lowercase();
    let config = top.config.as_ref();

    let backend = match provider.as_str() {
        "neo4j" => BackendConfig::Neo4j(section::<RawNeo4j>(config, "config")?.validate()?),
        "memgraph" => BackendConfig::Memgraph(section::<RawMemgraph>(config, "config")?.validate()?),
        "neptune" => BackendConfig::Neptune(section::<RawNeptune>(config, "config")?.validate()?),
        "falkordb" => BackendConfig::FalkorDb(section::<RawFalkorDb>(config, "config")?.validate()?),
        "kuzu" => BackendConfig::Kuzu(section::<RawEmbedded>(config, "config")?.validate_as("db")?),
        "sqlite" => {
            BackendConfig::Sqlite(section::<RawEmbedded>(config, "config")?.validate_as("path")?)
        }
        other => {
            return Err(GraphError::config(
                "provider",
                format!(
                    "unsupported graph store provider `{other}` (expected one of: {})",
                    PROVIDERS.join(", ")
                ),
            ))
        }
    };

    let vector_index =
        section::<RawVectorIndex>(top.vector_index.as_ref(), "vector_index")?.validate()?;

    let timeout_ms = Field::new("", "timeout_ms", &top.timeout_ms)
        .optional_u64()?
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(GraphError::config("timeout_ms", "must be greater than 0"));
    }

    let seed_fanout = Field::new("", "seed_fanout", &top.seed_fanout)
        .optional_u64()?
        .unwrap_or(1);
    if seed_fanout == 0 {
        return Err(GraphError::config("seed_fanout", "must be at least 1"));
    }

    Ok(NormalizedConfig {
        backend,
        vector_index,
        timeout: Duration::from_millis(timeout_ms),
        seed_fanout: seed_fanout as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn field_of(raw: Value) -> String {
        validate(&raw)
            .expect_err("config should be rejected")
            .field()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn neo4j_requires_credentials_triple() {
        let cfg = validate(&json!({
            "provider": "neo4j",
            "config": { "url": "http://localhost:7474", "username": "neo4j", "password": "pw" }
        }))
        .unwrap();

        let BackendConfig::Neo4j(neo) = cfg.backend else {
            panic!("expected neo4j variant");
        };
        assert_eq!(neo.url.as_str(), "http://localhost:7474/");
        assert_eq!(neo.username, "neo4j");
        assert_eq!(neo.password.expose(), "pw");
        assert_eq!(neo.database, DEFAULT_NEO4J_DATABASE);
        assert!(!neo.base_label);
    }

    #[test_case(json!({"username": "u", "password": "p"}), "config.url")]
    #[test_case(json!({"url": "http://h:7474", "password": "p"}), "config.username")]
    #[test_case(json!({"url": "http://h:7474", "username": "u"}), "config.password")]
    #[test_case(json!({"url": "not a url", "username": "u", "password": "p"}), "config.url")]
    #[test_case(json!({"url": "http://h:7474", "username": 5, "password": "p"}), "config.username")]
    fn neo4j_missing_or_malformed_field(config: Value, field: &str) {
        assert_eq!(field_of(json!({ "provider": "neo4j", "config": config })), field);
    }

    #[test]
    fn memgraph_shares_the_triple_shape() {
        assert_eq!(
            field_of(json!({ "provider": "memgraph", "config": { "url": "bolt://h:7687", "username": "u" } })),
            "config.password"
        );
        let cfg = validate(&json!({
            "provider": "memgraph",
            "config": { "url": "bolt://h:7687", "username": "u", "password": "p" }
        }))
        .unwrap();
        assert_eq!(cfg.backend.provider(), "memgraph");
    }

    #[test]
    fn neptune_derives_graph_identifier() {
        let cfg = validate(&json!({
            "provider": "neptune",
            "config": { "endpoint": "neptune-graph://g-abc123" }
        }))
        .unwrap();
        let BackendConfig::Neptune(neptune) = cfg.backend else {
            panic!("expected neptune variant");
        };
        assert_eq!(neptune.graph_identifier, "g-abc123");
        assert_eq!(neptune.app_id, DEFAULT_NEPTUNE_APP_ID);
    }

    #[test_case("neptune-db://cluster.example", "not supported")]
    #[test_case("neptune-graph://abc123", "must start with `g-`")]
    #[test_case("https://g-abc123", "neptune-graph://")]
    fn neptune_rejects_bad_endpoints(endpoint: &str, reason_fragment: &str) {
        let err = validate(&json!({ "provider": "neptune", "config": { "endpoint": endpoint } }))
            .unwrap_err();
        assert_eq!(err.field(), Some("config.endpoint"));
        assert!(err.to_string().contains(reason_fragment), "{err}");
    }

    #[test]
    fn falkordb_host_port_pair() {
        let cfg = validate(&json!({
            "provider": "falkordb",
            "config": { "host": "localhost", "port": "6379" }
        }))
        .unwrap();
        let BackendConfig::FalkorDb(falkor) = cfg.backend else {
            panic!("expected falkordb variant");
        };
        assert_eq!(falkor.port, 6379);
        assert_eq!(falkor.graph_name, DEFAULT_GRAPH_NAME);
        assert!(falkor.password.is_none());
    }

    #[test_case(json!({"port": 6379}), "config.host")]
    #[test_case(json!({"host": "localhost"}), "config.port")]
    #[test_case(json!({"host": "localhost", "port": 0}), "config.port")]
    #[test_case(json!({"host": "localhost", "port": 70000}), "config.port")]
    #[test_case(json!({"host": "localhost", "port": "abc"}), "config.port")]
    #[test_case(json!({"host": "localhost", "port": 6379, "graph_name": "a b"}), "config.graph_name")]
    fn falkordb_missing_or_malformed_field(config: Value, field: &str) {
        assert_eq!(field_of(json!({ "provider": "falkordb", "config": config })), field);
    }

    #[test]
    fn sqlite_defaults_to_in_memory() {
        let cfg = validate(&json!({ "provider": "sqlite" })).unwrap();
        let BackendConfig::Sqlite(sqlite) = cfg.backend else {
            panic!("expected sqlite variant");
        };
        assert!(sqlite.is_in_memory());
        assert_eq!(cfg.vector_index, VectorIndexConfig::default());
        assert_eq!(cfg.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(cfg.seed_fanout, 1);
    }

    #[test]
    fn kuzu_db_is_the_embedded_path() {
        let cfg = validate(&json!({ "provider": "kuzu", "config": { "db": "/var/lib/recall/graph.db" } }))
            .unwrap();
        assert_eq!(cfg.backend.provider(), "kuzu");
        assert_eq!(
            cfg.backend,
            BackendConfig::Kuzu(SqliteConfig {
                path: "/var/lib/recall/graph.db".into()
            })
        );

        let BackendConfig::Kuzu(default) = validate(&json!({ "provider": "kuzu" })).unwrap().backend
        else {
            panic!("expected kuzu variant");
        };
        assert!(default.is_in_memory());
        assert_eq!(
            field_of(json!({ "provider": "kuzu", "config": { "db": 42 } })),
            "config.db"
        );
    }

    #[test]
    fn raw_sections_report_type_errors_by_path() {
        assert_eq!(
            field_of(json!({ "provider": "neo4j", "config": { "url": "http://h", "username": "u", "password": ["p"] } })),
            "config.password"
        );
        assert_eq!(
            field_of(json!({ "provider": "falkordb", "config": { "host": "h", "port": 6379, "username": true } })),
            "config.username"
        );
        assert_eq!(
            field_of(json!({ "provider": "sqlite", "config": { "path": 3 } })),
            "config.path"
        );
        assert_eq!(field_of(json!({ "provider": "sqlite", "vector_index": [] })), "vector_index");
        assert_eq!(field_of(json!({ "provider": 7 })), "provider");
        assert_eq!(field_of(json!({ "provider": "sqlite", "timeout_ms": "soon" })), "timeout_ms");
    }

    #[test]
    fn foreign_fields_are_ignored_not_merged() {
        let cfg = validate(&json!({
            "provider": "sqlite",
            "config": { "path": "/tmp/graph.db", "url": "http://ignored", "port": 1 }
        }))
        .unwrap();
        assert_eq!(
            cfg.backend,
            BackendConfig::Sqlite(SqliteConfig {
                path: "/tmp/graph.db".into()
            })
        );
    }

    #[test]
    fn provider_is_required_and_closed() {
        assert_eq!(field_of(json!({ "config": {} })), "provider");
        let err = validate(&json!({ "provider": "cassandra" })).unwrap_err();
        assert_eq!(err.field(), Some("provider"));
        assert!(err.to_string().contains("cassandra"));
    }

    #[test]
    fn provider_tag_is_case_insensitive() {
        let cfg = validate(&json!({ "provider": "SQLite" })).unwrap();
        assert_eq!(cfg.backend.provider(), "sqlite");
    }

    #[test]
    fn vector_index_overrides() {
        let cfg = validate(&json!({
            "provider": "sqlite",
            "vector_index": { "label": "Memory", "property": "vec", "dimension": 8, "metric": "euclidean" },
            "timeout_ms": 250,
            "seed_fanout": 3
        }))
        .unwrap();
        assert_eq!(cfg.vector_index.label, "Memory");
        assert_eq!(cfg.vector_index.property, "vec");
        assert_eq!(cfg.vector_index.dimension, 8);
        assert_eq!(cfg.vector_index.metric, Metric::Euclidean);
        assert_eq!(cfg.timeout, Duration::from_millis(250));
        assert_eq!(cfg.seed_fanout, 3);
    }

    #[test_case(json!({"dimension": 0}), "vector_index.dimension")]
    #[test_case(json!({"dimension": -3}), "vector_index.dimension")]
    #[test_case(json!({"metric": "dot"}), "vector_index.metric")]
    #[test_case(json!({"label": "Entity) DETACH DELETE n //"}), "vector_index.label")]
    #[test_case(json!({"property": "1st"}), "vector_index.property")]
    fn vector_index_rejections(index: Value, field: &str) {
        assert_eq!(
            field_of(json!({ "provider": "sqlite", "vector_index": index })),
            field
        );
    }

    #[test]
    fn top_level_shape_errors() {
        assert_eq!(field_of(json!("sqlite")), "$");
        assert_eq!(field_of(json!({ "provider": "sqlite", "config": [] })), "config");
        assert_eq!(field_of(json!({ "provider": "sqlite", "timeout_ms": 0 })), "timeout_ms");
        assert_eq!(field_of(json!({ "provider": "sqlite", "seed_fanout": 0 })), "seed_fanout");
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let cfg = validate(&json!({
            "provider": "neo4j",
            "config": { "url": "http://h:7474", "username": "u", "password": "s3cr3t" }
        }))
        .unwrap();
        assert!(!format!("{cfg:?}").contains("s3cr3t"));
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("Entity"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("has space"));
    }
}
