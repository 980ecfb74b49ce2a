//! Neo4j transport over the HTTP transactional endpoint.
//!
//! Each query is one auto-committed transaction:
//! `POST {url}/db/{database}/tx/commit` with basic auth. The endpoint
//! reports query failures in the `errors` array of a `200` response.

use super::cypher::{CypherTransport, CypherValue, Params, Row};
use crate::config::Neo4jConfig;
use crate::error::{GraphError, GraphResult};
use async_trait::async_trait;
use recall_common::Secret;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// HTTP client bound to one Neo4j database.
pub struct Neo4jTransport {
    client: reqwest::Client,
    endpoint: url::Url,
    username: String,
    password: Secret,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    code: String,
    message: String,
}

impl Neo4jTransport {
    /// Build the client. No request is made until the first query.
    pub fn connect(config: &Neo4jConfig, timeout: Duration) -> GraphResult<Self> {
        let endpoint = commit_endpoint(&config.url, &config.database)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GraphError::config("config.url", e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

/// `{base}/db/{database}/tx/commit`; only HTTP(S) URLs are accepted.
fn commit_endpoint(base: &url::Url, database: &str) -> GraphResult<url::Url> {
    match base.scheme() {
        "http" | "https" => {}
        scheme @ ("bolt" | "bolt+s" | "bolt+ssc" | "neo4j" | "neo4j+s" | "neo4j+ssc") => {
            return Err(GraphError::config(
                "config.url",
                format!(
                    "Bolt URLs (`{scheme}://`) are not supported; this driver uses the HTTP API, \
                     point it at the http(s) endpoint of the same server, e.g. http://localhost:7474"
                ),
            ))
        }
        scheme => {
            return Err(GraphError::config(
                "config.url",
                format!(
                    "scheme `{scheme}` is not supported; use the http(s) endpoint, e.g. http://localhost:7474"
                ),
            ))
        }
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("db/{database}/tx/commit"))
        .map_err(|e| GraphError::config("config.database", e.to_string()))
}

/// Rejected credentials are a configuration fault, not an outage.
fn check_credentials(status: reqwest::StatusCode, username: &str) -> GraphResult<()> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(GraphError::config(
            "config.password",
            format!("Neo4j rejected the credentials for `{username}` ({status})"),
        ));
    }
    Ok(())
}

fn parameters(params: &Params) -> Value {
    let map: Map<String, Value> = params
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.to_json()))
        .collect();
    Value::Object(map)
}

fn into_rows(response: CommitResponse) -> GraphResult<Vec<Row>> {
    if let Some(error) = response.errors.first() {
        return Err(GraphError::Backend(format!("{}: {}", error.code, error.message)));
    }
    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    let columns = result.columns;
    Ok(result
        .data
        .into_iter()
        .map(|data| {
            Row::new(
                columns
                    .iter()
                    .cloned()
                    .zip(data.row.into_iter().map(CypherValue::from_json)),
            )
        })
        .collect())
}

#[async_trait]
impl CypherTransport for Neo4jTransport {
    fn name(&self) -> &str {
        "neo4j"
    }

    async fn run(&self, query: &str, params: &Params) -> GraphResult<Vec<Row>> {
        let body = json!({
            "statements": [{
                "statement": query,
                "parameters": parameters(params),
            }]
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.username, Some(self.password.expose()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        check_credentials(status, &self.username)?;
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GraphError::Backend(format!("Neo4j returned {status}: {text}")));
        }

        into_rows(response.json::<CommitResponse>().await?)
    }
}
