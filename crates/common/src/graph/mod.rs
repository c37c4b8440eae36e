//! Graph store capability
//!
//! "run a structured query against a fixed node/relationship schema and
//! return rows". Queries are always parameterized: entity names extracted
//! from user text are bound via the parameter map, never spliced into the
//! query string.
//!
//! The production implementation talks to the Neo4j HTTP transaction
//! endpoint; rows come back as plain column -> value mappings.

use crate::config::GraphConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One result row: column name -> value.
pub type GraphRow = serde_json::Map<String, Value>;

/// Trait for the graph store capability
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run one parameterized query and return its rows.
    async fn run(&self, query: &str, params: Value) -> Result<Vec<GraphRow>>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> Result<()>;
}

/// Neo4j client over the HTTP transaction-commit endpoint
pub struct Neo4jHttpStore {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<TxStatement<'a>>,
}

#[derive(Serialize)]
struct TxStatement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Deserialize)]
struct TxResponse {
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jHttpStore {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.url.trim_end_matches('/'),
                config.database
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn commit(&self, query: &str, params: Value) -> Result<TxResponse> {
        let request = TxRequest {
            statements: vec![TxStatement {
                statement: query,
                parameters: params,
            }],
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(user) = &self.username {
            builder = builder.basic_auth(user, self.password.as_deref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::GraphUnavailable {
                message: format!("Connection failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GraphQuery {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: TxResponse = response.json().await.map_err(|e| AppError::GraphQuery {
            message: format!("Failed to parse response: {}", e),
        })?;

        if let Some(err) = parsed.errors.first() {
            return Err(AppError::GraphQuery {
                message: format!("{}: {}", err.code, err.message),
            });
        }

        Ok(parsed)
    }
}

/// Zip Neo4j's columns/row arrays into keyed rows.
fn rows_from_result(result: &TxResult) -> Vec<GraphRow> {
    result
        .data
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .cloned()
                .zip(row.row.iter().cloned())
                .collect()
        })
        .collect()
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn run(&self, query: &str, params: Value) -> Result<Vec<GraphRow>> {
        let response = self.commit(query, params).await?;
        Ok(response
            .results
            .first()
            .map(rows_from_result)
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        self.run("RETURN 1 AS ok", Value::Object(Default::default()))
            .await?;
        Ok(())
    }
}
