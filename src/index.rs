//! REST client for the managed vector-search service.
//!
//! The service owns index schemas, documents, and nearest-neighbor search;
//! this module is only the wire plumbing. One trait, [`VectorIndex`], covers
//! the three operations the pipeline needs: schema management
//! (create-or-update and delete), batched document upserts, and filtered
//! vector queries. [`RestSearchIndex`] is the live implementation;
//! [`crate::memory::InMemoryIndex`] substitutes for it in tests.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{Config, SearchConfig};
use crate::error::{remote_error_message, Error, Result};
use crate::models::{IndexRecord, SearchHit};
use crate::schema::IndexSchema;

/// Request timeout for search-service calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Write action for document upserts: replace an existing record with the
/// same id, insert otherwise.
const UPSERT_ACTION: &str = "mergeOrUpload";

/// Outcome of a batch upsert.
///
/// The service applies records individually, so part of a batch can succeed
/// while the rest is rejected. Callers must not swallow `failed`.
#[derive(Debug, Default)]
pub struct UpsertSummary {
    pub succeeded: u64,
    /// Rejected records as `(record id, reason)`.
    pub failed: Vec<(String, String)>,
}

/// The remote vector index: schema management, document writes, and
/// filtered vector queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the index if absent, update its definition otherwise.
    /// Idempotent: applying the same schema twice produces no diff.
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()>;

    /// Delete the index. Returns `false` if no index existed.
    async fn delete_index(&self) -> Result<bool>;

    /// Upsert a batch of records, reporting per-record rejections.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<UpsertSummary>;

    /// Nearest-neighbor search over `contentVector`, optionally restricted
    /// to one user's records by an exact-match filter. Results arrive in the
    /// service's descending-score order.
    async fn vector_search(
        &self,
        vector: &[f32],
        top_k: usize,
        user_id: Option<&str>,
    ) -> Result<Vec<SearchHit>>;
}

/// Live client for the managed search service's REST API.
pub struct RestSearchIndex {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    index_name: String,
    api_version: String,
}

impl RestSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::remote("search", e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn index_url(&self) -> String {
        format!(
            "{}/indexes/{}?api-version={}",
            self.endpoint, self.index_name, self.api_version
        )
    }

    fn docs_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/index?api-version={}",
            self.endpoint, self.index_name, self.api_version
        )
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes('{}')/docs/search.post.search?api-version={}",
            self.endpoint, self.index_name, self.api_version
        )
    }

    async fn read_error(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("HTTP {}: {}", status, remote_error_message(&body))
    }
}

#[async_trait]
impl VectorIndex for RestSearchIndex {
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        // The body's name must match the URL; override whatever the schema
        // file declared.
        let mut payload = serde_json::to_value(schema)?;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "name".to_string(),
                Value::String(self.index_name.clone()),
            );
        }

        let response = self
            .http
            .put(self.index_url())
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::remote("search", e.to_string()))?;

        match response.status().as_u16() {
            200 | 201 => {
                info!(index = %self.index_name, "index created or updated");
                Ok(())
            }
            _ => Err(Error::remote("search", Self::read_error(response).await)),
        }
    }

    async fn delete_index(&self) -> Result<bool> {
        let response = self
            .http
            .delete(self.index_url())
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::remote("search", e.to_string()))?;

        match response.status().as_u16() {
            204 => {
                info!(index = %self.index_name, "index deleted");
                Ok(true)
            }
            404 => {
                warn!(index = %self.index_name, "index does not exist");
                Ok(false)
            }
            _ => Err(Error::remote("search", Self::read_error(response).await)),
        }
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<UpsertSummary> {
        let payload = upsert_payload(records)?;

        let response = self
            .http
            .post(self.docs_url())
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::remote("search", e.to_string()))?;

        // 200 = all records applied, 207 = at least one rejected; both carry
        // per-record statuses in the body.
        match response.status().as_u16() {
            200 | 207 => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| Error::remote("search", e.to_string()))?;
                let summary = parse_upsert_response(&body)?;
                debug!(
                    succeeded = summary.succeeded,
                    failed = summary.failed.len(),
                    "upsert batch applied"
                );
                Ok(summary)
            }
            _ => Err(Error::remote("search", Self::read_error(response).await)),
        }
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        top_k: usize,
        user_id: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let body = search_body(vector, top_k, user_id);

        let response = self
            .http
            .post(self.search_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::remote("search", e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::remote("search", Self::read_error(response).await));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::remote("search", e.to_string()))?;
        parse_search_response(&payload)
    }
}

/// CLI entry: load the schema file and apply it to the remote service.
pub async fn run_setup_index(config: &Config, schema_path: &Path) -> Result<()> {
    let schema = IndexSchema::from_file(schema_path)?;
    let index = RestSearchIndex::new(&config.search)?;
    index.ensure_index(&schema).await?;
    println!(
        "Index '{}' created or updated successfully.",
        index.index_name()
    );
    Ok(())
}

/// CLI entry: delete the remote index. A missing index is not an error.
pub async fn run_delete_index(config: &Config) -> Result<()> {
    let index = RestSearchIndex::new(&config.search)?;
    if index.delete_index().await? {
        println!("Index '{}' deleted successfully.", index.index_name());
    } else {
        println!("Index '{}' does not exist.", index.index_name());
    }
    Ok(())
}

/// Build the `{"value": [...]}` upsert payload, tagging each record with the
/// write action.
fn upsert_payload(records: &[IndexRecord]) -> Result<Value> {
    let mut actions = Vec::with_capacity(records.len());
    for record in records {
        let Value::Object(mut doc) = serde_json::to_value(record)? else {
            return Err(Error::Serialization(
                "index record did not serialize to an object".to_string(),
            ));
        };
        doc.insert(
            "@search.action".to_string(),
            Value::String(UPSERT_ACTION.to_string()),
        );
        actions.push(Value::Object(doc));
    }
    Ok(json!({ "value": actions }))
}

/// Collect per-record statuses from an upsert response.
fn parse_upsert_response(payload: &Value) -> Result<UpsertSummary> {
    let items = payload
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::remote("search", "malformed response: missing value array"))?;

    let mut summary = UpsertSummary::default();
    for item in items {
        let key = item
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or("(unknown)")
            .to_string();
        if item.get("status").and_then(Value::as_bool).unwrap_or(false) {
            summary.succeeded += 1;
        } else {
            let reason = item
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("rejected")
                .to_string();
            summary.failed.push((key, reason));
        }
    }
    Ok(summary)
}

/// Build the vector query body: wildcard search plus one vector query over
/// `contentVector`, with an optional exact-match owner filter.
fn search_body(vector: &[f32], top_k: usize, user_id: Option<&str>) -> Value {
    let mut body = json!({
        "search": "*",
        "vectorQueries": [
            {
                "kind": "vector",
                "vector": vector,
                "fields": "contentVector",
                "k": top_k,
                "exhaustive": false,
            }
        ],
        "select": "id, userId, folderId, documentId, type, content, metadata",
        "top": top_k,
    });
    if let Some(user) = user_id {
        body["filter"] = Value::String(user_filter(user));
    }
    body
}

/// Exact-match OData filter on the owning user. Single quotes are doubled,
/// the OData string-literal escape.
fn user_filter(user_id: &str) -> String {
    format!("userId eq '{}'", user_id.replace('\'', "''"))
}

/// Decode search results, preserving the service's ordering.
fn parse_search_response(payload: &Value) -> Result<Vec<SearchHit>> {
    let items = payload
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::remote("search", "malformed response: missing value array"))?;

    items
        .iter()
        .map(|item| {
            serde_json::from_value::<SearchHit>(item.clone()).map_err(|e| {
                Error::remote("search", format!("malformed search result: {}", e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, user_id: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            folder_id: Some("folderABC".to_string()),
            document_id: "doc789".to_string(),
            doc_type: "result".to_string(),
            content: "flattened text".to_string(),
            content_vector: vec![0.0; 4],
            metadata: String::new(),
        }
    }

    #[test]
    fn test_upsert_payload_tags_every_record() {
        let payload = upsert_payload(&[record("r1", "u1"), record("r2", "u1")]).unwrap();
        let value = payload["value"].as_array().unwrap();
        assert_eq!(value.len(), 2);
        for doc in value {
            assert_eq!(doc["@search.action"], "mergeOrUpload");
        }
        assert_eq!(value[0]["userId"], "u1");
        assert!(value[0]["contentVector"].is_array());
    }

    #[test]
    fn test_parse_upsert_response_partial_failure() {
        let payload = json!({
            "value": [
                { "key": "r1", "status": true, "statusCode": 200 },
                { "key": "r2", "status": false, "errorMessage": "key too long", "statusCode": 400 },
                { "key": "r3", "status": true, "statusCode": 201 }
            ]
        });
        let summary = parse_upsert_response(&payload).unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "r2");
        assert_eq!(summary.failed[0].1, "key too long");
    }

    #[test]
    fn test_parse_upsert_response_missing_value_fails() {
        assert!(parse_upsert_response(&json!({})).is_err());
    }

    #[test]
    fn test_search_body_with_filter() {
        let body = search_body(&[0.1, 0.2], 5, Some("userXYZ"));
        assert_eq!(body["filter"], "userId eq 'userXYZ'");
        assert_eq!(body["vectorQueries"][0]["fields"], "contentVector");
        assert_eq!(body["vectorQueries"][0]["k"], 5);
        assert_eq!(body["top"], 5);
    }

    #[test]
    fn test_search_body_without_filter() {
        let body = search_body(&[0.1], 3, None);
        assert!(body.get("filter").is_none());
    }

    #[test]
    fn test_user_filter_escapes_quotes() {
        assert_eq!(user_filter("o'brien"), "userId eq 'o''brien'");
    }

    #[test]
    fn test_parse_search_response_preserves_order() {
        let payload = json!({
            "value": [
                { "@search.score": 0.9, "id": "r1", "userId": "u1", "documentId": "d1",
                  "type": "result", "content": "first", "metadata": "" },
                { "@search.score": 0.4, "id": "r2", "userId": "u1", "documentId": "d2",
                  "type": "result", "content": "second", "metadata": null }
            ]
        });
        let hits = parse_search_response(&payload).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "r1");
        assert_eq!(hits[1].id, "r2");
        assert!(hits[0].score > hits[1].score);
    }
}
