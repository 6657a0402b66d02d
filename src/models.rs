//! Core data types flowing through the indexing and query pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A structured submission document parsed from a batch file.
///
/// Wraps the raw JSON so the flattener can see every field, with the
/// identifiers the index needs validated up front. `folder_id` is optional;
/// everything else is required.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub folder_id: Option<String>,
    pub document_id: String,
    pub raw: Value,
}

impl Submission {
    /// Validate and wrap a raw JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Serialization("submission must be a JSON object".to_string()))?;

        let required = |key: &str| -> Result<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::Serialization(format!("submission missing required field '{}'", key))
                })
        };

        let id = required("_id")?;
        let user_id = required("user_id")?;
        let document_id = required("document_id")?;
        let folder_id = obj
            .get("folder_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            id,
            user_id,
            folder_id,
            document_id,
            raw: value,
        })
    }
}

/// A record upserted into the remote search index.
///
/// `content_vector` is always exactly as wide as the configured embedding
/// dimensionality (1536) and is produced only by the embedding client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub id: String,
    pub user_id: String,
    pub folder_id: Option<String>,
    pub document_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content: String,
    pub content_vector: Vec<f32>,
    pub metadata: String,
}

/// A search result returned by the remote index, in service score order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub document_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(rename = "@search.score", default)]
    pub score: f64,
}

/// One turn of the rolling conversation, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub text: String,
}
