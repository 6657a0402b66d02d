//! Document indexing pipeline: flatten → embed → upsert.
//!
//! Each submission in a batch file becomes one index record. Records are
//! written in batches; the service applies them individually, so rejections
//! are collected per record and the run fails loudly if any occurred,
//! naming the rejected ids alongside how many records did apply.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::embedding::{Embedder, RemoteEmbedder};
use crate::error::{Error, Result};
use crate::flatten::flatten_submission;
use crate::index::{RestSearchIndex, UpsertSummary, VectorIndex};
use crate::models::{IndexRecord, Submission};

/// Document type tag recorded on every submission upsert.
const SUBMISSION_TYPE: &str = "result";

/// Build one index record from a submission: flatten the fields, embed the
/// text, carry the identifiers over.
pub async fn build_record(embedder: &dyn Embedder, submission: &Submission) -> Result<IndexRecord> {
    let content = flatten_submission(&submission.raw)?;
    let content_vector = embedder.embed(&content).await?;

    Ok(IndexRecord {
        id: submission.id.clone(),
        user_id: submission.user_id.clone(),
        folder_id: submission.folder_id.clone(),
        document_id: submission.document_id.clone(),
        doc_type: SUBMISSION_TYPE.to_string(),
        content,
        content_vector,
        metadata: String::new(),
    })
}

/// Index a batch of documents, upserting in `batch_size` groups.
pub async fn index_documents(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    documents: Vec<Value>,
    batch_size: usize,
) -> Result<UpsertSummary> {
    let total = documents.len();
    let mut records = Vec::with_capacity(total);
    for document in documents {
        let submission = Submission::from_value(document)?;
        records.push(build_record(embedder, &submission).await?);
    }

    let mut summary = UpsertSummary::default();
    for batch in records.chunks(batch_size.max(1)) {
        let outcome = index.upsert(batch).await?;
        summary.succeeded += outcome.succeeded;
        summary.failed.extend(outcome.failed);
    }

    if !summary.failed.is_empty() {
        let ids = summary
            .failed
            .iter()
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::remote(
            "search",
            format!(
                "{} of {} records rejected ({}); {} applied",
                summary.failed.len(),
                total,
                ids,
                summary.succeeded
            ),
        ));
    }

    info!(records = summary.succeeded, "batch indexed");
    Ok(summary)
}

/// Parse a batch file: either one submission object or an array of them.
pub fn load_batch(raw: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![value]),
        _ => Err(Error::Serialization(
            "document batch must be a JSON object or an array of objects".to_string(),
        )),
    }
}

/// CLI entry: read the batch file and push everything through the pipeline.
pub async fn run_index(config: &Config, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let documents = load_batch(&raw)?;
    let count = documents.len();

    let embedder = RemoteEmbedder::new(&config.openai)?;
    let index = RestSearchIndex::new(&config.search)?;
    let summary = index_documents(&embedder, &index, documents, config.index_batch_size).await?;

    println!("index {}", file.display());
    println!("  documents: {}", count);
    println!("  upserted: {}", summary.succeeded);
    println!("ok");
    Ok(())
}
