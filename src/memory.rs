//! In-memory collaborators for tests and offline runs.
//!
//! Each remote capability has a stand-in here that honors the same contract
//! without a network: [`InMemoryIndex`] does brute-force cosine similarity
//! with the same exact-match owner filter the service applies,
//! [`HashEmbedder`] produces deterministic bag-of-words vectors, and
//! [`ScriptedChatModel`] replays canned replies while recording every
//! request it receives.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chat::{ChatMessage, ChatModel};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{UpsertSummary, VectorIndex};
use crate::models::{IndexRecord, SearchHit};
use crate::schema::IndexSchema;

/// In-memory vector index keyed by record id.
pub struct InMemoryIndex {
    records: Mutex<HashMap<String, IndexRecord>>,
    schema: Mutex<Option<IndexSchema>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            schema: Mutex::new(None),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The schema most recently applied via `ensure_index`, if any.
    pub fn schema(&self) -> Option<IndexSchema> {
        self.schema.lock().unwrap().clone()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        *self.schema.lock().unwrap() = Some(schema.clone());
        Ok(())
    }

    async fn delete_index(&self) -> Result<bool> {
        let existed = self.schema.lock().unwrap().take().is_some();
        self.records.lock().unwrap().clear();
        Ok(existed)
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<UpsertSummary> {
        let mut stored = self.records.lock().unwrap();
        let mut summary = UpsertSummary::default();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
            summary.succeeded += 1;
        }
        Ok(summary)
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        top_k: usize,
        user_id: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let records = self.records.lock().unwrap();
        let mut hits: Vec<SearchHit> = records
            .values()
            .filter(|record| user_id.map_or(true, |user| record.user_id == user))
            .map(|record| SearchHit {
                id: record.id.clone(),
                user_id: record.user_id.clone(),
                folder_id: record.folder_id.clone(),
                document_id: record.document_id.clone(),
                doc_type: record.doc_type.clone(),
                content: record.content.clone(),
                metadata: Some(record.metadata.clone()),
                score: cosine_sim(vector, &record.content_vector) as f64,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// Deterministic embedder that hashes whitespace tokens into buckets.
///
/// Texts sharing words produce similar vectors, which is enough to exercise
/// retrieval ordering without a remote model.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dims];
        for token in text.split_whitespace() {
            let bucket = fnv1a(&token.to_lowercase()) % self.dims as u64;
            vector[bucket as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// FNV-1a: stable across runs, unlike the stdlib's default hasher.
fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Chat double that replays queued replies and records every request.
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn enqueue_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    /// Queue a failure for the next call.
    pub fn enqueue_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// Every message sequence this double has been called with.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for ScriptedChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::remote("chat", message)),
            None => Err(Error::remote("chat", "no scripted reply queued")),
        }
    }
}
