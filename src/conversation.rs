//! Rolling conversation state and prompt assembly.
//!
//! [`ConversationManager`] drives one query session: it retrieves context
//! for each question, assembles the prompt, calls the chat model, and keeps
//! the history of prior turns. History lives only in this process and is
//! never persisted across runs.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::chat::{ChatMessage, ChatModel, RemoteChatModel};
use crate::config::Config;
use crate::embedding::{Embedder, RemoteEmbedder};
use crate::error::Result;
use crate::index::{RestSearchIndex, VectorIndex};
use crate::models::{ConversationTurn, SearchHit};
use crate::retrieve::retrieve_context;

/// Standing instructions for every prompt.
const SYSTEM_INSTRUCTIONS: &str =
    "You are an AI assistant that helps answer questions based on provided documents. \
     Use the information from the documents and the recent conversation history to answer.";

/// Whether a chat call is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// A successful exchange: the answer plus the context that informed it.
#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub hits: Vec<SearchHit>,
}

/// One query session over the three remote collaborators.
pub struct ConversationManager {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    user_id: String,
    top_k: usize,
    history: Vec<ConversationTurn>,
    state: SessionState,
}

impl ConversationManager {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
        user_id: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            user_id: user_id.into(),
            top_k,
            history: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Prior turns, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Retrieve context for `question`, ask the chat model, and append the
    /// exchange to history.
    ///
    /// On failure the history is left untouched (no partial turn is
    /// recorded) and the session returns to idle.
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let hits = retrieve_context(
            self.embedder.as_ref(),
            self.index.as_ref(),
            question,
            &self.user_id,
            self.top_k,
        )
        .await?;
        let messages = build_messages(&hits, &self.history, question);
        debug!(
            context = hits.len(),
            history = self.history.len(),
            "prompt assembled"
        );

        self.state = SessionState::AwaitingResponse;
        let outcome = self.chat.complete(&messages).await;
        self.state = SessionState::Idle;
        let text = outcome?;

        self.history.push(ConversationTurn {
            role: "user".to_string(),
            text: question.to_string(),
        });
        self.history.push(ConversationTurn {
            role: "assistant".to_string(),
            text: text.clone(),
        });

        Ok(Answer { text, hits })
    }
}

/// Prompt shape: system instructions, retrieved documents, prior turns
/// oldest first, then the new question.
fn build_messages(
    hits: &[SearchHit],
    history: &[ConversationTurn],
    question: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::system(SYSTEM_INSTRUCTIONS));

    if !hits.is_empty() {
        let context = hits
            .iter()
            .map(|hit| hit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        messages.push(ChatMessage::system(format!("Documents:\n{}", context)));
    }

    for turn in history {
        messages.push(ChatMessage {
            role: turn.role.clone(),
            content: turn.text.clone(),
        });
    }

    messages.push(ChatMessage::user(question));
    messages
}

/// Wire the live clients into a session for the configured user.
fn build_manager(config: &Config, top_k: Option<usize>) -> Result<ConversationManager> {
    let embedder = Arc::new(RemoteEmbedder::new(&config.openai)?);
    let index = Arc::new(RestSearchIndex::new(&config.search)?);
    let chat = Arc::new(RemoteChatModel::new(&config.openai)?);
    Ok(ConversationManager::new(
        embedder,
        index,
        chat,
        config.user_id.clone(),
        top_k.unwrap_or(config.top_k),
    ))
}

/// CLI entry: answer a single question read from the query file.
pub async fn run_ask(config: &Config, query_file: &Path, top_k: Option<usize>) -> Result<()> {
    let question = std::fs::read_to_string(query_file)?.trim().to_string();
    println!("{}", question);

    let mut session = build_manager(config, top_k)?;
    let answer = session.ask(&question).await?;

    if answer.hits.is_empty() {
        println!("\nNo relevant documents found.");
    } else {
        println!("\nTop Relevant Documents:");
        for (i, hit) in answer.hits.iter().enumerate() {
            println!();
            println!("Document {}:", i + 1);
            println!("ID: {}", hit.id);
            println!("Type: {}", hit.doc_type);
            println!("Content: {}", hit.content);
            println!("Metadata: {}", hit.metadata.as_deref().unwrap_or(""));
        }
    }

    println!("\nAnswer:\n{}", answer.text);
    Ok(())
}

/// CLI entry: interactive session with rolling history.
///
/// Reads questions from stdin until a blank line, `exit`, or end of input.
/// A failed turn propagates and terminates the session; there is no retry.
pub async fn run_chat(config: &Config, top_k: Option<usize>) -> Result<()> {
    let mut session = build_manager(config, top_k)?;
    println!(
        "Interactive session for user '{}'. Blank line or \"exit\" to quit.",
        config.user_id
    );

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() || question == "exit" {
            break;
        }

        let answer = session.ask(question).await?;
        println!("\n{}\n", answer.text);
    }

    Ok(())
}
