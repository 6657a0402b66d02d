//! # Knowledge Index CLI (`kix`)
//!
//! The `kix` binary drives the whole pipeline: index setup, document
//! indexing, and retrieval-augmented question answering.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kix setup-index` | Create or update the remote search index from the schema file |
//! | `kix delete-index` | Delete the remote search index |
//! | `kix index <file>` | Flatten, embed, and upsert a document batch file |
//! | `kix ask` | Answer a single question from the query file |
//! | `kix chat` | Interactive session with rolling history |
//! | `kix flatten <file>` | Print flattened text without calling any remote service |
//!
//! ## Configuration
//!
//! All settings come from environment variables (`SEARCH_ENDPOINT`,
//! `SEARCH_API_KEY`, `SEARCH_INDEX`, `OPENAI_ENDPOINT`, `OPENAI_API_KEY`,
//! `EMBEDDING_MODEL`, `CHAT_MODEL`, `CURRENT_USER_ID`, ...). An env file is
//! loaded first when present; see `config/local.env.example`.
//!
//! ```bash
//! kix setup-index
//! kix index ./config/sample_submission.json
//! kix ask --query-file ./config/query.txt
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use knowledge_index::config::Config;
use knowledge_index::flatten::flatten_submission;
use knowledge_index::{conversation, index, indexer};

/// Knowledge Index: index documents into a managed vector search service
/// and answer questions with retrieval-augmented chat.
#[derive(Parser)]
#[command(
    name = "kix",
    about = "Index documents into a managed vector search service and answer questions with retrieval-augmented chat",
    version
)]
struct Cli {
    /// Env file loaded into the environment before reading configuration.
    ///
    /// Missing file is not an error; configuration then comes from the
    /// process environment alone.
    #[arg(long, global = true, default_value = "./config/local.env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create or update the remote search index from the schema file.
    ///
    /// Idempotent: applying the same schema twice produces no diff.
    SetupIndex {
        /// Path to the declarative index schema (JSON).
        #[arg(long, default_value = "./config/index_schema.json")]
        schema: PathBuf,
    },

    /// Delete the remote search index.
    ///
    /// A missing index is reported, not treated as an error.
    DeleteIndex,

    /// Flatten, embed, and upsert a document batch file.
    ///
    /// The file holds one submission object or an array of them. Any record
    /// the service rejects fails the run, with the applied count reported.
    Index {
        /// Path to the document batch file (JSON).
        file: PathBuf,
    },

    /// Answer a single question from the query file.
    ///
    /// Retrieves the current user's closest documents, forwards them with
    /// the question to the chat model, and prints the answer.
    Ask {
        /// Path to the query text file.
        #[arg(long, default_value = "./config/query.txt")]
        query_file: PathBuf,

        /// Number of documents to retrieve (defaults to TOP_K).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Interactive session with rolling in-process history.
    ///
    /// Reads questions from stdin; a blank line or "exit" quits. History is
    /// kept only for the lifetime of the session.
    Chat {
        /// Number of documents to retrieve per turn (defaults to TOP_K).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print the flattened text for a batch file.
    ///
    /// Needs no configuration and calls no remote service; useful for
    /// checking what would be embedded.
    Flatten {
        /// Path to the document batch file (JSON).
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.env_file.exists() {
        dotenvy::from_path(&cli.env_file)
            .with_context(|| format!("failed to load env file {}", cli.env_file.display()))?;
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "knowledge_index=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Flatten needs no remote configuration.
    if let Commands::Flatten { file } = &cli.command {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        for document in indexer::load_batch(&raw)? {
            println!("{}", flatten_submission(&document)?);
            println!("----");
        }
        return Ok(());
    }

    let config = Config::from_env()?;

    match cli.command {
        Commands::SetupIndex { schema } => {
            index::run_setup_index(&config, &schema).await?;
        }
        Commands::DeleteIndex => {
            index::run_delete_index(&config).await?;
        }
        Commands::Index { file } => {
            indexer::run_index(&config, &file).await?;
        }
        Commands::Ask { query_file, top_k } => {
            conversation::run_ask(&config, &query_file, top_k).await?;
        }
        Commands::Chat { top_k } => {
            conversation::run_chat(&config, top_k).await?;
        }
        Commands::Flatten { .. } => {
            // Handled above, before config loading.
            unreachable!()
        }
    }

    Ok(())
}
