//! Configuration loaded from environment variables.
//!
//! The entire configuration surface is read once into an explicit [`Config`]
//! value that is passed through constructors and functions; no ambient
//! global state. An optional env file (`--env-file`, default
//! `./config/local.env`) is loaded into the process environment by the CLI
//! before [`Config::from_env`] runs.

use crate::error::{Error, Result};

/// Default remote index name.
pub const DEFAULT_INDEX_NAME: &str = "knowledge-index";

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchConfig,
    pub openai: OpenAiConfig,
    /// User whose records retrieval is scoped to.
    pub user_id: String,
    /// Number of documents to retrieve per query.
    pub top_k: usize,
    /// Maximum records per upsert call.
    pub index_batch_size: usize,
}

/// Connection settings for the managed vector-search service.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub api_version: String,
}

/// Connection settings for the embedding and chat endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub embedding_model: String,
    pub embedding_dims: usize,
    pub chat_model: String,
}

impl Config {
    /// Read and validate configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read and validate configuration from an arbitrary lookup.
    ///
    /// Factored out so tests can supply variables without touching the
    /// process-global environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            get(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} must be set", name)))
        };
        let or_default = |name: &str, default: &str| -> String {
            get(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let search = SearchConfig {
            endpoint: normalize_endpoint(&required("SEARCH_ENDPOINT")?),
            api_key: required("SEARCH_API_KEY")?,
            index_name: or_default("SEARCH_INDEX", DEFAULT_INDEX_NAME),
            api_version: or_default("SEARCH_API_VERSION", "2024-07-01"),
        };

        let embedding_dims = parse_usize(&or_default("EMBEDDING_DIMS", "1536"), "EMBEDDING_DIMS")?;
        if embedding_dims == 0 {
            return Err(Error::Config("EMBEDDING_DIMS must be > 0".to_string()));
        }

        let openai = OpenAiConfig {
            endpoint: normalize_endpoint(&required("OPENAI_ENDPOINT")?),
            api_key: required("OPENAI_API_KEY")?,
            embedding_model: or_default("EMBEDDING_MODEL", "text-embedding-ada-002"),
            embedding_dims,
            chat_model: or_default("CHAT_MODEL", "gpt-4"),
        };

        let top_k = parse_usize(&or_default("TOP_K", "5"), "TOP_K")?;
        if top_k == 0 {
            return Err(Error::Config("TOP_K must be >= 1".to_string()));
        }

        let index_batch_size =
            parse_usize(&or_default("INDEX_BATCH_SIZE", "100"), "INDEX_BATCH_SIZE")?;
        if index_batch_size == 0 {
            return Err(Error::Config("INDEX_BATCH_SIZE must be >= 1".to_string()));
        }

        Ok(Config {
            search,
            openai,
            user_id: required("CURRENT_USER_ID")?,
            top_k,
            index_batch_size,
        })
    }
}

/// Strip a trailing slash so URL joins stay predictable.
fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

fn parse_usize(value: &str, name: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::Config(format!("{} must be an integer, got '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_env() -> HashMap<String, String> {
        [
            ("SEARCH_ENDPOINT", "https://search.example.net/"),
            ("SEARCH_API_KEY", "search-key"),
            ("OPENAI_ENDPOINT", "https://models.example.net"),
            ("OPENAI_API_KEY", "model-key"),
            ("CURRENT_USER_ID", "userXYZ"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn load(env: &HashMap<String, String>) -> Result<Config> {
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&test_env()).unwrap();
        assert_eq!(config.search.index_name, "knowledge-index");
        assert_eq!(config.search.api_version, "2024-07-01");
        assert_eq!(config.openai.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.openai.embedding_dims, 1536);
        assert_eq!(config.openai.chat_model, "gpt-4");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.index_batch_size, 100);
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = load(&test_env()).unwrap();
        assert_eq!(config.search.endpoint, "https://search.example.net");
    }

    #[test]
    fn test_missing_required_var_fails() {
        let mut env = test_env();
        env.remove("SEARCH_API_KEY");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("SEARCH_API_KEY"));
    }

    #[test]
    fn test_blank_required_var_fails() {
        let mut env = test_env();
        env.insert("CURRENT_USER_ID".to_string(), "  ".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_zero_dims_rejected() {
        let mut env = test_env();
        env.insert("EMBEDDING_DIMS".to_string(), "0".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_non_numeric_top_k_rejected() {
        let mut env = test_env();
        env.insert("TOP_K".to_string(), "many".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut env = test_env();
        env.insert("SEARCH_INDEX".to_string(), "scratch-index".to_string());
        env.insert("TOP_K".to_string(), "9".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.search.index_name, "scratch-index");
        assert_eq!(config.top_k, 9);
    }
}
