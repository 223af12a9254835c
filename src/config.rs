//! Configuration handling for the lazydb MCP bridge.
//!
//! The bridge deliberately has a tiny CLI surface: the connection override and
//! a verbosity switch. Everything else (the connection set, the active
//! selector) lives in the on-disk descriptor store written by the companion
//! terminal UI.

use clap::Parser;
use std::path::PathBuf;

/// Server name advertised in the `initialize` response.
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Server version advertised in the `initialize` response.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default connection deadline in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Configuration for the lazydb MCP bridge.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "lazydb-mcp",
    about = "MCP bridge for PostgreSQL - gives AI assistants read-only schema and query context",
    version,
    author
)]
pub struct Config {
    /// Pin the active connection by name, overriding the store's selector
    /// for the lifetime of this process.
    #[arg(short, long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Enable diagnostic logging on standard error.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// The connection override, if one was given and non-empty.
    pub fn connection_override(&self) -> Option<&str> {
        self.connection.as_deref().filter(|s| !s.is_empty())
    }
}

/// AI provider API keys, read once at startup and surfaced to the
/// configuration layer. The protocol and tool paths never consult the
/// environment themselves.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub google: Option<String>,
}

impl ApiKeys {
    /// Snapshot the provider keys from the environment.
    pub fn from_env() -> Self {
        Self {
            anthropic: std::env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty()),
            openai: std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()),
            google: std::env::var("GOOGLE_API_KEY").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Names of the providers with a key present.
    pub fn configured(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if self.anthropic.is_some() {
            providers.push("anthropic");
        }
        if self.openai.is_some() {
            providers.push("openai");
        }
        if self.google.is_some() {
            providers.push("google");
        }
        providers
    }
}

/// Platform-conventional path of the connection descriptor store.
///
/// The store is written by the sibling terminal UI; the bridge only reads it.
pub fn default_store_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lazydb").join("connections.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.connection.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_connection_override_filters_empty() {
        let config = Config {
            connection: Some(String::new()),
            verbose: false,
        };
        assert_eq!(config.connection_override(), None);

        let config = Config {
            connection: Some("staging".to_string()),
            verbose: false,
        };
        assert_eq!(config.connection_override(), Some("staging"));
    }

    #[test]
    fn test_store_path_under_config_dir() {
        if let Some(path) = default_store_path() {
            assert!(path.ends_with("lazydb/connections.json"));
        }
    }
}
