use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Component, Path, PathBuf};

use crate::utils::MAX_TIMEOUT_SECS;

/// URL path the static directory is mounted at
pub const STATIC_WEB_ROOT: &str = "/static";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub database: DatabaseConfig,
    pub mcp: McpConfig,
    pub web_surfer: WebSurferConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
    pub favicon_path: PathBuf,
    /// Deadline applied to a request when the caller does not supply one
    pub request_timeout_secs: u64,
}

/// One OpenAI-compatible chat-completion endpoint
#[derive(Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// Endpoint used by the chat proxy and every agent
    pub primary: EndpointConfig,
    /// Endpoint used to pick the best web-surfer message
    pub selector: EndpointConfig,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpConfig {
    pub filesystem_command: String,
    pub filesystem_data_dir: String,
    pub flight_info_command: String,
    pub browser_command: String,
    pub max_turns: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSurferConfig {
    pub max_messages: usize,
    pub termination_keyword: String,
    pub screenshots_dir: PathBuf,
    pub screenshots_web_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                var("DB_USER", "postgres"),
                var("DB_PASSWORD", ""),
                var("DB_HOST", "localhost"),
                var("DB_PORT", "5432"),
                var("DB_NAME", "postgres"),
            ),
        };

        Ok(Self {
            server: ServerConfig {
                port: var("PORT", "3000").parse().context("PORT must be a port number")?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                static_dir: PathBuf::from(var("STATIC_DIR", "static")),
                favicon_path: PathBuf::from(var("FAVICON_PATH", "favicon.ico")),
                request_timeout_secs: var("REQUEST_TIMEOUT_SECS", "300")
                    .parse()
                    .context("REQUEST_TIMEOUT_SECS must be an integer")?,
            },
            llm: LLMConfig {
                primary: EndpointConfig {
                    base_url: var("BASE_URL", "https://api.openai.com/v1"),
                    api_key: var("API_KEY", ""),
                    model: var("LLM_MODEL", ""),
                },
                selector: EndpointConfig {
                    base_url: var("SELECTOR_BASE_URL", "http://localhost:11434/v1"),
                    api_key: var("SELECTOR_API_KEY", "ollama"),
                    model: var("SELECTOR_MODEL", "llama3.1"),
                },
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: var("DB_MAX_CONNECTIONS", "5")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be an integer")?,
            },
            mcp: McpConfig {
                filesystem_command: var(
                    "MCP_FILESYSTEM_COMMAND",
                    "npx -y @modelcontextprotocol/server-filesystem@2025.8.18",
                ),
                filesystem_data_dir: var("MCP_FILESYSTEM_DATA_DIR", "data"),
                flight_info_command: var("MCP_FLIGHT_INFO_COMMAND", "npx acme-air-demo"),
                browser_command: var("MCP_BROWSER_COMMAND", "npx -y @playwright/mcp@latest --headless"),
                max_turns: var("MCP_MAX_TURNS", "10")
                    .parse()
                    .context("MCP_MAX_TURNS must be an integer")?,
            },
            web_surfer: WebSurferConfig {
                max_messages: var("WEB_SURFER_MAX_MESSAGES", "6")
                    .parse()
                    .context("WEB_SURFER_MAX_MESSAGES must be an integer")?,
                termination_keyword: var("WEB_SURFER_TERMINATION_KEYWORD", "TERMINATE"),
                screenshots_dir: PathBuf::from(var("SCREENSHOTS_DIR", "static/screenshots")),
                screenshots_web_prefix: var("SCREENSHOTS_WEB_PREFIX", "/static/screenshots"),
            },
        })
    }

    /// Check required settings once at startup
    pub fn validate(&self) -> Result<()> {
        for (role, endpoint) in [("primary", &self.llm.primary), ("selector", &self.llm.selector)] {
            if endpoint.base_url.trim().is_empty() {
                bail!("{role} LLM endpoint needs a base URL");
            }
            if endpoint.model.trim().is_empty() {
                bail!("{role} LLM endpoint needs a model (set LLM_MODEL / SELECTOR_MODEL)");
            }
        }
        if self.llm.primary.api_key.is_empty() {
            bail!("API_KEY must be set");
        }
        if self.mcp.max_turns == 0 {
            bail!("MCP_MAX_TURNS must be at least 1");
        }
        if self.web_surfer.max_messages < 2 {
            bail!("WEB_SURFER_MAX_MESSAGES must allow at least one agent reply");
        }
        if self.web_surfer.termination_keyword.is_empty() {
            bail!("WEB_SURFER_TERMINATION_KEYWORD must not be empty");
        }
        if self.server.request_timeout_secs == 0 || self.server.request_timeout_secs > MAX_TIMEOUT_SECS {
            bail!("REQUEST_TIMEOUT_SECS must be between 1 and {}", MAX_TIMEOUT_SECS);
        }

        let Some(expected) = web_prefix_for(&self.server.static_dir, &self.web_surfer.screenshots_dir) else {
            bail!(
                "SCREENSHOTS_DIR ({}) must be inside STATIC_DIR ({}) so screenshots can be served",
                self.web_surfer.screenshots_dir.display(),
                self.server.static_dir.display()
            );
        };
        if self.web_surfer.screenshots_web_prefix.trim_end_matches('/') != expected {
            bail!(
                "SCREENSHOTS_WEB_PREFIX is {} but SCREENSHOTS_DIR is served at {}",
                self.web_surfer.screenshots_web_prefix,
                expected
            );
        }
        Ok(())
    }
}

/// URL prefix under which `dir` is served, if it lies inside `static_dir`
fn web_prefix_for(static_dir: &Path, dir: &Path) -> Option<String> {
    let normalize = |path: &Path| -> PathBuf {
        path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
    };
    let relative = normalize(dir).strip_prefix(normalize(static_dir)).ok()?.to_path_buf();

    let mut prefix = STATIC_WEB_ROOT.to_string();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                prefix.push('/');
                prefix.push_str(part.to_str()?);
            }
            _ => return None,
        }
    }
    Some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("API_KEY", "k"), ("LLM_MODEL", "gpt-4o")]);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.cors_allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.web_surfer.max_messages, 6);
        assert_eq!(config.web_surfer.termination_keyword, "TERMINATE");
        assert_eq!(config.web_surfer.screenshots_dir, PathBuf::from("static/screenshots"));
        assert_eq!(config.web_surfer.screenshots_web_prefix, "/static/screenshots");
        assert_eq!(config.database.url, "postgresql://postgres:@localhost:5432/postgres");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoints_are_independent() {
        let config = config_from(&[
            ("API_KEY", "k"),
            ("LLM_MODEL", "gpt-4o"),
            ("BASE_URL", "https://remote.example/v1"),
            ("SELECTOR_BASE_URL", "http://127.0.0.1:8080/v1"),
            ("SELECTOR_MODEL", "qwen2.5"),
        ]);
        assert_eq!(config.llm.primary.base_url, "https://remote.example/v1");
        assert_eq!(config.llm.selector.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.llm.selector.model, "qwen2.5");
    }

    #[test]
    fn test_database_url_from_parts() {
        let config = config_from(&[("DB_PASSWORD", "secret"), ("DB_HOST", "db")]);
        assert_eq!(config.database.url, "postgresql://postgres:secret@db:5432/postgres");
    }

    #[test]
    fn test_validate_requires_primary_model() {
        let config = config_from(&[("API_KEY", "k")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout_is_bounded() {
        let huge = u64::MAX.to_string();
        for value in ["0", "3601", huge.as_str()] {
            let config = config_from(&[("API_KEY", "k"), ("LLM_MODEL", "m"), ("REQUEST_TIMEOUT_SECS", value)]);
            assert!(config.validate().is_err(), "accepted {}", value);
        }
        let config = config_from(&[("API_KEY", "k"), ("LLM_MODEL", "m"), ("REQUEST_TIMEOUT_SECS", "3600")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_screenshots_must_be_served_from_static_dir() {
        let outside = config_from(&[("API_KEY", "k"), ("LLM_MODEL", "m"), ("STATIC_DIR", "public")]);
        assert!(outside.validate().is_err());

        let wrong_prefix = config_from(&[
            ("API_KEY", "k"),
            ("LLM_MODEL", "m"),
            ("SCREENSHOTS_WEB_PREFIX", "/shots"),
        ]);
        assert!(wrong_prefix.validate().is_err());

        let moved = config_from(&[
            ("API_KEY", "k"),
            ("LLM_MODEL", "m"),
            ("STATIC_DIR", "./public"),
            ("SCREENSHOTS_DIR", "public/img/shots"),
            ("SCREENSHOTS_WEB_PREFIX", "/static/img/shots/"),
        ]);
        assert!(moved.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = Config::from_lookup(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&[("API_KEY", "sk-very-secret"), ("LLM_MODEL", "m")]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
    }
}
