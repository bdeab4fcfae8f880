//! Configuration management for the articles API and its tools.
//!
//! Every subcommand is configured from command-line arguments, with an
//! environment variable behind each option:
//!
//! - `serve`: `ARTICLES_*`, plus `ORIGIN_ALLOWED` for CORS
//! - `import`, `link`: `CLI_*`, or a YAML file given with `--config-file`
//! - `proxy`: `PROXY_*` for the listener, the client options for the upstream
//!
//! # Example
//!
//! ```ignore
//! use articles_api::config::{Cli, Command};
//! use clap::Parser;
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     _ => {}
//! }
//! ```
//!
//! # Client configuration file
//!
//! ```yaml
//! api-url: https://api.example.com
//! auth:
//!   auth-url: https://example.auth0.com/oauth/token
//!   grant_type: client_credentials
//!   client_id: abc
//!   client_secret: xyz
//!   audience: https://api.example.com
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::client::ClientCredentials;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default API server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default proxy port.
pub const DEFAULT_PROXY_PORT: u16 = 8081;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default database name, the prefix of every table.
pub const DEFAULT_DATABASE_NAME: &str = "articles";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default OAuth grant type for client tools.
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default graceful shutdown bound in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 15;

/// Default signing key cache TTL in seconds.
pub const DEFAULT_KEY_TTL_SECS: u64 = 600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Articles API - a small content backend for articles, links and images.
#[derive(Parser, Debug, Clone)]
#[command(name = "articles-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeConfig),

    /// Import markdown articles (a file or a folder) into the API
    Import(ImportConfig),

    /// Add a link
    Link(LinkConfig),

    /// Serve a static site and forward GET /api/* with a bearer token
    Proxy(ProxyConfig),
}

// =============================================================================
// Serve
// =============================================================================

/// Where documents are stored.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentBackend {
    /// In-process, lost on exit
    Memory,
    /// DynamoDB tables `<database-name>-articles` and `<database-name>-links`
    Dynamodb,
}

/// Where article images are stored.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackend {
    /// In-process, lost on exit
    Memory,
    /// An S3 or S3-compatible bucket
    S3,
}

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "ARTICLES_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ARTICLES_PORT")]
    pub port: u16,

    /// Log level (debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "ARTICLES_LOG_LEVEL")]
    pub log_level: String,

    /// Requests running longer than this many seconds are aborted.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "ARTICLES_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS, env = "ARTICLES_SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: u64,

    // =========================================================================
    // Document Storage
    // =========================================================================
    /// Document store backend.
    #[arg(long, value_enum, default_value_t = DocumentBackend::Dynamodb, env = "ARTICLES_STORAGE")]
    pub storage: DocumentBackend,

    /// Database name; tables are named `<database-name>-<collection>`.
    #[arg(long, default_value = DEFAULT_DATABASE_NAME, env = "ARTICLES_DATABASE_NAME")]
    pub database_name: String,

    /// Custom DynamoDB endpoint (DynamoDB Local, etc.).
    #[arg(long, env = "ARTICLES_DYNAMODB_ENDPOINT")]
    pub dynamodb_endpoint: Option<String>,

    /// AWS region for DynamoDB and S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "ARTICLES_REGION")]
    pub region: String,

    // =========================================================================
    // Image Storage
    // =========================================================================
    /// Image store backend.
    #[arg(long, value_enum, default_value_t = ImageBackend::S3, env = "ARTICLES_IMAGE_STORAGE")]
    pub image_storage: ImageBackend,

    /// S3 bucket holding article images.
    #[arg(long, env = "ARTICLES_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "ARTICLES_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Identity provider domain; tokens must be issued by `https://<domain>/`.
    #[arg(long, env = "ARTICLES_AUTH_DOMAIN")]
    pub auth_domain: Option<String>,

    /// Expected token audience.
    #[arg(long, env = "ARTICLES_AUTH_AUDIENCE")]
    pub auth_audience: Option<String>,

    /// Key set URL, if not `https://<domain>/.well-known/jwks.json`.
    #[arg(long, env = "ARTICLES_JWKS_URL")]
    pub jwks_url: Option<String>,

    /// Seconds a fetched signing key is trusted.
    #[arg(long, default_value_t = DEFAULT_KEY_TTL_SECS, env = "ARTICLES_KEY_TTL")]
    pub key_ttl: u64,

    /// Require bearer tokens on write routes.
    ///
    /// WARNING: Only disable authentication in development/testing.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "ARTICLES_AUTH_ENABLED")]
    pub auth_enabled: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated). If not specified, allows any origin.
    #[arg(long, env = "ORIGIN_ALLOWED", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_enabled {
            if is_blank(&self.auth_domain) {
                return Err(
                    "Authentication is enabled but no domain provided. \
                     Set --auth-domain or ARTICLES_AUTH_DOMAIN, or disable auth with --auth-enabled=false"
                        .to_string(),
                );
            }
            if is_blank(&self.auth_audience) {
                return Err(
                    "Authentication is enabled but no audience provided. \
                     Set --auth-audience or ARTICLES_AUTH_AUDIENCE"
                        .to_string(),
                );
            }
        }

        if self.storage == DocumentBackend::Dynamodb && self.database_name.trim().is_empty() {
            return Err(
                "Database name is required. Set --database-name or ARTICLES_DATABASE_NAME"
                    .to_string(),
            );
        }

        if self.image_storage == ImageBackend::S3 && is_blank(&self.s3_bucket) {
            return Err(
                "S3 bucket name is required. Set --s3-bucket or ARTICLES_S3_BUCKET".to_string(),
            );
        }

        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }
        if self.shutdown_timeout == 0 {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.key_ttl)
    }

    /// Effective log level, `debug` when verbose.
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Client Commands
// =============================================================================

/// Connection settings shared by the client commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    /// YAML file with `api-url` and an `auth` block. Flags override it.
    #[arg(long, env = "CLI_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Base URL of the articles API.
    #[arg(long, env = "CLI_API_URL")]
    pub api_url: Option<String>,

    /// Token endpoint of the identity provider.
    #[arg(long, env = "CLI_AUTH_URL")]
    pub auth_url: Option<String>,

    /// OAuth grant type.
    #[arg(long, env = "CLI_GRANT_TYPE")]
    pub grant_type: Option<String>,

    #[arg(long, env = "CLI_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "CLI_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Audience requested for the access token.
    #[arg(long, env = "CLI_AUDIENCE")]
    pub audience: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub credentials: ClientCredentials,
}

/// Shape of the client configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFileConfig {
    #[serde(rename = "api-url", default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub auth: AuthFileConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthFileConfig {
    #[serde(rename = "auth-url", default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

impl ClientFileConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config file {}: {}", path.display(), e))?;
        Self::parse(&text).map_err(|e| format!("Invalid config file {}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

impl ClientArgs {
    /// Merge flags, environment and the optional config file.
    pub fn resolve(&self) -> Result<ClientConfig, String> {
        let file = match &self.config_file {
            Some(path) => ClientFileConfig::load(path)?,
            None => ClientFileConfig::default(),
        };
        self.merge(file)
    }

    fn merge(&self, file: ClientFileConfig) -> Result<ClientConfig, String> {
        fn pick(flag: &Option<String>, file: Option<String>, name: &str) -> Result<String, String> {
            flag.clone()
                .or(file)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{} is required (flag, CLI_* variable or config file)", name))
        }

        let auth = file.auth;
        Ok(ClientConfig {
            api_url: pick(&self.api_url, file.api_url, "api-url")?,
            credentials: ClientCredentials {
                auth_url: pick(&self.auth_url, auth.auth_url, "auth-url")?,
                grant_type: self
                    .grant_type
                    .clone()
                    .or(auth.grant_type)
                    .unwrap_or_else(|| DEFAULT_GRANT_TYPE.to_string()),
                client_id: pick(&self.client_id, auth.client_id, "client_id")?,
                client_secret: pick(&self.client_secret, auth.client_secret, "client_secret")?,
                audience: pick(&self.audience, auth.audience, "audience")?,
            },
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportConfig {
    /// Markdown file, or a folder searched recursively for `*.md` files.
    pub path: PathBuf,

    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LinkConfig {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub banner: Option<String>,

    /// Comma-separated categories.
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Comma-separated tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[command(flatten)]
    pub client: ClientArgs,
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("--title must not be empty".to_string());
        }
        if self.url.trim().is_empty() {
            return Err("--url must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Proxy
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ProxyConfig {
    /// Host address to bind the proxy to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PROXY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PROXY_PORT, env = "PROXY_PORT")]
    pub port: u16,

    /// Directory with the static site.
    #[arg(long, default_value = "./public", env = "PROXY_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Log level (debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "PROXY_LOG_LEVEL")]
    pub log_level: String,

    /// Requests running longer than this many seconds are aborted.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "PROXY_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS, env = "PROXY_SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: u64,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,

    #[command(flatten)]
    pub client: ClientArgs,
}

impl ProxyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.static_dir.is_dir() {
            return Err(format!(
                "Static directory {} does not exist. Set --static-dir or PROXY_STATIC_DIR",
                self.static_dir.display()
            ));
        }
        if self.request_timeout == 0 || self.shutdown_timeout == 0 {
            return Err("timeouts must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    pub fn effective_log_level(&self) -> &str {
        if self.client.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Filter directive for the crate and `tower_http` at `level`.
///
/// Unknown levels fall back to `info`.
pub fn log_filter(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    format!("articles_api={},tower_http={}", level, level)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

// =============================================================================
// Tests
// =============================================================================
