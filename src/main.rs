//! Articles API - HTTP server, markdown importer and static-site proxy.
//!
//! This binary dispatches to the subcommand and configures all components.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use articles_api::{
    client::{AccessTokenService, ApiClient, ArticleImporter},
    config::{
        log_filter, ClientArgs, ClientConfig, Cli, Command, DocumentBackend, ImageBackend,
        ImportConfig, LinkConfig, ProxyConfig, ServeConfig,
    },
    model::{Article, Link},
    objects::{create_s3_client, MemoryObjectStore, ObjectStore, S3ObjectStore},
    proxy::{create_proxy_router, ProxyState},
    server::{self, create_router, AppState, HttpKeySetFetcher, JwtAuth, RouterConfig},
    store::{create_dynamodb_client, DocumentStore, DynamoStore, MemoryStore, Repository},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Import(config) => run_import(config).await,
        Command::Link(config) => run_link(config).await,
        Command::Proxy(config) => run_proxy(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.effective_log_level());

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Articles API v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    match config.storage {
        DocumentBackend::Memory => warn!("  Documents: in memory, lost on exit"),
        DocumentBackend::Dynamodb => {
            info!("  Documents: DynamoDB, tables {}-*", config.database_name);
            if let Some(ref endpoint) = config.dynamodb_endpoint {
                info!("  DynamoDB endpoint: {}", endpoint);
            }
        }
    }
    match (config.image_storage, config.s3_bucket.as_deref()) {
        (ImageBackend::S3, Some(bucket)) => info!("  Images: S3 bucket {}", bucket),
        _ => warn!("  Images: in memory, lost on exit"),
    }
    info!("  Region: {}", config.region);

    let documents = build_document_store(&config).await;
    let images = build_object_store(&config).await;

    info!("Checking storage connectivity...");
    if let Err(e) = check_backends(&documents, &images).await {
        error!("  {}", e);
        error!("  Please check your AWS credentials, endpoints and table/bucket names");
        return ExitCode::FAILURE;
    }
    info!("  Storage reachable");

    let router_config = build_router_config(&config);
    let router = create_router(AppState::new(documents, images), router_config);

    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Server listening on: http://{}", addr);

    if let Err(e) = server::serve(listener, router, config.shutdown_timeout()).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

async fn build_document_store(config: &ServeConfig) -> Arc<dyn DocumentStore> {
    match config.storage {
        DocumentBackend::Memory => Arc::new(MemoryStore::new()),
        DocumentBackend::Dynamodb => {
            let client =
                create_dynamodb_client(config.dynamodb_endpoint.as_deref(), &config.region).await;
            Arc::new(DynamoStore::new(client, config.database_name.clone()))
        }
    }
}

async fn build_object_store(config: &ServeConfig) -> Arc<dyn ObjectStore> {
    match (config.image_storage, config.s3_bucket.as_deref()) {
        (ImageBackend::S3, Some(bucket)) => {
            let client = create_s3_client(config.s3_endpoint.as_deref(), &config.region).await;
            Arc::new(S3ObjectStore::new(client, bucket))
        }
        _ => Arc::new(MemoryObjectStore::new()),
    }
}

/// Make sure both collections and the image store are reachable.
async fn check_backends(
    documents: &Arc<dyn DocumentStore>,
    images: &Arc<dyn ObjectStore>,
) -> Result<(), String> {
    Repository::<Article>::new(Arc::clone(documents))
        .check()
        .await
        .map_err(|e| format!("Articles table unavailable: {}", e))?;
    Repository::<Link>::new(Arc::clone(documents))
        .check()
        .await
        .map_err(|e| format!("Links table unavailable: {}", e))?;
    images
        .check()
        .await
        .map_err(|e| format!("Image storage unavailable: {}", e))
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = match (&config.auth_domain, &config.auth_audience) {
        (Some(domain), Some(audience)) if config.auth_enabled => {
            let auth = match &config.jwks_url {
                Some(url) => JwtAuth::with_fetcher(
                    domain.as_str(),
                    audience.as_str(),
                    Arc::new(HttpKeySetFetcher::new(url.as_str())),
                ),
                None => JwtAuth::new(domain.as_str(), audience.as_str()),
            };
            info!("  Auth: tokens issued by {}", auth.issuer());
            RouterConfig::new(auth.with_key_ttl(config.key_ttl()))
        }
        _ => {
            warn!("  Auth: DISABLED - every endpoint is publicly accessible");
            RouterConfig::without_auth()
        }
    };

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
        .with_request_timeout(config.request_timeout())
        .with_tracing(!config.no_tracing)
}

// =============================================================================
// Client Commands
// =============================================================================

fn build_api_client(args: &ClientArgs) -> Result<ApiClient, String> {
    let ClientConfig {
        api_url,
        credentials,
    } = args.resolve()?;
    let tokens = Arc::new(AccessTokenService::new(credentials));
    Ok(ApiClient::new(api_url, tokens))
}

async fn run_import(config: ImportConfig) -> ExitCode {
    init_logging(client_log_level(&config.client));

    let client = match build_api_client(&config.client) {
        Ok(client) => client,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let importer = ArticleImporter::new(client);
    match importer.import(&config.path).await {
        Ok(summary) => {
            info!(
                "Imported {} article(s), {} failed",
                summary.succeeded, summary.failed
            );
            if summary.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("Import failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_link(config: LinkConfig) -> ExitCode {
    init_logging(client_log_level(&config.client));

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let client = match build_api_client(&config.client) {
        Ok(client) => client,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let link = Link {
        title: config.title,
        url: config.url,
        banner: config.banner.unwrap_or_default(),
        categories: config.categories,
        tags: config.tags,
        ..Default::default()
    };

    match client.create_link(&link).await {
        Ok(saved) => {
            info!(
                "Saved link {} ({})",
                saved.title,
                saved.id.as_deref().unwrap_or("no id")
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to save link: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn client_log_level(args: &ClientArgs) -> &'static str {
    if args.verbose {
        "debug"
    } else {
        "info"
    }
}

// =============================================================================
// Proxy Command
// =============================================================================

async fn run_proxy(config: ProxyConfig) -> ExitCode {
    init_logging(config.effective_log_level());

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let ClientConfig {
        api_url,
        credentials,
    } = match config.client.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Static files: {}", static_dir_display(&config.static_dir));
    info!("  Forwarding /api/* to {}", api_url);

    let tokens = Arc::new(AccessTokenService::new(credentials));
    let state = ProxyState::new(api_url, tokens);
    let router = create_proxy_router(
        state,
        &config.static_dir,
        config.request_timeout(),
        !config.no_tracing,
    );

    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Proxy listening on: http://{}", addr);

    if let Err(e) = server::serve(listener, router, config.shutdown_timeout()).await {
        error!("Proxy error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn static_dir_display(dir: &Path) -> String {
    dir.canonicalize()
        .unwrap_or_else(|_| dir.to_path_buf())
        .display()
        .to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Initialize the tracing/logging subsystem. `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    let env_filter = log_filter(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
