//! HTTP server for Pagewright.
//!
//! This crate wires configuration, storage and the generation pipeline into
//! an axum server exposing:
//! - `POST /generate` to create or revise a page
//! - `GET /page`, `DELETE /page` and `GET /pages` for stored pages
//! - `GET /view` to serve a page as HTML
//! - `GET /health` for backend reachability and consistency
//!
//! # Quick Start
//!
//! ```ignore
//! use pw_config::Config;
//! use pw_server::{build_service, run_server, server_config_from_pw_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     config.require_generator().unwrap();
//!     let service = build_service(&config).await.unwrap();
//!     run_server(server_config_from_pw_config(&config), service).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Client ──HTTP──► axum router (pw-server)
//!                      │
//!                      └─► PageService (pw-pages)
//!                              │
//!                              ├─► GenerationInvoker ──► provider (pw-generator)
//!                              │
//!                              └─► Storage (memory | fs | s3 | sql)
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use pw_config::{Config, ConfigError, StorageBackend, StorageConfig};
use pw_generator::{AnthropicClient, GenerationInvoker, GenerationSettings};
use pw_pages::{PageService, PromptComposer};
use pw_storage::{FsStorage, MemoryStorage, Storage};
use pw_storage_s3::{S3Config, S3Storage};
use pw_storage_sql::SqlStorage;
use state::AppState;

pub use error::StartupError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upper bound on a single generate request.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7878,
            request_timeout: Duration::from_secs(180),
        }
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener fails.
pub async fn run_server(config: ServerConfig, service: PageService) -> Result<(), StartupError> {
    let state = Arc::new(AppState {
        service: Arc::new(service),
        request_timeout: config.request_timeout,
    });

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from Pagewright config.
#[must_use]
pub fn server_config_from_pw_config(config: &Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        request_timeout: config.generator.request_timeout(),
    }
}

/// Open the configured storage backend.
///
/// # Errors
///
/// Returns an error if the relational backend cannot connect or the S3
/// section is missing.
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, StartupError> {
    let base_url = config.public_base_url.clone();
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => {
            let storage = MemoryStorage::new();
            Arc::new(match base_url {
                Some(url) => storage.with_base_url(url),
                None => storage,
            })
        }
        StorageBackend::Fs => {
            let storage = FsStorage::new(config.fs.dir.clone());
            Arc::new(match base_url {
                Some(url) => storage.with_base_url(url),
                None => storage,
            })
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                ConfigError::Validation("[storage.s3] section required".to_owned())
            })?;
            Arc::new(
                S3Storage::connect(S3Config {
                    bucket: s3.bucket.clone(),
                    region: s3.region.clone(),
                    endpoint: s3.endpoint.clone(),
                    root_path: s3.root_path.clone(),
                    public_base_url: base_url,
                })
                .await,
            )
        }
        StorageBackend::Sql => {
            let storage = SqlStorage::connect(&config.sql.url).await?;
            Arc::new(match base_url {
                Some(url) => storage.with_base_url(url),
                None => storage,
            })
        }
    };

    if !storage.is_persistent() {
        tracing::warn!(
            backend = storage.backend(),
            "Storage is not persistent; pages are lost on restart"
        );
    }
    tracing::info!(backend = storage.backend(), "Storage backend ready");
    Ok(storage)
}

/// Build the page service from configuration.
///
/// The API key is not checked here so read-only callers can list and delete
/// without one; call [`Config::require_generator`] before generating.
///
/// # Errors
///
/// Returns an error if storage cannot be opened.
pub async fn build_service(config: &Config) -> Result<PageService, StartupError> {
    let generator = &config.generator;
    let storage = open_storage(&config.storage).await?;

    let client = AnthropicClient::from_config(
        &generator.api_key,
        &generator.base_url,
        generator.http_timeout(),
    );
    let settings = GenerationSettings {
        model: generator.model.clone(),
        max_tokens: generator.max_tokens,
        temperature: generator.temperature,
        max_attempts: generator.max_attempts,
        retry_delay: generator.retry_delay(),
    };

    Ok(PageService::new(
        storage,
        GenerationInvoker::new(Arc::new(client), settings),
        PromptComposer::new(config.pages.kind.clone()),
    ))
}
