//! Read-path server replaying an archive
//!
//! Serves asset files from an allow-list of directories on disk and every
//! other path from the archive database, keyed the same way the crawler
//! stores resources.

mod archive;
mod assets;

pub use archive::ArchiveHandle;
pub use assets::{asset_file, content_type_for, DEFAULT_ASSET_PATHS};

use crate::resource::{Resource, HTML_CONTENT_TYPE};
use crate::storage::StoreError;
use crate::url::storage_key;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use url::Url;

/// Port the server listens on by default
pub const DEFAULT_PORT: u16 = 8080;

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Archive error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory asset paths are resolved against
    pub asset_root: PathBuf,

    /// Path prefixes served from `asset_root`
    pub asset_paths: Vec<String>,

    /// Archive database file
    pub db: PathBuf,

    /// Bucket within the archive database
    pub bucket: String,
}

/// State shared by every request
pub struct AppState {
    archive: ArchiveHandle,
    asset_root: PathBuf,
    asset_paths: Vec<String>,
}

impl AppState {
    /// Opens the archive named by the config
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, ServerError> {
        let archive = ArchiveHandle::open(&config.db, &config.bucket)?;
        Ok(Arc::new(Self {
            archive,
            asset_root: config.asset_root,
            asset_paths: config.asset_paths,
        }))
    }
}

/// Builds the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/statusz", get(statusz))
        .route("/reloadz", get(reloadz))
        .fallback(serve_path)
        .with_state(state)
}

/// Runs the server until the process is stopped
///
/// # Arguments
///
/// * `config` - Archive and asset settings
/// * `port` - Port to listen on, on all interfaces
pub async fn serve(config: ServerConfig, port: u16) -> Result<(), ServerError> {
    let state = AppState::new(config)?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn statusz() -> &'static str {
    "OK\n"
}

async fn reloadz(State(state): State<Arc<AppState>>) -> Response {
    if let Err(e) = state.archive.reload() {
        tracing::error!("Reload failed: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "reload failed\n").into_response();
    }
    found("/")
}

async fn serve_path(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    if let Some(file) = asset_file(&state.asset_root, &state.asset_paths, uri.path()) {
        return match tokio::fs::read(&file).await {
            Ok(body) => {
                ([(header::CONTENT_TYPE, content_type_for(&file))], body).into_response()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(),
            Err(e) => {
                tracing::warn!(file = %file.display(), "Asset read failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let key = match archive_key(path_and_query) {
        Some(key) => key,
        None => return StatusCode::BAD_REQUEST.into_response(),
    };

    match state.archive.lookup(key).await {
        Ok(Some(Resource::Page {
            content,
            content_type,
        })) => {
            let content_type = if content_type.is_empty() {
                HTML_CONTENT_TYPE.to_string()
            } else {
                content_type
            };
            ([(header::CONTENT_TYPE, content_type)], content).into_response()
        }
        Ok(Some(Resource::Redirect { target })) => found(&target),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(path = %path_and_query, "Archive lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Storage key for a request target
fn archive_key(path_and_query: &str) -> Option<String> {
    let url = Url::parse("http://archive.invalid/")
        .and_then(|base| base.join(path_and_query))
        .ok()?;
    storage_key(&url).ok()
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}
