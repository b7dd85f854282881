//! Playlist file server
//!
//! Serves the playlists of one directory over HTTP so TVs and media players
//! on the local network can load them. Only `.m3u`/`.m3u8` files directly
//! inside the directory are reachable.

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::playlist::is_playlist;

/// Content type players expect for M3U playlists
pub const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegurl";

struct ServerState {
    root: PathBuf,
}

#[derive(Debug, Serialize)]
struct IndexResponse {
    service: String,
    version: String,
    playlists: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Names of the playlists directly inside `dir`, sorted
pub fn playlist_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for dir_entry in std::fs::read_dir(dir)? {
        let path = dir_entry?.path();
        if path.is_file() && is_playlist(&path) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Whether a request path segment may name a served playlist
fn is_servable_name(name: &str) -> bool {
    !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && is_playlist(Path::new(name))
}

/// Build the router serving playlists from `root`
///
/// Every response carries permissive CORS headers so browser-based players
/// can fetch the playlists.
pub fn playlist_router(root: impl Into<PathBuf>) -> Router {
    let state = Arc::new(ServerState { root: root.into() });

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/{name}", get(playlist_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn index_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<IndexResponse>, HandlerError> {
    let playlists = playlist_names(&state.root).map_err(|e| {
        tracing::error!(error = %e, root = %state.root.display(), "Failed to list playlists");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list playlists")
    })?;

    Ok(Json(IndexResponse {
        service: "playcheck".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        playlists,
    }))
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn playlist_handler(
    State(state): State<Arc<ServerState>>,
    UrlPath(name): UrlPath<String>,
) -> Result<Response, HandlerError> {
    if !is_servable_name(&name) {
        return Err(error_response(StatusCode::NOT_FOUND, "Not a playlist"));
    }

    let path = state.root.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            tracing::debug!(playlist = %name, bytes = bytes.len(), "Serving playlist");
            Ok(([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], bytes).into_response())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Playlist {name} not found"),
        )),
        Err(e) => {
            tracing::error!(error = %e, playlist = %name, "Failed to read playlist");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read playlist",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servable_names() {
        assert!(is_servable_name("pk_working.m3u"));
        assert!(is_servable_name("All.M3U8"));
        assert!(!is_servable_name("notes.txt"));
        assert!(!is_servable_name(".hidden.m3u"));
        assert!(!is_servable_name("..\\secret.m3u"));
        assert!(!is_servable_name("m3u"));
    }
}
