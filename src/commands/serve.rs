use anyhow::{bail, Context, Result};
use std::net::{IpAddr, UdpSocket};
use std::path::PathBuf;
use tokio::signal;

use playcheck::server::{playlist_names, playlist_router};

/// Parameters of the serve command
pub struct ServeParams {
    /// Directory whose playlists are served
    pub dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Playlist that must exist before the server starts
    pub playlist: Option<String>,
}

/// Address other devices on the network reach this machine at
///
/// Connecting a UDP socket sends nothing; it only selects the outbound
/// interface.
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Serve the playlists of a directory until interrupted
pub async fn serve(params: ServeParams) -> Result<()> {
    let names = playlist_names(&params.dir)
        .with_context(|| format!("Failed to read directory {}", params.dir.display()))?;

    if let Some(required) = &params.playlist {
        if !names.contains(required) {
            bail!(
                "{} not found in {}; run `playcheck check` first to create it",
                required,
                params.dir.display()
            );
        }
    }

    let addr = format!("{}:{}", params.host, params.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let network_host = local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "localhost".to_string());

    println!("Playlist Server");
    println!("===============");
    println!("  Directory: {}", params.dir.display());
    println!("  Listening: http://{addr}");
    println!();
    if let Some(required) = &params.playlist {
        println!("Player URLs:");
        println!("  Local: http://localhost:{}/{required}", params.port);
        println!("  Network: http://{network_host}:{}/{required}", params.port);
        println!();
    }
    println!("Available playlists:");
    if names.is_empty() {
        println!("  (none yet)");
    }
    for name in &names {
        println!("  http://{network_host}:{}/{name}", params.port);
    }
    println!();
    println!("Press Ctrl+C to stop");

    tracing::info!(addr = %addr, playlists = names.len(), "Playlist server started");

    axum::serve(listener, playlist_router(params.dir))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Playlist server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
