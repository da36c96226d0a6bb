// ABOUTME: Ghosty server binary: loads config, wires resources, serves the HTTP router
// ABOUTME: Development default is in-memory storage with no provider keys required
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! Ghosty server entrypoint

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use ghosty_server::config::{ServerConfig, ToolCostTable};
use ghosty_server::external::in_memory_collaborators;
use ghosty_server::logging::{self, LogFormat};
use ghosty_server::resources::ServerResources;
use ghosty_server::routes;
use ghosty_server::storage;

/// Ghosty platform server
#[derive(Parser, Debug)]
#[command(name = "ghosty-server", version, about)]
struct Args {
    /// Override the HTTP port from GHOSTY_HTTP_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }

    logging::init(LogFormat::parse(&config.log_format))?;
    info!("Starting ghosty-server v{}", env!("CARGO_PKG_VERSION"));

    let storage = storage::connect(&config.database_url).await?;
    let config = Arc::new(config);
    let resources = Arc::new(ServerResources::new(
        Arc::clone(&config),
        storage,
        // Real collaborator clients are wired at the deployment layer; the
        // standalone binary runs with the in-memory set
        in_memory_collaborators(),
        ToolCostTable::default(),
    ));

    let router = routes::router(resources).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
