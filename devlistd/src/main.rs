mod api;
mod config;
mod feed;
mod presenter;
mod store;
mod store_manager;
mod view;

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use shared::filter::DeviceFilter;
use crate::config::Config;
use crate::presenter::Presenter;
use crate::store::device_store::DeviceStore;
use crate::store_manager::{Snapshot, StoreHandle};
use crate::view::RenderedList;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("devlistd=info"))
        )
        .init();

    tracing::info!("Starting devlistd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/devlistd/devlistd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    // Store thread publishes a fresh snapshot after every change
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
    let store_handle = StoreHandle::spawn(
        DeviceStore::new(config.store.default_expiration_secs),
        snapshot_tx,
    );

    // View thread consumes edits and publishes what it renders
    let (view_tx, view_rx) = flume::unbounded();
    let (rendered_tx, rendered_rx) = watch::channel(RenderedList::default());
    let view_handle = view::spawn(view_rx, rendered_tx);

    let (filter_tx, filter_rx) = watch::channel(DeviceFilter::new(&config.list.query));
    let filter_tx = Arc::new(filter_tx);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Spawn feed task
    let (feed_tx, feed_rx) = mpsc::channel(256);
    let feed_cancel = cancel.clone();
    let feed_source = config.feed.source.clone();
    let feed_handle = tokio::spawn(async move {
        if let Err(e) = feed::reader::run_feed(feed_source, feed_tx, feed_cancel).await {
            tracing::error!("Feed error: {:#}", e);
        }
    });

    // Spawn store manager task
    let mgr_cancel = cancel.clone();
    let mgr_config = config.store.clone();
    let mgr_store = store_handle.clone();
    let mgr_handle = tokio::spawn(async move {
        if let Err(e) = store_manager::run(mgr_store, feed_rx, mgr_config, mgr_cancel).await {
            tracing::error!("Store manager error: {}", e);
        }
    });

    // Spawn presenter task
    let presenter = Presenter::new(config.list.sort, view_tx);
    let presenter_cancel = cancel.clone();
    let presenter_handle = tokio::spawn(async move {
        if let Err(e) = presenter::run(presenter, snapshot_rx, filter_rx, presenter_cancel).await {
            tracing::error!("Presenter error: {}", e);
        }
    });

    // Build API router
    let app_state = api::routes::AppState {
        store: store_handle.clone(),
        rendered_rx,
        filter_tx,
        sort: config.list.sort,
        default_expiration_secs: config.store.default_expiration_secs,
    };
    let app = api::routes::router(app_state);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    // Trigger cancellation
    cancel.cancel();

    // Wait for all tasks to complete
    let _ = tokio::join!(feed_handle, mgr_handle, presenter_handle, server_handle);

    // Presenter has sent its shutdown message by now
    match tokio::task::spawn_blocking(move || view_handle.join()).await {
        Ok(Ok(())) => {}
        _ => tracing::error!("View thread panicked"),
    }

    // Shutdown store thread
    if let Err(e) = store_handle.shutdown().await {
        tracing::error!("Failed to shutdown store: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
