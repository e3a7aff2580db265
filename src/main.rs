//! filedepot server binary.
//!
//! An authenticated file repository over a single upload directory. The
//! repository core (`storage`, `names`, `transfer`) owns the directory; the
//! HTTP layer authenticates requests and maps them onto list, upload,
//! download and delete.

mod app;
mod atomic;
mod auth;
mod background;
mod config;
mod error;
mod files;
mod http;
mod locking;
mod logging;
mod names;
mod storage;
mod transfer;

use axum_server::Handle;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use crate::app::build_router;
use crate::auth::AuthContext;
use crate::background::spawn_background_tasks;
use crate::config::{Args, SHUTDOWN_GRACE_SECS};
use crate::http::build_cors_layer;
use crate::storage::Repository;

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let args = Args::parse();
    logging::init_logging(&args.log_level);

    let repo = Arc::new(
        Repository::open(&args.storage_dir, args.on_conflict)
            .await
            .map_err(std::io::Error::other)?,
    );
    let auth = Arc::new(AuthContext::new(
        args.auth_user.clone(),
        args.auth_pass.clone(),
        Duration::from_secs(args.session_ttl_secs),
    ));

    let mut app = build_router(repo.clone(), auth.clone());
    if let Some(cors_layer) = build_cors_layer(args.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!(
        %addr,
        root = %repo.root_path().display(),
        on_conflict = ?repo.conflict_policy(),
        "starting filedepot"
    );

    spawn_background_tasks(
        repo,
        auth,
        Duration::from_secs(args.stale_upload_ttl_secs),
    );
    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::spawn(shutdown_signal(handle));
    server.await
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("received termination signal, shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
