use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prism::allowlist::sweeper;
use prism::config::Args;
use prism::forward::{Forwarder, parse_upstream};
use prism::geo::GeoClient;
use prism::handlers::{admin_router, proxy_router};
use prism::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prism=info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    // a broken upstream is a configuration error, not something to serve 500s for
    let target = parse_upstream(&args.target_url).context("TARGET_URL is not a usable upstream")?;
    let forwarder = Forwarder::new(&args.target_url, args.upstream_timeout())
        .context("failed to build upstream client")?;

    let geo = if args.no_geo {
        GeoClient::disabled()
    } else {
        GeoClient::new(args.geo_url.clone(), args.geo_timeout())
            .context("failed to build enrichment client")?
    };

    let state = Arc::new(AppState::new(geo, forwarder));

    if let Some(every) = args.sweep_interval() {
        tokio::spawn(sweeper(state.store.clone(), every));
    }

    let proxy_listener = TcpListener::bind((args.bind.as_str(), args.proxy_port))
        .await
        .with_context(|| format!("failed to bind proxy port {}", args.proxy_port))?;
    let admin_listener = TcpListener::bind((args.bind.as_str(), args.admin_port))
        .await
        .with_context(|| format!("failed to bind admin port {}", args.admin_port))?;

    info!(port = args.proxy_port, %target, "Proxy listening");
    info!(port = args.admin_port, "Admin interface listening");

    let proxy = axum::serve(
        proxy_listener,
        proxy_router(state.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());
    let admin = axum::serve(admin_listener, admin_router(state))
        .with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(async { proxy.await }, async { admin.await })?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
