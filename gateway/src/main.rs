mod api;
mod api_error;
mod config;
mod deferred;
mod jobs;
mod openapi;
mod store;
#[cfg(test)]
mod test_utils;

use anyhow::Context;
use clap::Parser;
use ractor::Actor;
use std::{env, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::jobs::feeder::{FeederActor, FeederArgs};
use crate::store::{ElasticsearchStore, StoreClient};

#[derive(Parser, Debug)]
#[command(
    name = "search-gateway",
    about = "HTTP gateway over an Elasticsearch document index"
)]
struct Args {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config_path = args
        .config
        .or_else(|| env::var(config::CONFIG_PATH_ENV).ok().map(PathBuf::from));
    let settings = config::Settings::load(config_path)?;

    let backend = ElasticsearchStore::from_config(&settings.store)?;
    tracing::info!(
        base_url = %settings.store.base_url,
        index = backend.index_name(),
        "document store configured"
    );
    let store = StoreClient::new(Arc::new(backend));

    let feeder = if settings.feeder.enabled {
        let (actor, handle) = Actor::spawn(
            Some("synthetic-feeder".to_string()),
            FeederActor,
            FeederArgs {
                store: store.clone(),
                interval: settings.feeder.interval(),
            },
        )
        .await
        .context("failed to start synthetic feeder")?;
        Some((actor, handle))
    } else {
        tracing::info!("synthetic feeder disabled");
        None
    };

    let app = api::router(Arc::new(api::AppState::new(store))).layer(TraceLayer::new_for_http());

    let listen_addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(address = %listen_addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((actor, handle)) = feeder {
        actor.stop(Some("shutdown".to_string()));
        handle.await.context("synthetic feeder did not stop cleanly")?;
    }
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
