use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotive_api::{
    api::{create_router, AppState, Backends},
    config::{Config, StoreBackend},
    db::{self, redis::Cache},
    services::providers::build_language_model,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotive_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        variant = %config.taxonomy_variant,
        llm_provider = config.llm_provider.as_str(),
        store = ?config.store_backend,
        "Starting Spotive API"
    );

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(url) => {
            let client = db::create_redis_client(url).context("Invalid REDIS_URL")?;
            let (cache, writer) = Cache::new(client);
            tracing::info!("Suggestion cache enabled");
            (Some(cache), Some(writer))
        }
        None => (None, None),
    };

    let backends = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db::run_migrations(&pool).await.context("Failed to run migrations")?;

            Backends {
                listings: Arc::new(db::PgListingStore::new(pool.clone(), config.taxonomy_variant)),
                users: Arc::new(db::PgUserStore::new(pool.clone())),
                call_logs: Arc::new(db::PgCallLogStore::new(pool)),
                cache,
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            Backends {
                listings: Arc::new(db::InMemoryListingStore::default()),
                users: Arc::new(db::InMemoryUserStore::new()),
                call_logs: Arc::new(db::InMemoryCallLogStore::new()),
                cache,
            }
        }
    };

    let model = build_language_model(&config);
    if model.is_none() {
        tracing::warn!("No language model available; using keyword mapping and templated suggestions");
    }

    let state = AppState::new(&config, model, backends).context("Invalid taxonomy configuration")?;
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
