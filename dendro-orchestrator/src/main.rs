use std::sync::Arc;

use anyhow::Context;
use dendro_orchestrator::config::{Config, StoreBackend};
use dendro_orchestrator::repository::memory::{
    MemoryComputeClientStore, MemoryIdentityResolver, MemoryJobStore, MemoryServiceDirectory,
    SeedData,
};
use dendro_orchestrator::repository::{
    ComputeClientStore, IdentityResolver, JobStore, PgComputeClientStore, PgIdentityResolver,
    PgJobStore, PgServiceDirectory, ServiceDirectory,
};
use dendro_orchestrator::service::identity::CachedIdentityResolver;
use dendro_orchestrator::service::notifier::{
    FanoutNotifier, LogNotifier, Notifier, WebhookNotifier,
};
use dendro_orchestrator::{AppState, api, db};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Stores {
    jobs: Arc<dyn JobStore>,
    compute_clients: Arc<dyn ComputeClientStore>,
    services: Arc<dyn ServiceDirectory>,
    identity: Arc<dyn IdentityResolver>,
}

async fn postgres_stores(config: &Config) -> anyhow::Result<Stores> {
    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(Stores {
        jobs: Arc::new(PgJobStore::new(pool.clone())),
        compute_clients: Arc::new(PgComputeClientStore::new(pool.clone())),
        services: Arc::new(PgServiceDirectory::new(pool.clone())),
        identity: Arc::new(PgIdentityResolver::new(pool)),
    })
}

async fn memory_stores(config: &Config) -> anyhow::Result<Stores> {
    tracing::warn!("Using the in-memory store; nothing survives a restart");

    let services = MemoryServiceDirectory::new();
    let identities = MemoryIdentityResolver::new();
    if let Some(path) = &config.seed_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seed file {}", path))?;
        let seed: SeedData = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path))?;
        tracing::info!(
            services = seed.services.len(),
            users = seed.users.len(),
            "Loaded seed data"
        );
        seed.load_into(&services, &identities).await;
    }

    Ok(Stores {
        jobs: Arc::new(MemoryJobStore::new()),
        compute_clients: Arc::new(MemoryComputeClientStore::new()),
        services: Arc::new(services),
        identity: Arc::new(identities),
    })
}

fn notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.pubsub_webhook_url {
        Some(url) => {
            tracing::info!("Publishing job events to {}", url);
            let targets: Vec<Arc<dyn Notifier>> =
                vec![Arc::new(LogNotifier), Arc::new(WebhookNotifier::new(url.clone()))];
            Arc::new(FanoutNotifier::new(targets))
        }
        None => Arc::new(LogNotifier),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dendro_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dendro Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let stores = match config.store {
        StoreBackend::Postgres => postgres_stores(&config).await?,
        StoreBackend::Memory => memory_stores(&config).await?,
    };

    let identity: Arc<dyn IdentityResolver> = Arc::new(CachedIdentityResolver::new(
        stores.identity,
        config.identity_cache_capacity,
        config.identity_cache_ttl,
    ));

    let state = AppState {
        jobs: stores.jobs,
        compute_clients: stores.compute_clients,
        services: stores.services,
        identity,
        notifier: notifier(&config),
        config: Arc::new(config.clone()),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
