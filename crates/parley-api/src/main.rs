use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley_api::{
    build_router,
    config::{Config, SearchBackend, StoreBackend},
    state::AppState,
};
use parley_cache::{CacheStore, MemoryCacheStore, MongoCacheStore};
use parley_persist::{MemoryPersistenceClient, MongoPersistenceClientBuilder, PersistenceClient};
use parley_search::{ElasticsearchClient, MemorySearchIndex, SearchIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Parley API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let persist = connect_store(&config).await?;
    let cache_store = connect_cache(&config).await?;
    let search_index = connect_search(&config).await?;

    // Create application state
    let state = Arc::new(AppState::new(
        config.clone(),
        persist,
        cache_store,
        search_index,
    ));

    // Build router
    let app = build_router(state.clone());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = state.cache.close().await {
        tracing::warn!(error = %e, "Failed to close cache store");
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    match config.storage.backend {
        StoreBackend::Mongodb => {
            tracing::info!("Connecting to MongoDB");
            let client = MongoPersistenceClientBuilder::new()
                .mongodb_uri(&config.mongodb_uri)
                .database(&config.mongodb.database)
                .timeout(Duration::from_millis(config.mongodb.timeout_ms))
                .max_pool_size(config.mongodb.pool_size)
                .max_attempts(config.sequence.max_attempts)
                .build()
                .await?;
            tracing::info!("MongoDB connected");
            Ok(Arc::new(client))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryPersistenceClient::new()))
        }
    }
}

async fn connect_cache(config: &Config) -> anyhow::Result<Arc<dyn CacheStore>> {
    match config.cache.backend {
        StoreBackend::Mongodb => {
            let store = MongoCacheStore::connect(
                &config.mongodb_uri,
                &config.mongodb.database,
                &config.cache.collection,
                Duration::from_millis(config.mongodb.timeout_ms),
            )
            .await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryCacheStore::new())),
    }
}

async fn connect_search(config: &Config) -> anyhow::Result<Arc<dyn SearchIndex>> {
    match config.search.backend {
        SearchBackend::Elasticsearch => {
            let client = ElasticsearchClient::new(
                &config.search.url,
                &config.search.index,
                Duration::from_millis(config.search.timeout_ms),
            )?;
            // Searches report unavailable until the cluster is reachable
            if let Err(e) = client.ensure_index().await {
                tracing::warn!(url = %config.search.url, error = %e, "Could not prepare search index");
            }
            Ok(Arc::new(client))
        }
        SearchBackend::Memory => Ok(Arc::new(MemorySearchIndex::new())),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
