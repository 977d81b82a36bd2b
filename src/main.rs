//! Vitae Server
//!
//! Resume ingestion service: presigned uploads, registration, and an
//! asynchronous parse pipeline from broker event to stored result.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitae_server::agent::OpenAiAgent;
use vitae_server::broker::{MemoryBroker, MessageQueue};
use vitae_server::config::Config;
use vitae_server::db::{create_pool, DocumentStore};
use vitae_server::ingest::{
    Dispatcher, EventPublisher, IngestService, MonotonicIdGenerator, PublisherConfig,
};
use vitae_server::parser::{ParseOrchestrator, PdfTextExtractor};
use vitae_server::routes;
use vitae_server::state::AppState;
use vitae_server::storage::S3Store;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitae_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Vitae Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("S3 endpoint: {}", config.storage.endpoint);
    tracing::info!("S3 bucket: {}", config.storage.bucket);

    let store = Arc::new(S3Store::new(&config.storage).await?);

    let db_pool = create_pool(&config.database.url).await?;
    tracing::info!("Database initialized at {}", config.database.url);
    let registry = DocumentStore::new(db_pool);

    // In-process broker: producer and consumer share this process. A
    // multi-instance deployment swaps in an external broker behind the
    // same traits.
    let broker: Arc<dyn MessageQueue> =
        Arc::new(MemoryBroker::new(config.broker.partitions));

    let (publisher, publish_worker) = EventPublisher::spawn(
        broker.clone(),
        PublisherConfig::new(
            config.broker.resume_topic.clone(),
            config.broker.publish_queue_capacity,
        ),
    );

    let ingest = IngestService::new(
        Arc::new(MonotonicIdGenerator::new()),
        store.clone(),
        registry.clone(),
        publisher,
    );

    // Consumer side: dispatcher loop driving the parse orchestrator.
    let orchestrator = Arc::new(ParseOrchestrator::new(
        store,
        Arc::new(PdfTextExtractor),
        Arc::new(OpenAiAgent::new(config.agent.clone())),
        registry,
        config.parser.clone(),
    ));
    let subscription = broker
        .subscribe(&[config.broker.resume_topic.clone()])
        .await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(
        subscription,
        orchestrator,
        broker.clone(),
        &config.broker.resume_topic,
        shutdown_rx,
    );
    let consumer_task = tokio::spawn(dispatcher.run());
    tracing::info!(topic = %config.broker.resume_topic, "Consumer started");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app_state = AppState::new(ingest);
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check))
        .nest("/api/v1/resumes", routes::resumes::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight message handling may be cut short here; that is the
    // documented shutdown risk.
    tracing::info!("Shutting down consumer...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = consumer_task.await {
        tracing::error!("Consumer task join error: {e}");
    }
    publish_worker.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
