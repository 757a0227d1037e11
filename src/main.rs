use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{info, warn};

use payment_engine::api::{create_router, AppState, WebhookContext};
use payment_engine::config::Settings;
use payment_engine::events::{EventPublisher, PublisherConfig};
use payment_engine::gateway::CinetPayGateway;
use payment_engine::observability::{init_logging, init_metrics, HealthChecker, LogConfig};
use payment_engine::queue::RedisReconciliationQueue;
use payment_engine::repositories::PaymentRepository;
use payment_engine::services::PaymentService;
use payment_engine::worker::{ReconciliationWorker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    init_logging(&LogConfig {
        level: settings.application.log_level.clone(),
        format: settings.application.log_format.as_str().into(),
        ..LogConfig::default()
    });
    info!("Configuration loaded");

    let metrics_handle = init_metrics();

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied");

    // Connect to Redis
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    {
        let mut conn = redis_client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
    }
    info!("Redis connection established");

    // Connect to Kafka (optional; events degrade to log records without it)
    let events = if settings.kafka.enabled {
        let mut publisher = EventPublisher::new(PublisherConfig {
            brokers: vec![settings.kafka.brokers.clone()],
            topic: settings.kafka.topic.clone(),
            ..PublisherConfig::default()
        });
        match publisher.connect().await {
            Ok(()) => Some(Arc::new(publisher)),
            Err(e) => {
                warn!("Kafka unavailable, continuing without events: {}", e);
                None
            }
        }
    } else {
        None
    };
    let kafka_connected = events.is_some();

    // Wire the core
    let store = Arc::new(PaymentRepository::new(pool.clone()));
    let gateway = Arc::new(CinetPayGateway::new(settings.gateway.clone())?);
    let queue = Arc::new(RedisReconciliationQueue::new(
        redis_client.clone(),
        "payments",
        settings.worker.max_attempts,
    ));

    let mut service = PaymentService::new(
        store.clone(),
        gateway,
        queue.clone(),
        settings.gateway.name.clone(),
    )
    .with_first_check_delay(Duration::from_secs(settings.worker.first_check_delay_secs));
    if let Some(events) = &events {
        service = service.with_events(events.clone());
    }
    let service = Arc::new(service);

    // The queue is disposable: heal it from the ledger before polling.
    let worker = ReconciliationWorker::new(
        service.clone(),
        queue.clone(),
        store.clone(),
        WorkerConfig::from(&settings.worker),
    );
    match worker.rebuild_queue().await {
        Ok(added) if added > 0 => info!("Recovered {} pending payments into the queue", added),
        Ok(_) => {}
        Err(e) => warn!("Queue rebuild failed: {}", e),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await;
    });

    let health_checker = Arc::new(HealthChecker::new(
        pool.clone(),
        redis_client.clone(),
        kafka_connected,
    ));

    let state = AppState::new(service, WebhookContext::from(&settings.gateway))
        .with_metrics(metrics_handle)
        .with_health_checker(health_checker);
    let app = create_router(state);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop pulling new queue entries; in-flight verifications finish or
    // time out before the task exits.
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
