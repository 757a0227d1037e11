use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Duration;

/// Health status of a service or dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy)
    }
}

/// Health of a single dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: Option<f64>,
    pub message: Option<String>,
}

impl DependencyHealth {
    fn healthy(name: &str, latency_ms: f64) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn degraded(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Degraded,
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    fn unhealthy(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

/// Aggregated health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedHealth {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyHealth>,
}

impl AggregatedHealth {
    pub fn new(version: String, uptime_seconds: u64, dependencies: Vec<DependencyHealth>) -> Self {
        let status = if dependencies.iter().any(|d| d.status.is_unhealthy()) {
            HealthStatus::Unhealthy
        } else if dependencies.iter().any(|d| !d.status.is_healthy()) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            version,
            uptime_seconds,
            dependencies,
        }
    }
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes for the engine's infrastructure dependencies.
pub struct HealthChecker {
    pool: PgPool,
    redis_client: redis::Client,
    kafka_connected: bool,
    start_time: std::time::Instant,
}

impl HealthChecker {
    pub fn new(pool: PgPool, redis_client: redis::Client, kafka_connected: bool) -> Self {
        Self {
            pool,
            redis_client,
            kafka_connected,
            start_time: std::time::Instant::now(),
        }
    }

    /// Performs a full health check of all dependencies.
    pub async fn check_all(&self) -> AggregatedHealth {
        let dependencies = vec![
            self.check_database().await,
            self.check_redis().await,
            self.check_kafka(),
        ];

        AggregatedHealth::new(
            env!("CARGO_PKG_VERSION").to_string(),
            self.start_time.elapsed().as_secs(),
            dependencies,
        )
    }

    pub async fn check_database(&self) -> DependencyHealth {
        let start = std::time::Instant::now();

        match tokio::time::timeout(PROBE_TIMEOUT, sqlx::query("SELECT 1").fetch_one(&self.pool))
            .await
        {
            Ok(Ok(_)) => DependencyHealth::healthy("database", start.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => DependencyHealth::unhealthy("database", format!("query failed: {e}")),
            Err(_) => DependencyHealth::unhealthy("database", "connection timeout"),
        }
    }

    pub async fn check_redis(&self) -> DependencyHealth {
        let start = std::time::Instant::now();

        let mut conn = match self.redis_client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => return DependencyHealth::unhealthy("redis", format!("connection failed: {e}")),
        };

        match tokio::time::timeout(
            PROBE_TIMEOUT,
            redis::cmd("PING").query_async::<_, ()>(&mut conn),
        )
        .await
        {
            Ok(Ok(_)) => DependencyHealth::healthy("redis", start.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => DependencyHealth::unhealthy("redis", format!("PING failed: {e}")),
            Err(_) => DependencyHealth::unhealthy("redis", "PING timeout"),
        }
    }

    /// Kafka is optional: events degrade to log records without it.
    pub fn check_kafka(&self) -> DependencyHealth {
        if self.kafka_connected {
            DependencyHealth::healthy("kafka", 0.0)
        } else {
            DependencyHealth::degraded("kafka", "event publisher not connected")
        }
    }

    /// Readiness: the ledger must be reachable; the queue may lag behind.
    pub async fn is_ready(&self) -> bool {
        let db = self.check_database().await;
        let redis = self.check_redis().await;
        db.status.is_healthy() && !redis.status.is_unhealthy()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
