use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the payment engine.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_payment_created(&self, kind: &str, currency: &str) {
        counter!("payment_created_total", "kind" => kind.to_string(), "currency" => currency.to_string()).increment(1);
    }

    /// A payment reached a terminal status. `source` is which path won:
    /// webhook, worker, or initiation (gateway rejection).
    pub fn record_payment_resolved(&self, status: &str, source: &str) {
        counter!("payment_resolved_total", "status" => status.to_string(), "source" => source.to_string()).increment(1);
    }

    pub fn record_duplicate_resolution(&self) {
        counter!("payment_duplicate_resolutions_total").increment(1);
    }

    pub fn record_webhook_rejected(&self) {
        counter!("payment_webhook_rejected_total").increment(1);
    }

    pub fn record_gateway_call(&self, operation: &str, duration_ms: f64, success: bool) {
        counter!("payment_gateway_requests_total", "operation" => operation.to_string(), "success" => success.to_string()).increment(1);
        histogram!("payment_gateway_request_duration_ms", "operation" => operation.to_string()).record(duration_ms);
    }

    pub fn record_worker_cycle(&self, processed: u64) {
        counter!("payment_worker_cycles_total").increment(1);
        histogram!("payment_worker_batch_size").record(processed as f64);
    }

    pub fn set_pending_payments(&self, count: i64) {
        gauge!("payment_pending").set(count as f64);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("payment_created_total", Unit::Count, "Payments created");
    describe_counter!(
        "payment_resolved_total",
        Unit::Count,
        "Payments that reached a terminal status"
    );
    describe_counter!(
        "payment_duplicate_resolutions_total",
        Unit::Count,
        "Resolutions ignored because the payment was already terminal"
    );
    describe_counter!(
        "payment_webhook_rejected_total",
        Unit::Count,
        "Webhook deliveries rejected for a bad signature"
    );

    describe_counter!(
        "payment_gateway_requests_total",
        Unit::Count,
        "Outbound gateway calls"
    );
    describe_histogram!(
        "payment_gateway_request_duration_ms",
        Unit::Milliseconds,
        "Gateway call latency in milliseconds"
    );

    describe_counter!(
        "payment_worker_cycles_total",
        Unit::Count,
        "Reconciliation worker ticks"
    );
    describe_histogram!(
        "payment_worker_batch_size",
        Unit::Count,
        "Entries processed per worker tick"
    );

    describe_gauge!("payment_pending", Unit::Count, "Payments currently pending");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!(
        "http_request_duration_ms",
        Unit::Milliseconds,
        "HTTP request latency in milliseconds"
    );
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
