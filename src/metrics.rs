// Prometheus metrics for gateway monitoring
//
// Counters and histograms for the validation and execution paths. The
// registry is exposed for embedding; awsgate itself does not serve an
// export endpoint.

use lazy_static::lazy_static;
use prometheus::{CounterVec, Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    // Validation metrics
    pub static ref VALIDATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "awsgate_validations_total",
            "Command validations by outcome (allowed, denied, invalid)"
        ),
        &["outcome"]
    )
    .expect("Failed to create validations metric");

    pub static ref PERMISSIVE_OVERRIDES_TOTAL: IntCounter = IntCounter::new(
        "awsgate_permissive_overrides_total",
        "Security denials overridden in permissive mode"
    )
    .expect("Failed to create permissive overrides metric");

    // Execution metrics
    pub static ref EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "awsgate_executions_total",
            "Command executions by result status"
        ),
        &["status"]
    )
    .expect("Failed to create executions metric");

    pub static ref EXECUTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "awsgate_execution_duration_seconds",
            "Command execution duration in seconds"
        )
    )
    .expect("Failed to create execution duration metric");

    pub static ref RATE_LIMIT_WAITS_TOTAL: IntCounter = IntCounter::new(
        "awsgate_rate_limit_waits_total",
        "Executions delayed by the rate limiter"
    )
    .expect("Failed to create rate limit waits metric");
}

/// Register all gateway metrics with the shared registry.
///
/// Safe to call more than once; duplicate registrations are ignored.
pub fn register_metrics() {
    let _ = REGISTRY.register(Box::new(VALIDATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PERMISSIVE_OVERRIDES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(EXECUTION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(RATE_LIMIT_WAITS_TOTAL.clone()));
}
