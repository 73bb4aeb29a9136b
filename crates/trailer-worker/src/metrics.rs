//! Prometheus metrics for the pipeline.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const ANALYSIS_COVERAGE_SECONDS: &str = "trailer_analysis_coverage_seconds";
    pub const ANALYSIS_COVERAGE_RATIO: &str = "trailer_analysis_coverage_ratio";
    pub const JOBS_TOTAL: &str = "trailer_jobs_total";
    pub const RENDERS_TOTAL: &str = "trailer_renders_total";
    pub const STAGE_DURATION_SECONDS: &str = "trailer_stage_duration_seconds";
}

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn install_exporter(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}

pub fn record_coverage(seconds: f64, ratio: f64) {
    gauge!(names::ANALYSIS_COVERAGE_SECONDS).set(seconds);
    gauge!(names::ANALYSIS_COVERAGE_RATIO).set(ratio);
}

pub fn record_job(status: &str) {
    counter!(names::JOBS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_render(status: &str) {
    counter!(names::RENDERS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_stage(stage: &str, elapsed_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.to_string()).record(elapsed_secs);
}
