//! Metrics module
//!
//! Prometheus metrics for the ingest pipeline.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec,
};

lazy_static! {
    // Ingest metrics
    pub static ref INGESTS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_ingests_total",
        "Total number of video ingests",
        &["status", "orientation"]
    ).unwrap();

    pub static ref INGEST_BYTES_TOTAL: Counter = register_counter!(
        "tubely_ingest_bytes_total",
        "Total bytes staged from video uploads"
    ).unwrap();

    pub static ref INGEST_DURATION: HistogramVec = register_histogram_vec!(
        "tubely_ingest_duration_seconds",
        "End-to-end ingest duration in seconds",
        &["status"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    pub static ref STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "tubely_ingest_stage_duration_seconds",
        "Time spent reaching each ingest stage from the previous one",
        &["stage"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 300.0]
    ).unwrap();

    pub static ref INGEST_FAILURES: CounterVec = register_counter_vec!(
        "tubely_ingest_failures_total",
        "Failed ingests by the last stage reached",
        &["stage", "kind"]
    ).unwrap();

    // External tool metrics
    pub static ref TOOL_DURATION: HistogramVec = register_histogram_vec!(
        "tubely_media_tool_duration_seconds",
        "ffprobe/ffmpeg run time in seconds",
        &["tool"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0, 300.0]
    ).unwrap();

    // Thumbnail metrics
    pub static ref THUMBNAILS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_thumbnails_total",
        "Total number of thumbnail uploads",
        &["status"]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "tubely_auth_attempts_total",
        "Authentication attempts",
        &["status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a committed ingest
pub fn record_ingest_success(orientation: &str, bytes: u64, duration_secs: f64) {
    INGESTS_TOTAL
        .with_label_values(&["success", orientation])
        .inc();
    INGEST_BYTES_TOTAL.inc_by(bytes as f64);
    INGEST_DURATION
        .with_label_values(&["success"])
        .observe(duration_secs);
}

/// Record a failed ingest
pub fn record_ingest_failure(stage: &str, kind: &str, duration_secs: f64) {
    INGESTS_TOTAL
        .with_label_values(&["failure", "unknown"])
        .inc();
    INGEST_FAILURES.with_label_values(&[stage, kind]).inc();
    INGEST_DURATION
        .with_label_values(&["failure"])
        .observe(duration_secs);
}

/// Record the time taken to reach `stage`
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(duration_secs);
}

/// Record how long an external media tool ran
pub fn record_tool_duration(tool: &str, duration_secs: f64) {
    TOOL_DURATION.with_label_values(&[tool]).observe(duration_secs);
}

/// Record a thumbnail upload
pub fn record_thumbnail(success: bool) {
    let status = if success { "success" } else { "failure" };
    THUMBNAILS_TOTAL.with_label_values(&[status]).inc();
}

/// Record authentication attempt
pub fn record_auth_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
