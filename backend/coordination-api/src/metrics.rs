use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref REQUESTS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "coordination_requests_created_total",
        "Total number of representative requests created",
        &["type"]
    )
    .unwrap();

    pub static ref REQUEST_RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "coordination_request_responses_total",
        "Total number of lecturer responses recorded",
        &["decision"]
    )
    .unwrap();

    pub static ref ANNOUNCEMENTS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        "coordination_announcements_sent_total",
        "Total number of announcements sent",
        &["type"]
    )
    .unwrap();

    pub static ref CAS_CONFLICTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "coordination_cas_conflicts_total",
        "Conditional writes rejected due to a stale document version",
        &["collection"]
    )
    .unwrap();

    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "coordination_notifications_total",
        "Notification delivery attempts",
        &["status"]
    )
    .unwrap();

    pub static ref SUBSCRIPTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "coordination_subscriptions_active",
        "Currently active request change-feed subscriptions"
    )
    .unwrap();
}

pub fn render_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
