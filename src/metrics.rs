use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("medchat_api_requests_total", "Total number of API requests checked").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("medchat_rate_limited_total", "API requests rejected with 429").unwrap();
    pub static ref CHAT_LATENCY: Histogram = register_histogram!(
        "medchat_chat_latency_seconds",
        "Language model round trip latency in seconds"
    )
    .unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("medchat_upstream_errors_total", "Failed language model calls").unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge =
        register_gauge!("medchat_rate_limit_keys", "Client keys currently tracked by the rate limiter").unwrap();
}
