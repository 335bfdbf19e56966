use crate::limiter::RateLimiter;
use crate::llm::LlmClient;
use std::sync::Arc;

// app's shared state
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub llm: LlmClient,
    pub trust_forwarded_for: bool, // key clients by X-Forwarded-For
}
