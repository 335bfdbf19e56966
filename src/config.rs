use clap::Parser;
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::limiter::RateLimitPolicy;

// Max requests per client per window
pub const RATE_LIMIT: u32 = 50;
// Window length in milliseconds
pub const RATE_LIMIT_WINDOW_MS: u64 = 60_000;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "medchat-gateway")]
#[command(about = "Rate limited API gateway for the medical chat assistant")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = RATE_LIMIT)]
    pub rate_limit: u32,

    // Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = RATE_LIMIT_WINDOW_MS)]
    pub rate_window_ms: u64,

    // How often expired windows are swept, in seconds
    #[arg(long, env = "RATE_LIMIT_PURGE_SECS", default_value_t = 60)]
    pub purge_interval: u64,

    // Take the client key from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long, env = "TRUST_FORWARDED_FOR", default_value_t = false)]
    pub trust_forwarded_for: bool,

    // OpenAI compatible API base url
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub llm_api_key: String,

    // Model for text-only conversations
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4-turbo-preview")]
    pub llm_model: String,

    // Model used when an image is attached
    #[arg(long, env = "LLM_VISION_MODEL", default_value = "gpt-4.1-mini")]
    pub llm_vision_model: String,

    // Base for relative attachment urls such as /api/v1/files/{id}
    #[arg(long, env = "FILE_BASE_URL")]
    pub file_base_url: Option<String>,
}

impl Args {
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            limit: self.rate_limit,
            window: Duration::from_millis(self.rate_window_ms),
        }
    }

    /// Refuse to start without the language model API key.
    pub fn validate(&self) -> Result<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(GatewayError::Config(
                "missing OPENAI_API_KEY (or --llm-api-key)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn purge_every(&self) -> Duration {
        Duration::from_secs(self.purge_interval.max(1))
    }
}
