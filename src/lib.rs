//! Rate limited API gateway for the medical chat assistant.
//!
//! Every request under `/api` passes a per-client fixed-window rate limiter
//! before reaching its handler; the chat handler proxies to an OpenAI
//! compatible language model API.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
