//! HTTP client module
//!
//! Thin wrapper over reqwest with a base URL, ordered query parameters and a
//! governor token bucket in front of every request.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
