//! Core components of the `portfolio-api` crate.
//!
//! This module contains the foundational building blocks shared by both integrations:
//! - The [`ApiClient`] with its builder and the retrying request executor.
//! - The primary [`ApiError`] type.
//! - The single-flight [`ResponseCache`].

/// Single-flight, time-boxed payload cache.
pub mod cache;
/// The HTTP client (`ApiClient`), builder, and retry policy.
pub mod client;
/// The primary error type (`ApiError`) for the crate.
pub mod error;

pub(crate) mod net;

// convenient re-exports so most code can just `use crate::core::ApiClient`
pub use cache::{CacheStatus, Cached, ResponseCache};
pub use client::{ApiClient, ApiClientBuilder, Backoff, RetryConfig};
pub use error::ApiError;
