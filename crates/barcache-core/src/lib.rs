//! Core types and traits for the bar cache.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, CachedBar, CacheKey, CacheQuery)
//! - Provider priority and the shared conflict-resolution rule
//! - Core traits for durable bar stores and upstream bar providers

pub mod types;
pub mod traits;
pub mod error;

pub use error::{CacheError, CacheResult};
pub use types::*;
pub use traits::*;
