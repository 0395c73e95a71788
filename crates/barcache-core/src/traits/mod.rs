//! Core traits for the bar cache.

mod bar_store;
mod provider;

pub use bar_store::BarStore;
pub use provider::BarProvider;
