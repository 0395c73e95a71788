//! SQLite durable tier for the bar cache.

mod migrations;
mod pool;
mod sqlite;

pub use migrations::{run_migrations, verify_schema};
pub use pool::{connect, DbPool};
pub use sqlite::SqliteBarStore;
