//! Shared infrastructure for the recibo workspace.
//!
//! Currently limited to database pool construction and embedded migrations.

mod pool;

pub use pool::{create_migration_pool, create_pool, run_migrations, PoolError};
