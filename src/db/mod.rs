//! Database connection pooling for PostGIS access.
//!
//! All of C1/C3/C4/C5/C6 share a single pool, built once at startup.

mod pool;

pub use pool::{PoolSettings, PostgresPool};
