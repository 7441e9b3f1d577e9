//! Adapter configuration parsed from connection URLs.

mod connection;

pub use connection::{ConnectionConfig, DEFAULT_SCHEMA, MAX_POOL_SIZE};
