//! Concrete transaction store implementations.

pub mod postgres;

pub use postgres::{PostgresConfig, PostgresTransactionStore};
