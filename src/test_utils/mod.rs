//! Test utilities and mock implementations.
//!
//! This module provides in-memory implementations of the backend client
//! traits and of the transaction store, for use in unit and integration
//! tests of the network facades.

pub mod mocks;

pub use mocks::{
    KOIOS_PAGE_ROWS, MockConfig, MockEvmRpc, MockGraphQlApi, MockKoiosApi,
    MockTransactionStore,
};
