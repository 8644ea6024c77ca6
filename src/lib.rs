//! Bridge Chain Query
//!
//! Read-mostly access to the chains a cross-chain bridge watches, behind one
//! abstraction per chain family and one adapter per backend.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Application Layer              │
//! │   Configuration, backend selection           │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │   Network traits, canonical types, errors    │
//! ├─────────────────────────────────────────────┤
//! │                 Chain Layer                  │
//! │   Failure classification, normalization,    │
//! │   box validity                               │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │  Koios, cardano-graphql and EVM JSON-RPC     │
//! │  adapters, PostgreSQL store, observability   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every public network operation either returns a canonical value or fails
//! with exactly one [`domain::ChainError`] kind: `Network` (retry later),
//! `Failed` (the backend rejected the request) or `UnexpectedApi` (the
//! backend answered with something unusable).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_chain_query::domain::{CardanoNetwork, ChainNetwork};
//! use bridge_chain_query::infra::{HttpClientConfig, KoiosHttpClient, KoiosNetwork};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = KoiosHttpClient::new("https://preprod.koios.rest/api/v1", &HttpClientConfig::default())?;
//!     let network = KoiosNetwork::new(Arc::new(client));
//!
//!     let height = network.get_height().await?;
//!     let params = network.get_protocol_parameters().await?;
//!     println!("{height} {params:?}");
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod chain;
pub mod domain;
pub mod infra;

// Test utilities are available in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
