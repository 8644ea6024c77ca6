//! Infrastructure layer: backend adapters, the transaction store and
//! observability setup.

pub mod database;
pub mod evm;
pub mod graphql;
pub mod http;
pub mod koios;
pub mod observability;

pub use database::{PostgresConfig, PostgresTransactionStore};
pub use evm::{EvmRpc, EvmRpcNetwork, JsonRpcClient};
pub use graphql::{GraphQlApi, GraphQlHttpClient, GraphQlNetwork};
pub use http::HttpClientConfig;
pub use koios::{KoiosApi, KoiosHttpClient, KoiosNetwork};
