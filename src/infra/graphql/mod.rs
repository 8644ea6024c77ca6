//! cardano-graphql backend.

pub mod client;
pub mod network;
pub mod normalize;
pub mod records;

pub use client::{GraphQlApi, GraphQlHttpClient};
pub use network::GraphQlNetwork;
