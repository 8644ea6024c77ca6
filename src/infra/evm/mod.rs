//! EVM JSON-RPC backend.

pub mod client;
pub mod network;
pub mod normalize;
pub mod records;

pub use client::{EvmRpc, JsonRpcClient, classify_rpc_error};
pub use network::EvmRpcNetwork;
