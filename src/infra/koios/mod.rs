//! Koios REST backend for Cardano.

pub mod client;
pub mod network;
pub mod normalize;
pub mod records;

pub use client::{KoiosApi, KoiosHttpClient};
pub use network::KoiosNetwork;
