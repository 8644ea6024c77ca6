//! Domain layer containing canonical chain types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChainError, ConfigError, ErrorKind, StoreError};
pub use traits::{CardanoNetwork, ChainNetwork, EvmNetwork, TransactionStore};
pub use types::{
    Asset, AssetBalance, BlockId, BlockInfo, BoxCandidate, BoxId, ChainTx, EvmCall, EvmTx,
    ProtocolParameters, TokenAmount, TokenDetail, TransactionRecord, TxId, TxMetadata, Utxo,
};
