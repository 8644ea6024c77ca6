//! Capability traits implemented by each backend adapter.

use async_trait::async_trait;
use num_bigint::BigUint;

use super::error::{ChainError, StoreError};
use super::types::{
    AssetBalance, BlockInfo, BoxId, ChainTx, EvmCall, EvmTx, ProtocolParameters, TokenDetail,
    TransactionRecord, Utxo,
};

/// Query operations common to every chain backend.
///
/// Implementations hold no cross-call state: each call builds its result
/// from live backend data and either returns a canonical value or fails with
/// exactly one classified [`ChainError`].
#[async_trait]
pub trait ChainNetwork: Send + Sync {
    /// Transaction shape of this chain family.
    type Tx: Send;

    /// Current chain height.
    async fn get_height(&self) -> Result<u64, ChainError>;

    /// Number of blocks on top of the block containing `tx_id`.
    ///
    /// Returns `-1` when the transaction exists neither on chain nor in the
    /// mempool; absence is never an error.
    async fn get_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError>;

    /// Native and token balance of `address`.
    async fn get_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError>;

    /// Ids of the transactions included in `block_id`.
    async fn get_block_transaction_ids(&self, block_id: &str) -> Result<Vec<String>, ChainError>;

    async fn get_block_info(&self, block_id: &str) -> Result<BlockInfo, ChainError>;

    /// Fetches `tx_id` and verifies that it belongs to `block_id`.
    async fn get_transaction(&self, tx_id: &str, block_id: &str) -> Result<Self::Tx, ChainError>;

    /// Hands a signed transaction to the backend's submission endpoint.
    ///
    /// Success means accepted for relay, not confirmed.
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<(), ChainError>;

    /// Transactions currently in the mempool.
    ///
    /// Backends without mempool visibility return an empty list.
    async fn get_mempool_transactions(&self) -> Result<Vec<Self::Tx>, ChainError> {
        Ok(Vec::new())
    }
}

/// UTXO-specific operations of Cardano backends.
#[async_trait]
pub trait CardanoNetwork: ChainNetwork<Tx = ChainTx> {
    async fn get_utxo(&self, box_id: &BoxId) -> Result<Utxo, ChainError>;

    /// Unspent outputs owned by `address`, paginated by `offset`/`limit`.
    async fn get_address_boxes(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Utxo>, ChainError>;

    /// Whether `box_id` still exists and is unspent.
    async fn is_box_unspent_and_valid(&self, box_id: &BoxId) -> Result<bool, ChainError>;

    async fn get_protocol_parameters(&self) -> Result<ProtocolParameters, ChainError>;
}

/// Account-model operations of EVM backends.
#[async_trait]
pub trait EvmNetwork: ChainNetwork<Tx = EvmTx> {
    async fn get_token_detail(&self, contract: &str) -> Result<TokenDetail, ChainError>;

    async fn get_address_balance_for_erc20_asset(
        &self,
        address: &str,
        contract: &str,
    ) -> Result<BigUint, ChainError>;

    async fn get_address_balance_for_native_asset(
        &self,
        address: &str,
    ) -> Result<BigUint, ChainError>;

    /// Next nonce, counting pending transactions.
    async fn get_address_next_available_nonce(&self, address: &str) -> Result<u64, ChainError>;

    async fn get_gas_required(&self, call: &EvmCall) -> Result<BigUint, ChainError>;

    async fn get_max_fee_per_gas(&self) -> Result<BigUint, ChainError>;

    async fn get_max_priority_fee_per_gas(&self) -> Result<BigUint, ChainError>;
}

/// Local store of transactions observed by the bridge.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Looks up a record by the hash of its unsigned form.
    async fn find_by_unsigned_hash(
        &self,
        chain: &str,
        unsigned_hash: &str,
    ) -> Result<Option<TransactionRecord>, StoreError>;
}
