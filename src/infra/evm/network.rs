//! Chain query facade over an EVM JSON-RPC node.

use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::{debug, instrument};

use crate::chain::ClassifyExt;
use crate::chain::normalize::{hex_amount, hex_integer};
use crate::domain::{
    AssetBalance, BlockInfo, ChainError, ChainNetwork, EvmCall, EvmNetwork, EvmTx, TokenAmount,
    TokenDetail, TransactionStore,
};
use crate::infra::observability::report;

use super::client::EvmRpc;
use super::normalize::{self, IERC20};
use super::records::RpcBlock;

const BACKEND: &str = "evm-rpc";

/// [`EvmNetwork`] backed by a JSON-RPC node.
///
/// Confirmation queries go through the local transaction store first, since
/// callers may hold the unsigned hash of a transaction the bridge signed.
pub struct EvmRpcNetwork {
    rpc: Arc<dyn EvmRpc>,
    store: Arc<dyn TransactionStore>,
    chain: String,
    supported_tokens: Vec<String>,
}

impl EvmRpcNetwork {
    /// `chain` is the key under which the store records transactions;
    /// `supported_tokens` are the ERC-20 contracts reported by
    /// [`ChainNetwork::get_address_assets`].
    #[must_use]
    pub fn new(
        rpc: Arc<dyn EvmRpc>,
        store: Arc<dyn TransactionStore>,
        chain: impl Into<String>,
        supported_tokens: Vec<String>,
    ) -> Self {
        Self {
            rpc,
            store,
            chain: chain.into(),
            supported_tokens,
        }
    }

    async fn fetch_height(&self) -> Result<u64, ChainError> {
        let raw = self.rpc.block_number().await?;
        hex_integer("blockNumber", Some(raw.as_str()))
    }

    /// Hash to query on chain for `tx_id`.
    async fn resolve_hash(&self, tx_id: &str) -> Result<String, ChainError> {
        let record = self.store.find_by_unsigned_hash(&self.chain, tx_id).await?;
        Ok(match record {
            Some(record) => {
                debug!(
                    unsigned = %tx_id,
                    signed = %record.chain_hash(),
                    "Resolved stored transaction"
                );
                record.chain_hash().to_string()
            }
            None => tx_id.to_string(),
        })
    }

    async fn fetch_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError> {
        let hash = self.resolve_hash(tx_id).await?;
        if let Some(receipt) = self.rpc.transaction_receipt(&hash).await? {
            let included_at = hex_integer("blockNumber", receipt.block_number.as_deref())?;
            let height = self.fetch_height().await?;
            let depth = height.saturating_sub(included_at);
            return i64::try_from(depth).map_err(|_| {
                ChainError::unexpected(format!("confirmation depth out of range: {depth}"))
            });
        }
        if self.rpc.transaction_by_hash(&hash).await?.is_some() {
            return Ok(0);
        }
        Ok(-1)
    }

    async fn fetch_native_balance(&self, address: &str) -> Result<BigUint, ChainError> {
        let address = normalize::parse_address(address)?;
        let raw = self.rpc.balance(&normalize::hex_address(&address)).await?;
        hex_amount("balance", Some(raw.as_str()))
    }

    async fn fetch_erc20_balance(
        &self,
        address: &str,
        contract: &str,
    ) -> Result<BigUint, ChainError> {
        let owner = normalize::parse_address(address)?;
        let contract = normalize::parse_address(contract)?;
        let data = normalize::encode_call(&IERC20::balanceOfCall { owner });
        let raw = self.rpc.call(&normalize::erc20_call(&contract, data)).await?;
        let balance = normalize::decode_return::<IERC20::balanceOfCall>(&raw)?;
        Ok(normalize::u256_to_biguint(balance))
    }

    async fn fetch_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError> {
        let mut balance = AssetBalance::empty();
        balance.native_amount = self.fetch_native_balance(address).await?;
        for contract in &self.supported_tokens {
            let amount = self.fetch_erc20_balance(address, contract).await?;
            if amount == BigUint::ZERO {
                continue;
            }
            balance.tokens.push(TokenAmount {
                id: normalize::hex_address(&normalize::parse_address(contract)?),
                amount,
            });
        }
        Ok(balance)
    }

    async fn fetch_block(&self, block_id: &str) -> Result<RpcBlock, ChainError> {
        self.rpc
            .block_by_hash(block_id)
            .await?
            .ok_or_else(|| ChainError::failed("Block not found"))
    }

    async fn fetch_transaction(&self, tx_id: &str, block_id: &str) -> Result<EvmTx, ChainError> {
        let tx = self
            .rpc
            .transaction_by_hash(tx_id)
            .await?
            .ok_or_else(|| ChainError::failed(format!("Transaction [{tx_id}] not found")))?;
        let belongs = tx
            .block_hash
            .as_deref()
            .is_some_and(|hash| hash.eq_ignore_ascii_case(block_id));
        if !belongs {
            return Err(ChainError::failed(format!(
                "Transaction [{tx_id}] does not belong to block [{block_id}]"
            )));
        }
        normalize::transaction(&tx)
    }

    async fn fetch_token_detail(&self, contract: &str) -> Result<TokenDetail, ChainError> {
        let address = normalize::parse_address(contract)?;

        let data = normalize::encode_call(&IERC20::nameCall {});
        let raw = self.rpc.call(&normalize::erc20_call(&address, data)).await?;
        let name = normalize::decode_return::<IERC20::nameCall>(&raw)?;

        let data = normalize::encode_call(&IERC20::symbolCall {});
        let raw = self.rpc.call(&normalize::erc20_call(&address, data)).await?;
        let symbol = normalize::decode_return::<IERC20::symbolCall>(&raw)?;

        let data = normalize::encode_call(&IERC20::decimalsCall {});
        let raw = self.rpc.call(&normalize::erc20_call(&address, data)).await?;
        let decimals = normalize::decode_return::<IERC20::decimalsCall>(&raw)?;

        Ok(TokenDetail {
            token_id: normalize::hex_address(&address),
            name,
            symbol,
            decimals,
        })
    }

    async fn fetch_next_nonce(&self, address: &str) -> Result<u64, ChainError> {
        let address = normalize::parse_address(address)?;
        let raw = self
            .rpc
            .pending_transaction_count(&normalize::hex_address(&address))
            .await?;
        hex_integer("transactionCount", Some(raw.as_str()))
    }

    async fn fetch_gas_required(&self, call: &EvmCall) -> Result<BigUint, ChainError> {
        let request = normalize::call_request(call)?;
        let raw = self.rpc.estimate_gas(&request).await?;
        hex_amount("gas", Some(raw.as_str()))
    }

    async fn fetch_priority_fee(&self) -> Result<BigUint, ChainError> {
        let raw = self.rpc.max_priority_fee_per_gas().await?;
        hex_amount("maxPriorityFeePerGas", Some(raw.as_str()))
    }

    async fn fetch_max_fee(&self) -> Result<BigUint, ChainError> {
        let block = self
            .rpc
            .latest_block()
            .await?
            .ok_or_else(|| ChainError::unexpected("latest block is missing"))?;
        let priority_fee = self.fetch_priority_fee().await?;
        normalize::max_fee_per_gas(&block, &priority_fee)
    }
}

#[async_trait]
impl ChainNetwork for EvmRpcNetwork {
    type Tx = EvmTx;

    #[instrument(skip(self))]
    async fn get_height(&self) -> Result<u64, ChainError> {
        let result = self
            .fetch_height()
            .await
            .classify_err("Failed to get current height from EVM node: ");
        report(BACKEND, "get_height", result)
    }

    #[instrument(skip(self))]
    async fn get_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError> {
        let result = self
            .fetch_tx_confirmation(tx_id)
            .await
            .classify_with(|| {
                format!("Failed to get confirmation for tx [{tx_id}] from EVM node: ")
            });
        report(BACKEND, "get_tx_confirmation", result)
    }

    #[instrument(skip(self))]
    async fn get_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError> {
        let result = self
            .fetch_address_assets(address)
            .await
            .classify_with(|| format!("Failed to get address [{address}] assets from EVM node: "));
        report(BACKEND, "get_address_assets", result)
    }

    #[instrument(skip(self))]
    async fn get_block_transaction_ids(&self, block_id: &str) -> Result<Vec<String>, ChainError> {
        let result = self
            .fetch_block(block_id)
            .await
            .and_then(|block| normalize::block_transaction_ids(&block))
            .classify_with(|| {
                format!("Failed to get block [{block_id}] transaction ids from EVM node: ")
            });
        report(BACKEND, "get_block_transaction_ids", result)
    }

    #[instrument(skip(self))]
    async fn get_block_info(&self, block_id: &str) -> Result<BlockInfo, ChainError> {
        let result = self
            .fetch_block(block_id)
            .await
            .and_then(|block| normalize::block_info(&block))
            .classify_with(|| format!("Failed to get block [{block_id}] info from EVM node: "));
        report(BACKEND, "get_block_info", result)
    }

    #[instrument(skip(self))]
    async fn get_transaction(&self, tx_id: &str, block_id: &str) -> Result<EvmTx, ChainError> {
        let result = self
            .fetch_transaction(tx_id, block_id)
            .await
            .classify_with(|| {
                format!("Failed to get transaction [{tx_id}] of block [{block_id}] from EVM node: ")
            });
        report(BACKEND, "get_transaction", result)
    }

    #[instrument(skip(self, signed_tx), fields(size = signed_tx.len()))]
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<(), ChainError> {
        let raw_hex = format!("0x{}", hex::encode(signed_tx));
        let result = self
            .rpc
            .send_raw_transaction(&raw_hex)
            .await
            .map(|hash| {
                debug!(tx_hash = %hash, "Transaction accepted by EVM node");
            })
            .classify_err("Failed to submit transaction to EVM node: ");
        report(BACKEND, "submit_transaction", result)
    }
}

#[async_trait]
impl EvmNetwork for EvmRpcNetwork {
    #[instrument(skip(self))]
    async fn get_token_detail(&self, contract: &str) -> Result<TokenDetail, ChainError> {
        let result = self
            .fetch_token_detail(contract)
            .await
            .classify_with(|| format!("Failed to get token [{contract}] detail from EVM node: "));
        report(BACKEND, "get_token_detail", result)
    }

    #[instrument(skip(self))]
    async fn get_address_balance_for_erc20_asset(
        &self,
        address: &str,
        contract: &str,
    ) -> Result<BigUint, ChainError> {
        let result = self
            .fetch_erc20_balance(address, contract)
            .await
            .classify_with(|| {
                format!(
                    "Failed to get token [{contract}] balance of address [{address}] from EVM node: "
                )
            });
        report(BACKEND, "get_address_balance_for_erc20_asset", result)
    }

    #[instrument(skip(self))]
    async fn get_address_balance_for_native_asset(
        &self,
        address: &str,
    ) -> Result<BigUint, ChainError> {
        let result = self
            .fetch_native_balance(address)
            .await
            .classify_with(|| {
                format!("Failed to get native balance of address [{address}] from EVM node: ")
            });
        report(BACKEND, "get_address_balance_for_native_asset", result)
    }

    #[instrument(skip(self))]
    async fn get_address_next_available_nonce(&self, address: &str) -> Result<u64, ChainError> {
        let result = self
            .fetch_next_nonce(address)
            .await
            .classify_with(|| {
                format!("Failed to get next nonce of address [{address}] from EVM node: ")
            });
        report(BACKEND, "get_address_next_available_nonce", result)
    }

    #[instrument(skip(self, call), fields(to = %call.to))]
    async fn get_gas_required(&self, call: &EvmCall) -> Result<BigUint, ChainError> {
        let result = self
            .fetch_gas_required(call)
            .await
            .classify_with(|| {
                format!("Failed to estimate gas for call to [{}] on EVM node: ", call.to)
            });
        report(BACKEND, "get_gas_required", result)
    }

    #[instrument(skip(self))]
    async fn get_max_fee_per_gas(&self) -> Result<BigUint, ChainError> {
        let result = self
            .fetch_max_fee()
            .await
            .classify_err("Failed to get max fee per gas from EVM node: ");
        report(BACKEND, "get_max_fee_per_gas", result)
    }

    #[instrument(skip(self))]
    async fn get_max_priority_fee_per_gas(&self) -> Result<BigUint, ChainError> {
        let result = self
            .fetch_priority_fee()
            .await
            .classify_err("Failed to get max priority fee per gas from EVM node: ");
        report(BACKEND, "get_max_priority_fee_per_gas", result)
    }
}
