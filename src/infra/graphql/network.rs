//! Chain query facade over cardano-graphql.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::chain::ClassifyExt;
use crate::chain::normalize::required;
use crate::domain::{
    AssetBalance, BlockInfo, BoxId, CardanoNetwork, ChainError, ChainNetwork, ChainTx,
    ProtocolParameters, Utxo,
};
use crate::infra::observability::report;

use super::client::GraphQlApi;
use super::normalize;
use super::records::{GqlBlock, GqlTransaction};

const BACKEND: &str = "graphql";

/// [`CardanoNetwork`] backed by a cardano-graphql server.
///
/// The indexer answers unspent-output lookups by `(txHash, index)`, so box
/// validity takes a single round trip.
pub struct GraphQlNetwork {
    api: Arc<dyn GraphQlApi>,
}

impl GraphQlNetwork {
    #[must_use]
    pub fn new(api: Arc<dyn GraphQlApi>) -> Self {
        Self { api }
    }

    async fn tip_number(&self) -> Result<u64, ChainError> {
        let tip = self.api.tip().await?;
        let tip = required("cardano.tip", tip.as_ref())?;
        required("tip.number", tip.number)
    }

    async fn find_transaction(&self, tx_id: &str) -> Result<Option<GqlTransaction>, ChainError> {
        let mut transactions = self.api.transactions(&[tx_id.to_string()]).await?;
        Ok(transactions
            .iter()
            .position(|tx| tx.hash.as_deref() == Some(tx_id))
            .map(|at| transactions.swap_remove(at)))
    }

    async fn fetch_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError> {
        let Some(tx) = self.find_transaction(tx_id).await? else {
            return Ok(-1);
        };
        let included_at = normalize::transaction_block_number(&tx)?;
        let height = self.tip_number().await?;
        let depth = height.saturating_sub(included_at);
        i64::try_from(depth)
            .map_err(|_| {
                ChainError::unexpected(format!("confirmation depth out of range: {depth}"))
            })
    }

    async fn fetch_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError> {
        let addresses = self.api.payment_addresses(&[address.to_string()]).await?;
        let summary = addresses
            .iter()
            .find(|entry| entry.address.as_deref() == Some(address));
        normalize::asset_balance(summary)
    }

    async fn fetch_block(&self, block_id: &str) -> Result<GqlBlock, ChainError> {
        self.api
            .blocks(block_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::failed("Block not found"))
    }

    async fn fetch_transaction(&self, tx_id: &str, block_id: &str) -> Result<ChainTx, ChainError> {
        let tx = self
            .find_transaction(tx_id)
            .await?
            .ok_or_else(|| ChainError::failed(format!("Transaction [{tx_id}] not found")))?;
        if normalize::transaction_block_hash(&tx)? != block_id {
            return Err(ChainError::failed(format!(
                "Transaction [{tx_id}] does not belong to block [{block_id}]"
            )));
        }
        normalize::transaction(&tx)
    }

    async fn fetch_utxo(&self, box_id: &BoxId) -> Result<Utxo, ChainError> {
        let tx = self.find_transaction(&box_id.tx_id).await?.ok_or_else(|| {
            ChainError::failed(format!("Transaction [{}] not found", box_id.tx_id))
        })?;
        let outputs = required("outputs", tx.outputs.as_ref())?;
        let output = outputs
            .iter()
            .find(|output| output.index == Some(box_id.index))
            .ok_or_else(|| {
                ChainError::unexpected(format!(
                    "transaction [{}] has no output at index {}",
                    box_id.tx_id, box_id.index
                ))
            })?;
        normalize::output_utxo(&box_id.tx_id, output)
    }

    async fn fetch_address_boxes(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Utxo>, ChainError> {
        let rows = self.api.address_utxos(address, offset, limit).await?;
        rows.iter().map(normalize::utxo).collect()
    }

    async fn fetch_box_validity(&self, box_id: &BoxId) -> Result<bool, ChainError> {
        let utxos = self.api.utxos_by_ref(&box_id.tx_id, box_id.index).await?;
        Ok(utxos.iter().any(|utxo| {
            utxo.tx_hash.as_deref() == Some(box_id.tx_id.as_str())
                && utxo.index == Some(box_id.index)
        }))
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ChainError> {
        let params = self.api.protocol_params().await?;
        normalize::protocol_parameters(required("currentEpoch.protocolParams", params.as_ref())?)
    }
}

#[async_trait]
impl ChainNetwork for GraphQlNetwork {
    type Tx = ChainTx;

    #[instrument(skip(self))]
    async fn get_height(&self) -> Result<u64, ChainError> {
        let result = self
            .tip_number()
            .await
            .classify_err("Failed to get current height from GraphQL: ");
        report(BACKEND, "get_height", result)
    }

    #[instrument(skip(self))]
    async fn get_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError> {
        let result = self
            .fetch_tx_confirmation(tx_id)
            .await
            .classify_with(|| {
                format!("Failed to get confirmation for tx [{tx_id}] from GraphQL: ")
            });
        report(BACKEND, "get_tx_confirmation", result)
    }

    #[instrument(skip(self))]
    async fn get_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError> {
        let result = self
            .fetch_address_assets(address)
            .await
            .classify_with(|| format!("Failed to get address [{address}] assets from GraphQL: "));
        report(BACKEND, "get_address_assets", result)
    }

    #[instrument(skip(self))]
    async fn get_block_transaction_ids(&self, block_id: &str) -> Result<Vec<String>, ChainError> {
        let result = self
            .fetch_block(block_id)
            .await
            .and_then(|block| normalize::block_transaction_ids(&block))
            .classify_with(|| {
                format!("Failed to get block [{block_id}] transaction ids from GraphQL: ")
            });
        report(BACKEND, "get_block_transaction_ids", result)
    }

    #[instrument(skip(self))]
    async fn get_block_info(&self, block_id: &str) -> Result<BlockInfo, ChainError> {
        let result = self
            .fetch_block(block_id)
            .await
            .and_then(|block| normalize::block_info(&block))
            .classify_with(|| format!("Failed to get block [{block_id}] info from GraphQL: "));
        report(BACKEND, "get_block_info", result)
    }

    #[instrument(skip(self))]
    async fn get_transaction(&self, tx_id: &str, block_id: &str) -> Result<ChainTx, ChainError> {
        let result = self
            .fetch_transaction(tx_id, block_id)
            .await
            .classify_with(|| {
                format!("Failed to get transaction [{tx_id}] of block [{block_id}] from GraphQL: ")
            });
        report(BACKEND, "get_transaction", result)
    }

    #[instrument(skip(self, signed_tx), fields(size = signed_tx.len()))]
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<(), ChainError> {
        let result = self
            .api
            .submit_transaction(&hex::encode(signed_tx))
            .await
            .map(|hash| {
                debug!(tx_hash = %hash, "Transaction accepted by GraphQL");
            })
            .classify_err("Failed to submit transaction to GraphQL: ");
        report(BACKEND, "submit_transaction", result)
    }
}

#[async_trait]
impl CardanoNetwork for GraphQlNetwork {
    #[instrument(skip(self), fields(box_id = %box_id))]
    async fn get_utxo(&self, box_id: &BoxId) -> Result<Utxo, ChainError> {
        let result = self
            .fetch_utxo(box_id)
            .await
            .classify_with(|| format!("Failed to get box [{box_id}] from GraphQL: "));
        report(BACKEND, "get_utxo", result)
    }

    #[instrument(skip(self))]
    async fn get_address_boxes(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Utxo>, ChainError> {
        let result = self
            .fetch_address_boxes(address, offset, limit)
            .await
            .classify_with(|| {
                format!(
                    "Failed to get boxes of address [{address}] (offset {offset}, limit {limit}) from GraphQL: "
                )
            });
        report(BACKEND, "get_address_boxes", result)
    }

    #[instrument(skip(self), fields(box_id = %box_id))]
    async fn is_box_unspent_and_valid(&self, box_id: &BoxId) -> Result<bool, ChainError> {
        let result = self
            .fetch_box_validity(box_id)
            .await
            .classify_with(|| format!("Failed to check box [{box_id}] validity on GraphQL: "));
        report(BACKEND, "is_box_unspent_and_valid", result)
    }

    #[instrument(skip(self))]
    async fn get_protocol_parameters(&self) -> Result<ProtocolParameters, ChainError> {
        let result = self
            .fetch_protocol_parameters()
            .await
            .classify_err("Failed to get protocol parameters from GraphQL: ");
        report(BACKEND, "get_protocol_parameters", result)
    }
}
