//! Chain query facade over a Koios REST indexer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::chain::normalize::{required, required_str};
use crate::chain::{
    ClassifyExt, CredentialOutput, CredentialUtxoIndex, OutputRef, is_box_unspent,
};
use crate::domain::{
    AssetBalance, BlockInfo, BoxId, CardanoNetwork, ChainError, ChainNetwork, ChainTx,
    ProtocolParameters, Utxo,
};
use crate::infra::observability::report;

use super::client::KoiosApi;
use super::normalize;

const BACKEND: &str = "koios";

/// [`CardanoNetwork`] backed by Koios.
///
/// Koios has no direct "is this output unspent" query, so box validity goes
/// through the payment-credential indirection in [`is_box_unspent`]. It also
/// has no mempool visibility.
pub struct KoiosNetwork {
    api: Arc<dyn KoiosApi>,
}

impl KoiosNetwork {
    #[must_use]
    pub fn new(api: Arc<dyn KoiosApi>) -> Self {
        Self { api }
    }

    async fn fetch_height(&self) -> Result<u64, ChainError> {
        let tips = self.api.tip().await?;
        let tip = tips
            .first()
            .ok_or_else(|| ChainError::unexpected("tip response is empty"))?;
        normalize::height(tip)
    }

    async fn fetch_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError> {
        let statuses = self.api.tx_status(&[tx_id.to_string()]).await?;
        Ok(statuses
            .iter()
            .find(|status| status.tx_hash.as_deref() == Some(tx_id))
            .and_then(|status| status.num_confirmations)
            .unwrap_or(-1))
    }

    async fn fetch_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError> {
        let addresses = [address.to_string()];
        let infos = self.api.address_info(&addresses).await?;
        let tokens = self.api.address_assets(&addresses).await?;
        normalize::asset_balance(infos.first(), &tokens)
    }

    async fn fetch_block_info(&self, block_id: &str) -> Result<BlockInfo, ChainError> {
        let blocks = self.api.block_info(&[block_id.to_string()]).await?;
        let block = blocks
            .first()
            .ok_or_else(|| ChainError::failed("Block not found"))?;
        normalize::block_info(block)
    }

    async fn fetch_block_transaction_ids(&self, block_id: &str) -> Result<Vec<String>, ChainError> {
        let hashes = [block_id.to_string()];
        let rows = self.api.block_txs(&hashes).await?;
        if rows.is_empty() {
            // An empty answer is either an empty block or an unknown one.
            let blocks = self.api.block_info(&hashes).await?;
            if blocks.is_empty() {
                return Err(ChainError::failed("Block not found"));
            }
            return Ok(Vec::new());
        }
        rows.iter()
            .map(|row| required_str("tx_hash", &row.tx_hash).map(str::to_string))
            .collect()
    }

    async fn fetch_transaction(&self, tx_id: &str, block_id: &str) -> Result<ChainTx, ChainError> {
        let infos = self.api.tx_info(&[tx_id.to_string()]).await?;
        let info = infos
            .first()
            .ok_or_else(|| ChainError::failed(format!("Transaction [{tx_id}] not found")))?;
        let tx_block = required_str("block_hash", &info.block_hash)?;
        if tx_block != block_id {
            return Err(ChainError::failed(format!(
                "Transaction [{tx_id}] does not belong to block [{block_id}]"
            )));
        }
        normalize::transaction(info)
    }

    async fn fetch_utxo(&self, box_id: &BoxId) -> Result<Utxo, ChainError> {
        let infos = self.api.tx_info(&[box_id.tx_id.clone()]).await?;
        let info = infos.first().ok_or_else(|| {
            ChainError::failed(format!("Transaction [{}] not found", box_id.tx_id))
        })?;
        let outputs = required("outputs", info.outputs.as_ref())?;
        let output = outputs
            .iter()
            .find(|output| output.tx_index == Some(box_id.index))
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

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ChainError> {
        let tips = self.api.tip().await?;
        let tip = tips
            .first()
            .ok_or_else(|| ChainError::unexpected("tip response is empty"))?;
        let epoch = required("epoch_no", tip.epoch_no)?;
        let params = self.api.epoch_params(epoch).await?;
        let params = params.first().ok_or_else(|| {
            ChainError::unexpected(format!("no protocol parameters for epoch {epoch}"))
        })?;
        normalize::protocol_parameters(params)
    }
}

#[async_trait]
impl CredentialUtxoIndex for KoiosNetwork {
    async fn transaction_outputs(
        &self,
        tx_id: &str,
    ) -> Result<Option<Vec<CredentialOutput>>, ChainError> {
        let infos = self.api.tx_info(&[tx_id.to_string()]).await?;
        let Some(info) = infos.first() else {
            return Ok(None);
        };
        required("outputs", info.outputs.as_ref())?
            .iter()
            .map(normalize::credential_output)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    async fn unspent_outputs_for_credential(
        &self,
        credential: &str,
        box_id: &BoxId,
    ) -> Result<Vec<OutputRef>, ChainError> {
        let rows = self
            .api
            .credential_utxos(&[credential.to_string()], Some(box_id))
            .await?;
        rows.iter().map(normalize::output_ref).collect()
    }
}

#[async_trait]
impl ChainNetwork for KoiosNetwork {
    type Tx = ChainTx;

    #[instrument(skip(self))]
    async fn get_height(&self) -> Result<u64, ChainError> {
        let result = self
            .fetch_height()
            .await
            .classify_err("Failed to get current height from Koios: ");
        report(BACKEND, "get_height", result)
    }

    #[instrument(skip(self))]
    async fn get_tx_confirmation(&self, tx_id: &str) -> Result<i64, ChainError> {
        let result = self
            .fetch_tx_confirmation(tx_id)
            .await
            .classify_with(|| format!("Failed to get confirmation for tx [{tx_id}] from Koios: "));
        report(BACKEND, "get_tx_confirmation", result)
    }

    #[instrument(skip(self))]
    async fn get_address_assets(&self, address: &str) -> Result<AssetBalance, ChainError> {
        let result = self
            .fetch_address_assets(address)
            .await
            .classify_with(|| format!("Failed to get address [{address}] assets from Koios: "));
        report(BACKEND, "get_address_assets", result)
    }

    #[instrument(skip(self))]
    async fn get_block_transaction_ids(&self, block_id: &str) -> Result<Vec<String>, ChainError> {
        let result = self
            .fetch_block_transaction_ids(block_id)
            .await
            .classify_with(|| {
                format!("Failed to get block [{block_id}] transaction ids from Koios: ")
            });
        report(BACKEND, "get_block_transaction_ids", result)
    }

    #[instrument(skip(self))]
    async fn get_block_info(&self, block_id: &str) -> Result<BlockInfo, ChainError> {
        let result = self
            .fetch_block_info(block_id)
            .await
            .classify_with(|| format!("Failed to get block [{block_id}] info from Koios: "));
        report(BACKEND, "get_block_info", result)
    }

    #[instrument(skip(self))]
    async fn get_transaction(&self, tx_id: &str, block_id: &str) -> Result<ChainTx, ChainError> {
        let result = self
            .fetch_transaction(tx_id, block_id)
            .await
            .classify_with(|| {
                format!("Failed to get transaction [{tx_id}] of block [{block_id}] from Koios: ")
            });
        report(BACKEND, "get_transaction", result)
    }

    #[instrument(skip(self, signed_tx), fields(size = signed_tx.len()))]
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<(), ChainError> {
        let result = self
            .api
            .submit_tx(signed_tx)
            .await
            .map(|hash| {
                debug!(tx_hash = %hash, "Transaction accepted by Koios");
            })
            .classify_err("Failed to submit transaction to Koios: ");
        report(BACKEND, "submit_transaction", result)
    }
}

#[async_trait]
impl CardanoNetwork for KoiosNetwork {
    /// Returns the output whether or not it has been spent since.
    #[instrument(skip(self), fields(box_id = %box_id))]
    async fn get_utxo(&self, box_id: &BoxId) -> Result<Utxo, ChainError> {
        let result = self
            .fetch_utxo(box_id)
            .await
            .classify_with(|| format!("Failed to get box [{box_id}] from Koios: "));
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
                    "Failed to get boxes of address [{address}] (offset {offset}, limit {limit}) from Koios: "
                )
            });
        report(BACKEND, "get_address_boxes", result)
    }

    #[instrument(skip(self), fields(box_id = %box_id))]
    async fn is_box_unspent_and_valid(&self, box_id: &BoxId) -> Result<bool, ChainError> {
        let result = is_box_unspent(self, box_id)
            .await
            .classify_with(|| format!("Failed to check box [{box_id}] validity on Koios: "));
        report(BACKEND, "is_box_unspent_and_valid", result)
    }

    #[instrument(skip(self))]
    async fn get_protocol_parameters(&self) -> Result<ProtocolParameters, ChainError> {
        let result = self
            .fetch_protocol_parameters()
            .await
            .classify_err("Failed to get protocol parameters from Koios: ");
        report(BACKEND, "get_protocol_parameters", result)
    }
}
