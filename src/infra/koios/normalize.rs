//! Koios records to canonical entities.

use crate::chain::normalize::{amount, integer, metadata, required, required_str};
use crate::chain::{CredentialOutput, OutputRef};
use crate::domain::{
    Asset, AssetBalance, BlockInfo, BoxCandidate, ChainError, ChainTx, ProtocolParameters,
    TokenAmount, Utxo,
};

use super::records::{
    KoiosAddressAsset, KoiosAddressInfo, KoiosAsset, KoiosBlock, KoiosEpochParams, KoiosTip,
    KoiosTxInfo, KoiosTxIo, KoiosUtxo,
};

pub fn height(tip: &KoiosTip) -> Result<u64, ChainError> {
    required("block_height", tip.block_height)
}

pub fn asset(record: &KoiosAsset) -> Result<Asset, ChainError> {
    Ok(Asset {
        policy_id: required_str("policy_id", &record.policy_id)?.to_string(),
        asset_name: required_str("asset_name", &record.asset_name)?.to_string(),
        quantity: amount("quantity", record.quantity.as_ref())?,
        fingerprint: record.fingerprint.clone(),
    })
}

fn assets(list: &Option<Vec<KoiosAsset>>) -> Result<Vec<Asset>, ChainError> {
    list.iter().flatten().map(asset).collect()
}

/// Spent input of a transaction, as a UTXO.
pub fn input(io: &KoiosTxIo) -> Result<Utxo, ChainError> {
    Ok(Utxo {
        tx_id: required_str("tx_hash", &io.tx_hash)?.to_string(),
        index: required("tx_index", io.tx_index)?,
        value: amount("value", io.value.as_ref())?,
        assets: assets(&io.asset_list)?,
    })
}

pub fn output(io: &KoiosTxIo) -> Result<BoxCandidate, ChainError> {
    let address = io
        .payment_addr
        .as_ref()
        .and_then(|addr| addr.bech32.as_deref());
    Ok(BoxCandidate {
        address: required("payment_addr.bech32", address)?.to_string(),
        value: amount("value", io.value.as_ref())?,
        assets: assets(&io.asset_list)?,
    })
}

/// Output of `tx_hash` at its own position, as a UTXO.
pub fn output_utxo(tx_hash: &str, io: &KoiosTxIo) -> Result<Utxo, ChainError> {
    Ok(Utxo {
        tx_id: tx_hash.to_string(),
        index: required("tx_index", io.tx_index)?,
        value: amount("value", io.value.as_ref())?,
        assets: assets(&io.asset_list)?,
    })
}

pub fn utxo(record: &KoiosUtxo) -> Result<Utxo, ChainError> {
    Ok(Utxo {
        tx_id: required_str("tx_hash", &record.tx_hash)?.to_string(),
        index: required("tx_index", record.tx_index)?,
        value: amount("value", record.value.as_ref())?,
        assets: assets(&record.asset_list)?,
    })
}

pub fn transaction(info: &KoiosTxInfo) -> Result<ChainTx, ChainError> {
    let inputs = required("inputs", info.inputs.as_ref())?
        .iter()
        .map(input)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = required("outputs", info.outputs.as_ref())?
        .iter()
        .map(output)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChainTx {
        id: required_str("tx_hash", &info.tx_hash)?.to_string(),
        inputs,
        outputs,
        fee: amount("fee", info.fee.as_ref())?,
        metadata: info.metadata.clone().and_then(metadata),
    })
}

pub fn block_info(block: &KoiosBlock) -> Result<BlockInfo, ChainError> {
    Ok(BlockInfo {
        hash: required_str("hash", &block.hash)?.to_string(),
        parent_hash: required_str("parent_hash", &block.parent_hash)?.to_string(),
        height: required("block_height", block.block_height)?,
    })
}

/// Lovelace from `address_info` (absent when the address was never used)
/// plus the address's native tokens.
pub fn asset_balance(
    info: Option<&KoiosAddressInfo>,
    tokens: &[KoiosAddressAsset],
) -> Result<AssetBalance, ChainError> {
    let mut balance = AssetBalance::empty();
    if let Some(info) = info {
        balance.native_amount = amount("balance", info.balance.as_ref())?;
    }
    balance.tokens = tokens
        .iter()
        .map(|token| {
            let policy_id = required_str("policy_id", &token.policy_id)?;
            let asset_name = required_str("asset_name", &token.asset_name)?;
            Ok(TokenAmount {
                id: format!("{policy_id}.{asset_name}"),
                amount: amount("quantity", token.quantity.as_ref())?,
            })
        })
        .collect::<Result<Vec<_>, ChainError>>()?;
    Ok(balance)
}

pub fn protocol_parameters(params: &KoiosEpochParams) -> Result<ProtocolParameters, ChainError> {
    Ok(ProtocolParameters {
        min_fee_a: integer("min_fee_a", params.min_fee_a.as_ref())?,
        min_fee_b: integer("min_fee_b", params.min_fee_b.as_ref())?,
        max_tx_size: integer("max_tx_size", params.max_tx_size.as_ref())?,
        max_value_size: integer("max_val_size", params.max_val_size.as_ref())?,
        key_deposit: amount("key_deposit", params.key_deposit.as_ref())?,
        pool_deposit: amount("pool_deposit", params.pool_deposit.as_ref())?,
        coins_per_utxo_size: amount("coins_per_utxo_size", params.coins_per_utxo_size.as_ref())?,
    })
}

pub fn credential_output(io: &KoiosTxIo) -> Result<CredentialOutput, ChainError> {
    Ok(CredentialOutput {
        index: required("tx_index", io.tx_index)?,
        payment_credential: io.payment_addr.as_ref().and_then(|addr| addr.cred.clone()),
    })
}

pub fn output_ref(record: &KoiosUtxo) -> Result<OutputRef, ChainError> {
    Ok(OutputRef {
        tx_id: required_str("tx_hash", &record.tx_hash)?.to_string(),
        index: required("tx_index", record.tx_index)?,
    })
}
