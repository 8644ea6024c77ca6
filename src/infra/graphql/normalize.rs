//! cardano-graphql records to canonical entities.

use crate::chain::normalize::{amount, integer, metadata, required, required_str};
use crate::domain::{
    Asset, AssetBalance, BlockInfo, BoxCandidate, ChainError, ChainTx, ProtocolParameters,
    TokenAmount, Utxo,
};

use super::records::{
    GqlAsset, GqlBlock, GqlPaymentAddress, GqlProtocolParams, GqlToken, GqlTransaction,
    GqlTxInput, GqlTxOutput, GqlUtxo,
};

/// Asset id cardano-graphql uses for lovelace balances.
pub const LOVELACE_ASSET_ID: &str = "ada";

fn token_asset(asset: Option<&GqlAsset>) -> Result<&GqlAsset, ChainError> {
    required("asset", asset)
}

pub fn token(token: &GqlToken) -> Result<Asset, ChainError> {
    let asset = token_asset(token.asset.as_ref())?;
    Ok(Asset {
        policy_id: required_str("asset.policyId", &asset.policy_id)?.to_string(),
        asset_name: required_str("asset.assetName", &asset.asset_name)?.to_string(),
        quantity: amount("quantity", token.quantity.as_ref())?,
        fingerprint: asset.fingerprint.clone(),
    })
}

fn tokens(list: &Option<Vec<GqlToken>>) -> Result<Vec<Asset>, ChainError> {
    list.iter().flatten().map(token).collect()
}

pub fn input(input: &GqlTxInput) -> Result<Utxo, ChainError> {
    Ok(Utxo {
        tx_id: required_str("sourceTxHash", &input.source_tx_hash)?.to_string(),
        index: required("sourceTxIndex", input.source_tx_index)?,
        value: amount("value", input.value.as_ref())?,
        assets: tokens(&input.tokens)?,
    })
}

pub fn output(output: &GqlTxOutput) -> Result<BoxCandidate, ChainError> {
    Ok(BoxCandidate {
        address: required_str("address", &output.address)?.to_string(),
        value: amount("value", output.value.as_ref())?,
        assets: tokens(&output.tokens)?,
    })
}

pub fn output_utxo(tx_hash: &str, output: &GqlTxOutput) -> Result<Utxo, ChainError> {
    Ok(Utxo {
        tx_id: tx_hash.to_string(),
        index: required("index", output.index)?,
        value: amount("value", output.value.as_ref())?,
        assets: tokens(&output.tokens)?,
    })
}

pub fn utxo(record: &GqlUtxo) -> Result<Utxo, ChainError> {
    Ok(Utxo {
        tx_id: required_str("txHash", &record.tx_hash)?.to_string(),
        index: required("index", record.index)?,
        value: amount("value", record.value.as_ref())?,
        assets: tokens(&record.tokens)?,
    })
}

pub fn transaction(tx: &GqlTransaction) -> Result<ChainTx, ChainError> {
    let inputs = required("inputs", tx.inputs.as_ref())?
        .iter()
        .map(input)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = required("outputs", tx.outputs.as_ref())?
        .iter()
        .map(output)
        .collect::<Result<Vec<_>, _>>()?;
    let entries = tx
        .metadata
        .iter()
        .flatten()
        .map(|entry| {
            let key = required_str("metadata.key", &entry.key)?.to_string();
            let value = required("metadata.value", entry.value.clone())?;
            Ok((key, value))
        })
        .collect::<Result<Vec<_>, ChainError>>()?;

    Ok(ChainTx {
        id: required_str("hash", &tx.hash)?.to_string(),
        inputs,
        outputs,
        fee: amount("fee", tx.fee.as_ref())?,
        metadata: metadata(entries),
    })
}

/// Hash of the block containing `tx`.
pub fn transaction_block_hash(tx: &GqlTransaction) -> Result<&str, ChainError> {
    let block = required("block", tx.block.as_ref())?;
    required_str("block.hash", &block.hash)
}

pub fn transaction_block_number(tx: &GqlTransaction) -> Result<u64, ChainError> {
    let block = required("block", tx.block.as_ref())?;
    required("block.number", block.number)
}

pub fn block_info(block: &GqlBlock) -> Result<BlockInfo, ChainError> {
    let previous = required("previousBlock", block.previous_block.as_ref())?;
    Ok(BlockInfo {
        hash: required_str("hash", &block.hash)?.to_string(),
        parent_hash: required_str("previousBlock.hash", &previous.hash)?.to_string(),
        height: required("number", block.number)?,
    })
}

pub fn block_transaction_ids(block: &GqlBlock) -> Result<Vec<String>, ChainError> {
    required("transactions", block.transactions.as_ref())?
        .iter()
        .map(|tx| required_str("transactions.hash", &tx.hash).map(str::to_string))
        .collect()
}

/// Splits an address summary into lovelace and native tokens. An address
/// the indexer has never seen has a zero balance.
pub fn asset_balance(address: Option<&GqlPaymentAddress>) -> Result<AssetBalance, ChainError> {
    let mut balance = AssetBalance::empty();
    let entries = address
        .and_then(|address| address.summary.as_ref())
        .and_then(|summary| summary.asset_balances.as_ref());
    for entry in entries.into_iter().flatten() {
        let asset = token_asset(entry.asset.as_ref())?;
        let quantity = amount("quantity", entry.quantity.as_ref())?;
        if asset.asset_id.as_deref() == Some(LOVELACE_ASSET_ID) {
            balance.native_amount += quantity;
            continue;
        }
        let policy_id = required_str("asset.policyId", &asset.policy_id)?;
        let asset_name = required_str("asset.assetName", &asset.asset_name)?;
        balance.tokens.push(TokenAmount {
            id: format!("{policy_id}.{asset_name}"),
            amount: quantity,
        });
    }
    Ok(balance)
}

pub fn protocol_parameters(params: &GqlProtocolParams) -> Result<ProtocolParameters, ChainError> {
    Ok(ProtocolParameters {
        min_fee_a: integer("minFeeA", params.min_fee_a.as_ref())?,
        min_fee_b: integer("minFeeB", params.min_fee_b.as_ref())?,
        max_tx_size: integer("maxTxSize", params.max_tx_size.as_ref())?,
        max_value_size: integer("maxValSize", params.max_val_size.as_ref())?,
        key_deposit: amount("keyDeposit", params.key_deposit.as_ref())?,
        pool_deposit: amount("poolDeposit", params.pool_deposit.as_ref())?,
        coins_per_utxo_size: amount("coinsPerUtxoByte", params.coins_per_utxo_byte.as_ref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use num_bigint::BigUint;
    use serde_json::json;

    fn sample_transaction() -> GqlTransaction {
        serde_json::from_value(json!({
            "hash": "tx1",
            "fee": "168000",
            "block": {"hash": "b1", "number": 90},
            "inputs": [{
                "sourceTxHash": "prev",
                "sourceTxIndex": 1,
                "address": "addr1src",
                "value": "3000000",
                "tokens": []
            }],
            "outputs": [{
                "address": "addr1dst",
                "index": 0,
                "value": "2832000",
                "tokens": [{
                    "asset": {"assetId": "p1746f6b", "policyId": "p1", "assetName": "746f6b", "fingerprint": "asset1"},
                    "quantity": "10"
                }]
            }],
            "metadata": [{"key": "674", "value": {"msg": ["bridge"]}}]
        }))
        .unwrap()
    }

    #[test]
    fn test_transaction() {
        let tx = transaction(&sample_transaction()).unwrap();
        assert_eq!(tx.id, "tx1");
        assert_eq!(tx.fee, BigUint::from(168_000u32));
        assert_eq!(tx.inputs[0].index, 1);
        assert_eq!(tx.outputs[0].assets[0].policy_id, "p1");
        assert_eq!(tx.metadata.unwrap()["674"], json!({"msg": ["bridge"]}));
    }

    #[test]
    fn test_empty_metadata_list_is_absent() {
        let mut tx = sample_transaction();
        tx.metadata = Some(vec![]);
        assert_eq!(transaction(&tx).unwrap().metadata, None);
        tx.metadata = None;
        assert_eq!(transaction(&tx).unwrap().metadata, None);
    }

    #[test]
    fn test_transaction_block_fields() {
        let tx = sample_transaction();
        assert_eq!(transaction_block_hash(&tx).unwrap(), "b1");
        assert_eq!(transaction_block_number(&tx).unwrap(), 90);

        let orphan = GqlTransaction {
            block: None,
            ..sample_transaction()
        };
        assert_eq!(
            transaction_block_hash(&orphan).unwrap_err(),
            ChainError::missing_field("block")
        );
    }

    #[test]
    fn test_asset_balance_splits_lovelace() {
        let address: GqlPaymentAddress = serde_json::from_value(json!({
            "address": "addr1",
            "summary": {"assetBalances": [
                {"asset": {"assetId": "ada"}, "quantity": "5000000"},
                {"asset": {"assetId": "p1aa", "policyId": "p1", "assetName": "aa"}, "quantity": "3"}
            ]}
        }))
        .unwrap();
        let balance = asset_balance(Some(&address)).unwrap();
        assert_eq!(balance.native_amount, BigUint::from(5_000_000u32));
        assert_eq!(balance.tokens.len(), 1);
        assert_eq!(balance.tokens[0].id, "p1.aa");
    }

    #[test]
    fn test_asset_balance_unknown_address() {
        assert_eq!(asset_balance(None).unwrap(), AssetBalance::empty());
    }

    #[test]
    fn test_block_requires_previous_block() {
        let block = GqlBlock {
            hash: Some("b1".to_string()),
            number: Some(1),
            ..Default::default()
        };
        let err = block_info(&block).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
    }

    #[test]
    fn test_protocol_parameters() {
        let params: GqlProtocolParams = serde_json::from_value(json!({
            "minFeeA": 44,
            "minFeeB": 155381,
            "maxTxSize": 16384,
            "maxValSize": "5000",
            "keyDeposit": 2000000,
            "poolDeposit": 500000000,
            "coinsPerUtxoByte": 4310
        }))
        .unwrap();
        let parsed = protocol_parameters(&params).unwrap();
        assert_eq!(parsed.min_fee_b, 155_381);
        assert_eq!(parsed.pool_deposit, BigUint::from(500_000_000u32));
    }
}
