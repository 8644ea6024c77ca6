//! Backend-native cardano-graphql records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlEpochRef {
    pub number: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlTip {
    pub hash: Option<String>,
    pub number: Option<u64>,
    pub slot_no: Option<u64>,
    pub epoch: Option<GqlEpochRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlBlockRef {
    pub hash: Option<String>,
    pub number: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlAsset {
    /// `"ada"` for lovelace, `policyId || assetName` otherwise.
    pub asset_id: Option<String>,
    pub policy_id: Option<String>,
    pub asset_name: Option<String>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlToken {
    pub asset: Option<GqlAsset>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlTxInput {
    pub source_tx_hash: Option<String>,
    pub source_tx_index: Option<u32>,
    pub address: Option<String>,
    pub value: Option<Value>,
    pub tokens: Option<Vec<GqlToken>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlTxOutput {
    pub address: Option<String>,
    pub index: Option<u32>,
    pub value: Option<Value>,
    pub tokens: Option<Vec<GqlToken>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlMetadatum {
    pub key: Option<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlTransaction {
    pub hash: Option<String>,
    pub block: Option<GqlBlockRef>,
    pub fee: Option<Value>,
    pub inputs: Option<Vec<GqlTxInput>>,
    pub outputs: Option<Vec<GqlTxOutput>>,
    pub metadata: Option<Vec<GqlMetadatum>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlTxHash {
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlBlock {
    pub hash: Option<String>,
    pub number: Option<u64>,
    pub previous_block: Option<GqlBlockRef>,
    pub transactions: Option<Vec<GqlTxHash>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlAssetBalance {
    pub asset: Option<GqlAsset>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlAddressSummary {
    pub asset_balances: Option<Vec<GqlAssetBalance>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlPaymentAddress {
    pub address: Option<String>,
    pub summary: Option<GqlAddressSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlUtxo {
    pub tx_hash: Option<String>,
    pub index: Option<u32>,
    pub address: Option<String>,
    pub value: Option<Value>,
    pub tokens: Option<Vec<GqlToken>>,
}

/// Quantities arrive as numbers or strings depending on the server version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GqlProtocolParams {
    pub min_fee_a: Option<Value>,
    pub min_fee_b: Option<Value>,
    pub max_tx_size: Option<Value>,
    pub max_val_size: Option<Value>,
    pub key_deposit: Option<Value>,
    pub pool_deposit: Option<Value>,
    pub coins_per_utxo_byte: Option<Value>,
}

/// Entry of the top-level `errors` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GqlError {
    pub message: Option<String>,
    pub extensions: Option<GqlErrorExtensions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GqlErrorExtensions {
    pub code: Option<Value>,
}

/// Envelope of every GraphQL answer.
#[derive(Debug, Clone, Deserialize)]
pub struct GqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GqlError>>,
}
