//! Backend-native Koios records.
//!
//! Koios serves PostgREST rows where almost any column may come back null,
//! so every field is optional here. Which of them are required is decided by
//! the normalizer, not by deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosTip {
    pub hash: Option<String>,
    pub epoch_no: Option<u64>,
    pub abs_slot: Option<u64>,
    pub block_height: Option<u64>,
    pub block_time: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosAsset {
    pub policy_id: Option<String>,
    pub asset_name: Option<String>,
    pub fingerprint: Option<String>,
    pub decimals: Option<u32>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosPaymentAddr {
    pub bech32: Option<String>,
    /// Payment credential hash.
    pub cred: Option<String>,
}

/// Input or output of a `tx_info` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosTxIo {
    pub payment_addr: Option<KoiosPaymentAddr>,
    pub stake_addr: Option<String>,
    pub tx_hash: Option<String>,
    pub tx_index: Option<u32>,
    pub value: Option<Value>,
    pub datum_hash: Option<String>,
    #[serde(default)]
    pub asset_list: Option<Vec<KoiosAsset>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosTxInfo {
    pub tx_hash: Option<String>,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    pub tx_timestamp: Option<u64>,
    pub fee: Option<Value>,
    #[serde(default)]
    pub inputs: Option<Vec<KoiosTxIo>>,
    #[serde(default)]
    pub outputs: Option<Vec<KoiosTxIo>>,
    /// Metadata keyed by label; Koios sends null or `{}` when there is none.
    pub metadata: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosTxStatus {
    pub tx_hash: Option<String>,
    pub num_confirmations: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosAddressInfo {
    pub address: Option<String>,
    pub balance: Option<Value>,
    pub stake_address: Option<String>,
    pub script_address: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosAddressAsset {
    pub address: Option<String>,
    pub policy_id: Option<String>,
    pub asset_name: Option<String>,
    pub fingerprint: Option<String>,
    pub decimals: Option<u32>,
    pub quantity: Option<Value>,
}

/// Row of `address_utxos` and `credential_utxos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosUtxo {
    pub tx_hash: Option<String>,
    pub tx_index: Option<u32>,
    pub address: Option<String>,
    pub value: Option<Value>,
    pub block_height: Option<u64>,
    pub is_spent: Option<bool>,
    #[serde(default)]
    pub asset_list: Option<Vec<KoiosAsset>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosBlock {
    pub hash: Option<String>,
    pub epoch_no: Option<u64>,
    pub block_height: Option<u64>,
    pub parent_hash: Option<String>,
    pub tx_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosBlockTx {
    pub block_hash: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KoiosEpochParams {
    pub epoch_no: Option<u64>,
    pub min_fee_a: Option<Value>,
    pub min_fee_b: Option<Value>,
    pub max_tx_size: Option<Value>,
    pub max_val_size: Option<Value>,
    pub key_deposit: Option<Value>,
    pub pool_deposit: Option<Value>,
    pub coins_per_utxo_size: Option<Value>,
}
