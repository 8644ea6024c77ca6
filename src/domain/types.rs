use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::error::ChainError;

/// Transaction hash as reported by the backend.
pub type TxId = String;

/// Block hash as reported by the backend.
pub type BlockId = String;

/// Auxiliary data attached to a transaction, keyed by metadata label.
pub type TxMetadata = BTreeMap<String, serde_json::Value>;

/// Decimal-string serde for arbitrary-precision amounts.
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }

    /// Same as the parent module, for optional amounts.
    pub mod option {
        use num_bigint::BigUint;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            value: &Option<BigUint>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<BigUint>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| raw.parse().map_err(D::Error::custom))
                .transpose()
        }
    }
}

/// A native token held in an output or an address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub policy_id: String,
    pub asset_name: String,
    #[serde(with = "decimal")]
    pub quantity: BigUint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl Asset {
    /// Token id used in balances: `<policyId>.<assetName>`.
    #[must_use]
    pub fn token_id(&self) -> String {
        format!("{}.{}", self.policy_id, self.asset_name)
    }
}

/// System-wide output identifier, serialized as `"<txId>.<index>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId {
    pub tx_id: TxId,
    pub index: u32,
}

impl BoxId {
    pub fn new(tx_id: impl Into<TxId>, index: u32) -> Self {
        Self {
            tx_id: tx_id.into(),
            index,
        }
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tx_id, self.index)
    }
}

impl FromStr for BoxId {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tx_id, index) = s
            .rsplit_once('.')
            .filter(|(tx_id, _)| !tx_id.is_empty())
            .ok_or_else(|| ChainError::failed(format!("Invalid box id [{s}]")))?;
        let invalid_index = || ChainError::failed(format!("Invalid output index in box id [{s}]"));
        let canonical = !index.is_empty()
            && index.bytes().all(|b| b.is_ascii_digit())
            && (index == "0" || !index.starts_with('0'));
        if !canonical {
            return Err(invalid_index());
        }
        let index = index.parse().map_err(|_| invalid_index())?;
        Ok(BoxId::new(tx_id, index))
    }
}

impl Serialize for BoxId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BoxId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An unspent (or once unspent) transaction output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub tx_id: TxId,
    pub index: u32,
    #[serde(with = "decimal")]
    pub value: BigUint,
    pub assets: Vec<Asset>,
}

impl Utxo {
    #[must_use]
    pub fn box_id(&self) -> BoxId {
        BoxId::new(self.tx_id.clone(), self.index)
    }
}

/// Output of a transaction, before it has an identity of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoxCandidate {
    pub address: String,
    #[serde(with = "decimal")]
    pub value: BigUint,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenAmount {
    pub id: String,
    #[serde(with = "decimal")]
    pub amount: BigUint,
}

/// Balance snapshot of one address at query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    #[serde(with = "decimal")]
    pub native_amount: BigUint,
    pub tokens: Vec<TokenAmount>,
}

impl AssetBalance {
    /// Balance of an address with nothing recorded.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            native_amount: BigUint::ZERO,
            tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub hash: BlockId,
    pub parent_hash: BlockId,
    pub height: u64,
}

/// Cardano transaction in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainTx {
    pub id: TxId,
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<BoxCandidate>,
    #[serde(with = "decimal")]
    pub fee: BigUint,
    /// `None` when nothing is recorded; never an empty map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TxMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParameters {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub max_tx_size: u64,
    pub max_value_size: u64,
    #[serde(with = "decimal")]
    pub key_deposit: BigUint,
    #[serde(with = "decimal")]
    pub pool_deposit: BigUint,
    #[serde(with = "decimal")]
    pub coins_per_utxo_size: BigUint,
}

/// EVM transaction as returned by a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvmTx {
    pub hash: TxId,
    pub block_hash: Option<BlockId>,
    pub from: String,
    pub to: Option<String>,
    pub nonce: u64,
    #[serde(with = "decimal")]
    pub value: BigUint,
    pub data: String,
    #[serde(with = "decimal")]
    pub gas_limit: BigUint,
    #[serde(default, with = "decimal::option")]
    pub gas_price: Option<BigUint>,
    #[serde(default, with = "decimal::option")]
    pub max_fee_per_gas: Option<BigUint>,
    #[serde(default, with = "decimal::option")]
    pub max_priority_fee_per_gas: Option<BigUint>,
    pub chain_id: Option<u64>,
}

/// Gas estimation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvmCall {
    pub from: Option<String>,
    pub to: String,
    #[serde(default, with = "decimal::option")]
    pub value: Option<BigUint>,
    /// Hex calldata with `0x` prefix.
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetail {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Locally observed transaction, keyed by its unsigned hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub unsigned_hash: String,
    pub signed_hash: Option<String>,
    pub chain: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Hash to query on chain: the signed variant when one was recorded.
    #[must_use]
    pub fn chain_hash(&self) -> &str {
        self.signed_hash.as_deref().unwrap_or(&self.unsigned_hash)
    }
}
