//! cardano-graphql client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::chain::BackendFailure;
use crate::domain::ConfigError;
use crate::infra::http::{HttpClientConfig, read_json, transport_failure};

use super::records::{
    GqlBlock, GqlError, GqlPaymentAddress, GqlProtocolParams, GqlResponse, GqlTip,
    GqlTransaction, GqlUtxo,
};

const TIP_QUERY: &str = "query Tip { cardano { tip { hash number slotNo epoch { number } } } }";

const TRANSACTIONS_QUERY: &str = r#"
query Transactions($hashes: [Hash32Hex]!) {
  transactions(where: { hash: { _in: $hashes } }) {
    hash
    fee
    block { hash number }
    inputs(order_by: { sourceTxHash: asc }) {
      sourceTxHash
      sourceTxIndex
      address
      value
      tokens { asset { assetId policyId assetName fingerprint } quantity }
    }
    outputs(order_by: { index: asc }) {
      address
      index
      value
      tokens { asset { assetId policyId assetName fingerprint } quantity }
    }
    metadata { key value }
  }
}"#;

const BLOCK_QUERY: &str = r#"
query Block($hash: Hash32Hex!) {
  blocks(where: { hash: { _eq: $hash } }) {
    hash
    number
    previousBlock { hash number }
    transactions(order_by: { blockIndex: asc }) { hash }
  }
}"#;

const PAYMENT_ADDRESSES_QUERY: &str = r#"
query PaymentAddresses($addresses: [String]!) {
  paymentAddresses(addresses: $addresses) {
    address
    summary {
      assetBalances { asset { assetId policyId assetName fingerprint } quantity }
    }
  }
}"#;

const ADDRESS_UTXOS_QUERY: &str = r#"
query AddressUtxos($address: String!, $offset: Int!, $limit: Int!) {
  utxos(
    where: { address: { _eq: $address } }
    order_by: [{ transaction: { block: { number: asc } } }, { txHash: asc }, { index: asc }]
    offset: $offset
    limit: $limit
  ) {
    txHash
    index
    address
    value
    tokens { asset { assetId policyId assetName fingerprint } quantity }
  }
}"#;

const UTXO_BY_REF_QUERY: &str = r#"
query UtxoByRef($txHash: Hash32Hex!, $index: Int!) {
  utxos(where: { _and: [{ txHash: { _eq: $txHash } }, { index: { _eq: $index } }] }) {
    txHash
    index
    address
    value
    tokens { asset { assetId policyId assetName fingerprint } quantity }
  }
}"#;

const PROTOCOL_PARAMS_QUERY: &str = r#"
query ProtocolParams {
  cardano {
    currentEpoch {
      protocolParams {
        minFeeA minFeeB maxTxSize maxValSize keyDeposit poolDeposit coinsPerUtxoByte
      }
    }
  }
}"#;

const SUBMIT_MUTATION: &str = r#"
mutation Submit($transaction: String!) {
  submitTransaction(transaction: $transaction) { hash }
}"#;

/// cardano-graphql queries consumed by
/// [`GraphQlNetwork`](super::GraphQlNetwork).
#[async_trait]
pub trait GraphQlApi: Send + Sync {
    async fn tip(&self) -> Result<Option<GqlTip>, BackendFailure>;

    async fn transactions(&self, hashes: &[String]) -> Result<Vec<GqlTransaction>, BackendFailure>;

    async fn blocks(&self, hash: &str) -> Result<Vec<GqlBlock>, BackendFailure>;

    async fn payment_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<GqlPaymentAddress>, BackendFailure>;

    async fn address_utxos(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<GqlUtxo>, BackendFailure>;

    /// Unspent output at `(tx_hash, index)`; empty once spent.
    async fn utxos_by_ref(&self, tx_hash: &str, index: u32) -> Result<Vec<GqlUtxo>, BackendFailure>;

    async fn protocol_params(&self) -> Result<Option<GqlProtocolParams>, BackendFailure>;

    /// Submits a hex-encoded signed transaction and returns its hash.
    async fn submit_transaction(&self, cbor_hex: &str) -> Result<String, BackendFailure>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardanoData {
    tip: Option<GqlTip>,
    current_epoch: Option<CurrentEpochData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentEpochData {
    protocol_params: Option<GqlProtocolParams>,
}

#[derive(Debug, Deserialize)]
struct CardanoEnvelope {
    cardano: Option<CardanoData>,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    transactions: Vec<GqlTransaction>,
}

#[derive(Debug, Deserialize)]
struct BlocksData {
    blocks: Vec<GqlBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentAddressesData {
    payment_addresses: Vec<GqlPaymentAddress>,
}

#[derive(Debug, Deserialize)]
struct UtxosData {
    utxos: Vec<GqlUtxo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitData {
    submit_transaction: SubmittedTx,
}

#[derive(Debug, Deserialize)]
struct SubmittedTx {
    hash: String,
}

/// HTTP implementation of [`GraphQlApi`].
pub struct GraphQlHttpClient {
    http_client: Client,
    url: String,
}

impl GraphQlHttpClient {
    pub fn new(url: &str, config: &HttpClientConfig) -> Result<Self, ConfigError> {
        let http_client = config.build()?;
        info!(url = %url, "Created GraphQL client");
        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }

    pub fn with_defaults(url: &str) -> Result<Self, ConfigError> {
        Self::new(url, &HttpClientConfig::default())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, BackendFailure> {
        debug!(operation = %operation, "GraphQL request");
        let response = self
            .http_client
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(transport_failure)?;
        let envelope: GqlResponse<T> = read_json(response).await?;
        unwrap_envelope(envelope)
    }
}

/// Extracts `data`, classifying the `errors` array.
///
/// An error carrying `extensions.code` is a declared rejection; an error
/// without one, or an envelope with neither field, is not interpretable.
pub fn unwrap_envelope<T>(envelope: GqlResponse<T>) -> Result<T, BackendFailure> {
    if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
        return Err(classify_errors(&errors));
    }
    envelope
        .data
        .ok_or_else(|| BackendFailure::malformed("response has neither data nor errors"))
}

fn classify_errors(errors: &[GqlError]) -> BackendFailure {
    let message = errors
        .iter()
        .map(|error| error.message.as_deref().unwrap_or("unknown error"))
        .collect::<Vec<_>>()
        .join("; ");
    let code = errors
        .iter()
        .find_map(|error| error.extensions.as_ref()?.code.as_ref())
        .map(|code| match code {
            Value::String(code) => code.clone(),
            other => other.to_string(),
        });
    match code {
        Some(code) => BackendFailure::coded(code, message),
        None => BackendFailure::malformed(message),
    }
}

#[async_trait]
impl GraphQlApi for GraphQlHttpClient {
    #[instrument(skip(self))]
    async fn tip(&self) -> Result<Option<GqlTip>, BackendFailure> {
        let data: CardanoEnvelope = self.execute("Tip", TIP_QUERY, json!({})).await?;
        Ok(data.cardano.and_then(|cardano| cardano.tip))
    }

    #[instrument(skip(self))]
    async fn transactions(&self, hashes: &[String]) -> Result<Vec<GqlTransaction>, BackendFailure> {
        let data: TransactionsData = self
            .execute("Transactions", TRANSACTIONS_QUERY, json!({ "hashes": hashes }))
            .await?;
        Ok(data.transactions)
    }

    #[instrument(skip(self))]
    async fn blocks(&self, hash: &str) -> Result<Vec<GqlBlock>, BackendFailure> {
        let data: BlocksData = self
            .execute("Block", BLOCK_QUERY, json!({ "hash": hash }))
            .await?;
        Ok(data.blocks)
    }

    #[instrument(skip(self))]
    async fn payment_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<GqlPaymentAddress>, BackendFailure> {
        let data: PaymentAddressesData = self
            .execute(
                "PaymentAddresses",
                PAYMENT_ADDRESSES_QUERY,
                json!({ "addresses": addresses }),
            )
            .await?;
        Ok(data.payment_addresses)
    }

    #[instrument(skip(self))]
    async fn address_utxos(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<GqlUtxo>, BackendFailure> {
        let variables = json!({ "address": address, "offset": offset, "limit": limit });
        let data: UtxosData = self
            .execute("AddressUtxos", ADDRESS_UTXOS_QUERY, variables)
            .await?;
        Ok(data.utxos)
    }

    #[instrument(skip(self))]
    async fn utxos_by_ref(
        &self,
        tx_hash: &str,
        index: u32,
    ) -> Result<Vec<GqlUtxo>, BackendFailure> {
        let variables = json!({ "txHash": tx_hash, "index": index });
        let data: UtxosData = self
            .execute("UtxoByRef", UTXO_BY_REF_QUERY, variables)
            .await?;
        Ok(data.utxos)
    }

    #[instrument(skip(self))]
    async fn protocol_params(&self) -> Result<Option<GqlProtocolParams>, BackendFailure> {
        let data: CardanoEnvelope = self
            .execute("ProtocolParams", PROTOCOL_PARAMS_QUERY, json!({}))
            .await?;
        Ok(data
            .cardano
            .and_then(|cardano| cardano.current_epoch)
            .and_then(|epoch| epoch.protocol_params))
    }

    #[instrument(skip(self, cbor_hex), fields(size = cbor_hex.len() / 2))]
    async fn submit_transaction(&self, cbor_hex: &str) -> Result<String, BackendFailure> {
        let data: SubmitData = self
            .execute(
                "Submit",
                SUBMIT_MUTATION,
                json!({ "transaction": cbor_hex }),
            )
            .await?;
        Ok(data.submit_transaction.hash)
    }
}
