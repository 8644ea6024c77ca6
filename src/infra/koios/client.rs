//! Koios REST client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::chain::BackendFailure;
use crate::domain::{BoxId, ConfigError};
use crate::infra::http::{HttpClientConfig, read_body, read_json, transport_failure};

use super::records::{
    KoiosAddressAsset, KoiosAddressInfo, KoiosBlock, KoiosBlockTx, KoiosEpochParams, KoiosTip,
    KoiosTxInfo, KoiosTxStatus, KoiosUtxo,
};

/// Koios endpoints consumed by [`KoiosNetwork`](super::KoiosNetwork).
///
/// Methods return raw rows; an empty vector means the backend had nothing
/// for the given keys.
#[async_trait]
pub trait KoiosApi: Send + Sync {
    async fn tip(&self) -> Result<Vec<KoiosTip>, BackendFailure>;

    /// `tx_info` with inputs, metadata and assets.
    async fn tx_info(&self, tx_hashes: &[String]) -> Result<Vec<KoiosTxInfo>, BackendFailure>;

    async fn tx_status(&self, tx_hashes: &[String]) -> Result<Vec<KoiosTxStatus>, BackendFailure>;

    async fn address_info(
        &self,
        addresses: &[String],
    ) -> Result<Vec<KoiosAddressInfo>, BackendFailure>;

    async fn address_assets(
        &self,
        addresses: &[String],
    ) -> Result<Vec<KoiosAddressAsset>, BackendFailure>;

    async fn address_utxos(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<KoiosUtxo>, BackendFailure>;

    /// Unspent outputs of `credentials`. With `output`, only that output's
    /// row is requested, so the answer never hits the server's row cap.
    async fn credential_utxos(
        &self,
        credentials: &[String],
        output: Option<&BoxId>,
    ) -> Result<Vec<KoiosUtxo>, BackendFailure>;

    async fn block_info(&self, block_hashes: &[String]) -> Result<Vec<KoiosBlock>, BackendFailure>;

    async fn block_txs(&self, block_hashes: &[String]) -> Result<Vec<KoiosBlockTx>, BackendFailure>;

    async fn epoch_params(&self, epoch_no: u64) -> Result<Vec<KoiosEpochParams>, BackendFailure>;

    /// Submits a CBOR-encoded signed transaction and returns its hash.
    async fn submit_tx(&self, cbor: &[u8]) -> Result<String, BackendFailure>;
}

/// HTTP implementation of [`KoiosApi`] against a Koios v1 base URL,
/// e.g. `https://api.koios.rest/api/v1`.
pub struct KoiosHttpClient {
    http_client: Client,
    base_url: String,
}

impl KoiosHttpClient {
    pub fn new(base_url: &str, config: &HttpClientConfig) -> Result<Self, ConfigError> {
        let http_client = config.build()?;
        info!(base_url = %base_url, "Created Koios client");
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_defaults(base_url: &str) -> Result<Self, ConfigError> {
        Self::new(base_url, &HttpClientConfig::default())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<R, BackendFailure> {
        debug!(endpoint = %endpoint, "Koios GET");
        let response = self
            .http_client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(transport_failure)?;
        read_json(response).await
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<R, BackendFailure> {
        debug!(endpoint = %endpoint, "Koios POST");
        let response = self
            .http_client
            .post(self.url(endpoint))
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(transport_failure)?;
        read_json(response).await
    }
}

#[async_trait]
impl KoiosApi for KoiosHttpClient {
    #[instrument(skip(self))]
    async fn tip(&self) -> Result<Vec<KoiosTip>, BackendFailure> {
        self.get("tip", &[]).await
    }

    #[instrument(skip(self))]
    async fn tx_info(&self, tx_hashes: &[String]) -> Result<Vec<KoiosTxInfo>, BackendFailure> {
        let body = json!({
            "_tx_hashes": tx_hashes,
            "_inputs": true,
            "_metadata": true,
            "_assets": true,
            "_withdrawals": false,
            "_certs": false,
            "_scripts": false,
            "_bytecode": false,
        });
        self.post("tx_info", &[], &body).await
    }

    #[instrument(skip(self))]
    async fn tx_status(&self, tx_hashes: &[String]) -> Result<Vec<KoiosTxStatus>, BackendFailure> {
        self.post("tx_status", &[], &json!({ "_tx_hashes": tx_hashes }))
            .await
    }

    #[instrument(skip(self))]
    async fn address_info(
        &self,
        addresses: &[String],
    ) -> Result<Vec<KoiosAddressInfo>, BackendFailure> {
        self.post("address_info", &[], &json!({ "_addresses": addresses }))
            .await
    }

    #[instrument(skip(self))]
    async fn address_assets(
        &self,
        addresses: &[String],
    ) -> Result<Vec<KoiosAddressAsset>, BackendFailure> {
        self.post("address_assets", &[], &json!({ "_addresses": addresses }))
            .await
    }

    #[instrument(skip(self))]
    async fn address_utxos(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<KoiosUtxo>, BackendFailure> {
        let query = [
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("order", "block_height.asc,tx_hash.asc,tx_index.asc".to_string()),
        ];
        let body = json!({ "_addresses": [address], "_extended": true });
        self.post("address_utxos", &query, &body).await
    }

    #[instrument(skip(self))]
    async fn credential_utxos(
        &self,
        credentials: &[String],
        output: Option<&BoxId>,
    ) -> Result<Vec<KoiosUtxo>, BackendFailure> {
        let query = output_filter(output);
        let body = json!({ "_payment_credentials": credentials, "_extended": false });
        self.post("credential_utxos", &query, &body).await
    }

    #[instrument(skip(self))]
    async fn block_info(&self, block_hashes: &[String]) -> Result<Vec<KoiosBlock>, BackendFailure> {
        self.post("block_info", &[], &json!({ "_block_hashes": block_hashes }))
            .await
    }

    #[instrument(skip(self))]
    async fn block_txs(
        &self,
        block_hashes: &[String],
    ) -> Result<Vec<KoiosBlockTx>, BackendFailure> {
        self.post("block_txs", &[], &json!({ "_block_hashes": block_hashes }))
            .await
    }

    #[instrument(skip(self))]
    async fn epoch_params(&self, epoch_no: u64) -> Result<Vec<KoiosEpochParams>, BackendFailure> {
        self.get("epoch_params", &[("_epoch_no", epoch_no.to_string())])
            .await
    }

    #[instrument(skip(self, cbor), fields(size = cbor.len()))]
    async fn submit_tx(&self, cbor: &[u8]) -> Result<String, BackendFailure> {
        let response = self
            .http_client
            .post(self.url("submittx"))
            .header(reqwest::header::CONTENT_TYPE, "application/cbor")
            .body(cbor.to_vec())
            .send()
            .await
            .map_err(transport_failure)?;
        let body = read_body(response).await?;
        parse_submitted_hash(&body)
    }
}

/// PostgREST row filter selecting a single output.
fn output_filter(output: Option<&BoxId>) -> Vec<(&'static str, String)> {
    match output {
        Some(box_id) => vec![
            ("tx_hash", format!("eq.{}", box_id.tx_id)),
            ("tx_index", format!("eq.{}", box_id.index)),
        ],
        None => Vec::new(),
    }
}

/// The submit endpoint answers with the hash as a JSON string.
fn parse_submitted_hash(body: &[u8]) -> Result<String, BackendFailure> {
    let text = String::from_utf8_lossy(body);
    let hash = text.trim().trim_matches('"');
    if hash.is_empty() {
        return Err(BackendFailure::malformed("empty submission response"));
    }
    Ok(hash.to_string())
}
