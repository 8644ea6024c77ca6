//! Mock implementations for testing.
//!
//! These mocks provide in-memory implementations of the backend client
//! traits and of the transaction store. Each can be configured to fail every
//! call, or individual methods, with a given [`BackendFailure`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::U256;
use alloy::sol_types::{SolCall, SolValue};
use num_bigint::BigUint;
use serde_json::json;

use crate::chain::BackendFailure;
use crate::domain::{BoxId, StoreError, TransactionRecord, TransactionStore};
use crate::infra::evm::normalize::{IERC20, hex_address, to_quantity};
use crate::infra::evm::records::{RpcBlock, RpcCallRequest, RpcReceipt, RpcTransaction};
use crate::infra::evm::EvmRpc;
use crate::infra::graphql::GraphQlApi;
use crate::infra::graphql::records::{
    GqlBlock, GqlPaymentAddress, GqlProtocolParams, GqlTip, GqlTransaction, GqlUtxo,
};
use crate::infra::koios::KoiosApi;
use crate::infra::koios::records::{
    KoiosAddressAsset, KoiosAddressInfo, KoiosBlock, KoiosBlockTx, KoiosEpochParams, KoiosTip,
    KoiosTxInfo, KoiosTxStatus, KoiosUtxo,
};

/// Rows a Koios endpoint returns before it truncates the response.
pub const KOIOS_PAGE_ROWS: usize = 1000;

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// If set, every call fails with this signal.
    pub failure: Option<BackendFailure>,
    /// Simulated latency in milliseconds.
    pub latency_ms: Option<u64>,
}

impl MockConfig {
    /// Creates a config that always succeeds.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Creates a config that always fails.
    #[must_use]
    pub fn failure(failure: BackendFailure) -> Self {
        Self {
            failure: Some(failure),
            latency_ms: None,
        }
    }

    /// Adds simulated latency.
    #[must_use]
    pub fn with_latency(mut self, ms: u64) -> Self {
        self.latency_ms = Some(ms);
        self
    }
}

/// Call accounting and failure injection shared by the client mocks.
#[derive(Default)]
struct MockControl {
    config: MockConfig,
    call_count: AtomicU64,
    calls: Mutex<Vec<&'static str>>,
    method_failures: Mutex<HashMap<&'static str, BackendFailure>>,
}

impl MockControl {
    fn new(config: MockConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    async fn enter(&self, method: &'static str) -> Result<(), BackendFailure> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().unwrap().push(method);
        if let Some(ms) = self.config.latency_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if let Some(failure) = &self.config.failure {
            return Err(failure.clone());
        }
        if let Some(failure) = self.method_failures.lock().unwrap().get(method) {
            return Err(failure.clone());
        }
        Ok(())
    }

    fn fail_method(&self, method: &'static str, failure: BackendFailure) {
        self.method_failures.lock().unwrap().insert(method, failure);
    }

    fn clear_failures(&self) {
        self.method_failures.lock().unwrap().clear();
    }

    fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| **called == method)
            .count()
    }
}

macro_rules! mock_control_api {
    () => {
        /// Gets the number of times any method was called.
        pub fn call_count(&self) -> u64 {
            self.control.call_count()
        }

        /// Gets the number of calls made to `method`.
        pub fn calls_to(&self, method: &str) -> usize {
            self.control.calls_to(method)
        }

        /// Makes every later call to `method` fail with `failure`.
        pub fn fail_method(&self, method: &'static str, failure: BackendFailure) {
            self.control.fail_method(method, failure);
        }

        /// Removes all per-method failures.
        pub fn clear_failures(&self) {
            self.control.clear_failures();
        }
    };
}

// ---------------------------------------------------------------------------
// Koios
// ---------------------------------------------------------------------------

#[derive(Default)]
struct KoiosState {
    tip: Vec<KoiosTip>,
    transactions: HashMap<String, KoiosTxInfo>,
    confirmations: HashMap<String, Option<i64>>,
    address_infos: HashMap<String, KoiosAddressInfo>,
    address_assets: HashMap<String, Vec<KoiosAddressAsset>>,
    address_utxos: HashMap<String, Vec<KoiosUtxo>>,
    credential_utxos: HashMap<String, Vec<KoiosUtxo>>,
    blocks: HashMap<String, KoiosBlock>,
    block_txs: HashMap<String, Vec<String>>,
    epoch_params: HashMap<u64, KoiosEpochParams>,
    submitted: Vec<Vec<u8>>,
}

/// Mock Koios API backed by in-memory rows.
///
/// # Example
///
/// ```
/// use bridge_chain_query::chain::BackendFailure;
/// use bridge_chain_query::test_utils::{MockConfig, MockKoiosApi};
///
/// let mock = MockKoiosApi::new();
/// mock.set_tip(100, 500);
///
/// let unreachable = MockKoiosApi::with_config(MockConfig::failure(
///     BackendFailure::no_response("connection refused"),
/// ));
/// ```
pub struct MockKoiosApi {
    state: Mutex<KoiosState>,
    control: MockControl,
}

impl MockKoiosApi {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            state: Mutex::new(KoiosState::default()),
            control: MockControl::new(config),
        }
    }

    #[must_use]
    pub fn failing(failure: BackendFailure) -> Self {
        Self::with_config(MockConfig::failure(failure))
    }

    mock_control_api!();

    pub fn set_tip(&self, block_height: u64, epoch_no: u64) {
        self.state.lock().unwrap().tip = vec![KoiosTip {
            hash: Some(format!("tip{block_height}")),
            epoch_no: Some(epoch_no),
            block_height: Some(block_height),
            ..Default::default()
        }];
    }

    /// Stores `tx`, keyed by its `tx_hash`.
    pub fn insert_transaction(&self, tx: KoiosTxInfo) {
        let hash = tx.tx_hash.clone().unwrap_or_default();
        self.state.lock().unwrap().transactions.insert(hash, tx);
    }

    /// `None` answers with a row whose confirmation count is null.
    pub fn set_confirmations(&self, tx_hash: &str, confirmations: Option<i64>) {
        self.state
            .lock()
            .unwrap()
            .confirmations
            .insert(tx_hash.to_string(), confirmations);
    }

    pub fn set_address(
        &self,
        address: &str,
        info: KoiosAddressInfo,
        assets: Vec<KoiosAddressAsset>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.address_infos.insert(address.to_string(), info);
        state.address_assets.insert(address.to_string(), assets);
    }

    pub fn set_address_utxos(&self, address: &str, utxos: Vec<KoiosUtxo>) {
        self.state
            .lock()
            .unwrap()
            .address_utxos
            .insert(address.to_string(), utxos);
    }

    pub fn set_credential_utxos(&self, credential: &str, utxos: Vec<KoiosUtxo>) {
        self.state
            .lock()
            .unwrap()
            .credential_utxos
            .insert(credential.to_string(), utxos);
    }

    /// Removes the output from every unspent set.
    pub fn spend(&self, tx_hash: &str, index: u32) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        for utxos in state
            .credential_utxos
            .values_mut()
            .chain(state.address_utxos.values_mut())
        {
            utxos.retain(|utxo| {
                !(utxo.tx_hash.as_deref() == Some(tx_hash) && utxo.tx_index == Some(index))
            });
        }
    }

    pub fn insert_block(&self, block: KoiosBlock, tx_hashes: Vec<String>) {
        let hash = block.hash.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state.block_txs.insert(hash.clone(), tx_hashes);
        state.blocks.insert(hash, block);
    }

    pub fn set_epoch_params(&self, epoch_no: u64, params: KoiosEpochParams) {
        self.state
            .lock()
            .unwrap()
            .epoch_params
            .insert(epoch_no, params);
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl Default for MockKoiosApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KoiosApi for MockKoiosApi {
    async fn tip(&self) -> Result<Vec<KoiosTip>, BackendFailure> {
        self.control.enter("tip").await?;
        Ok(self.state.lock().unwrap().tip.clone())
    }

    async fn tx_info(&self, tx_hashes: &[String]) -> Result<Vec<KoiosTxInfo>, BackendFailure> {
        self.control.enter("tx_info").await?;
        let state = self.state.lock().unwrap();
        Ok(tx_hashes
            .iter()
            .filter_map(|hash| state.transactions.get(hash).cloned())
            .collect())
    }

    async fn tx_status(&self, tx_hashes: &[String]) -> Result<Vec<KoiosTxStatus>, BackendFailure> {
        self.control.enter("tx_status").await?;
        let state = self.state.lock().unwrap();
        Ok(tx_hashes
            .iter()
            .map(|hash| KoiosTxStatus {
                tx_hash: Some(hash.clone()),
                num_confirmations: state.confirmations.get(hash).copied().flatten(),
            })
            .collect())
    }

    async fn address_info(
        &self,
        addresses: &[String],
    ) -> Result<Vec<KoiosAddressInfo>, BackendFailure> {
        self.control.enter("address_info").await?;
        let state = self.state.lock().unwrap();
        Ok(addresses
            .iter()
            .filter_map(|address| state.address_infos.get(address).cloned())
            .collect())
    }

    async fn address_assets(
        &self,
        addresses: &[String],
    ) -> Result<Vec<KoiosAddressAsset>, BackendFailure> {
        self.control.enter("address_assets").await?;
        let state = self.state.lock().unwrap();
        Ok(addresses
            .iter()
            .filter_map(|address| state.address_assets.get(address))
            .flatten()
            .cloned()
            .collect())
    }

    async fn address_utxos(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<KoiosUtxo>, BackendFailure> {
        self.control.enter("address_utxos").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .address_utxos
            .get(address)
            .map(|utxos| {
                utxos
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn credential_utxos(
        &self,
        credentials: &[String],
        output: Option<&BoxId>,
    ) -> Result<Vec<KoiosUtxo>, BackendFailure> {
        self.control.enter("credential_utxos").await?;
        let state = self.state.lock().unwrap();
        Ok(credentials
            .iter()
            .filter_map(|credential| state.credential_utxos.get(credential))
            .flatten()
            .filter(|utxo| {
                output.is_none_or(|box_id| {
                    utxo.tx_hash.as_deref() == Some(box_id.tx_id.as_str())
                        && utxo.tx_index == Some(box_id.index)
                })
            })
            .take(KOIOS_PAGE_ROWS)
            .cloned()
            .collect())
    }

    async fn block_info(&self, block_hashes: &[String]) -> Result<Vec<KoiosBlock>, BackendFailure> {
        self.control.enter("block_info").await?;
        let state = self.state.lock().unwrap();
        Ok(block_hashes
            .iter()
            .filter_map(|hash| state.blocks.get(hash).cloned())
            .collect())
    }

    async fn block_txs(
        &self,
        block_hashes: &[String],
    ) -> Result<Vec<KoiosBlockTx>, BackendFailure> {
        self.control.enter("block_txs").await?;
        let state = self.state.lock().unwrap();
        Ok(block_hashes
            .iter()
            .flat_map(|block| {
                state
                    .block_txs
                    .get(block)
                    .into_iter()
                    .flatten()
                    .map(move |tx| KoiosBlockTx {
                        block_hash: Some(block.clone()),
                        tx_hash: Some(tx.clone()),
                    })
            })
            .collect())
    }

    async fn epoch_params(&self, epoch_no: u64) -> Result<Vec<KoiosEpochParams>, BackendFailure> {
        self.control.enter("epoch_params").await?;
        let state = self.state.lock().unwrap();
        Ok(state.epoch_params.get(&epoch_no).cloned().into_iter().collect())
    }

    async fn submit_tx(&self, cbor: &[u8]) -> Result<String, BackendFailure> {
        self.control.enter("submit_tx").await?;
        self.state.lock().unwrap().submitted.push(cbor.to_vec());
        Ok(format!("submitted{}", cbor.len()))
    }
}

// ---------------------------------------------------------------------------
// GraphQL
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GraphQlState {
    tip: Option<GqlTip>,
    transactions: HashMap<String, GqlTransaction>,
    blocks: HashMap<String, GqlBlock>,
    addresses: HashMap<String, GqlPaymentAddress>,
    address_utxos: HashMap<String, Vec<GqlUtxo>>,
    unspent: Vec<GqlUtxo>,
    protocol_params: Option<GqlProtocolParams>,
    submitted: Vec<String>,
}

/// Mock cardano-graphql API backed by in-memory records.
pub struct MockGraphQlApi {
    state: Mutex<GraphQlState>,
    control: MockControl,
}

impl MockGraphQlApi {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            state: Mutex::new(GraphQlState::default()),
            control: MockControl::new(config),
        }
    }

    #[must_use]
    pub fn failing(failure: BackendFailure) -> Self {
        Self::with_config(MockConfig::failure(failure))
    }

    mock_control_api!();

    pub fn set_tip(&self, number: u64) {
        self.state.lock().unwrap().tip = Some(GqlTip {
            number: Some(number),
            ..Default::default()
        });
    }

    pub fn insert_transaction(&self, tx: GqlTransaction) {
        let hash = tx.hash.clone().unwrap_or_default();
        self.state.lock().unwrap().transactions.insert(hash, tx);
    }

    pub fn insert_block(&self, block: GqlBlock) {
        let hash = block.hash.clone().unwrap_or_default();
        self.state.lock().unwrap().blocks.insert(hash, block);
    }

    pub fn set_address(&self, address: GqlPaymentAddress) {
        let key = address.address.clone().unwrap_or_default();
        self.state.lock().unwrap().addresses.insert(key, address);
    }

    /// Answers lookups of `queried` with `record`, whatever address it names.
    pub fn set_address_answer(&self, queried: &str, record: GqlPaymentAddress) {
        self.state
            .lock()
            .unwrap()
            .addresses
            .insert(queried.to_string(), record);
    }

    /// Registers unspent outputs, reachable both by address and by
    /// `(txHash, index)`.
    pub fn add_unspent(&self, utxo: GqlUtxo) {
        let mut state = self.state.lock().unwrap();
        if let Some(address) = utxo.address.clone() {
            state
                .address_utxos
                .entry(address)
                .or_default()
                .push(utxo.clone());
        }
        state.unspent.push(utxo);
    }

    pub fn spend(&self, tx_hash: &str, index: u32) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let spent = |utxo: &GqlUtxo| {
            utxo.tx_hash.as_deref() == Some(tx_hash) && utxo.index == Some(index)
        };
        state.unspent.retain(|utxo| !spent(utxo));
        for utxos in state.address_utxos.values_mut() {
            utxos.retain(|utxo| !spent(utxo));
        }
    }

    pub fn set_protocol_params(&self, params: GqlProtocolParams) {
        self.state.lock().unwrap().protocol_params = Some(params);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl Default for MockGraphQlApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphQlApi for MockGraphQlApi {
    async fn tip(&self) -> Result<Option<GqlTip>, BackendFailure> {
        self.control.enter("tip").await?;
        Ok(self.state.lock().unwrap().tip.clone())
    }

    async fn transactions(&self, hashes: &[String]) -> Result<Vec<GqlTransaction>, BackendFailure> {
        self.control.enter("transactions").await?;
        let state = self.state.lock().unwrap();
        Ok(hashes
            .iter()
            .filter_map(|hash| state.transactions.get(hash).cloned())
            .collect())
    }

    async fn blocks(&self, hash: &str) -> Result<Vec<GqlBlock>, BackendFailure> {
        self.control.enter("blocks").await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .blocks
            .get(hash)
            .cloned()
            .into_iter()
            .collect())
    }

    async fn payment_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<GqlPaymentAddress>, BackendFailure> {
        self.control.enter("payment_addresses").await?;
        let state = self.state.lock().unwrap();
        Ok(addresses
            .iter()
            .filter_map(|address| state.addresses.get(address).cloned())
            .collect())
    }

    async fn address_utxos(
        &self,
        address: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<GqlUtxo>, BackendFailure> {
        self.control.enter("address_utxos").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .address_utxos
            .get(address)
            .map(|utxos| {
                utxos
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn utxos_by_ref(
        &self,
        tx_hash: &str,
        index: u32,
    ) -> Result<Vec<GqlUtxo>, BackendFailure> {
        self.control.enter("utxos_by_ref").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .unspent
            .iter()
            .filter(|utxo| utxo.tx_hash.as_deref() == Some(tx_hash) && utxo.index == Some(index))
            .cloned()
            .collect())
    }

    async fn protocol_params(&self) -> Result<Option<GqlProtocolParams>, BackendFailure> {
        self.control.enter("protocol_params").await?;
        Ok(self.state.lock().unwrap().protocol_params.clone())
    }

    async fn submit_transaction(&self, cbor_hex: &str) -> Result<String, BackendFailure> {
        self.control.enter("submit_transaction").await?;
        self.state
            .lock()
            .unwrap()
            .submitted
            .push(cbor_hex.to_string());
        Ok(format!("submitted{}", cbor_hex.len() / 2))
    }
}

// ---------------------------------------------------------------------------
// EVM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenMetadata {
    name: String,
    symbol: String,
    decimals: u8,
}

#[derive(Default)]
struct EvmState {
    block_number: u64,
    blocks: HashMap<String, RpcBlock>,
    latest_block: Option<RpcBlock>,
    transactions: HashMap<String, RpcTransaction>,
    receipts: HashMap<String, RpcReceipt>,
    balances: HashMap<String, BigUint>,
    token_balances: HashMap<(String, String), BigUint>,
    tokens: HashMap<String, TokenMetadata>,
    nonces: HashMap<String, u64>,
    gas_estimate: BigUint,
    priority_fee: BigUint,
    submitted: Vec<String>,
}

/// Mock JSON-RPC node.
///
/// Addresses are keyed lower-cased, the way the facade sends them. ERC-20
/// `eth_call`s are decoded and answered from the registered token state.
pub struct MockEvmRpc {
    state: Mutex<EvmState>,
    control: MockControl,
}

fn hex_u64(value: u64) -> String {
    format!("{value:#x}")
}

fn encode_return<T: SolValue>(value: T) -> String {
    format!("0x{}", hex::encode((value,).abi_encode_params()))
}

fn reverted() -> BackendFailure {
    BackendFailure::coded("3", "execution reverted")
}

impl MockEvmRpc {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            state: Mutex::new(EvmState::default()),
            control: MockControl::new(config),
        }
    }

    #[must_use]
    pub fn failing(failure: BackendFailure) -> Self {
        Self::with_config(MockConfig::failure(failure))
    }

    mock_control_api!();

    pub fn set_block_number(&self, number: u64) {
        self.state.lock().unwrap().block_number = number;
    }

    /// Registers a block by hash; `base_fee` also makes it the latest block.
    pub fn insert_block(
        &self,
        hash: &str,
        parent_hash: &str,
        number: u64,
        tx_hashes: &[&str],
        base_fee: Option<u64>,
    ) {
        let block = RpcBlock {
            hash: Some(hash.to_string()),
            parent_hash: Some(parent_hash.to_string()),
            number: Some(hex_u64(number)),
            base_fee_per_gas: base_fee.map(hex_u64),
            transactions: Some(tx_hashes.iter().map(|tx| json!(tx)).collect()),
        };
        let mut state = self.state.lock().unwrap();
        if base_fee.is_some() {
            state.latest_block = Some(block.clone());
        }
        state.blocks.insert(hash.to_string(), block);
    }

    /// Registers a transaction; with `mined_in = Some((block_hash, number))`
    /// a receipt is registered too.
    pub fn insert_transaction(&self, tx: RpcTransaction, mined_in: Option<(&str, u64)>) {
        let hash = tx.hash.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if let Some((block_hash, number)) = mined_in {
            state.receipts.insert(
                hash.clone(),
                RpcReceipt {
                    transaction_hash: Some(hash.clone()),
                    block_hash: Some(block_hash.to_string()),
                    block_number: Some(hex_u64(number)),
                    status: Some("0x1".to_string()),
                },
            );
        }
        state.transactions.insert(hash, tx);
    }

    pub fn set_balance(&self, address: &str, balance: BigUint) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.to_ascii_lowercase(), balance);
    }

    pub fn add_token(&self, contract: &str, name: &str, symbol: &str, decimals: u8) {
        self.state.lock().unwrap().tokens.insert(
            contract.to_ascii_lowercase(),
            TokenMetadata {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        );
    }

    pub fn set_token_balance(&self, contract: &str, owner: &str, balance: BigUint) {
        self.state.lock().unwrap().token_balances.insert(
            (contract.to_ascii_lowercase(), owner.to_ascii_lowercase()),
            balance,
        );
    }

    pub fn set_nonce(&self, address: &str, nonce: u64) {
        self.state
            .lock()
            .unwrap()
            .nonces
            .insert(address.to_ascii_lowercase(), nonce);
    }

    pub fn set_gas_estimate(&self, gas: u64) {
        self.state.lock().unwrap().gas_estimate = BigUint::from(gas);
    }

    pub fn set_priority_fee(&self, fee: u64) {
        self.state.lock().unwrap().priority_fee = BigUint::from(fee);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    fn answer_erc20(&self, request: &RpcCallRequest) -> Result<String, BackendFailure> {
        let data = request.data.as_deref().unwrap_or("0x");
        let bytes = hex::decode(data.trim_start_matches("0x"))
            .map_err(|e| BackendFailure::coded("-32602", e.to_string()))?;
        if bytes.len() < 4 {
            return Err(reverted());
        }
        let state = self.state.lock().unwrap();
        let contract = request.to.to_ascii_lowercase();
        let token = state.tokens.get(&contract).ok_or_else(reverted)?;
        let selector = [bytes[0], bytes[1], bytes[2], bytes[3]];

        if selector == IERC20::nameCall::SELECTOR {
            return Ok(encode_return(token.name.clone()));
        }
        if selector == IERC20::symbolCall::SELECTOR {
            return Ok(encode_return(token.symbol.clone()));
        }
        if selector == IERC20::decimalsCall::SELECTOR {
            return Ok(encode_return(u16::from(token.decimals)));
        }
        if selector == IERC20::balanceOfCall::SELECTOR {
            let call = IERC20::balanceOfCall::abi_decode(&bytes).map_err(|_| reverted())?;
            let balance = state
                .token_balances
                .get(&(contract, hex_address(&call.owner)))
                .cloned()
                .unwrap_or_default();
            let value = U256::from_be_slice(&balance.to_bytes_be());
            return Ok(encode_return(value));
        }
        Err(reverted())
    }
}

impl Default for MockEvmRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EvmRpc for MockEvmRpc {
    async fn block_number(&self) -> Result<String, BackendFailure> {
        self.control.enter("eth_blockNumber").await?;
        Ok(hex_u64(self.state.lock().unwrap().block_number))
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<RpcBlock>, BackendFailure> {
        self.control.enter("eth_getBlockByHash").await?;
        Ok(self.state.lock().unwrap().blocks.get(hash).cloned())
    }

    async fn latest_block(&self) -> Result<Option<RpcBlock>, BackendFailure> {
        self.control.enter("eth_getBlockByNumber").await?;
        Ok(self.state.lock().unwrap().latest_block.clone())
    }

    async fn transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<RpcTransaction>, BackendFailure> {
        self.control.enter("eth_getTransactionByHash").await?;
        Ok(self.state.lock().unwrap().transactions.get(hash).cloned())
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, BackendFailure> {
        self.control.enter("eth_getTransactionReceipt").await?;
        Ok(self.state.lock().unwrap().receipts.get(hash).cloned())
    }

    async fn balance(&self, address: &str) -> Result<String, BackendFailure> {
        self.control.enter("eth_getBalance").await?;
        let state = self.state.lock().unwrap();
        let balance = state.balances.get(address).cloned().unwrap_or_default();
        Ok(to_quantity(&balance))
    }

    async fn pending_transaction_count(&self, address: &str) -> Result<String, BackendFailure> {
        self.control.enter("eth_getTransactionCount").await?;
        let state = self.state.lock().unwrap();
        Ok(hex_u64(state.nonces.get(address).copied().unwrap_or(0)))
    }

    async fn call(&self, request: &RpcCallRequest) -> Result<String, BackendFailure> {
        self.control.enter("eth_call").await?;
        self.answer_erc20(request)
    }

    async fn estimate_gas(&self, _request: &RpcCallRequest) -> Result<String, BackendFailure> {
        self.control.enter("eth_estimateGas").await?;
        Ok(to_quantity(&self.state.lock().unwrap().gas_estimate))
    }

    async fn max_priority_fee_per_gas(&self) -> Result<String, BackendFailure> {
        self.control.enter("eth_maxPriorityFeePerGas").await?;
        Ok(to_quantity(&self.state.lock().unwrap().priority_fee))
    }

    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, BackendFailure> {
        self.control.enter("eth_sendRawTransaction").await?;
        self.state
            .lock()
            .unwrap()
            .submitted
            .push(raw_hex.to_string());
        Ok(format!("0x{:064x}", raw_hex.len()))
    }
}

// ---------------------------------------------------------------------------
// Transaction store
// ---------------------------------------------------------------------------

/// In-memory [`TransactionStore`].
pub struct MockTransactionStore {
    records: Mutex<HashMap<(String, String), TransactionRecord>>,
    failure: Mutex<Option<StoreError>>,
    call_count: AtomicU64,
    is_healthy: AtomicBool,
}

impl MockTransactionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
            call_count: AtomicU64::new(0),
            is_healthy: AtomicBool::new(true),
        }
    }

    /// Creates a store whose lookups fail with `error`.
    #[must_use]
    pub fn failing(error: StoreError) -> Self {
        let store = Self::new();
        store.set_failure(Some(error));
        store
    }

    pub fn set_failure(&self, error: Option<StoreError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn insert(&self, record: TransactionRecord) {
        let key = (record.chain.clone(), record.unsigned_hash.clone());
        self.records.lock().unwrap().insert(key, record);
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for MockTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for MockTransactionStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(StoreError::Connection("Mock store unhealthy".to_string()));
        }
        Ok(())
    }

    async fn find_by_unsigned_hash(
        &self,
        chain: &str,
        unsigned_hash: &str,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        let key = (chain.to_string(), unsigned_hash.to_string());
        Ok(self.records.lock().unwrap().get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_mock_config_failure_applies_to_every_call() {
        let mock = MockKoiosApi::failing(BackendFailure::no_response("down"));
        assert!(mock.tip().await.is_err());
        assert!(mock.block_info(&["b".to_string()]).await.is_err());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_method_failure_is_scoped() {
        let mock = MockKoiosApi::new();
        mock.set_tip(10, 1);
        mock.fail_method("block_txs", BackendFailure::malformed("garbage"));
        assert!(mock.tip().await.is_ok());
        assert!(mock.block_txs(&["b".to_string()]).await.is_err());
        mock.clear_failures();
        assert!(mock.block_txs(&["b".to_string()]).await.is_ok());
        assert_eq!(mock.calls_to("block_txs"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let mock = MockGraphQlApi::with_config(MockConfig::success().with_latency(500));
        let started = tokio::time::Instant::now();
        mock.tip().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_erc20_calls_are_answered() {
        let mock = MockEvmRpc::new();
        let contract = "0x00000000000000000000000000000000000000c0";
        mock.add_token(contract, "Wrapped Ether", "WETH", 18);
        let data = format!("0x{}", hex::encode(IERC20::symbolCall {}.abi_encode()));
        let raw = mock
            .call(&RpcCallRequest {
                to: contract.to_string(),
                data: Some(data),
                ..Default::default()
            })
            .await
            .unwrap();
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        assert_eq!(IERC20::symbolCall::abi_decode_returns(&bytes).unwrap(), "WETH");
    }

    #[tokio::test]
    async fn test_store_lookup_and_failure() {
        let store = MockTransactionStore::new();
        store.insert(TransactionRecord {
            unsigned_hash: "0xu".to_string(),
            signed_hash: Some("0xs".to_string()),
            chain: "ethereum".to_string(),
            created_at: Utc::now(),
        });
        let found = store.find_by_unsigned_hash("ethereum", "0xu").await.unwrap();
        assert_eq!(found.unwrap().chain_hash(), "0xs");
        assert!(store.find_by_unsigned_hash("binance", "0xu").await.unwrap().is_none());

        store.set_failure(Some(StoreError::Connection("refused".to_string())));
        assert!(store.find_by_unsigned_hash("ethereum", "0xu").await.is_err());
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unhealthy_store_reports_connection() {
        let store = MockTransactionStore::new();
        store.health_check().await.unwrap();

        store.set_healthy(false);
        let err = store.health_check().await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[tokio::test]
    async fn test_credential_utxos_are_truncated() {
        let mock = MockKoiosApi::new();
        let rows = (0..1200)
            .map(|index| KoiosUtxo {
                tx_hash: Some("aa".to_string()),
                tx_index: Some(index),
                ..Default::default()
            })
            .collect();
        mock.set_credential_utxos("cred", rows);
        let credentials = ["cred".to_string()];

        let page = mock.credential_utxos(&credentials, None).await.unwrap();
        assert_eq!(page.len(), KOIOS_PAGE_ROWS);

        let target = BoxId::new("aa", 1100);
        let narrowed = mock.credential_utxos(&credentials, Some(&target)).await.unwrap();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].tx_index, Some(1100));
    }
}
