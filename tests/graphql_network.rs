//! Facade tests for the cardano-graphql backend.

use std::sync::Arc;

use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use bridge_chain_query::chain::BackendFailure;
use bridge_chain_query::domain::{BoxId, CardanoNetwork, ChainNetwork, ErrorKind};
use bridge_chain_query::infra::GraphQlNetwork;
use bridge_chain_query::test_utils::MockGraphQlApi;

const TX: &str = "5b1e77";
const BLOCK: &str = "c4fe01";
const ADDR: &str = "addr_test1vq";

fn record<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

fn setup() -> (Arc<MockGraphQlApi>, GraphQlNetwork) {
    let api = Arc::new(MockGraphQlApi::new());
    let network = GraphQlNetwork::new(api.clone());
    (api, network)
}

fn seed_transaction(api: &MockGraphQlApi) {
    api.insert_transaction(record(json!({
        "hash": TX,
        "fee": "171617",
        "block": {"hash": BLOCK, "number": 480},
        "inputs": [{
            "sourceTxHash": "aa01",
            "sourceTxIndex": 0,
            "address": ADDR,
            "value": "10000000",
            "tokens": []
        }],
        "outputs": [
            {"address": ADDR, "index": 0, "value": "1500000", "tokens": []},
            {
                "address": ADDR,
                "index": 1,
                "value": "8328383",
                "tokens": [{
                    "asset": {"assetId": "p2746f6b", "policyId": "p2", "assetName": "746f6b"},
                    "quantity": "18446744073709551617"
                }]
            }
        ],
        "metadata": []
    })));
}

fn unspent(tx: &str, index: u32) -> Value {
    json!({"txHash": tx, "index": index, "address": ADDR, "value": "1500000", "tokens": []})
}

#[tokio::test]
async fn test_height_and_missing_tip() {
    let (api, network) = setup();
    let err = network.get_height().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);

    api.set_tip(500);
    assert_eq!(network.get_height().await.unwrap(), 500);
}

#[tokio::test]
async fn test_confirmation_is_depth_below_tip() {
    let (api, network) = setup();
    api.set_tip(500);
    assert_eq!(network.get_tx_confirmation(TX).await.unwrap(), -1);

    seed_transaction(&api);
    assert_eq!(network.get_tx_confirmation(TX).await.unwrap(), 20);
}

#[tokio::test]
async fn test_graphql_rejection_is_failed() {
    let api = Arc::new(MockGraphQlApi::failing(BackendFailure::coded(
        "BAD_USER_INPUT",
        "Variable \"$hashes\" got invalid value",
    )));
    let network = GraphQlNetwork::new(api);
    let err = network.get_tx_confirmation("zz").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    assert!(err.message().contains("BAD_USER_INPUT"));
}

#[tokio::test]
async fn test_address_assets_split_lovelace() {
    let (api, network) = setup();
    assert_eq!(
        network.get_address_assets(ADDR).await.unwrap().native_amount,
        BigUint::ZERO
    );

    api.set_address(record(json!({
        "address": ADDR,
        "summary": {"assetBalances": [
            {"asset": {"assetId": "ada"}, "quantity": "42000000"},
            {"asset": {"assetId": "p2746f6b", "policyId": "p2", "assetName": "746f6b"}, "quantity": "7"}
        ]}
    })));
    let balance = network.get_address_assets(ADDR).await.unwrap();
    assert_eq!(balance.native_amount, BigUint::from(42_000_000u32));
    assert_eq!(balance.tokens.len(), 1);
    assert_eq!(balance.tokens[0].id, "p2.746f6b");
}

#[tokio::test]
async fn test_address_assets_ignore_other_addresses() {
    let (api, network) = setup();
    api.set_address_answer(
        ADDR,
        record(json!({
            "address": "addr_test1wz",
            "summary": {"assetBalances": [
                {"asset": {"assetId": "ada"}, "quantity": "42000000"}
            ]}
        })),
    );

    let balance = network.get_address_assets(ADDR).await.unwrap();
    assert_eq!(balance.native_amount, BigUint::ZERO);
    assert!(balance.tokens.is_empty());
}

#[tokio::test]
async fn test_block_queries() {
    let (api, network) = setup();
    let err = network.get_block_info(BLOCK).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    assert!(err.message().ends_with("Block not found"));

    api.insert_block(record(json!({
        "hash": BLOCK,
        "number": 480,
        "previousBlock": {"hash": "c4fe00", "number": 479},
        "transactions": [{"hash": TX}, {"hash": "99"}]
    })));
    let info = network.get_block_info(BLOCK).await.unwrap();
    assert_eq!(info.parent_hash, "c4fe00");
    assert_eq!(
        network.get_block_transaction_ids(BLOCK).await.unwrap(),
        vec![TX.to_string(), "99".to_string()]
    );
}

#[tokio::test]
async fn test_block_without_parent_is_unexpected() {
    let (api, network) = setup();
    api.insert_block(record(json!({"hash": BLOCK, "number": 1, "transactions": []})));
    let err = network.get_block_info(BLOCK).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
}

#[tokio::test]
async fn test_transaction_membership() {
    let (api, network) = setup();
    seed_transaction(&api);

    let tx = network.get_transaction(TX, BLOCK).await.unwrap();
    assert_eq!(
        tx.outputs[1].assets[0].quantity,
        "18446744073709551617".parse::<BigUint>().unwrap()
    );
    assert!(tx.metadata.is_none());

    let err = network.get_transaction(TX, "elsewhere").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    assert!(err.message().contains(TX));
    assert!(err.message().contains("elsewhere"));
}

#[tokio::test]
async fn test_utxo_and_validity() {
    let (api, network) = setup();
    seed_transaction(&api);
    api.add_unspent(record(unspent(TX, 0)));
    let box_id: BoxId = format!("{TX}.0").parse().unwrap();

    assert!(network.is_box_unspent_and_valid(&box_id).await.unwrap());
    assert_eq!(api.calls_to("utxos_by_ref"), 1);
    api.spend(TX, 0);
    assert!(!network.is_box_unspent_and_valid(&box_id).await.unwrap());

    // still readable once spent
    let utxo = network.get_utxo(&box_id).await.unwrap();
    assert_eq!(utxo.value, BigUint::from(1_500_000u32));
}

#[tokio::test]
async fn test_address_boxes_and_parameters() {
    let (api, network) = setup();
    for index in 0..3 {
        api.add_unspent(record(unspent(TX, index)));
    }
    let page = network.get_address_boxes(ADDR, 1, 5).await.unwrap();
    assert_eq!(page.len(), 2);

    let err = network.get_protocol_parameters().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);

    api.set_protocol_params(record(json!({
        "minFeeA": 44,
        "minFeeB": 155381,
        "maxTxSize": 16384,
        "maxValSize": "5000",
        "keyDeposit": 2000000,
        "poolDeposit": 500000000,
        "coinsPerUtxoByte": 4310
    })));
    let params = network.get_protocol_parameters().await.unwrap();
    assert_eq!(params.min_fee_b, 155_381);
    assert_eq!(params.pool_deposit, BigUint::from(500_000_000u32));
}

#[tokio::test]
async fn test_submit_sends_hex() {
    let (api, network) = setup();
    network.submit_transaction(&[0xde, 0xad]).await.unwrap();
    assert_eq!(api.submitted(), vec!["dead".to_string()]);

    api.fail_method("submit_transaction", BackendFailure::no_response("timeout"));
    let err = network.submit_transaction(&[0x00]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}
