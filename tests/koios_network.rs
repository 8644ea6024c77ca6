//! Facade tests for the Koios backend over the in-memory Koios API.

use std::sync::Arc;

use num_bigint::BigUint;
use serde_json::json;

use bridge_chain_query::chain::BackendFailure;
use bridge_chain_query::domain::{BoxId, CardanoNetwork, ChainNetwork, ErrorKind};
use bridge_chain_query::infra::KoiosNetwork;
use bridge_chain_query::infra::koios::records::{
    KoiosAddressAsset, KoiosAddressInfo, KoiosAsset, KoiosBlock, KoiosEpochParams,
    KoiosPaymentAddr, KoiosTxInfo, KoiosTxIo, KoiosUtxo,
};
use bridge_chain_query::test_utils::{KOIOS_PAGE_ROWS, MockKoiosApi};

const TX: &str = "9f2c0a";
const BLOCK: &str = "b10c4a";
const CRED: &str = "cred01";
const ADDR: &str = "addr_test1qz";

fn setup() -> (Arc<MockKoiosApi>, KoiosNetwork) {
    let api = Arc::new(MockKoiosApi::new());
    let network = KoiosNetwork::new(api.clone());
    (api, network)
}

fn tx_output(index: u32, lovelace: &str, cred: Option<&str>) -> KoiosTxIo {
    KoiosTxIo {
        payment_addr: Some(KoiosPaymentAddr {
            bech32: Some(ADDR.to_string()),
            cred: cred.map(str::to_string),
        }),
        tx_index: Some(index),
        value: Some(json!(lovelace)),
        asset_list: Some(vec![]),
        ..Default::default()
    }
}

fn sample_tx() -> KoiosTxInfo {
    KoiosTxInfo {
        tx_hash: Some(TX.to_string()),
        block_hash: Some(BLOCK.to_string()),
        block_height: Some(95),
        tx_timestamp: None,
        fee: Some(json!("170000")),
        inputs: Some(vec![KoiosTxIo {
            tx_hash: Some("00aa".to_string()),
            tx_index: Some(3),
            value: Some(json!("5000000")),
            asset_list: Some(vec![KoiosAsset {
                policy_id: Some("p1".to_string()),
                asset_name: Some("6e616d65".to_string()),
                quantity: Some(json!("9007199254740993")),
                ..Default::default()
            }]),
            ..Default::default()
        }]),
        outputs: Some(vec![
            tx_output(0, "2000000", Some(CRED)),
            tx_output(1, "2830000", Some(CRED)),
        ]),
        metadata: Some(serde_json::Map::new()),
    }
}

fn unspent(tx: &str, index: u32) -> KoiosUtxo {
    KoiosUtxo {
        tx_hash: Some(tx.to_string()),
        tx_index: Some(index),
        address: Some(ADDR.to_string()),
        value: Some(json!("2000000")),
        asset_list: Some(vec![]),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_height_from_tip() {
    let (api, network) = setup();
    api.set_tip(1_042, 120);
    assert_eq!(network.get_height().await.unwrap(), 1_042);
}

#[tokio::test]
async fn test_empty_tip_is_unexpected() {
    let (_api, network) = setup();
    let err = network.get_height().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
    assert!(err.message().starts_with("Failed to get current height from Koios: "));
}

#[tokio::test]
async fn test_unreachable_backend_is_network() {
    let api = Arc::new(MockKoiosApi::failing(BackendFailure::no_response(
        "connection refused",
    )));
    let network = KoiosNetwork::new(api);
    let err = network.get_height().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unknown_transaction_has_minus_one_confirmations() {
    let (api, network) = setup();
    assert_eq!(network.get_tx_confirmation(TX).await.unwrap(), -1);

    api.set_confirmations(TX, None);
    assert_eq!(network.get_tx_confirmation(TX).await.unwrap(), -1);

    api.set_confirmations(TX, Some(12));
    assert_eq!(network.get_tx_confirmation(TX).await.unwrap(), 12);
}

#[tokio::test]
async fn test_unknown_address_has_zero_balance() {
    let (_api, network) = setup();
    let balance = network.get_address_assets(ADDR).await.unwrap();
    assert_eq!(balance.native_amount, BigUint::ZERO);
    assert!(balance.tokens.is_empty());
}

#[tokio::test]
async fn test_address_assets_keep_full_precision() {
    let (api, network) = setup();
    api.set_address(
        ADDR,
        KoiosAddressInfo {
            address: Some(ADDR.to_string()),
            balance: Some(json!("123456789012345678901")),
            ..Default::default()
        },
        vec![KoiosAddressAsset {
            address: Some(ADDR.to_string()),
            policy_id: Some("p1".to_string()),
            asset_name: Some("6e616d65".to_string()),
            quantity: Some(json!("9007199254740993")),
            ..Default::default()
        }],
    );

    let balance = network.get_address_assets(ADDR).await.unwrap();
    assert_eq!(
        balance.native_amount,
        "123456789012345678901".parse::<BigUint>().unwrap()
    );
    assert_eq!(balance.tokens.len(), 1);
    assert_eq!(balance.tokens[0].id, "p1.6e616d65");
    assert_eq!(balance.tokens[0].amount, BigUint::from(9_007_199_254_740_993u64));
}

#[tokio::test]
async fn test_transaction_in_wrong_block_is_failed() {
    let (api, network) = setup();
    api.insert_transaction(sample_tx());

    let err = network.get_transaction(TX, "other").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    assert!(err.message().contains(TX));
    assert!(err.message().contains("other"));
}

#[tokio::test]
async fn test_transaction_is_normalized() {
    let (api, network) = setup();
    api.insert_transaction(sample_tx());

    let tx = network.get_transaction(TX, BLOCK).await.unwrap();
    assert_eq!(tx.id, TX);
    assert_eq!(tx.fee, BigUint::from(170_000u32));
    assert_eq!(tx.inputs[0].box_id(), BoxId::new("00aa", 3));
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[1].address, ADDR);
    assert!(tx.metadata.is_none());

    let missing = network.get_transaction("feed", BLOCK).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Failed);
}

#[tokio::test]
async fn test_missing_block_vs_malformed_response() {
    let (api, network) = setup();
    let err = network.get_block_info(BLOCK).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    assert!(err.message().ends_with("Block not found"));

    let err = network.get_block_transaction_ids(BLOCK).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);

    api.fail_method("block_info", BackendFailure::malformed("expected array"));
    let err = network.get_block_info(BLOCK).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
}

#[tokio::test]
async fn test_block_info_and_transaction_ids() {
    let (api, network) = setup();
    api.insert_block(
        KoiosBlock {
            hash: Some(BLOCK.to_string()),
            parent_hash: Some("b10c49".to_string()),
            block_height: Some(95),
            ..Default::default()
        },
        vec![TX.to_string(), "77ee".to_string()],
    );
    api.insert_block(
        KoiosBlock {
            hash: Some("empty".to_string()),
            parent_hash: Some(BLOCK.to_string()),
            block_height: Some(96),
            ..Default::default()
        },
        vec![],
    );

    let info = network.get_block_info(BLOCK).await.unwrap();
    assert_eq!(info.parent_hash, "b10c49");
    assert_eq!(info.height, 95);

    let ids = network.get_block_transaction_ids(BLOCK).await.unwrap();
    assert_eq!(ids, vec![TX.to_string(), "77ee".to_string()]);

    assert!(network.get_block_transaction_ids("empty").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_box_validity_follows_spending() {
    let (api, network) = setup();
    api.insert_transaction(sample_tx());
    api.set_credential_utxos(CRED, vec![unspent(TX, 0), unspent(TX, 1)]);
    let box_id = BoxId::new(TX, 1);

    assert!(network.is_box_unspent_and_valid(&box_id).await.unwrap());
    api.spend(TX, 1);
    assert!(!network.is_box_unspent_and_valid(&box_id).await.unwrap());
    assert!(network.is_box_unspent_and_valid(&BoxId::new(TX, 0)).await.unwrap());
}

#[tokio::test]
async fn test_box_validity_beyond_first_page() {
    let (api, network) = setup();
    api.insert_transaction(sample_tx());
    let mut rows: Vec<KoiosUtxo> = (0..KOIOS_PAGE_ROWS as u32)
        .map(|index| unspent("77e1", index))
        .collect();
    rows.push(unspent(TX, 1));
    api.set_credential_utxos(CRED, rows);

    assert!(network.is_box_unspent_and_valid(&BoxId::new(TX, 1)).await.unwrap());
    assert!(!network.is_box_unspent_and_valid(&BoxId::new(TX, 0)).await.unwrap());
}

#[tokio::test]
async fn test_box_of_unknown_transaction_is_not_valid() {
    let (api, network) = setup();
    assert!(!network.is_box_unspent_and_valid(&BoxId::new(TX, 0)).await.unwrap());
    assert_eq!(api.calls_to("credential_utxos"), 0);
}

#[tokio::test]
async fn test_box_validity_without_credential_is_unexpected() {
    let (api, network) = setup();
    let mut tx = sample_tx();
    tx.outputs = Some(vec![tx_output(0, "1000000", None)]);
    api.insert_transaction(tx);

    let err = network
        .is_box_unspent_and_valid(&BoxId::new(TX, 0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
}

#[tokio::test]
async fn test_get_utxo_returns_spent_output() {
    let (api, network) = setup();
    api.insert_transaction(sample_tx());

    let utxo = network.get_utxo(&BoxId::new(TX, 1)).await.unwrap();
    assert_eq!(utxo.value, BigUint::from(2_830_000u32));
    assert_eq!(utxo.box_id(), BoxId::new(TX, 1));

    let err = network.get_utxo(&BoxId::new(TX, 7)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);

    let err = network.get_utxo(&BoxId::new("feed", 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
}

#[tokio::test]
async fn test_address_boxes_are_paginated() {
    let (api, network) = setup();
    api.set_address_utxos(ADDR, (0..5).map(|i| unspent(TX, i)).collect());

    let page = network.get_address_boxes(ADDR, 2, 2).await.unwrap();
    let indexes: Vec<u32> = page.iter().map(|utxo| utxo.index).collect();
    assert_eq!(indexes, vec![2, 3]);
    assert!(network.get_address_boxes("nobody", 0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_protocol_parameters_of_current_epoch() {
    let (api, network) = setup();
    api.set_tip(1_000, 120);
    api.set_epoch_params(
        120,
        KoiosEpochParams {
            epoch_no: Some(120),
            min_fee_a: Some(json!(44)),
            min_fee_b: Some(json!(155381)),
            max_tx_size: Some(json!(16384)),
            max_val_size: Some(json!("5000")),
            key_deposit: Some(json!("2000000")),
            pool_deposit: Some(json!("500000000")),
            coins_per_utxo_size: Some(json!("4310")),
        },
    );

    let params = network.get_protocol_parameters().await.unwrap();
    assert_eq!(params.min_fee_a, 44);
    assert_eq!(params.max_value_size, 5000);
    assert_eq!(params.coins_per_utxo_size, BigUint::from(4310u32));

    api.set_tip(1_000, 121);
    let err = network.get_protocol_parameters().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
}

#[tokio::test]
async fn test_submit_and_rejection() {
    let (api, network) = setup();
    network.submit_transaction(&[0x84, 0xa4]).await.unwrap();
    assert_eq!(api.submitted(), vec![vec![0x84, 0xa4]]);

    api.fail_method("submit_tx", BackendFailure::http(400, "BadInputsUTxO"));
    let err = network.submit_transaction(&[0x84]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Failed);
    assert!(err.message().contains("BadInputsUTxO"));
}

#[tokio::test]
async fn test_mempool_is_empty() {
    let (_api, network) = setup();
    assert!(network.get_mempool_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    let (api, network) = setup();
    api.insert_transaction(sample_tx());
    let first = network.get_transaction(TX, BLOCK).await.unwrap();
    let second = network.get_transaction(TX, BLOCK).await.unwrap();
    assert_eq!(first, second);
}
