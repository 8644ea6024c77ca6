use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use bridge_chain_query::chain::normalize::{amount, hex_amount};
use bridge_chain_query::domain::BoxId;
use bridge_chain_query::infra::koios::normalize::transaction;
use bridge_chain_query::infra::koios::records::KoiosTxInfo;

fn bench_box_id(c: &mut Criterion) {
    let raw = "8f3c6a1b2d4e5f60718293a4b5c6d7e8f90112233445566778899aabbccddeef.17";

    c.bench_function("parse_box_id", |b| {
        b.iter(|| {
            let _ = black_box(raw).parse::<BoxId>();
        })
    });
}

fn bench_amounts(c: &mut Criterion) {
    let decimal = json!("340282366920938463463374607431768211457");
    let hex = "0x1bc16d674ec80000";

    c.bench_function("decimal_amount", |b| {
        b.iter(|| {
            let _ = amount("quantity", Some(black_box(&decimal)));
        })
    });

    c.bench_function("hex_amount", |b| {
        b.iter(|| {
            let _ = hex_amount("value", Some(black_box(hex)));
        })
    });
}

fn bench_koios_transaction(c: &mut Criterion) {
    let io = |index: u32| {
        json!({
            "payment_addr": {"bech32": "addr_test1qz", "cred": "cred01"},
            "tx_hash": "00aa",
            "tx_index": index,
            "value": "2000000",
            "asset_list": [{"policy_id": "p1", "asset_name": "6e616d65", "quantity": "9007199254740993"}]
        })
    };
    let info: KoiosTxInfo = serde_json::from_value(json!({
        "tx_hash": "9f2c0a",
        "block_hash": "b10c4a",
        "fee": "170000",
        "inputs": (0..4).map(io).collect::<Vec<_>>(),
        "outputs": (0..8).map(io).collect::<Vec<_>>(),
        "metadata": {"674": {"msg": ["bridge"]}}
    }))
    .unwrap();

    c.bench_function("normalize_koios_transaction", |b| {
        b.iter(|| {
            let _ = transaction(black_box(&info));
        })
    });
}

criterion_group!(benches, bench_box_id, bench_amounts, bench_koios_transaction);
criterion_main!(benches);
