//! JSON-RPC results to canonical entities, and ERC-20 call encoding.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use num_bigint::BigUint;
use serde_json::Value;

use crate::chain::normalize::{hex_amount, hex_integer, optional_hex_amount, required, required_str};
use crate::domain::{BlockInfo, ChainError, EvmCall, EvmTx};

use super::records::{RpcBlock, RpcCallRequest, RpcTransaction};

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Parses a caller-supplied address. A malformed address is a rejected
/// request, not a backend fault.
pub fn parse_address(address: &str) -> Result<Address, ChainError> {
    address
        .parse::<Address>()
        .map_err(|e| ChainError::failed(format!("Invalid address [{address}]: {e}")))
}

/// Lower-cased `0x` form of an address, also the token id of ERC-20
/// contracts.
#[must_use]
pub fn hex_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

#[must_use]
pub fn u256_to_biguint(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

#[must_use]
pub fn to_quantity(value: &BigUint) -> String {
    format!("{value:#x}")
}

/// ABI-encodes `call` as `0x`-prefixed calldata.
#[must_use]
pub fn encode_call<C: SolCall>(call: &C) -> String {
    format!("0x{}", hex::encode(call.abi_encode()))
}

/// Decodes the return data of an `eth_call` made with `C`.
pub fn decode_return<C: SolCall>(data: &str) -> Result<C::Return, ChainError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(digits).map_err(|e| {
        ChainError::unexpected(format!("{} returned non-hex data: {e}", C::SIGNATURE))
    })?;
    C::abi_decode_returns(&bytes).map_err(|e| {
        ChainError::unexpected(format!("{} returned undecodable data: {e}", C::SIGNATURE))
    })
}

pub fn erc20_call(contract: &Address, data: String) -> RpcCallRequest {
    RpcCallRequest {
        from: None,
        to: hex_address(contract),
        value: None,
        data: Some(data),
    }
}

pub fn call_request(call: &EvmCall) -> Result<RpcCallRequest, ChainError> {
    let from = call
        .from
        .as_deref()
        .map(parse_address)
        .transpose()?
        .map(|from| hex_address(&from));
    Ok(RpcCallRequest {
        from,
        to: hex_address(&parse_address(&call.to)?),
        value: call.value.as_ref().map(to_quantity),
        data: call.data.clone(),
    })
}

pub fn transaction(tx: &RpcTransaction) -> Result<EvmTx, ChainError> {
    Ok(EvmTx {
        hash: required_str("hash", &tx.hash)?.to_string(),
        block_hash: tx.block_hash.clone(),
        from: required_str("from", &tx.from)?.to_string(),
        to: tx.to.clone(),
        nonce: hex_integer("nonce", tx.nonce.as_deref())?,
        value: hex_amount("value", tx.value.as_deref())?,
        data: required_str("input", &tx.input)?.to_string(),
        gas_limit: hex_amount("gas", tx.gas.as_deref())?,
        gas_price: optional_hex_amount("gasPrice", tx.gas_price.as_deref())?,
        max_fee_per_gas: optional_hex_amount("maxFeePerGas", tx.max_fee_per_gas.as_deref())?,
        max_priority_fee_per_gas: optional_hex_amount(
            "maxPriorityFeePerGas",
            tx.max_priority_fee_per_gas.as_deref(),
        )?,
        chain_id: tx
            .chain_id
            .as_deref()
            .map(|raw| hex_integer("chainId", Some(raw)))
            .transpose()?,
    })
}

pub fn block_info(block: &RpcBlock) -> Result<BlockInfo, ChainError> {
    Ok(BlockInfo {
        hash: required_str("hash", &block.hash)?.to_string(),
        parent_hash: required_str("parentHash", &block.parent_hash)?.to_string(),
        height: hex_integer("number", block.number.as_deref())?,
    })
}

pub fn block_transaction_ids(block: &RpcBlock) -> Result<Vec<String>, ChainError> {
    required("transactions", block.transactions.as_ref())?
        .iter()
        .map(|entry| match entry {
            Value::String(hash) => Ok(hash.clone()),
            Value::Object(object) => object
                .get("hash")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ChainError::missing_field("transactions.hash")),
            other => Err(ChainError::unexpected(format!(
                "unexpected transaction entry: {other}"
            ))),
        })
        .collect()
}

/// Suggested fee cap: twice the latest base fee plus the priority fee.
pub fn max_fee_per_gas(block: &RpcBlock, priority_fee: &BigUint) -> Result<BigUint, ChainError> {
    let base_fee = hex_amount("baseFeePerGas", block.base_fee_per_gas.as_deref())?;
    Ok(base_fee * 2u32 + priority_fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use alloy::sol_types::SolValue;
    use serde_json::json;

    const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    #[test]
    fn test_parse_address() {
        let address = parse_address(TOKEN).unwrap();
        assert_eq!(hex_address(&address), TOKEN.to_ascii_lowercase());

        let err = parse_address("0x1234").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert!(err.message().contains("0x1234"));
    }

    #[test]
    fn test_balance_of_encoding() {
        let owner = parse_address("0x00000000000000000000000000000000000000aa").unwrap();
        let data = encode_call(&IERC20::balanceOfCall { owner });
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("aa"));
        assert_eq!(data.len(), 2 + 8 + 64);
    }

    #[test]
    fn test_decode_returns() {
        let raw = format!("0x{}", hex::encode((U256::from(1_000_000u64),).abi_encode_params()));
        let balance = decode_return::<IERC20::balanceOfCall>(&raw).unwrap();
        assert_eq!(u256_to_biguint(balance), BigUint::from(1_000_000u32));

        let raw = format!("0x{}", hex::encode(("USD Coin".to_string(),).abi_encode_params()));
        assert_eq!(decode_return::<IERC20::nameCall>(&raw).unwrap(), "USD Coin");

        let err = decode_return::<IERC20::decimalsCall>("0x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
    }

    #[test]
    fn test_u256_beyond_u128() {
        let value = U256::MAX;
        assert_eq!(
            u256_to_biguint(value).to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn test_transaction() {
        let tx: RpcTransaction = serde_json::from_value(json!({
            "hash": "0xabc",
            "blockHash": "0xb1",
            "blockNumber": "0x10",
            "from": "0xfrom",
            "to": null,
            "nonce": "0x5",
            "value": "0xde0b6b3a7640000",
            "input": "0x",
            "gas": "0x5208",
            "maxFeePerGas": "0x3b9aca00",
            "maxPriorityFeePerGas": "0x1",
            "chainId": "0x1"
        }))
        .unwrap();
        let parsed = transaction(&tx).unwrap();
        assert_eq!(parsed.nonce, 5);
        assert_eq!(parsed.value.to_string(), "1000000000000000000");
        assert_eq!(parsed.gas_limit, BigUint::from(21_000u32));
        assert_eq!(parsed.gas_price, None);
        assert_eq!(parsed.to, None);
        assert_eq!(parsed.chain_id, Some(1));
    }

    #[test]
    fn test_block_transaction_ids_accepts_both_shapes() {
        let block = RpcBlock {
            transactions: Some(vec![json!("0x1"), json!({"hash": "0x2"})]),
            ..Default::default()
        };
        assert_eq!(block_transaction_ids(&block).unwrap(), vec!["0x1", "0x2"]);

        let bad = RpcBlock {
            transactions: Some(vec![json!(7)]),
            ..Default::default()
        };
        assert!(block_transaction_ids(&bad).is_err());
    }

    #[test]
    fn test_max_fee_per_gas() {
        let block = RpcBlock {
            base_fee_per_gas: Some("0x64".to_string()),
            ..Default::default()
        };
        let fee = max_fee_per_gas(&block, &BigUint::from(2u32)).unwrap();
        assert_eq!(fee, BigUint::from(202u32));

        let pre_london = RpcBlock::default();
        let err = max_fee_per_gas(&pre_london, &BigUint::from(2u32)).unwrap_err();
        assert_eq!(err, ChainError::missing_field("baseFeePerGas"));
    }

    #[test]
    fn test_call_request() {
        let call = EvmCall {
            to: TOKEN.to_string(),
            value: Some(BigUint::from(255u32)),
            ..Default::default()
        };
        let request = call_request(&call).unwrap();
        assert_eq!(request.value.as_deref(), Some("0xff"));
        assert_eq!(request.to, TOKEN.to_ascii_lowercase());
        assert!(request.from.is_none());
    }
}
