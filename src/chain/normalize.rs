//! Field-level helpers shared by the backend normalizers.
//!
//! Every helper that reads a required field fails with
//! [`ChainError::UnexpectedApi`] naming the field when the backend sent null
//! or nothing; none of them substitutes a default.

use num_bigint::BigUint;
use serde_json::Value;

use crate::domain::{ChainError, TxMetadata};

pub fn required<T>(field: &str, value: Option<T>) -> Result<T, ChainError> {
    value.ok_or_else(|| ChainError::missing_field(field))
}

/// Borrowing variant of [`required`] for string fields.
pub fn required_str<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ChainError> {
    value
        .as_deref()
        .ok_or_else(|| ChainError::missing_field(field))
}

/// Parses a quantity sent either as a decimal string or a JSON integer.
pub fn amount(field: &str, value: Option<&Value>) -> Result<BigUint, ChainError> {
    match value {
        None | Some(Value::Null) => Err(ChainError::missing_field(field)),
        Some(Value::String(raw)) => parse_decimal(field, raw),
        Some(Value::Number(number)) => number.as_u64().map(BigUint::from).ok_or_else(|| {
            ChainError::unexpected(format!(
                "field `{field}` is not a non-negative integer: {number}"
            ))
        }),
        Some(other) => Err(ChainError::unexpected(format!(
            "field `{field}` has unexpected type: {other}"
        ))),
    }
}

pub fn optional_amount(field: &str, value: Option<&Value>) -> Result<Option<BigUint>, ChainError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(_) => amount(field, value).map(Some),
    }
}

/// Quantity that must fit a machine word (sizes, fee coefficients, heights).
pub fn integer(field: &str, value: Option<&Value>) -> Result<u64, ChainError> {
    let parsed = amount(field, value)?;
    u64::try_from(&parsed)
        .map_err(|_| ChainError::unexpected(format!("field `{field}` out of range: {parsed}")))
}

fn parse_decimal(field: &str, raw: &str) -> Result<BigUint, ChainError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChainError::unexpected(format!(
            "field `{field}` is not a decimal quantity: {raw:?}"
        )));
    }
    raw.parse()
        .map_err(|e| ChainError::unexpected(format!("field `{field}`: {e}")))
}

/// Parses a `0x`-prefixed hex quantity as returned by JSON-RPC nodes.
pub fn hex_amount(field: &str, value: Option<&str>) -> Result<BigUint, ChainError> {
    let raw = required(field, value)?;
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| ChainError::unexpected(format!("field `{field}` is not hex: {raw:?}")))?;
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| ChainError::unexpected(format!("field `{field}` is not hex: {raw:?}")))
}

pub fn optional_hex_amount(
    field: &str,
    value: Option<&str>,
) -> Result<Option<BigUint>, ChainError> {
    value.map(|raw| hex_amount(field, Some(raw))).transpose()
}

pub fn hex_integer(field: &str, value: Option<&str>) -> Result<u64, ChainError> {
    let parsed = hex_amount(field, value)?;
    u64::try_from(&parsed)
        .map_err(|_| ChainError::unexpected(format!("field `{field}` out of range: {parsed}")))
}

/// Collapses an empty metadata collection to "nothing recorded".
pub fn metadata<I>(entries: I) -> Option<TxMetadata>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let map: TxMetadata = entries.into_iter().collect();
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_amount_keeps_precision_above_2_pow_53() {
        let raw = json!("9007199254740993");
        let parsed = amount("value", Some(&raw)).unwrap();
        assert_eq!(parsed.to_string(), "9007199254740993");

        let huge = json!("340282366920938463463374607431768211457");
        let parsed = amount("quantity", Some(&huge)).unwrap();
        assert_eq!(
            parsed.to_string(),
            "340282366920938463463374607431768211457"
        );
    }

    #[test]
    fn test_amount_accepts_json_integers() {
        let parsed = amount("fee", Some(&json!(170_000))).unwrap();
        assert_eq!(parsed, BigUint::from(170_000u32));
    }

    #[test]
    fn test_amount_missing_is_unexpected() {
        for value in [None, Some(&Value::Null)] {
            let err = amount("value", value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
            assert!(err.message().contains("`value`"));
        }
    }

    #[test]
    fn test_amount_rejects_negative_and_fractional() {
        for raw in [json!("-5"), json!(-5), json!(1.5), json!("1.5"), json!(""), json!(true)] {
            let err = amount("value", Some(&raw)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnexpectedApi, "{raw}");
        }
    }

    #[test]
    fn test_optional_amount() {
        assert_eq!(optional_amount("x", None).unwrap(), None);
        assert_eq!(optional_amount("x", Some(&Value::Null)).unwrap(), None);
        assert_eq!(
            optional_amount("x", Some(&json!("7"))).unwrap(),
            Some(BigUint::from(7u32))
        );
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(integer("size", Some(&json!("16384"))).unwrap(), 16384);
        let err = integer("size", Some(&json!("18446744073709551616"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedApi);
    }

    #[test]
    fn test_hex_amount() {
        assert_eq!(hex_amount("n", Some("0x0")).unwrap(), BigUint::ZERO);
        assert_eq!(hex_integer("n", Some("0x1b4")).unwrap(), 436);
        assert_eq!(
            hex_amount("n", Some("0xde0b6b3a7640000")).unwrap().to_string(),
            "1000000000000000000"
        );
        assert!(hex_amount("n", Some("1b4")).is_err());
        assert!(hex_amount("n", Some("0x")).is_err());
        assert!(hex_amount("n", None).is_err());
        assert_eq!(optional_hex_amount("n", None).unwrap(), None);
    }

    #[test]
    fn test_required() {
        assert_eq!(required("a", Some(1)).unwrap(), 1);
        let err = required::<u8>("block_hash", None).unwrap_err();
        assert_eq!(err, ChainError::missing_field("block_hash"));
        assert_eq!(required_str("s", &Some("v".to_string())).unwrap(), "v");
        assert!(required_str("s", &None).is_err());
    }

    #[test]
    fn test_empty_metadata_is_absent() {
        assert_eq!(metadata(Vec::new()), None);

        let meta = metadata(vec![("674".to_string(), json!({"msg": ["hi"]}))]).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["674"], json!({"msg": ["hi"]}));
    }
}
