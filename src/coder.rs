//! Value Coders
//!
//! Converts values to and from the byte strings backends store. Values cross
//! the coder seam as `serde_json::Value`; typed results are converted with
//! serde on either side.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Coder Trait ==
/// Encode/decode pair used to store values in a backend.
pub trait Coder: Send + Sync + fmt::Debug {
    /// Encodes a value to bytes.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decodes bytes produced by [`Coder::encode`].
    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

// == JSON Coder ==
/// JSON coder. Handles any serde-representable value, including nested
/// dates and timestamps (carried as ISO-8601 strings).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCoder;

impl Coder for JsonCoder {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Decode(e.to_string()))
    }
}

// == String Coder ==
/// Plain-text coder.
///
/// Strings are stored as their raw text, anything else as its JSON text.
/// Decoding always yields a string.
///
/// Only use it for callables returning text. For any other return type the
/// decoded string does not deserialize into the result, so every hit is
/// treated as a miss and the callable runs on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCoder;

impl Coder for StringCoder {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(text.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|e| CacheError::Decode(e.to_string()))
    }
}

// == Binary Coder ==
/// Compact binary coder backed by bincode.
///
/// bincode is not self-describing, so values go through a tagged tree that
/// keeps integers, floats (bit-exact) and key order intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCoder;

#[derive(Serialize, Deserialize)]
enum Tree {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<Tree>),
    Map(Vec<(String, Tree)>),
}

impl Tree {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Tree::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Tree::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    Tree::Float(f)
                } else {
                    return Err(CacheError::Encode(format!("unrepresentable number {}", n)));
                }
            }
            Value::String(s) => Tree::Text(s.clone()),
            Value::Array(items) => {
                Tree::List(items.iter().map(Tree::from_value).collect::<Result<_>>()?)
            }
            Value::Object(fields) => Tree::Map(
                fields
                    .iter()
                    .map(|(k, v)| -> Result<(String, Tree)> {
                        Ok((k.clone(), Tree::from_value(v)?))
                    })
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn into_value(self) -> Result<Value> {
        Ok(match self {
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(b),
            Tree::Int(i) => Value::from(i),
            Tree::UInt(u) => Value::from(u),
            Tree::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| CacheError::Decode(format!("non-finite float {}", f)))?,
            Tree::Text(s) => Value::String(s),
            Tree::List(items) => Value::Array(
                items
                    .into_iter()
                    .map(Tree::into_value)
                    .collect::<Result<_>>()?,
            ),
            Tree::Map(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| -> Result<(String, Value)> { Ok((k, v.into_value()?)) })
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

impl Coder for BinaryCoder {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let tree = Tree::from_value(value)?;
        bincode::serde::encode_to_vec(&tree, bincode::config::standard())
            .map_err(|e| CacheError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let (tree, read): (Tree, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| CacheError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(CacheError::Decode(format!(
                "{} trailing bytes after value",
                bytes.len() - read
            )));
        }
        tree.into_value()
    }
}

// == Typed Helpers ==
/// Serializes a typed value and encodes it with `coder`.
pub fn encode_typed<T: Serialize>(coder: &dyn Coder, value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| CacheError::Encode(e.to_string()))?;
    coder.encode(&value)
}

/// Decodes bytes with `coder` and deserializes them into `T`.
pub fn decode_typed<T: DeserializeOwned>(coder: &dyn Coder, bytes: &[u8]) -> Result<T> {
    let value = coder.decode(bytes)?;
    serde_json::from_value(value).map_err(|e| CacheError::Decode(e.to_string()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        issued: NaiveDate,
        paid_at: Option<DateTime<Utc>>,
        lines: Vec<(String, i64)>,
    }

    #[test]
    fn test_json_coder() {
        let data = json!({"key": "value", "number": 42});

        let encoded = JsonCoder.encode(&data).unwrap();
        let decoded = JsonCoder.decode(&encoded).unwrap();

        assert_eq!(decoded, data);
    }

    #[test]
    fn test_json_coder_nested_dates() {
        let invoice = Invoice {
            issued: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            paid_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            lines: vec![("widget".to_string(), 12345)],
        };

        let encoded = encode_typed(&JsonCoder, &invoice).unwrap();
        let decoded: Invoice = decode_typed(&JsonCoder, &encoded).unwrap();

        assert_eq!(decoded, invoice);
    }

    #[test]
    fn test_json_coder_floats_are_bit_exact() {
        for bits in [17024601205761757343u64, 0x3fb999999999999a, 0x0000000000000001] {
            let original = f64::from_bits(bits);
            let encoded = JsonCoder.encode(&json!(original)).unwrap();
            let decoded = JsonCoder.decode(&encoded).unwrap();
            assert_eq!(decoded.as_f64().unwrap().to_bits(), bits, "value {:e}", original);
        }
    }

    #[test]
    fn test_binary_coder() {
        let data = json!({
            "id": 7,
            "big": u64::MAX,
            "neg": -3,
            "ratio": -3.2879771061403474e213,
            "tags": ["a", "ü", null, true],
        });

        let encoded = BinaryCoder.encode(&data).unwrap();
        let decoded = BinaryCoder.decode(&encoded).unwrap();

        assert_eq!(decoded, data);
        assert_eq!(decoded["big"].as_u64(), Some(u64::MAX));
    }

    #[test]
    fn test_binary_coder_typed_dates() {
        let invoice = Invoice {
            issued: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            paid_at: None,
            lines: vec![("widget".to_string(), -5)],
        };

        let encoded = encode_typed(&BinaryCoder, &invoice).unwrap();
        let decoded: Invoice = decode_typed(&BinaryCoder, &encoded).unwrap();

        assert_eq!(decoded, invoice);
    }

    #[test]
    fn test_binary_coder_rejects_garbage() {
        assert!(matches!(BinaryCoder.decode(&[0xff; 3]), Err(CacheError::Decode(_))));

        let mut encoded = BinaryCoder.encode(&json!(1)).unwrap();
        encoded.push(0);
        assert!(matches!(BinaryCoder.decode(&encoded), Err(CacheError::Decode(_))));
    }

    #[test]
    fn test_json_coder_rejects_garbage() {
        let result = JsonCoder.decode(b"{not json");
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }

    #[test]
    fn test_string_coder() {
        let encoded = StringCoder.encode(&json!("test string")).unwrap();
        assert_eq!(encoded, b"test string");

        let decoded = StringCoder.decode(&encoded).unwrap();
        assert_eq!(decoded, json!("test string"));
    }

    #[test]
    fn test_string_coder_non_string_values() {
        let encoded = StringCoder.encode(&json!(42)).unwrap();
        assert_eq!(encoded, b"42");
        assert_eq!(StringCoder.decode(&encoded).unwrap(), json!("42"));
    }

    #[test]
    fn test_string_coder_invalid_utf8() {
        let result = StringCoder.decode(&[0xff, 0xfe]);
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }
}
