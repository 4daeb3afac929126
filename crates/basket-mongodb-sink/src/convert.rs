//! JSON to BSON conversion.
//!
//! Integers map to `Int32` when they fit and `Int64` otherwise; JSON numbers
//! with a fraction or exponent map to `Double`. Object key order is kept.

use crate::error::ConvertError;
use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

/// Convert a JSON object into a BSON document.
pub fn json_to_document(bytes: &[u8]) -> Result<Document, ConvertError> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Object(map) => object_to_document(&map, ""),
        other => Err(ConvertError::NotAnObject(type_name(&other))),
    }
}

fn object_to_document(map: &Map<String, Value>, path: &str) -> Result<Document, ConvertError> {
    let mut doc = Document::new();
    for (key, value) in map {
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        doc.insert(key.clone(), value_to_bson(value, &child)?);
    }
    Ok(doc)
}

fn value_to_bson(value: &Value, path: &str) -> Result<Bson, ConvertError> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => number_to_bson(n, path)?,
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| value_to_bson(item, &format!("{path}.{i}")))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(map) => Bson::Document(object_to_document(map, path)?),
    })
}

fn number_to_bson(n: &Number, path: &str) -> Result<Bson, ConvertError> {
    if let Some(i) = n.as_i64() {
        if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
            Ok(Bson::Int32(i as i32))
        } else {
            Ok(Bson::Int64(i))
        }
    } else if n.is_u64() {
        // Above i64::MAX: a Double would round it
        Err(ConvertError::UnrepresentableNumber {
            path: path.to_string(),
            value: n.to_string(),
        })
    } else {
        match n.as_f64() {
            Some(f) => Ok(Bson::Double(f)),
            None => Err(ConvertError::UnrepresentableNumber {
                path: path.to_string(),
                value: n.to_string(),
            }),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
