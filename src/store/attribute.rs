//! Conversion between plain JSON and `DynamoDB` attribute values.

use super::{Item, StoreError};
use serde_json::{Map, Number, Value};

/// Marshal a JSON value into its attribute value form, e.g. `"a"` into `{"S": "a"}`.
///
/// # Errors
/// Never fails for values produced by `serde_json`; kept fallible for symmetry
/// with [`from_attribute`].
pub fn to_attribute(value: &Value) -> Result<Value, StoreError> {
    let attribute = match value {
        Value::Null => tagged("NULL", Value::Bool(true)),
        Value::Bool(flag) => tagged("BOOL", Value::Bool(*flag)),
        Value::Number(number) => tagged("N", Value::String(number.to_string())),
        Value::String(text) => tagged("S", Value::String(text.clone())),
        Value::Array(values) => tagged(
            "L",
            Value::Array(
                values
                    .iter()
                    .map(to_attribute)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        ),
        Value::Object(map) => tagged("M", Value::Object(to_item(map)?)),
    };
    Ok(attribute)
}

/// Unmarshal an attribute value back into plain JSON.
///
/// Sets (`SS`, `NS`, `BS`) become arrays; binary values stay base64 strings.
///
/// # Errors
/// Returns [`StoreError::Marshal`] for unknown type tags or malformed numbers.
pub fn from_attribute(attribute: &Value) -> Result<Value, StoreError> {
    let Some((tag, inner)) = attribute
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.iter().next())
    else {
        return Err(StoreError::Marshal(format!(
            "expected a single-key attribute value, got {attribute}"
        )));
    };

    match (tag.as_str(), inner) {
        ("NULL", _) => Ok(Value::Null),
        ("BOOL", Value::Bool(flag)) => Ok(Value::Bool(*flag)),
        ("S" | "B", Value::String(text)) => Ok(Value::String(text.clone())),
        ("N", Value::String(number)) => parse_number(number),
        ("L", Value::Array(values)) => values
            .iter()
            .map(from_attribute)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        ("M", Value::Object(map)) => from_item(map).map(Value::Object),
        ("SS" | "BS", Value::Array(values)) => Ok(Value::Array(values.clone())),
        ("NS", Value::Array(values)) => values
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .ok_or_else(|| StoreError::Marshal(format!("invalid NS member {value}")))
                    .and_then(parse_number)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(StoreError::Marshal(format!(
            "unsupported attribute value {attribute}"
        ))),
    }
}

/// Marshal every field of an item.
///
/// # Errors
/// See [`to_attribute`].
pub fn to_item(item: &Item) -> Result<Map<String, Value>, StoreError> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), to_attribute(value)?)))
        .collect()
}

/// Unmarshal every field of a stored item.
///
/// # Errors
/// See [`from_attribute`].
pub fn from_item(attributes: &Map<String, Value>) -> Result<Item, StoreError> {
    attributes
        .iter()
        .map(|(name, attribute)| Ok((name.clone(), from_attribute(attribute)?)))
        .collect()
}

/// Attribute value for a numeric key.
#[must_use]
pub fn number_key(key: i64) -> Value {
    tagged("N", Value::String(key.to_string()))
}

fn tagged(tag: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(tag.to_string(), value);
    Value::Object(map)
}

fn parse_number(text: &str) -> Result<Value, StoreError> {
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }
    if let Ok(uint) = text.parse::<u64>() {
        return Ok(Value::Number(uint.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::Marshal(format!("invalid number {text}")))
}
