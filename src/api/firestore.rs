//! Typed field values used by the document REST API.
//!
//! The store wraps every value in a type tag (`{"stringValue": "x"}`); these helpers convert
//! between that form and plain JSON so models can use ordinary serde derives.

use crate::error::QueryError;
use crate::api::models::Timestamp;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// A decoded document: its id (last path segment) and plain-JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Deserialize into a model, exposing the document id under `id_key`.
    pub fn decode<T: DeserializeOwned>(&self, id_key: &str) -> Result<T, QueryError> {
        let mut fields = self.fields.clone();
        fields.entry(id_key.to_string()).or_insert_with(|| Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| QueryError::Decode(e.to_string()))
    }

    /// Parse a REST document resource (`{"name": ".../users/abc", "fields": {...}}`).
    pub fn from_resource(resource: &Value) -> Result<Self, QueryError> {
        let name = resource
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::Decode("document without name".into()))?;
        let id = name.rsplit('/').next().unwrap_or_default().to_string();
        let fields = match resource.get("fields") {
            Some(Value::Object(map)) => decode_fields(map),
            _ => Map::new(),
        };
        Ok(Self { id, fields })
    }
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect()
}

/// Timestamps become `{"seconds", "nanos"}` objects; unknown tags decode to null.
pub fn decode_value(typed: &Value) -> Value {
    let Some((tag, inner)) = typed.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => inner.clone(),
        "stringValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "timestampValue" => inner
            .as_str()
            .and_then(Timestamp::from_rfc3339)
            .and_then(|t| serde_json::to_value(t).ok())
            .unwrap_or(Value::Null),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

pub fn decode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect()
}
