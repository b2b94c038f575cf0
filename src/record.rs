//! Entity records as the store returns them: a (entity type, id) pair plus a
//! bag of mixed-typed attributes. Accessors are lenient; an absent or
//! wrong-typed attribute reads as `None`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pointer to another record, optionally carrying its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
        }
    }

    pub fn named(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: Some(name.to_string()),
        }
    }
}

/// Attribute value. Money is decimal, never floating point. Blobs travel as
/// base64 text on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Bool(bool),
    Int(i64),
    Money(Decimal),
    Date(DateTime<Utc>),
    Ref(EntityRef),
    Blob(#[serde(with = "base64_bytes")] Vec<u8>),
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity: String,
    pub id: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Record {
    pub fn new(entity: &str, id: &str) -> Self {
        Self {
            entity: entity.to_string(),
            id: id.to_string(),
            attributes: HashMap::new(),
        }
    }

    pub fn with(mut self, attribute: &str, value: Value) -> Self {
        self.attributes.insert(attribute.to_string(), value);
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn text(&self, attribute: &str) -> Option<&str> {
        match self.get(attribute) {
            Some(Value::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn boolean(&self, attribute: &str) -> Option<bool> {
        match self.get(attribute) {
            Some(Value::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    pub fn int(&self, attribute: &str) -> Option<i64> {
        match self.get(attribute) {
            Some(Value::Int(number)) => Some(*number),
            _ => None,
        }
    }

    pub fn money(&self, attribute: &str) -> Option<Decimal> {
        match self.get(attribute) {
            Some(Value::Money(amount)) => Some(*amount),
            _ => None,
        }
    }

    pub fn date(&self, attribute: &str) -> Option<DateTime<Utc>> {
        match self.get(attribute) {
            Some(Value::Date(when)) => Some(*when),
            _ => None,
        }
    }

    pub fn reference(&self, attribute: &str) -> Option<&EntityRef> {
        match self.get(attribute) {
            Some(Value::Ref(reference)) => Some(reference),
            _ => None,
        }
    }

    pub fn blob(&self, attribute: &str) -> Option<&[u8]> {
        match self.get(attribute) {
            Some(Value::Blob(bytes)) => Some(bytes),
            _ => None,
        }
    }
}
