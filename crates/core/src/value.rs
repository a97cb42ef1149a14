use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// String-keyed attribute mapping, ordered for stable output.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Decoded OTLP `AnyValue`. Both wire forms decode into this type before any
/// downstream logic looks at them.
///
/// Serializes as plain JSON (`"a"`, `1`, `[..]`, `{..}`) through
/// [`AttrValue::to_json`]. `Bytes` holds the UTF-8 (lossy) rendering of the
/// original byte string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Bytes(String),
    Array(Vec<AttrValue>),
    KeyValueList(Attributes),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Bytes(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::KeyValueList(_) => "kvlist",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) | Self::Bytes(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::from(*i),
            // NaN and infinities have no JSON number form.
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(AttrValue::to_json).collect())
            }
            Self::KeyValueList(map) => attributes_to_json(map),
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Scalars render bare; arrays and key-value lists render as JSON text.
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Bytes(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(_) | Self::KeyValueList(_) => write!(f, "{}", self.to_json()),
        }
    }
}

pub fn attributes_to_json(attrs: &Attributes) -> serde_json::Value {
    serde_json::Value::Object(
        attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
