use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::DocumentError;
use crate::node::{Document, Node, TextFormat};

/// Schema version written on every node record.
pub const NODE_VERSION: u32 = 1;

pub(crate) fn default_version() -> u32 {
    NODE_VERSION
}

impl Document {
    pub fn to_json(&self) -> Result<String, DocumentError> {
        self.validate_for_save()?;
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        self.validate_for_save()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> Result<Value, DocumentError> {
        self.validate_for_save()?;
        Ok(serde_json::to_value(self)?)
    }

    /// Parses a persisted document. Nodes that cannot be decoded are skipped
    /// with a warning; only a structurally broken envelope is an error.
    pub fn from_json(s: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        Ok(serde_json::from_value(value)?)
    }
}

impl Node {
    /// Decodes and validates one node record.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let node: Node = serde_json::from_value(value)?;
        node.validate()?;
        Ok(node)
    }
}

pub(crate) fn lenient_nodes<'de, D>(deserializer: D) -> Result<Vec<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = Vec::deserialize(deserializer)?;
    let mut nodes = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<untyped>")
            .to_string();
        match Node::from_value(value) {
            Ok(node) => nodes.push(node),
            Err(err) => {
                tracing::warn!(index, kind = %kind, error = %err, "skipping unreadable node");
            }
        }
    }
    Ok(nodes)
}

/// Image dimensions are either pixels or `"inherit"`; anything that is not a
/// non-negative pixel count loads as unset.
pub(crate) fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok()))
}

pub(crate) fn write_dimension<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(px) => serializer.serialize_u32(*px),
        None => serializer.serialize_str("inherit"),
    }
}

impl Serialize for TextFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for TextFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(TextFormat::from_bits_truncate(bits))
    }
}
