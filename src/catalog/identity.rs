use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Store-assigned identifier of a catalog entity.
///
/// Opaque to the walkers except for ordering: stores hand out ids in creation
/// order, which export relies on to rebuild arrays.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

/// Store-assigned identifier of a type record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural role of an entity in the graph.
///
/// Schema properties, tag items and OAuth scopes are `Property`; every other
/// node is an `Element`. `Other` keeps kinds written by other tools intact.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum AssetKind {
    #[default]
    Element,
    Property,
    Other(String),
}

/// Primitive type names registered at the start of every import run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BasicType {
    String,
    Integer,
    Boolean,
    Array,
}

impl BasicType {
    pub const ALL: [BasicType; 4] = [
        BasicType::String,
        BasicType::Integer,
        BasicType::Boolean,
        BasicType::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BasicType::String => "string",
            BasicType::Integer => "integer",
            BasicType::Boolean => "boolean",
            BasicType::Array => "array",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "string" => Some(BasicType::String),
            "integer" => Some(BasicType::Integer),
            "boolean" => Some(BasicType::Boolean),
            "array" => Some(BasicType::Array),
            _ => None,
        }
    }
}

impl Serialize for AssetKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AssetKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

impl AssetKind {
    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Element => "JSON Element",
            AssetKind::Property => "JSON Property",
            AssetKind::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "JSON Element" => AssetKind::Element,
            "JSON Property" => AssetKind::Property,
            other => AssetKind::Other(other.to_string()),
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, AssetKind::Property)
    }
}
