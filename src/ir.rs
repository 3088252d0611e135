//! Document model produced by one schema pass. No serde_json::Value here.
//!
//! Serialized with camelCase keys; this is the shape template engines see.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

// ------------------------------- Kinds ----------------------------------- //

/// Primitive kind inferred for one nesting level of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Unknown,
    Integer,
    Number,
    Boolean,
    String,
    Object,
    Array,
}

impl Kind {
    /// Maps a `type` keyword value to its kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "string" => Some(Self::String),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a finished field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Number,
    Boolean,
    String,
    Reference,
}

impl FieldKind {
    /// Primitive field kinds have a direct counterpart; `object`, `array`
    /// and `unknown` do not.
    pub fn from_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Integer => Some(Self::Integer),
            Kind::Number => Some(Self::Number),
            Kind::Boolean => Some(Self::Boolean),
            Kind::String => Some(Self::String),
            Kind::Unknown | Kind::Object | Kind::Array => None,
        }
    }

    pub fn as_kind(self) -> Kind {
        match self {
            Self::Integer => Kind::Integer,
            Self::Number => Kind::Number,
            Self::Boolean => Kind::Boolean,
            Self::String => Kind::String,
            Self::Reference => Kind::Object,
        }
    }
}

// ------------------------------ Scalars ---------------------------------- //

/// A JSON scalar as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    /// Runtime kind of the value. Integers and floats are distinct kinds.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Unknown,
            Self::Bool(_) => Kind::Boolean,
            Self::Number(n) if n.is_f64() => Kind::Number,
            Self::Number(_) => Kind::Integer,
            Self::String(_) => Kind::String,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

// ------------------------------ Document --------------------------------- //

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Post-order: nested classes come before the classes that use them.
    pub classes: Vec<SchemaClass>,
    pub enums: IndexMap<String, EnumDefinition>,
    pub has_uuids: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaClass {
    pub name: String,
    pub fields: Vec<SchemaField>,
}

/// Deserializable so template callbacks can take a field back from the
/// rendered context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_class_name: Option<String>,
    pub is_array: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    pub members: Vec<String>,
}

/// Enums serialize as their member list so `enums` reads as name → members.
impl Serialize for EnumDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.members)
    }
}

/// A field whose reference names neither a class nor an enum of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub class: String,
    pub field: String,
    pub target: String,
}

impl Document {
    pub fn class(&self, name: &str) -> Option<&SchemaClass> {
        self.classes.iter().find(|class| class.name == name)
    }

    /// References may point at classes supplied elsewhere; callers decide
    /// whether these matter.
    pub fn unresolved_references(&self) -> Vec<DanglingReference> {
        let mut out = Vec::new();
        for class in &self.classes {
            for field in &class.fields {
                let Some(target) = &field.reference_class_name else { continue };
                if self.class(target).is_none() && !self.enums.contains_key(target) {
                    out.push(DanglingReference {
                        class: class.name.clone(),
                        field: field.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        out
    }
}

impl SchemaClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl SchemaField {
    /// Format annotation used to request a unique-identifier type.
    pub const UUID_FORMAT: &'static str = "uuid";

    pub fn is_uuid(&self) -> bool {
        self.kind == FieldKind::String && self.format.as_deref() == Some(Self::UUID_FORMAT)
    }
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: Vec::new() }
    }
}

// ------------------------------- Tests ------------------------------------ //
