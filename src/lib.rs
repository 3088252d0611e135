//! JSON schema → classes, fields and enums, mapped to target type names.
//!
//! One forward pass: serde_json events → [`interpreter`] → [`lower`] →
//! [`ir::Document`]. Rendering reads the finished Document together with a
//! [`type_map::TypeMap`].
pub mod cli;
pub mod codegen;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod ir;
pub mod lower;
pub mod naming;
pub mod path_de;
pub mod type_map;

pub use error::{ConfigError, Diagnostic, SchemaError};
pub use interpreter::{ParsedSchema, parse_schema};
pub use ir::{Document, EnumDefinition, FieldKind, SchemaClass, SchemaField};
pub use type_map::TypeMap;
