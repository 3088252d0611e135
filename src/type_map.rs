//! Abstract field kinds → target type names.
//!
//! Built once from defaults plus an optional JSON override object, then
//! passed read-only to whatever renders the Document.

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::ir::{FieldKind, SchemaField};
use crate::path_de;

/// Where the element type goes in the `array` template.
pub const ELEMENT_PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMap {
    pub integer: String,
    pub number: String,
    pub boolean: String,
    pub string: String,
    /// Strings carrying `format: "uuid"`.
    pub uuid: String,
    /// Wrapper template; [`ELEMENT_PLACEHOLDER`] marks the element type.
    pub array: String,
}

impl Default for TypeMap {
    fn default() -> Self {
        Self {
            integer: "int".into(),
            number: "double".into(),
            boolean: "bool".into(),
            string: "std::string".into(),
            uuid: "uuids::uuid".into(),
            array: "std::vector<{}>".into(),
        }
    }
}

impl TypeMap {
    /// Applies `overrides` on top of `self`. Unknown keys are ignored with a
    /// warning.
    pub fn with_overrides<I>(mut self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, name) in overrides {
            let slot = match key.as_str() {
                "integer" => &mut self.integer,
                "number" => &mut self.number,
                "boolean" => &mut self.boolean,
                "string" => &mut self.string,
                "uuid" => &mut self.uuid,
                "array" => {
                    if !name.contains(ELEMENT_PLACEHOLDER) {
                        return Err(ConfigError::MissingPlaceholder { template: name });
                    }
                    &mut self.array
                }
                _ => {
                    warn!(key = %key, "ignoring unknown type mapping");
                    continue;
                }
            };
            *slot = name;
        }
        Ok(self)
    }

    /// Defaults overridden by a JSON object of string values.
    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        let overrides: IndexMap<String, String> = path_de::from_str_with_path(src)?;
        Self::default().with_overrides(overrides)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&src)
    }

    pub fn wrap_array(&self, element: &str) -> String {
        self.array.replace(ELEMENT_PLACEHOLDER, element)
    }

    /// Target type of `field`: a reference name verbatim, otherwise the
    /// mapped primitive, wrapped when the field is an array.
    pub fn resolve(&self, field: &SchemaField) -> String {
        let element: &str = match &field.reference_class_name {
            Some(name) => name.as_str(),
            None if field.is_uuid() => &self.uuid,
            None => match field.kind {
                FieldKind::Integer => &self.integer,
                FieldKind::Number => &self.number,
                FieldKind::Boolean => &self.boolean,
                FieldKind::String => &self.string,
                // the builder never produces a reference without a target
                FieldKind::Reference => &field.name,
            },
        };
        if field.is_array {
            self.wrap_array(element)
        } else {
            element.to_string()
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
