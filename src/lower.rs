//! Lowers schema events into the [`Document`].
//!
//! Classes in progress live on an explicit stack mirroring object nesting.
//! Field events always target the innermost open class; the pieces of one
//! field (kind, default, array flag, reference) may arrive in any order and
//! are merged onto one entry keyed by field name.
//!
//! Enum members seen outside any class (an entry under `definitions`) still
//! declare the enum, so `$ref`s to it resolve.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::SchemaError;
use crate::interpreter::{SchemaEvent, SchemaHandler};
use crate::ir::{Document, EnumDefinition, FieldKind, Kind, Scalar, SchemaClass, SchemaField};

#[derive(Debug, Default)]
pub struct ModelBuilder {
    stack: Vec<ClassDraft>,
    classes: Vec<SchemaClass>,
    enums: IndexMap<String, EnumDefinition>,
}

#[derive(Debug)]
struct ClassDraft {
    name: String,
    fields: Vec<FieldDraft>,
}

#[derive(Debug)]
struct FieldDraft {
    name: String,
    kind: Option<FieldKind>,
    default: Option<Scalar>,
    reference: Option<String>,
    origin: Option<ReferenceOrigin>,
    is_array: bool,
    format: Option<String>,
}

/// Where a field's reference target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceOrigin {
    /// `type: "object"` below the root, named after the field.
    Inline,
    /// `$ref`; replaces an inline name.
    Explicit,
    Enum,
}

impl SchemaHandler for ModelBuilder {
    fn handle(&mut self, event: SchemaEvent) -> Result<(), SchemaError> {
        match event {
            SchemaEvent::BeginClass { name } => {
                self.stack.push(ClassDraft { name, fields: Vec::new() });
                Ok(())
            }
            SchemaEvent::EndClass => self.end_class(),
            SchemaEvent::FieldKind { field, kind } => self.with_field(&field, |draft| draft.set_kind(kind)),
            SchemaEvent::FieldDefault { field, value } => {
                self.with_field(&field, |draft| draft.set_default(value))
            }
            SchemaEvent::FieldObject { field, target } => {
                self.with_field(&field, |draft| draft.set_reference(target, ReferenceOrigin::Inline))
            }
            SchemaEvent::FieldReference { field, target } => {
                self.with_field(&field, |draft| draft.set_reference(target, ReferenceOrigin::Explicit))
            }
            SchemaEvent::FieldArray { field } => self.with_field(&field, |draft| {
                draft.is_array = true;
                Ok(())
            }),
            SchemaEvent::FieldFormat { field, format } => self.with_field(&field, |draft| {
                draft.format = Some(format);
                Ok(())
            }),
            SchemaEvent::EnumMember { field, enum_name, member } => {
                self.enums
                    .entry(enum_name.clone())
                    .or_insert_with(|| EnumDefinition::new(enum_name.clone()))
                    .members
                    .push(member);
                self.with_field(&field, |draft| draft.set_reference(enum_name, ReferenceOrigin::Enum))
            }
        }
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands over the Document. Every class must have been closed.
    pub fn finish(self) -> Result<Document, SchemaError> {
        if let Some(open) = self.stack.last() {
            return Err(SchemaError::structural(format!("class `{}` was never closed", open.name)));
        }
        let has_uuids = self
            .classes
            .iter()
            .flat_map(|class| &class.fields)
            .any(SchemaField::is_uuid);
        Ok(Document { classes: self.classes, enums: self.enums, has_uuids })
    }

    fn end_class(&mut self) -> Result<(), SchemaError> {
        let draft = self
            .stack
            .pop()
            .ok_or_else(|| SchemaError::structural("class closed without being opened"))?;
        if self.classes.iter().any(|class| class.name == draft.name) {
            return Err(SchemaError::structural(format!("class `{}` is declared twice", draft.name)));
        }
        let fields = draft
            .fields
            .into_iter()
            .map(|field| field.finish(&draft.name))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(class = %draft.name, fields = fields.len(), "class complete");
        self.classes.push(SchemaClass { name: draft.name, fields });
        Ok(())
    }

    /// Applies `apply` to `field` of the innermost open class, creating the
    /// field on first mention. Events outside any class are dropped.
    fn with_field(
        &mut self,
        field: &str,
        apply: impl FnOnce(&mut FieldDraft) -> Result<(), SchemaError>,
    ) -> Result<(), SchemaError> {
        let Some(class) = self.stack.last_mut() else {
            debug!(%field, "field outside of any class dropped");
            return Ok(());
        };
        let index = match class.fields.iter().position(|draft| draft.name == field) {
            Some(index) => index,
            None => {
                class.fields.push(FieldDraft::new(field));
                class.fields.len() - 1
            }
        };
        apply(&mut class.fields[index])
    }
}

impl FieldDraft {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            default: None,
            reference: None,
            origin: None,
            is_array: false,
            format: None,
        }
    }

    fn enum_backed(&self) -> bool {
        self.origin == Some(ReferenceOrigin::Enum)
    }

    fn set_kind(&mut self, kind: FieldKind) -> Result<(), SchemaError> {
        match self.kind {
            None => self.kind = Some(kind),
            Some(current) if current == kind => {}
            // `type: "string"` next to an `enum` keeps the enum reference.
            Some(FieldKind::Reference) if self.enum_backed() && kind == FieldKind::String => {}
            Some(current) => return Err(self.inconsistent(current, kind)),
        }
        Ok(())
    }

    fn set_default(&mut self, value: Scalar) -> Result<(), SchemaError> {
        let found = value.kind();
        match self.kind {
            None => self.kind = FieldKind::from_kind(found),
            Some(FieldKind::Reference) if self.enum_backed() && found == Kind::String => {}
            Some(current) if current.as_kind() == found => {}
            Some(current) => {
                return Err(SchemaError::TypeConsistency {
                    field: self.name.clone(),
                    declared: current.as_kind(),
                    found,
                });
            }
        }
        self.default = Some(value);
        Ok(())
    }

    fn set_reference(&mut self, target: String, origin: ReferenceOrigin) -> Result<(), SchemaError> {
        let enum_backed = origin == ReferenceOrigin::Enum;
        match self.kind {
            None | Some(FieldKind::Reference) => {}
            Some(FieldKind::String) if enum_backed => {}
            Some(current) if enum_backed => {
                return Err(SchemaError::structural(format!(
                    "`enum` of `{}` requires a string type, found {}",
                    self.name,
                    current.as_kind()
                )));
            }
            Some(current) => return Err(self.inconsistent(current, FieldKind::Reference)),
        }
        self.kind = Some(FieldKind::Reference);
        let (Some(existing), Some(current)) = (&self.reference, self.origin) else {
            self.reference = Some(target);
            self.origin = Some(origin);
            return Ok(());
        };
        match (current, origin) {
            (ReferenceOrigin::Inline, ReferenceOrigin::Explicit) => {
                debug!(field = %self.name, inline = %existing, %target, "`$ref` replaces inline object name");
                self.reference = Some(target);
                self.origin = Some(origin);
            }
            (ReferenceOrigin::Explicit, ReferenceOrigin::Inline) => {}
            _ if *existing == target => {
                if enum_backed {
                    self.origin = Some(origin);
                }
            }
            _ => {
                return Err(SchemaError::structural(format!(
                    "`{}` references both `{existing}` and `{target}`",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn inconsistent(&self, declared: FieldKind, found: FieldKind) -> SchemaError {
        SchemaError::TypeConsistency {
            field: self.name.clone(),
            declared: declared.as_kind(),
            found: found.as_kind(),
        }
    }

    fn finish(self, class: &str) -> Result<SchemaField, SchemaError> {
        let kind = self.kind.ok_or_else(|| {
            SchemaError::structural(format!("field `{class}.{}` has no type", self.name))
        })?;
        Ok(SchemaField {
            name: self.name,
            kind,
            default: self.default,
            reference_class_name: self.reference,
            is_array: self.is_array,
            format: self.format,
        })
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn build(events: Vec<SchemaEvent>) -> Result<Document, SchemaError> {
        let mut builder = ModelBuilder::new();
        for event in events {
            builder.handle(event)?;
        }
        builder.finish()
    }

    fn begin(name: &str) -> SchemaEvent {
        SchemaEvent::BeginClass { name: name.into() }
    }

    fn kind(field: &str, kind: FieldKind) -> SchemaEvent {
        SchemaEvent::FieldKind { field: field.into(), kind }
    }

    fn array(field: &str) -> SchemaEvent {
        SchemaEvent::FieldArray { field: field.into() }
    }

    fn member(field: &str, enum_name: &str, member: &str) -> SchemaEvent {
        SchemaEvent::EnumMember { field: field.into(), enum_name: enum_name.into(), member: member.into() }
    }

    #[test]
    fn classes_are_appended_when_they_close() {
        let document = build(vec![
            begin("Base"),
            SchemaEvent::FieldReference { field: "address".into(), target: "Address".into() },
            begin("Address"),
            kind("street", FieldKind::String),
            SchemaEvent::EndClass,
            kind("age", FieldKind::Integer),
            SchemaEvent::EndClass,
        ])
        .unwrap();
        let names: Vec<_> = document.classes.iter().map(|class| class.name.as_str()).collect();
        assert_eq!(names, ["Address", "Base"]);
        let base = document.class("Base").unwrap();
        let fields: Vec<_> = base.fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(fields, ["address", "age"]);
    }

    #[test]
    fn array_flag_merges_in_either_order() {
        for events in [
            vec![begin("Base"), array("xs"), kind("xs", FieldKind::Integer), SchemaEvent::EndClass],
            vec![begin("Base"), kind("xs", FieldKind::Integer), array("xs"), SchemaEvent::EndClass],
        ] {
            let document = build(events).unwrap();
            let field = &document.classes[0].fields[0];
            assert_eq!(field.kind, FieldKind::Integer);
            assert!(field.is_array);
            assert_eq!(document.classes[0].fields.len(), 1);
        }
    }

    #[test]
    fn enum_members_rewrite_the_field_to_a_reference() {
        let document = build(vec![
            begin("Base"),
            kind("color", FieldKind::String),
            member("color", "Color", "red"),
            member("color", "Color", "blue"),
            kind("color", FieldKind::String),
            SchemaEvent::FieldDefault { field: "color".into(), value: Scalar::String("red".into()) },
            SchemaEvent::EndClass,
        ])
        .unwrap();
        assert_eq!(document.enums["Color"].members, ["red", "blue"]);
        let color = document.classes[0].field("color").unwrap();
        assert_eq!(color.kind, FieldKind::Reference);
        assert_eq!(color.reference_class_name.as_deref(), Some("Color"));
        assert_eq!(color.default, Some(Scalar::String("red".into())));
    }

    #[test]
    fn default_without_type_infers_the_kind() {
        let document = build(vec![
            begin("Base"),
            SchemaEvent::FieldDefault {
                field: "ratio".into(),
                value: Scalar::Number(serde_json::Number::from_f64(0.5).unwrap()),
            },
            SchemaEvent::EndClass,
        ])
        .unwrap();
        assert_eq!(document.classes[0].fields[0].kind, FieldKind::Number);
    }

    #[test]
    fn conflicting_kinds_are_inconsistent() {
        let error = build(vec![
            begin("Base"),
            kind("x", FieldKind::Integer),
            kind("x", FieldKind::String),
            SchemaEvent::EndClass,
        ])
        .unwrap_err();
        assert_eq!(error, SchemaError::TypeConsistency {
            field: "x".into(),
            declared: Kind::Integer,
            found: Kind::String,
        });
    }

    #[test]
    fn untyped_field_is_rejected_at_class_end() {
        let error = build(vec![begin("Base"), array("xs"), SchemaEvent::EndClass]).unwrap_err();
        assert!(matches!(error, SchemaError::Structural(_)), "{error:?}");
    }

    #[test]
    fn duplicate_class_names_are_rejected() {
        let error = build(vec![
            begin("Base"),
            begin("Item"),
            SchemaEvent::EndClass,
            begin("Item"),
            SchemaEvent::EndClass,
            SchemaEvent::EndClass,
        ])
        .unwrap_err();
        assert!(matches!(error, SchemaError::Structural(_)), "{error:?}");
    }

    #[test]
    fn fields_outside_classes_are_dropped_but_enums_are_declared() {
        let document = build(vec![
            kind("Color", FieldKind::String),
            member("Color", "Color", "red"),
            member("Color", "Color", "green"),
            begin("Base"),
            SchemaEvent::EndClass,
        ])
        .unwrap();
        assert_eq!(document.enums["Color"].members, ["red", "green"]);
        assert!(document.classes[0].fields.is_empty());
    }

    #[test]
    fn explicit_reference_replaces_the_inline_object_name_in_either_order() {
        let inline = || SchemaEvent::FieldObject { field: "owner".into(), target: "Owner".into() };
        let explicit = || SchemaEvent::FieldReference { field: "owner".into(), target: "Person".into() };
        for events in [
            vec![begin("Base"), inline(), explicit(), SchemaEvent::EndClass],
            vec![begin("Base"), explicit(), inline(), SchemaEvent::EndClass],
        ] {
            let document = build(events).unwrap();
            let owner = document.classes[0].field("owner").unwrap();
            assert_eq!(owner.kind, FieldKind::Reference);
            assert_eq!(owner.reference_class_name.as_deref(), Some("Person"));
        }
    }

    #[test]
    fn two_explicit_targets_still_conflict() {
        let error = build(vec![
            begin("Base"),
            SchemaEvent::FieldReference { field: "owner".into(), target: "Person".into() },
            SchemaEvent::FieldReference { field: "owner".into(), target: "Robot".into() },
            SchemaEvent::EndClass,
        ])
        .unwrap_err();
        assert!(matches!(error, SchemaError::Structural(_)), "{error:?}");
    }

    #[test]
    fn uuid_format_sets_the_document_flag() {
        let document = build(vec![
            begin("Base"),
            kind("id", FieldKind::String),
            SchemaEvent::FieldFormat { field: "id".into(), format: "uuid".into() },
            SchemaEvent::EndClass,
        ])
        .unwrap();
        assert!(document.has_uuids);
    }

    #[test]
    fn unclosed_class_fails_finish() {
        let error = build(vec![begin("Base")]).unwrap_err();
        assert!(matches!(error, SchemaError::Structural(_)));
    }
}
