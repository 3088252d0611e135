//! Rendering the Document.
//!
//! [`TemplateContext`] is what a template sees: the Document shape plus each
//! field's resolved type and identifier. [`render_template`] applies a
//! Jinja-syntax template to it; [`Codegen`] is the built-in C++ header.

use indexmap::IndexMap;
use minijinja::Environment;
use minijinja::value::ViaDeserialize;
use serde::Serialize;

use crate::ir::{Document, EnumDefinition, FieldKind, Scalar, SchemaField};
use crate::naming::{camel_case, pascal_case};
use crate::type_map::TypeMap;

// --------------------------- Template context ---------------------------- //

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext<'a> {
    pub classes: Vec<ContextClass<'a>>,
    pub enums: &'a IndexMap<String, EnumDefinition>,
    pub has_uuids: bool,
}

#[derive(Debug, Serialize)]
pub struct ContextClass<'a> {
    pub name: &'a str,
    pub fields: Vec<ContextField<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ContextField<'a> {
    #[serde(flatten)]
    pub field: &'a SchemaField,
    pub identifier: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl<'a> TemplateContext<'a> {
    pub fn new(document: &'a Document, types: &TypeMap) -> Self {
        let classes = document
            .classes
            .iter()
            .map(|class| ContextClass {
                name: &class.name,
                fields: class
                    .fields
                    .iter()
                    .map(|field| ContextField {
                        field,
                        identifier: camel_case(&field.name),
                        type_name: types.resolve(field),
                    })
                    .collect(),
            })
            .collect();
        Self { classes, enums: &document.enums, has_uuids: document.has_uuids }
    }
}

// --------------------------- Template output ----------------------------- //

/// Renders `source` (registered as `name`) onto the document's
/// [`TemplateContext`]. Templates get `resolve(field)` plus the
/// `camel_case` and `pascal_case` filters.
pub fn render_template(
    name: &str,
    source: &str,
    document: &Document,
    types: &TypeMap,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    let table = types.clone();
    env.add_function("resolve", move |field: ViaDeserialize<SchemaField>| table.resolve(&field.0));
    env.add_filter("camel_case", camel_case);
    env.add_filter("pascal_case", pascal_case);
    env.add_template(name, source)?;
    let context = TemplateContext::new(document, types);
    env.get_template(name)?.render(&context)
}

// ----------------------------- Header output ----------------------------- //

pub struct Codegen<'t> {
    types: &'t TypeMap,
    out: String,
}

impl<'t> Codegen<'t> {
    pub fn new(types: &'t TypeMap) -> Self {
        Self { types, out: String::new() }
    }

    pub fn emit(&mut self, document: &Document) {
        self.out.push_str("// Generated by schemagen. Do not edit.\n");
        self.out.push_str("#pragma once\n\n");
        self.out.push_str("#include <string>\n#include <vector>\n");
        if document.has_uuids {
            self.out.push_str("#include <uuid.h>\n");
        }
        for definition in document.enums.values() {
            self.emit_enum(definition);
        }
        for class in &document.classes {
            self.out.push_str(&format!("\nstruct {} {{\n", class.name));
            for (index, field) in class.fields.iter().enumerate() {
                self.emit_field(document, index, field);
            }
            self.out.push_str("};\n");
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn emit_enum(&mut self, definition: &EnumDefinition) {
        self.out.push_str(&format!("\nenum class {} {{\n", definition.name));
        let mut seen = Vec::new();
        for (index, member) in definition.members.iter().enumerate() {
            let ident = enumerator(member, index);
            if seen.contains(&ident) {
                continue;
            }
            self.out.push_str(&format!("    {ident},\n"));
            seen.push(ident);
        }
        self.out.push_str("};\n");
    }

    fn emit_field(&mut self, document: &Document, index: usize, field: &SchemaField) {
        let mut ident = camel_case(&field.name);
        if ident.is_empty() {
            ident = format!("field{index}");
        }
        let type_name = self.types.resolve(field);
        match initializer(document, field) {
            Some(value) => self.out.push_str(&format!("    {type_name} {ident} = {value};\n")),
            None => self.out.push_str(&format!("    {type_name} {ident};\n")),
        }
    }
}

fn enumerator(member: &str, index: usize) -> String {
    let ident = pascal_case(member);
    if ident.is_empty() { format!("Value{index}") } else { ident }
}

/// Default initializer, when the default can be written for the field's type.
fn initializer(document: &Document, field: &SchemaField) -> Option<String> {
    let default = field.default.as_ref()?;
    if field.is_array || field.is_uuid() {
        return None;
    }
    match (field.kind, default) {
        (FieldKind::Reference, Scalar::String(member)) => {
            let name = field.reference_class_name.as_deref()?;
            let definition = document.enums.get(name)?;
            let index = definition.members.iter().position(|m| m == member)?;
            Some(format!("{name}::{}", enumerator(member, index)))
        }
        (_, Scalar::String(s)) => serde_json::to_string(s).ok(),
        (_, Scalar::Bool(b)) => Some(b.to_string()),
        (_, Scalar::Number(n)) => Some(n.to_string()),
        (_, Scalar::Null) => None,
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::parse_schema;
    use serde_json::json;

    fn document(schema: serde_json::Value) -> Document {
        parse_schema(&schema.to_string(), "Base").unwrap().document
    }

    #[test]
    fn header_declares_enums_then_classes_in_document_order() {
        let document = document(json!({
            "properties": {
                "eye_color": { "type": "string", "enum": ["light blue", "green"], "default": "green" },
                "home": { "type": "object", "properties": { "zip_code": { "type": "string", "default": "0000" } } },
                "scores": { "type": "array", "items": { "type": "integer" } },
                "age": { "type": "integer", "default": 5 },
                "ratio": { "type": "number", "default": 0.5 },
                "active": { "type": "boolean", "default": true }
            }
        }));
        let types = TypeMap::default();
        let mut cg = Codegen::new(&types);
        cg.emit(&document);
        let header = cg.into_string();

        let expected = "\
// Generated by schemagen. Do not edit.
#pragma once

#include <string>
#include <vector>

enum class EyeColor {
    LightBlue,
    Green,
};

struct Home {
    std::string zipCode = \"0000\";
};

struct Base {
    EyeColor eyeColor = EyeColor::Green;
    Home home;
    std::vector<int> scores;
    int age = 5;
    double ratio = 0.5;
    bool active = true;
};
";
        assert_eq!(header, expected);
    }

    #[test]
    fn uuid_fields_pull_in_the_uuid_header() {
        let document = document(json!({
            "properties": { "id": { "type": "string", "format": "uuid" } }
        }));
        let types = TypeMap::default();
        let mut cg = Codegen::new(&types);
        cg.emit(&document);
        let header = cg.into_string();
        assert!(header.contains("#include <uuid.h>\n"));
        assert!(header.contains("    uuids::uuid id;\n"));
    }

    #[test]
    fn repeated_enum_members_are_declared_once() {
        let document = document(json!({
            "properties": { "size": { "enum": ["S", "M", "S"] } }
        }));
        assert_eq!(document.enums["Size"].members, ["S", "M", "S"]);
        let types = TypeMap::default();
        let mut cg = Codegen::new(&types);
        cg.emit(&document);
        assert!(cg.into_string().contains("enum class Size {\n    S,\n    M,\n};\n"));
    }

    #[test]
    fn templates_call_back_into_the_type_table() {
        let document = document(json!({
            "properties": {
                "home_address": { "type": "object", "properties": { "zip": { "type": "string" } } },
                "scores": { "type": "array", "items": { "type": "integer" } }
            }
        }));
        let types = TypeMap::from_json_str(r#"{ "integer": "int64_t" }"#).unwrap();
        let template = "\
{% for class in classes %}struct {{ class.name }} {
{% for field in class.fields %}    {{ resolve(field) }} {{ field.name | camel_case }};
{% endfor %}};
{% endfor %}";
        let rendered = render_template("source.h.jinja2", template, &document, &types).unwrap();
        assert_eq!(rendered, "\
struct HomeAddress {
    std::string zip;
};
struct Base {
    HomeAddress homeAddress;
    std::vector<int64_t> scores;
};
");
    }

    #[test]
    fn template_context_fields_and_filters_are_available() {
        let document = document(json!({
            "properties": { "eye_color": { "enum": ["light blue"] } }
        }));
        let template = "{% for name, members in enums|items %}{{ name }}: {% for m in members %}{{ m | pascal_case }}{% endfor %}{% endfor %}\n";
        let rendered = render_template("enums", template, &document, &TypeMap::default()).unwrap();
        assert_eq!(rendered, "EyeColor: LightBlue\n");
    }

    #[test]
    fn broken_templates_are_errors() {
        let document = document(json!({ "properties": { "x": { "type": "string" } } }));
        assert!(render_template("bad", "{% for %}", &document, &TypeMap::default()).is_err());
    }

    #[test]
    fn template_context_adds_resolved_types() {
        let document = document(json!({
            "properties": {
                "tags": { "type": "array", "items": { "type": "string" } },
                "owner": { "$ref": "#/definitions/Person" }
            }
        }));
        let types = TypeMap::default();
        let context = serde_json::to_value(TemplateContext::new(&document, &types)).unwrap();
        assert_eq!(context, json!({
            "classes": [{
                "name": "Base",
                "fields": [
                    { "name": "tags", "kind": "string", "isArray": true, "identifier": "tags", "type": "std::vector<std::string>" },
                    { "name": "owner", "kind": "reference", "referenceClassName": "Person", "isArray": false, "identifier": "owner", "type": "Person" }
                ]
            }],
            "enums": {},
            "hasUuids": false
        }));
    }
}
