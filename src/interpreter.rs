//! Streaming schema interpreter.
//!
//! Consumes primitive [`JsonEvent`]s and classifies them into schema-level
//! constructs: class boundaries, typed fields, defaults, references, enums
//! and arrays. Each object/array level gets one [`Frame`]; the frame records
//! what has been committed about that level so later keys can be checked
//! against earlier ones in a single forward pass.
//!
//! Recognized keywords: `properties`, `type`, `default`, `$ref`, `enum`,
//! `items`, `format`. Annotation keywords are skipped with a diagnostic.
//! Everything else names a field (or a class, once a `properties` block
//! opens under it).

use tracing::{debug, info, warn};

use crate::error::{Diagnostic, SchemaError};
use crate::events::{self, EventSink, JsonEvent};
use crate::ir::{Document, FieldKind, Kind, Scalar};
use crate::lower::ModelBuilder;
use crate::naming::pascal_case;

// ------------------------------- Policy ---------------------------------- //

/// Keys whose values carry no shape information. Skipped wholesale.
const IGNORED_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "$comment",
    "title",
    "description",
    "examples",
    "required",
    "additionalProperties",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "readOnly",
    "writeOnly",
    "deprecated",
];

/// Frames at or below this depth belong to the root schema; a `type:
/// "object"` deeper than this is an inline nested declaration.
const ROOT_DEPTH: usize = 1;

// ---------------------------- Schema events ------------------------------ //

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaEvent {
    BeginClass { name: String },
    FieldKind { field: String, kind: FieldKind },
    FieldDefault { field: String, value: Scalar },
    /// Inline `type: "object"`: the class named after the field.
    FieldObject { field: String, target: String },
    FieldReference { field: String, target: String },
    FieldArray { field: String },
    FieldFormat { field: String, format: String },
    EnumMember { field: String, enum_name: String, member: String },
    EndClass,
}

pub trait SchemaHandler {
    fn handle(&mut self, event: SchemaEvent) -> Result<(), SchemaError>;
}

impl SchemaHandler for Vec<SchemaEvent> {
    fn handle(&mut self, event: SchemaEvent) -> Result<(), SchemaError> {
        self.push(event);
        Ok(())
    }
}

// ------------------------------- State ----------------------------------- //

/// What the last key said the next value means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Field,
    Properties,
    Type,
    Default,
    Reference,
    Enum,
    Format,
    Items,
    Skip,
}

impl Mode {
    fn keyword(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Properties => "properties",
            Self::Type => "type",
            Self::Default => "default",
            Self::Reference => "$ref",
            Self::Enum => "enum",
            Self::Format => "format",
            Self::Items => "items",
            Self::Skip => "skipped keyword",
        }
    }
}

#[derive(Debug, Clone)]
struct Frame {
    /// Name that was current when this level opened; restored on close.
    name: String,
    kind: Kind,
    /// Carries a `properties` key.
    container: bool,
    /// Is the value of `properties`: every key inside names a field.
    class_body: bool,
    in_items: bool,
    array: bool,
}

pub struct SchemaInterpreter<H> {
    handler: H,
    base_name: String,
    current_name: String,
    mode: Mode,
    frames: Vec<Frame>,
    /// Open containers still to swallow under a skipped keyword.
    skip_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<H: SchemaHandler> EventSink for SchemaInterpreter<H> {
    fn process(&mut self, event: JsonEvent) -> Result<(), SchemaError> {
        SchemaInterpreter::process(self, event)
    }
}

impl<H: SchemaHandler> SchemaInterpreter<H> {
    /// `base_name` names the class produced by the root's own `properties`.
    pub fn new(base_name: impl Into<String>, handler: H) -> Self {
        let base_name = base_name.into();
        Self {
            handler,
            current_name: base_name.clone(),
            base_name,
            mode: Mode::Field,
            frames: Vec::new(),
            skip_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn process(&mut self, event: JsonEvent) -> Result<(), SchemaError> {
        if self.skip_depth > 0 {
            self.skip(&event);
            return Ok(());
        }
        match event {
            JsonEvent::Key(key) => self.key(key),
            JsonEvent::Scalar(value) => self.scalar(value),
            JsonEvent::StartObject => self.start_object(),
            JsonEvent::EndObject => self.end_object(),
            JsonEvent::StartArray => self.start_array(),
            JsonEvent::EndArray => self.end_array(),
        }
    }

    /// Ends the pass. Every level must have been closed.
    pub fn finish(self) -> Result<(H, Vec<Diagnostic>), SchemaError> {
        if !self.frames.is_empty() || self.skip_depth > 0 {
            return Err(SchemaError::structural("schema ended inside an open object or array"));
        }
        Ok((self.handler, self.diagnostics))
    }

    // ---------------------------- Transitions ---------------------------- //

    fn key(&mut self, key: String) -> Result<(), SchemaError> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(SchemaError::structural(format!("key `{key}` outside of an object")));
        };
        if frame.class_body {
            self.mode = Mode::Field;
            self.current_name = key;
            return Ok(());
        }
        let mode = match key.as_str() {
            "properties" => Mode::Properties,
            "items" => Mode::Items,
            "type" => Mode::Type,
            "default" => Mode::Default,
            "$ref" => Mode::Reference,
            "enum" => Mode::Enum,
            "format" => Mode::Format,
            keyword if IGNORED_KEYWORDS.contains(&keyword) => Mode::Skip,
            _ => Mode::Field,
        };
        match mode {
            Mode::Properties => {
                self.commit_kind(Kind::Object)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.container = true;
                }
            }
            Mode::Items => self.commit_kind(Kind::Array)?,
            Mode::Skip => {
                info!(keyword = %key, field = %self.current_name, "skipping unsupported keyword");
                self.diagnostics.push(Diagnostic::UnsupportedKeywordSkip {
                    keyword: key,
                    field: self.current_name.clone(),
                });
            }
            Mode::Field => self.current_name = key,
            Mode::Type | Mode::Default | Mode::Reference | Mode::Enum | Mode::Format => {}
        }
        self.mode = mode;
        Ok(())
    }

    fn scalar(&mut self, value: Scalar) -> Result<(), SchemaError> {
        match self.mode {
            Mode::Skip => Ok(()),
            Mode::Default => self.default_value(value),
            Mode::Type => self.type_keyword(value),
            Mode::Reference => self.reference(value),
            Mode::Enum => self.enum_member(value),
            Mode::Format => self.format(value),
            Mode::Field | Mode::Properties | Mode::Items => Err(SchemaError::structural(format!(
                "`{}` is {value}, expected a schema object",
                self.current_name
            ))),
        }
    }

    fn default_value(&mut self, value: Scalar) -> Result<(), SchemaError> {
        if value == Scalar::Null {
            return Err(SchemaError::structural(format!(
                "`{}` has a null default",
                self.current_name
            )));
        }
        self.commit_kind(value.kind())?;
        let field = self.current_name.clone();
        self.emit(SchemaEvent::FieldDefault { field, value })
    }

    fn type_keyword(&mut self, value: Scalar) -> Result<(), SchemaError> {
        let field = self.current_name.clone();
        let kind = match &value {
            Scalar::String(keyword) => Kind::from_keyword(keyword),
            _ => None,
        };
        let Some(kind) = kind else {
            return Err(SchemaError::UnknownTypeKeyword { field, keyword: value.to_string() });
        };
        self.commit_kind(kind)?;

        match kind {
            Kind::Object => {
                if self.frames.len() > ROOT_DEPTH {
                    let target = derived_name(&field, "class")?;
                    self.emit(SchemaEvent::FieldObject { field, target })?;
                }
                Ok(())
            }
            Kind::Array => {
                if self.top().is_some_and(|frame| frame.in_items) {
                    return Err(SchemaError::structural(format!(
                        "`{field}` declares an array of arrays"
                    )));
                }
                self.emit(SchemaEvent::FieldArray { field })
            }
            primitive => match FieldKind::from_kind(primitive) {
                Some(kind) => self.emit(SchemaEvent::FieldKind { field, kind }),
                None => Ok(()),
            },
        }
    }

    fn reference(&mut self, value: Scalar) -> Result<(), SchemaError> {
        let Scalar::String(path) = value else {
            return Err(SchemaError::structural(format!(
                "`$ref` of `{}` must be a string",
                self.current_name
            )));
        };
        self.commit_kind(Kind::Object)?;
        let target = match path.rsplit_once('/') {
            Some((_, last)) => last.to_string(),
            None => path,
        };
        let field = self.current_name.clone();
        self.emit(SchemaEvent::FieldReference { field, target })
    }

    fn enum_member(&mut self, value: Scalar) -> Result<(), SchemaError> {
        let field = self.current_name.clone();
        if !self.top().is_some_and(|frame| frame.array) {
            return Err(SchemaError::structural(format!("`enum` of `{field}` must be an array")));
        }
        let Scalar::String(member) = value else {
            return Err(SchemaError::structural(format!(
                "`enum` of `{field}` has non-string member {value}"
            )));
        };
        // The array frame sits on top of the field's own schema level.
        let depth = self.frames.len();
        let schema = &mut self.frames[depth - 2];
        match schema.kind {
            Kind::Unknown | Kind::String => schema.kind = Kind::String,
            other => {
                return Err(SchemaError::structural(format!(
                    "`enum` of `{field}` requires a string type, found {other}"
                )));
            }
        }
        let enum_name = derived_name(&field, "enum")?;
        self.emit(SchemaEvent::EnumMember { field, enum_name, member })
    }

    fn format(&mut self, value: Scalar) -> Result<(), SchemaError> {
        let field = self.current_name.clone();
        let Scalar::String(format) = value else {
            return Err(SchemaError::structural(format!("`format` of `{field}` must be a string")));
        };
        self.emit(SchemaEvent::FieldFormat { field, format })
    }

    fn start_object(&mut self) -> Result<(), SchemaError> {
        match self.mode {
            Mode::Skip => {
                self.skip_depth = 1;
                return Ok(());
            }
            Mode::Default | Mode::Type | Mode::Reference | Mode::Format | Mode::Enum => {
                return Err(self.expected_scalar());
            }
            Mode::Field | Mode::Properties | Mode::Items => {}
        }

        let depth = self.frames.len();
        let parent_in_items = self.top().is_some_and(|frame| frame.in_items);
        let class_body = self.mode == Mode::Properties && self.top().is_some_and(|frame| frame.container);

        if self.mode == Mode::Items {
            if parent_in_items {
                return Err(SchemaError::structural(format!(
                    "`{}` declares an array of arrays",
                    self.current_name
                )));
            }
            let field = self.current_name.clone();
            self.emit(SchemaEvent::FieldArray { field })?;
        }
        if class_body {
            let name = if depth <= ROOT_DEPTH {
                self.base_name.clone()
            } else {
                derived_name(&self.current_name, "class")?
            };
            debug!(class = %name, "begin class");
            self.emit(SchemaEvent::BeginClass { name })?;
        }

        self.frames.push(Frame {
            name: self.current_name.clone(),
            kind: Kind::Unknown,
            container: false,
            class_body,
            in_items: self.mode == Mode::Items || (parent_in_items && !class_body),
            array: false,
        });
        self.mode = Mode::Field;
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), SchemaError> {
        let frame = match self.frames.pop() {
            Some(frame) if !frame.array => frame,
            _ => return Err(SchemaError::structural("object closed without being opened")),
        };
        self.current_name = frame.name;
        self.mode = Mode::Field;
        if frame.class_body {
            debug!(class = %self.current_name, "end class");
            self.emit(SchemaEvent::EndClass)?;
        }
        Ok(())
    }

    fn start_array(&mut self) -> Result<(), SchemaError> {
        match self.mode {
            Mode::Skip => {
                self.skip_depth = 1;
                Ok(())
            }
            Mode::Enum if !self.top().is_some_and(|frame| frame.array) => {
                self.frames.push(Frame {
                    name: self.current_name.clone(),
                    kind: Kind::Unknown,
                    container: false,
                    class_body: false,
                    in_items: false,
                    array: true,
                });
                Ok(())
            }
            Mode::Enum => Err(SchemaError::structural(format!(
                "`enum` of `{}` has a nested array member",
                self.current_name
            ))),
            Mode::Default | Mode::Type | Mode::Reference | Mode::Format => Err(self.expected_scalar()),
            Mode::Field | Mode::Properties | Mode::Items => Err(SchemaError::structural(format!(
                "`{}` is an array; arrays are only supported as `enum` values",
                self.current_name
            ))),
        }
    }

    fn end_array(&mut self) -> Result<(), SchemaError> {
        if self.mode != Mode::Enum || !self.top().is_some_and(|frame| frame.array) {
            return Err(SchemaError::structural("array closed outside of an `enum` block"));
        }
        self.frames.pop();
        self.mode = Mode::Field;
        Ok(())
    }

    // ------------------------------ Helpers ------------------------------ //

    fn skip(&mut self, event: &JsonEvent) {
        match event {
            JsonEvent::StartObject | JsonEvent::StartArray => self.skip_depth += 1,
            JsonEvent::EndObject | JsonEvent::EndArray => self.skip_depth -= 1,
            JsonEvent::Key(_) | JsonEvent::Scalar(_) => {}
        }
    }

    fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Unknown accepts anything and becomes fixed; otherwise the earlier
    /// kind must match.
    fn commit_kind(&mut self, found: Kind) -> Result<(), SchemaError> {
        let field = &self.current_name;
        let Some(frame) = self.frames.last_mut() else {
            return Err(SchemaError::structural(format!("`{field}` is outside of an object")));
        };
        if frame.kind == Kind::Unknown || frame.kind == found {
            frame.kind = found;
            return Ok(());
        }
        debug!(field = %field, declared = %frame.kind, %found, "type mismatch");
        Err(SchemaError::TypeConsistency { field: field.clone(), declared: frame.kind, found })
    }

    fn expected_scalar(&self) -> SchemaError {
        SchemaError::structural(format!(
            "`{}` of `{}` expects a scalar value",
            self.mode.keyword(),
            self.current_name
        ))
    }

    fn emit(&mut self, event: SchemaEvent) -> Result<(), SchemaError> {
        self.handler.handle(event)
    }
}

/// PascalCase name for a class or enum declared by `field`.
fn derived_name(field: &str, what: &str) -> Result<String, SchemaError> {
    let name = pascal_case(field);
    if name.is_empty() {
        return Err(SchemaError::structural(format!(
            "`{field}` has no letters to name its {what} after"
        )));
    }
    Ok(name)
}

// ------------------------------- Front API -------------------------------- //

#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs one pass over `src`. The root's own `properties` become the class
/// named `base_class`.
pub fn parse_schema(src: &str, base_class: &str) -> Result<ParsedSchema, SchemaError> {
    let mut interpreter = SchemaInterpreter::new(base_class, ModelBuilder::new());
    events::stream_events(src, &mut interpreter)?;
    let (builder, mut diagnostics) = interpreter.finish()?;
    let document = builder.finish()?;
    for dangling in document.unresolved_references() {
        let diagnostic = Diagnostic::UnresolvedReference {
            class: dangling.class,
            field: dangling.field,
            target: dangling.target,
        };
        warn!("{diagnostic}");
        diagnostics.push(diagnostic);
    }
    Ok(ParsedSchema { document, diagnostics })
}

// ------------------------------- Tests ------------------------------------ //
