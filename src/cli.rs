//! Minimal CLI: schema → (header | document)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::codegen::{self, Codegen, TemplateContext};
use crate::interpreter::{ParsedSchema, parse_schema};
use crate::type_map::TypeMap;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// turn a JSON schema into class declarations, or into the document a template engine renders
#[derive(Parser, Debug)]
#[command(name = "schemagen", version)]
pub struct CommandLineInterface {
    /// debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// render the header: a Jinja template if given, else one struct per class and one enum class per enum
    Header(HeaderOut),
    /// print the parsed document with resolved type names, for external templates
    Document(DocumentOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// schema file to read
    schema: PathBuf,

    /// class name for the root schema's own `properties`
    #[arg(long, default_value = "Base")]
    base_class: String,

    /// JSON object overriding type names (integer, number, boolean, string, uuid, array)
    #[arg(long)]
    types: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct HeaderOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// Jinja template rendered onto the document instead of the built-in header
    #[arg(long)]
    template: Option<PathBuf>,

    /// output header file
    #[arg(short, long, default_value = "source.h")]
    out: PathBuf,
}

#[derive(clap::Parser, Debug)]
struct DocumentOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<(ParsedSchema, TypeMap)> {
        let types = match self.types.as_ref() {
            Some(path) => TypeMap::load(path)?,
            None => TypeMap::default(),
        };
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema file {}", self.schema.display()))?;
        let parsed = parse_schema(&source, &self.base_class)
            .with_context(|| format!("failed to parse schema file {}", self.schema.display()))?;
        Ok((parsed, types))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Nothing is written unless the whole pass succeeds.
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Header(target) => {
                let (parsed, types) = target.input_settings.load()?;
                let header = match target.template.as_ref() {
                    Some(path) => render_template_file(path, &parsed, &types)?,
                    None => {
                        let mut cg = Codegen::new(&types);
                        cg.emit(&parsed.document);
                        cg.into_string()
                    }
                };
                write_output(&target.out, &header)
            }
            Command::Document(target) => {
                let (parsed, types) = target.input_settings.load()?;
                let context = TemplateContext::new(&parsed.document, &types);
                let context_src = serde_json::to_string_pretty(&context)?;
                match target.out.as_ref() {
                    Some(out) => write_output(out, &context_src),
                    None => {
                        println!("{context_src}");
                        Ok(())
                    }
                }
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render_template_file(path: &Path, parsed: &ParsedSchema, types: &TypeMap) -> Result<String> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("template");
    codegen::render_template(name, &source, &parsed.document, types)
        .with_context(|| format!("failed to render template {}", path.display()))
}

fn write_output(out: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}
