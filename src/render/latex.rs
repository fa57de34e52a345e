//! Tera-backed LaTeX renderer.
//!
//! Layouts are ordinary Tera templates. A `latex` filter escapes the
//! characters LaTeX treats specially in running text, and a `qr` filter
//! escapes an argument of `\qrcode` so the encoded string stays byte for byte
//! what was passed in. Question prompts are inserted as-is because they are
//! LaTeX source themselves.

use std::collections::HashMap;
use std::path::Path;

use tera::{Context, Tera, Value};
use tracing::{debug, info};

use super::{DocumentRenderer, RenderContext};
use crate::error::RenderError;

/// Layout used when no custom layout file is configured.
pub const BUILTIN_LAYOUT: &str = include_str!("layout.tex");

const BUILTIN_NAME: &str = "layout.tex";

/// Escapes LaTeX special characters.
pub fn escape_latex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a string for the `qrcode` package, which reads its argument
/// verbatim apart from backslash escapes.
pub fn escape_qr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '{' | '}' | '#' | '%' | '_' | '&' | '$' | '^' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_value(value: &Value, escape: fn(&str) -> String) -> Value {
    let text = match value {
        Value::String(s) => escape(s),
        Value::Null => String::new(),
        other => escape(&other.to_string()),
    };
    Value::String(text)
}

fn latex_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(escape_value(value, escape_latex))
}

fn qr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(escape_value(value, escape_qr))
}

/// Renders LaTeX documents from a single Tera layout.
#[derive(Debug)]
pub struct LatexRenderer {
    tera: Tera,
    layout_name: String,
}

impl LatexRenderer {
    /// Renderer using the built-in layout.
    pub fn new() -> Result<Self, RenderError> {
        Self::from_source(BUILTIN_NAME, BUILTIN_LAYOUT)
    }

    /// Renderer using a layout given as text.
    pub fn from_source(name: &str, source: &str) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.register_filter("latex", latex_filter);
        tera.register_filter("qr", qr_filter);
        tera.add_raw_template(name, source)?;
        Ok(Self {
            tera,
            layout_name: name.to_string(),
        })
    }

    /// Renderer using a layout file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::LayoutNotFound`] if the file does not exist and
    /// [`RenderError::Tera`] if it is not a valid template.
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        if !path.is_file() {
            return Err(RenderError::LayoutNotFound(path.display().to_string()));
        }
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| BUILTIN_NAME.to_string());
        let renderer = Self::from_source(&name, &source)?;
        info!(layout = %path.display(), "Loaded LaTeX layout");
        Ok(renderer)
    }

    /// Built-in layout unless `path` names a custom one.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self, RenderError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::new(),
        }
    }

    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }
}

impl DocumentRenderer for LatexRenderer {
    fn extension(&self) -> &str {
        "tex"
    }

    fn render(&self, context: &RenderContext) -> Result<String, RenderError> {
        let ctx = Context::from_serialize(context)
            .map_err(|e| RenderError::InvalidContext(e.to_string()))?;
        let rendered = self.tera.render(&self.layout_name, &ctx)?;
        debug!(
            student_id = %context.student.student_id,
            bytes = rendered.len(),
            "Rendered LaTeX"
        );
        Ok(rendered)
    }
}
