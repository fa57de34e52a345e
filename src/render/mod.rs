//! Document rendering.
//!
//! A [`DocumentRenderer`] turns a [`RenderContext`] into document source text.
//! The pipeline only depends on the trait; [`LatexRenderer`] is the Tera-backed
//! implementation used by the binary.

pub mod context;
pub mod latex;
pub mod locale;

pub use context::{RenderBlock, RenderContext, RenderQuestion, LOGO_KEY};
pub use latex::{escape_latex, LatexRenderer};
pub use locale::{Labels, Locale};

use crate::error::RenderError;

/// Produces document source for one student.
pub trait DocumentRenderer: Send + Sync {
    /// File extension of the rendered source, without the dot.
    fn extension(&self) -> &str;

    /// Renders a context into source text.
    fn render(&self, context: &RenderContext) -> Result<String, RenderError>;
}
