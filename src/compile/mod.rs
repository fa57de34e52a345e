//! Document compilation.
//!
//! A [`DocumentCompiler`] turns rendered source into a final artifact. It must
//! tolerate repeated calls for the same output path: each call overwrites the
//! previous artifact.

pub mod latex;

pub use latex::{with_suffix, LatexCompiler, AUX_EXTENSIONS};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CompileError;

/// Result of a compilation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    /// Expected artifact path, whether or not it was produced.
    pub output: PathBuf,
    pub diagnostic: Option<String>,
}

impl CompileOutcome {
    pub fn succeeded(output: PathBuf) -> Self {
        Self {
            success: true,
            output,
            diagnostic: None,
        }
    }

    pub fn failed(output: PathBuf, diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            output,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Compiles rendered source into an artifact.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    /// Program or engine name, for progress messages.
    fn name(&self) -> &str;

    /// Number of passes run per compilation.
    fn passes(&self) -> u32;

    /// Compiles `source` into `<output_base>.<ext>`. Relative assets are
    /// resolved against `working_dir`.
    ///
    /// A compiler that ran but produced nothing returns an unsuccessful
    /// outcome; a compiler that could not run or timed out returns an error.
    async fn compile(
        &self,
        source: &str,
        output_base: &Path,
        working_dir: &Path,
    ) -> Result<CompileOutcome, CompileError>;
}
