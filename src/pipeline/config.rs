//! Generator configuration.
//!
//! Settings for a generation run: where output goes, which compiler runs and
//! for how long, the document language, and optional logo and layout files.
//! Values come from defaults, then environment variables, then CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::render::Locale;

/// Configuration for a generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base directory; each run gets its own subdirectory.
    pub output_dir: PathBuf,
    /// Compiler executable.
    pub compiler: String,
    /// Compiler passes per document.
    pub passes: u32,
    /// Time limit for a single compiler pass.
    pub pass_timeout: Duration,
    /// Language of labels and dates.
    pub locale: Locale,
    /// Logo copied into the run when the template asks for one.
    pub logo_path: Option<PathBuf>,
    /// Custom layout; the built-in one is used when unset.
    pub layout_path: Option<PathBuf>,
    /// Fixes random selection. Student `i` (0-based) uses `seed + i`.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            compiler: "pdflatex".to_string(),
            passes: 2,
            pass_timeout: Duration::from_secs(60),
            locale: Locale::default(),
            logo_path: None,
            layout_path: None,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EXAM_FORGE_OUTPUT_DIR`: output directory (default: ./output)
    /// - `EXAM_FORGE_COMPILER`: compiler executable (default: pdflatex)
    /// - `EXAM_FORGE_PASSES`: compiler passes (default: 2)
    /// - `EXAM_FORGE_PASS_TIMEOUT_SECS`: per-pass timeout (default: 60)
    /// - `EXAM_FORGE_LOCALE`: `en` or `pt_br` (default: detected from
    ///   `LC_ALL`, `LC_MESSAGES`, `LANG`)
    /// - `EXAM_FORGE_LOGO`: logo file
    /// - `EXAM_FORGE_LAYOUT`: custom layout file
    /// - `EXAM_FORGE_SEED`: selection seed
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        if std::env::var("EXAM_FORGE_LOCALE").is_err() {
            config.locale = Locale::detect();
        }
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("EXAM_FORGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("EXAM_FORGE_COMPILER") {
            config.compiler = val;
        }

        if let Some(val) = lookup("EXAM_FORGE_PASSES") {
            config.passes = parse_env_value(&val, "EXAM_FORGE_PASSES")?;
        }

        if let Some(val) = lookup("EXAM_FORGE_PASS_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "EXAM_FORGE_PASS_TIMEOUT_SECS")?;
            config.pass_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("EXAM_FORGE_LOCALE") {
            config.locale = val.parse().map_err(|message| ConfigError::InvalidValue {
                key: "EXAM_FORGE_LOCALE".to_string(),
                message,
            })?;
        }

        if let Some(val) = lookup("EXAM_FORGE_LOGO") {
            config.logo_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("EXAM_FORGE_LAYOUT") {
            config.layout_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("EXAM_FORGE_SEED") {
            config.seed = Some(parse_env_value(&val, "EXAM_FORGE_SEED")?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.passes == 0 {
            return Err(ConfigError::ValidationFailed(
                "passes must be greater than 0".to_string(),
            ));
        }

        if self.pass_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "pass_timeout must be greater than 0".to_string(),
            ));
        }

        if self.compiler.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "compiler cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Upper bound for compiling one document.
    pub fn compile_timeout(&self) -> Duration {
        self.pass_timeout.saturating_mul(self.passes)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_logo(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(path.into());
        self
    }

    pub fn with_layout(mut self, path: impl Into<PathBuf>) -> Self {
        self.layout_path = Some(path.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Parses an environment variable value.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
