//! LaTeX compiler driven as a subprocess.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{CompileOutcome, DocumentCompiler};
use crate::error::CompileError;

/// Auxiliary files removed after a successful compilation.
pub const AUX_EXTENSIONS: [&str; 6] = [".aux", ".log", ".out", ".fdb_latexmk", ".fls", ".synctex.gz"];

const DEFAULT_PASSES: u32 = 2;
const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(60);
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// Appends `suffix` to the file name of `base`. Unlike
/// [`Path::with_extension`], dots already in the base name are kept.
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Compiles LaTeX sources with `pdflatex` or a compatible program.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    /// Arguments placed before the standard ones.
    args: Vec<String>,
    passes: u32,
    pass_timeout: Duration,
}

impl Default for LatexCompiler {
    fn default() -> Self {
        Self::new("pdflatex")
    }
}

impl LatexCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            passes: DEFAULT_PASSES,
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Number of runs, at least one. Two resolve cross-references.
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes.max(1);
        self
    }

    pub fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    pub fn pass_timeout(&self) -> Duration {
        self.pass_timeout
    }

    /// Runs `<program> --version` and reports whether it succeeded.
    pub async fn check_available(&self) -> bool {
        self.version().await.is_some()
    }

    /// First line of `<program> --version`, if the program runs.
    pub async fn version(&self) -> Option<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(VERSION_TIMEOUT, cmd.output())
            .await
            .ok()?
            .ok()?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Some(stdout.lines().next().unwrap_or_default().trim().to_string())
        } else {
            None
        }
    }

    async fn texinputs(working_dir: &Path) -> OsString {
        let dir = fs::canonicalize(working_dir)
            .await
            .unwrap_or_else(|_| working_dir.to_path_buf());
        let mut value = dir.into_os_string();
        value.push(PATH_SEPARATOR);
        if let Some(existing) = std::env::var_os("TEXINPUTS") {
            value.push(existing);
        }
        value
    }

    async fn run_pass(
        &self,
        tex_file: &Path,
        output_dir: &Path,
        texinputs: &OsString,
    ) -> Result<Output, CompileError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("-interaction=nonstopmode")
            .arg(format!("-output-directory={}", output_dir.display()))
            .arg(tex_file)
            .env("TEXINPUTS", texinputs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => CompileError::NotFound(self.program.clone()),
            _ => CompileError::Io(e),
        })?;

        // dropping the child on timeout kills the process
        match tokio::time::timeout(self.pass_timeout, child.wait_with_output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CompileError::Timeout {
                timeout: self.pass_timeout,
            }),
        }
    }

    async fn cleanup_auxiliary_files(output_base: &Path) {
        for ext in AUX_EXTENSIONS {
            let aux = with_suffix(output_base, ext);
            match fs::remove_file(&aux).await {
                Ok(()) => debug!(path = %aux.display(), "Removed auxiliary file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %aux.display(), error = %e, "Failed to remove auxiliary file"),
            }
        }
    }

    fn compilation_log_path(output_base: &Path) -> PathBuf {
        with_suffix(output_base, "_compilation.log")
    }

    async fn save_compilation_log(&self, output_base: &Path, output: Option<&Output>) -> PathBuf {
        let path = Self::compilation_log_path(output_base);
        let (stdout, stderr) = match output {
            Some(o) => (
                String::from_utf8_lossy(&o.stdout).into_owned(),
                String::from_utf8_lossy(&o.stderr).into_owned(),
            ),
            None => (String::new(), String::new()),
        };
        let contents = format!(
            "--- LaTeX Compilation Log ---\nCompiler: {}\nPasses: {}\n\n--- stdout ---\n{}\n--- stderr ---\n{}",
            self.program, self.passes, stdout, stderr
        );

        match fs::write(&path, contents).await {
            Ok(()) => info!(path = %path.display(), "Saved compilation log"),
            Err(e) => error!(path = %path.display(), error = %e, "Failed to save compilation log"),
        }
        path
    }
}

#[async_trait]
impl DocumentCompiler for LatexCompiler {
    fn name(&self) -> &str {
        &self.program
    }

    fn passes(&self) -> u32 {
        self.passes
    }

    async fn compile(
        &self,
        source: &str,
        output_base: &Path,
        working_dir: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        let start = Instant::now();
        let output_dir = match output_base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&output_dir).await?;

        let tex_file = with_suffix(output_base, ".tex");
        let pdf_file = with_suffix(output_base, ".pdf");

        // a pdf left over from an earlier run must not count as success
        if let Err(e) = fs::remove_file(&pdf_file).await {
            if e.kind() != ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        fs::write(&tex_file, source).await?;
        debug!(path = %tex_file.display(), "Wrote LaTeX source");

        let texinputs = Self::texinputs(working_dir).await;
        let mut last_output = None;
        for pass in 1..=self.passes {
            debug!(pass, passes = self.passes, compiler = %self.program, "Compilation pass");
            let output = self.run_pass(&tex_file, &output_dir, &texinputs).await?;
            last_output = Some(output);
        }

        let produced = fs::metadata(&pdf_file)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if produced {
            Self::cleanup_auxiliary_files(output_base).await;
            let _ = fs::remove_file(Self::compilation_log_path(output_base)).await;
            info!(
                path = %pdf_file.display(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Compiled PDF"
            );
            Ok(CompileOutcome::succeeded(pdf_file))
        } else {
            let log = self
                .save_compilation_log(output_base, last_output.as_ref())
                .await;
            let diagnostic = CompileError::MissingOutput { log }.to_string();
            error!(path = %pdf_file.display(), "{}", diagnostic);
            Ok(CompileOutcome::failed(pdf_file, diagnostic))
        }
    }
}
