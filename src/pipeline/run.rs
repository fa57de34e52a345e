//! Identity, directories and outcome of one generation run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, Utc};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::progress::GenerationProgress;

pub const TEX_DIR: &str = "tex";
pub const ASSETS_DIR: &str = "assets";
pub const PDF_DIR: &str = "pdf";
pub const LOG_DIR: &str = "log";
pub const LOG_FILE: &str = "generation.log";

/// A run directory and its success flag.
///
/// Layout: `<output>/<run_id>/{tex, tex/assets, pdf, log}`. The flag starts
/// true and only ever goes false.
#[derive(Debug)]
pub struct GenerationRun {
    run_id: String,
    run_dir: PathBuf,
    success: AtomicBool,
}

impl GenerationRun {
    /// Creates a run under `output_dir` identified by the current Unix time.
    /// If that directory already exists a `-<n>` suffix is added.
    pub fn create(output_dir: &Path) -> std::io::Result<Self> {
        Self::create_with_base(output_dir, &Utc::now().timestamp().to_string())
    }

    /// Creates a run whose id starts with `base`.
    pub fn create_with_base(output_dir: &Path, base: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;

        let mut run_id = base.to_string();
        let mut n = 0u32;
        loop {
            match std::fs::create_dir(output_dir.join(&run_id)) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    n += 1;
                    run_id = format!("{}-{}", base, n);
                }
                Err(e) => return Err(e),
            }
        }

        let run = Self {
            run_dir: output_dir.join(&run_id),
            run_id,
            success: AtomicBool::new(true),
        };
        for dir in [run.tex_dir(), run.assets_dir(), run.pdf_dir(), run.log_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        info!(run_id = %run.run_id, path = %run.run_dir.display(), "Created generation run");
        Ok(run)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Rendered sources; also the compiler's working directory.
    pub fn tex_dir(&self) -> PathBuf {
        self.run_dir.join(TEX_DIR)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.tex_dir().join(ASSETS_DIR)
    }

    /// Compiled artifacts.
    pub fn pdf_dir(&self) -> PathBuf {
        self.run_dir.join(PDF_DIR)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.run_dir.join(LOG_DIR)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join(LOG_FILE)
    }

    pub fn record_failure(&self) {
        self.success.store(false, Ordering::Relaxed);
    }

    pub fn success(&self) -> bool {
        self.success.load(Ordering::Relaxed)
    }

    /// Appends one timestamped line for `event` to the run log.
    pub async fn log_event(&self, event: &GenerationProgress) {
        let line = format!(
            "[{}] [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.stage,
            event.message.replace('\n', " ")
        );
        if let Err(e) = self.append_log(line.as_bytes()).await {
            warn!(path = %self.log_file().display(), error = %e, "Failed to write run log");
        }
    }

    async fn append_log(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file())
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}
