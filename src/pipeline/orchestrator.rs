//! Batch orchestrator.
//!
//! Runs the per-student pipeline for every student of a roster, in roster
//! order, and reports everything through one ordered stream of
//! [`GenerationProgress`] events:
//!
//! 1. three loading events (run location, bank size, roster size);
//! 2. each student's events;
//! 3. exactly one `complete` event carrying the run-wide success flag.
//!
//! A student's failure becomes an error event and the batch moves on. The
//! stream is single pass; a consumer that stops polling abandons the rest of
//! the batch, leaving already written files in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use chrono::{Local, NaiveDate};
use futures::{pin_mut, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::config::GeneratorConfig;
use super::progress::GenerationProgress;
use super::run::GenerationRun;
use super::student::StudentPipeline;
use crate::assets::AssetManager;
use crate::bank::QuestionBank;
use crate::compile::DocumentCompiler;
use crate::model::{AssessmentTemplate, Student};
use crate::render::{DocumentRenderer, Locale};

/// Generates documents for a whole roster.
pub struct BatchOrchestrator {
    run: GenerationRun,
    template: AssessmentTemplate,
    students: Vec<Student>,
    bank: QuestionBank,
    renderer: Arc<dyn DocumentRenderer>,
    compiler: Arc<dyn DocumentCompiler>,
    assets: AssetManager,
    locale: Locale,
    date: NaiveDate,
    logo_source: Option<PathBuf>,
    compile_timeout: Duration,
    seed: Option<u64>,
}

impl BatchOrchestrator {
    pub fn new(
        run: GenerationRun,
        template: AssessmentTemplate,
        students: Vec<Student>,
        bank: QuestionBank,
        renderer: Arc<dyn DocumentRenderer>,
        compiler: Arc<dyn DocumentCompiler>,
    ) -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            assets: AssetManager::new(run.assets_dir()),
            run,
            template,
            students,
            bank,
            renderer,
            compiler,
            locale: defaults.locale,
            date: Local::now().date_naive(),
            logo_source: None,
            compile_timeout: defaults.compile_timeout(),
            seed: None,
        }
    }

    /// Creates the run directory under `config.output_dir` and applies the
    /// configuration.
    pub fn from_config(
        config: &GeneratorConfig,
        template: AssessmentTemplate,
        students: Vec<Student>,
        bank: QuestionBank,
        renderer: Arc<dyn DocumentRenderer>,
        compiler: Arc<dyn DocumentCompiler>,
    ) -> std::io::Result<Self> {
        let run = GenerationRun::create(&config.output_dir)?;
        let mut orchestrator = Self::new(run, template, students, bank, renderer, compiler)
            .with_locale(config.locale)
            .with_compile_timeout(config.compile_timeout());
        orchestrator.logo_source = config.logo_path.clone();
        orchestrator.seed = config.seed;
        Ok(orchestrator)
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Date printed on the documents.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Logo file copied when the template asks for a logo. Without one the
    /// template's own logo path is used.
    pub fn with_logo_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_source = Some(path.into());
        self
    }

    /// Upper bound for one student's compilation.
    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn run_id(&self) -> &str {
        self.run.run_id()
    }

    pub fn run_dir(&self) -> &Path {
        self.run.run_dir()
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.run.pdf_dir()
    }

    async fn relocate_logo(&self) -> Option<String> {
        let requested = self.template.logo_path.as_deref()?;
        let source = self
            .logo_source
            .clone()
            .unwrap_or_else(|| PathBuf::from(requested));
        self.assets.copy_logo(&source).await
    }

    /// Generates every student's document, yielding progress as it goes.
    pub fn generate(self) -> impl Stream<Item = GenerationProgress> + Send + 'static {
        stream! {
            let this = self;
            let total = this.students.len();
            info!(run_id = %this.run.run_id(), students = total, "Starting generation");

            let event = GenerationProgress::loading(format!(
                "Output will be saved in: {}",
                this.run.run_dir().display()
            ));
            this.run.log_event(&event).await;
            yield event;

            let logo = this.relocate_logo().await;

            let event = GenerationProgress::loading(format!(
                "Loaded {} questions from database",
                this.bank.len()
            ));
            this.run.log_event(&event).await;
            yield event;

            let event = GenerationProgress::loading(format!("Found {} students", total));
            this.run.log_event(&event).await;
            yield event;

            let pipeline = StudentPipeline {
                template: &this.template,
                bank: &this.bank,
                run: &this.run,
                renderer: this.renderer.as_ref(),
                compiler: this.compiler.as_ref(),
                assets: &this.assets,
                locale: this.locale,
                date: this.date,
                logo: logo.as_deref(),
                compile_timeout: this.compile_timeout,
                seed: this.seed,
            };

            for (index, student) in this.students.iter().enumerate() {
                for await event in pipeline.process(student, index, total) {
                    if event.is_error() {
                        this.run.record_failure();
                    }
                    debug!(stage = %event.stage, student_id = %student.student_id, "{}", event.message);
                    this.run.log_event(&event).await;
                    yield event;
                }
            }

            let event = GenerationProgress::complete(this.run.success());
            info!(run_id = %this.run.run_id(), success = event.success, "Generation finished");
            this.run.log_event(&event).await;
            yield event;
        }
    }

    /// Runs the batch, forwarding every event to `tx`. Returns the run-wide
    /// success flag, or `false` if the receiver went away before the end.
    pub async fn run(self, tx: mpsc::Sender<GenerationProgress>) -> bool {
        let events = self.generate();
        pin_mut!(events);

        let mut success = false;
        while let Some(event) = events.next().await {
            if event.is_complete() {
                success = event.success;
            }
            if tx.send(event).await.is_err() {
                debug!("Progress receiver dropped, abandoning batch");
                return false;
            }
        }
        success
    }
}
