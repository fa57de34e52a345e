//! The per-student pipeline: select, render, compile.
//!
//! Each student runs `selecting -> rendering -> compiling` and stops at the
//! first failure, which is reported as a single error event. Nothing a
//! student's pipeline does affects another student.

use std::time::Duration;

use async_stream::stream;
use chrono::NaiveDate;
use futures::Stream;
use tracing::{debug, error};

use super::progress::{GenerationProgress, Stage};
use super::run::GenerationRun;
use crate::assets::AssetManager;
use crate::bank::QuestionBank;
use crate::compile::DocumentCompiler;
use crate::error::CompileError;
use crate::model::{AssessmentTemplate, Student};
use crate::render::{DocumentRenderer, Locale, RenderContext};
use crate::selection::QuestionSelector;
use crate::summary::VerificationPayload;

/// Base name shared by a student's rendered source and compiled artifact:
/// `<prefix>_<slug>_<student_id>`.
pub fn filename_base(template: &AssessmentTemplate, student: &Student) -> String {
    format!(
        "{}_{}_{}",
        template.filename_prefix,
        student.slug(),
        student.student_id
    )
}

/// Shared, read-only inputs for processing students of one run.
#[derive(Clone, Copy)]
pub(crate) struct StudentPipeline<'a> {
    pub template: &'a AssessmentTemplate,
    pub bank: &'a QuestionBank,
    pub run: &'a GenerationRun,
    pub renderer: &'a dyn DocumentRenderer,
    pub compiler: &'a dyn DocumentCompiler,
    pub assets: &'a AssetManager,
    pub locale: Locale,
    pub date: NaiveDate,
    pub logo: Option<&'a str>,
    pub compile_timeout: Duration,
    pub seed: Option<u64>,
}

impl<'a> StudentPipeline<'a> {
    fn selector(&self, index: usize) -> QuestionSelector<'a> {
        match self.seed {
            Some(seed) => QuestionSelector::with_seed(self.bank, seed.wrapping_add(index as u64)),
            None => QuestionSelector::new(self.bank),
        }
    }

    /// Events for one student. `index` is 0-based; events carry `index + 1`.
    pub fn process(
        self,
        student: &'a Student,
        index: usize,
        total: usize,
    ) -> impl Stream<Item = GenerationProgress> + Send + 'a {
        stream! {
            let current = index + 1;
            let name = &student.student_name;
            let step = |stage: Stage, message: String| {
                GenerationProgress::student(stage, message, student, current, total)
            };
            let fail = |message: String| {
                error!(student_id = %student.student_id, "{}", message);
                GenerationProgress::error(message, student, current, total)
            };

            yield step(Stage::Selecting, format!("Processing: {}", name));

            let selections = match self.selector(index).select(&self.template.selection_blocks) {
                Ok(selections) => selections,
                Err(e) => {
                    yield fail(format!("Failed to select questions for {}: {}", name, e));
                    return;
                }
            };
            let selections = self.assets.relocate_selections(&selections).await;

            let payload = VerificationPayload::from_selection(
                &student.student_id,
                self.run.run_id(),
                &self.template.selection_blocks,
                &selections,
            );
            debug!(student_id = %student.student_id, payload = %payload, "Selection summarized");

            yield step(Stage::Rendering, format!("Rendering document for {}", name));

            let context = RenderContext::new(
                self.template,
                student,
                &selections,
                &payload,
                self.locale,
                self.date,
            )
            .with_logo(self.logo);

            let source = match self.renderer.render(&context) {
                Ok(source) => source,
                Err(e) => {
                    yield fail(format!("Failed to render document for {}: {}", name, e));
                    return;
                }
            };

            let base = filename_base(self.template, student);
            let source_path = self
                .run
                .tex_dir()
                .join(format!("{}.{}", base, self.renderer.extension()));
            if let Err(e) = tokio::fs::write(&source_path, &source).await {
                yield fail(format!("Failed to render document for {}: {}", name, e));
                return;
            }

            yield step(
                Stage::Rendering,
                format!("  -> source saved to '{}'", source_path.display()),
            );

            yield step(Stage::Compiling, format!("Compiling document for {}", name));

            let output_base = self.run.pdf_dir().join(&base);
            let tex_dir = self.run.tex_dir();
            let compiled = tokio::time::timeout(
                self.compile_timeout,
                self.compiler.compile(&source, &output_base, &tex_dir),
            )
            .await;

            match compiled {
                Ok(Ok(outcome)) if outcome.success => {
                    yield step(
                        Stage::Compiling,
                        format!(
                            "  -> Document generated successfully using {}!",
                            self.compiler.name()
                        ),
                    );
                }
                Ok(Ok(outcome)) => {
                    yield fail(format!(
                        "  -> ERROR: document not created. {}",
                        outcome.diagnostic.unwrap_or_default()
                    ));
                }
                Ok(Err(e)) => {
                    yield fail(format!("Failed to compile document for {}: {}", name, e));
                }
                Err(_) => {
                    let e = CompileError::Timeout {
                        timeout: self.compile_timeout,
                    };
                    yield fail(format!("Failed to compile document for {}: {}", name, e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_base() {
        let template = AssessmentTemplate::new("T", "Exam", "midterm");
        let student = Student::new("Maria Clara Santos", "2023001");
        assert_eq!(filename_base(&template, &student), "midterm_maria_clara_santos_2023001");
    }
}
