//! Batch generation pipeline.
//!
//! # Architecture
//!
//! - **Config**: [`GeneratorConfig`], defaults overridden by environment and CLI
//! - **Run**: [`GenerationRun`], the run directory and its success flag
//! - **Student pipeline**: select, render and compile one student's document
//! - **Orchestrator**: [`BatchOrchestrator`], drives every student of a roster
//!   and reports through a stream of [`GenerationProgress`] events
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use exam_forge::compile::LatexCompiler;
//! use exam_forge::pipeline::{BatchOrchestrator, GeneratorConfig};
//! use exam_forge::render::LatexRenderer;
//!
//! let config = GeneratorConfig::from_env()?;
//! let orchestrator = BatchOrchestrator::from_config(
//!     &config,
//!     template,
//!     students,
//!     bank,
//!     Arc::new(LatexRenderer::new()?),
//!     Arc::new(LatexCompiler::new(&config.compiler)),
//! )?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let handle = tokio::spawn(orchestrator.run(tx));
//! while let Some(event) = rx.recv().await {
//!     println!("{}", event);
//! }
//! let success = handle.await?;
//! ```

pub mod config;
pub mod orchestrator;
pub mod progress;
pub mod run;
pub mod student;

pub use config::GeneratorConfig;
pub use orchestrator::BatchOrchestrator;
pub use progress::{GenerationProgress, Stage};
pub use run::GenerationRun;
pub use student::filename_base;
