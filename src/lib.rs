//! exam-forge: individualized assessment documents for every student.
//!
//! This library selects questions from a shared bank for each student of a
//! roster, renders one document per student from a layout and compiles it
//! with an external document compiler, reporting progress as a stream of
//! events.

// Core modules
pub mod assets;
pub mod bank;
pub mod cli;
pub mod compile;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod selection;
pub mod storage;
pub mod summary;
pub mod validation;

// Re-export commonly used types
pub use bank::QuestionBank;
pub use error::{
    AssetError, CompileError, ConfigError, RenderError, RepositoryError, SelectionError,
    ValidationError,
};
pub use model::{AssessmentTemplate, Question, SelectionBlock, Student};
pub use pipeline::{BatchOrchestrator, GenerationProgress, GeneratorConfig};
