//! Core data model for assessment generation.
//!
//! Questions, students, selection blocks and templates are plain values: they
//! are loaded once per run and never mutated while a run is in progress.

pub mod question;
pub mod student;
pub mod template;

pub use question::{Difficulty, ImagePosition, Question, QuestionImage};
pub use student::Student;
pub use template::{AssessmentTemplate, SelectionBlock, SelectionMethod};
