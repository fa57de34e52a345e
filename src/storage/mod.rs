//! File-backed repositories for questions, rosters and templates.
//!
//! The pipeline consumes these only through the traits below, once per run:
//! the whole question bank is materialized up front and the roster is read
//! once.
//!
//! # Layout
//!
//! - Questions: a directory of `*.json` files, each holding one question or
//!   an array of questions.
//! - Rosters: `*.csv` files with a `student_name,student_id` header, or the
//!   same records as JSON or YAML.
//! - Templates: a directory of `<name>.json` files.

pub mod questions;
pub mod roster;
pub mod templates;

pub use questions::JsonQuestionRepository;
pub use roster::{parse_roster_csv, write_roster_csv, FileStudentRepository};
pub use templates::{load_template_file, JsonTemplateRepository};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::model::{AssessmentTemplate, Question, Student};

/// Source of the question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Every question, in a stable order.
    async fn get_all(&self) -> Result<Vec<Question>, RepositoryError>;

    async fn get_by_id(&self, question_id: &str) -> Result<Option<Question>, RepositoryError> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|q| q.question_id == question_id))
    }

    async fn save(&self, question: &Question) -> Result<(), RepositoryError>;

    /// Returns whether anything was deleted.
    async fn delete(&self, question_id: &str) -> Result<bool, RepositoryError>;
}

/// Source of class rosters.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Loads the roster a template refers to, in file order.
    async fn load_roster(&self, reference: &str) -> Result<Vec<Student>, RepositoryError>;

    async fn save_roster(&self, students: &[Student], path: &Path) -> Result<(), RepositoryError>;

    /// File names of the rosters known to the repository, sorted.
    async fn available_rosters(&self) -> Result<Vec<String>, RepositoryError>;
}

/// Source of assessment templates.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Template names, sorted.
    async fn names(&self) -> Result<Vec<String>, RepositoryError>;

    async fn get_by_name(&self, name: &str) -> Result<Option<AssessmentTemplate>, RepositoryError>;

    async fn save(&self, template: &AssessmentTemplate) -> Result<(), RepositoryError>;

    async fn delete(&self, name: &str) -> Result<bool, RepositoryError>;
}

/// Sorted paths of the regular files in `dir` whose extension is one of
/// `extensions`. A missing directory yields an empty list.
pub(crate) async fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, RepositoryError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if matches && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Removes a file, reporting whether it existed.
pub(crate) async fn remove_if_exists(path: &Path) -> Result<bool, RepositoryError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
