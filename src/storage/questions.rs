//! Questions stored as JSON files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{list_files, remove_if_exists, QuestionRepository};
use crate::error::RepositoryError;
use crate::model::Question;

/// Reads every `*.json` file of a directory. Saving writes one file per
/// question, named `<question_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonQuestionRepository {
    questions_dir: PathBuf,
}

impl JsonQuestionRepository {
    pub fn new(questions_dir: impl Into<PathBuf>) -> Self {
        Self {
            questions_dir: questions_dir.into(),
        }
    }

    pub fn questions_dir(&self) -> &Path {
        &self.questions_dir
    }

    fn question_path(&self, question_id: &str) -> PathBuf {
        self.questions_dir.join(format!("{}.json", question_id))
    }

    /// Parses one file. Entries that are not questions are skipped with a
    /// warning; a file that is not JSON at all is skipped entirely.
    async fn load_file(path: &Path) -> Result<Vec<Question>, RepositoryError> {
        let content = tokio::fs::read_to_string(path).await?;
        let value: Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse question file");
                return Ok(Vec::new());
            }
        };

        let items = match value {
            Value::Array(items) => items,
            Value::Object(map) if map.contains_key("question_id") => vec![Value::Object(map)],
            _ => return Ok(Vec::new()),
        };

        let mut questions = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<Question>(item) {
                Ok(q) => questions.push(q),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to load question"),
            }
        }
        Ok(questions)
    }
}

#[async_trait]
impl QuestionRepository for JsonQuestionRepository {
    async fn get_all(&self) -> Result<Vec<Question>, RepositoryError> {
        let mut questions = Vec::new();
        for path in list_files(&self.questions_dir, &["json"]).await? {
            questions.extend(Self::load_file(&path).await?);
        }
        info!(
            dir = %self.questions_dir.display(),
            count = questions.len(),
            "Loaded questions"
        );
        Ok(questions)
    }

    async fn save(&self, question: &Question) -> Result<(), RepositoryError> {
        tokio::fs::create_dir_all(&self.questions_dir).await?;
        let json = serde_json::to_string_pretty(question)?;
        tokio::fs::write(self.question_path(&question.question_id), json).await?;
        info!(question_id = %question.question_id, "Saved question");
        Ok(())
    }

    async fn delete(&self, question_id: &str) -> Result<bool, RepositoryError> {
        let deleted = remove_if_exists(&self.question_path(question_id)).await?;
        if deleted {
            info!(question_id, "Deleted question");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_single_and_array_files() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"question_id": "Q1", "prompt": "p1", "topics": ["t"]},
                {"question_id": "Q2", "prompt": "p2", "topics": "x, y"},
                {"prompt": "missing id"}]"#,
        )
        .expect("write");
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"question_id": "Q3", "prompt": "p3", "topics": ["t"], "difficulty": "hard"}"#,
        )
        .expect("write");
        std::fs::write(dir.path().join("c.json"), "not json").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let repo = JsonQuestionRepository::new(dir.path());
        let questions = repo.get_all().await.expect("load");

        let ids: Vec<_> = questions.iter().map(|q| q.question_id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(questions[1].topics, vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn test_save_get_delete() {
        let dir = TempDir::new().expect("tempdir");
        let repo = JsonQuestionRepository::new(dir.path().join("questions"));
        let question = Question::new("Q9", "What?", vec!["misc".into()]);

        repo.save(&question).await.expect("save");
        assert_eq!(repo.get_by_id("Q9").await.expect("get"), Some(question));

        assert!(repo.delete("Q9").await.expect("delete"));
        assert!(!repo.delete("Q9").await.expect("delete again"));
        assert!(repo.get_all().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_bank() {
        let repo = JsonQuestionRepository::new("/nonexistent/exam-forge/questions");
        assert!(repo.get_all().await.expect("load").is_empty());
    }
}
