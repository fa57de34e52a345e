//! Progress events emitted while a batch is generated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Student;

/// Stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Loading,
    Selecting,
    Rendering,
    Compiling,
    Error,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loading => "loading",
            Stage::Selecting => "selecting",
            Stage::Rendering => "rendering",
            Stage::Compiling => "compiling",
            Stage::Error => "error",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update. The stream of these is the only report of how a
/// batch went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub stage: Stage,
    pub message: String,
    pub student_name: Option<String>,
    pub student_id: Option<String>,
    /// 1-based position of the student in the roster, 0 outside students.
    pub current: usize,
    pub total: usize,
    pub success: bool,
}

impl GenerationProgress {
    /// A run-level loading event.
    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Loading,
            message: message.into(),
            student_name: None,
            student_id: None,
            current: 0,
            total: 0,
            success: true,
        }
    }

    /// A successful step for one student.
    pub fn student(
        stage: Stage,
        message: impl Into<String>,
        student: &Student,
        current: usize,
        total: usize,
    ) -> Self {
        Self {
            stage,
            message: message.into(),
            student_name: Some(student.student_name.clone()),
            student_id: Some(student.student_id.clone()),
            current,
            total,
            success: true,
        }
    }

    /// A failure for one student.
    pub fn error(message: impl Into<String>, student: &Student, current: usize, total: usize) -> Self {
        Self {
            success: false,
            ..Self::student(Stage::Error, message, student, current, total)
        }
    }

    /// The final event of a run.
    pub fn complete(success: bool) -> Self {
        let message = if success {
            "--- PROCESS FINISHED ---\nAll documents were generated successfully!"
        } else {
            "--- PROCESS FINISHED ---\nCompleted with one or more errors."
        };
        Self {
            stage: Stage::Complete,
            success,
            ..Self::loading(message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.stage == Stage::Error
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }
}

impl fmt::Display for GenerationProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total > 0 {
            write!(f, "[{}/{}] ", self.current, self.total)?;
        }
        f.write_str(&self.message)
    }
}
