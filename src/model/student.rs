//! Students of a class roster.

use serde::{Deserialize, Serialize};

/// A student in a class roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_name: String,
    /// Registration number, unique within a roster.
    pub student_id: String,
}

impl Student {
    pub fn new(student_name: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            student_name: student_name.into(),
            student_id: student_id.into(),
        }
    }

    /// Filesystem-safe form of the name: spaces become underscores, lowercased.
    pub fn slug(&self) -> String {
        self.student_name.replace(' ', "_").to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        let s = Student::new("Maria Clara Santos", "2023001");
        assert_eq!(s.slug(), "maria_clara_santos");
        assert_eq!(s.slug(), s.slug());
    }
}
