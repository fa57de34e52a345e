//! Aggregated pre-flight report for a generation run.
//!
//! Collects the individual validators into named checks so a caller can show
//! everything that is wrong at once instead of stopping at the first error.

use serde::{Deserialize, Serialize};

use super::{validate_question, validate_roster, validate_template};
use crate::bank::QuestionBank;
use crate::model::{AssessmentTemplate, SelectionMethod, Student};

/// Result of an individual check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check that was performed.
    pub check_name: String,
    pub passed: bool,
    /// Failure reason, or a note for a passing check.
    pub message: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            check_name: name.into(),
            passed: true,
            message: None,
        }
    }

    pub fn pass_with_message(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check_name: name.into(),
            passed: true,
            message: Some(message.into()),
        }
    }

    pub fn fail(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            check_name: name.into(),
            passed: false,
            message: Some(reason.into()),
        }
    }
}

/// All checks run before a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether every check passed.
    pub valid: bool,
    pub checks: Vec<CheckResult>,
    pub summary: String,
}

impl ValidationReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let total = checks.len();
        let failed = checks.iter().filter(|c| !c.passed).count();
        let valid = failed == 0;

        let summary = if valid {
            format!("All {} checks passed", total)
        } else {
            format!("{} of {} checks failed", failed, total)
        };

        Self {
            valid,
            checks,
            summary,
        }
    }

    /// Checks a template, its roster and the question bank together.
    ///
    /// Manual ids missing from the bank are reported as a note only: selection
    /// skips them silently.
    pub fn for_run(template: &AssessmentTemplate, roster: &[Student], bank: &QuestionBank) -> Self {
        let mut checks = Vec::new();

        checks.push(match validate_template(template) {
            Ok(()) => CheckResult::pass("template"),
            Err(err) => CheckResult::fail("template", err.reason),
        });

        checks.push(match validate_roster(roster) {
            Ok(()) => CheckResult::pass_with_message("roster", format!("{} students", roster.len())),
            Err(err) => CheckResult::fail("roster", err.reason),
        });

        let invalid: Vec<String> = bank
            .iter()
            .filter_map(|q| {
                validate_question(q)
                    .err()
                    .map(|err| format!("'{}': {}", q.question_id, err.reason))
            })
            .collect();
        checks.push(if invalid.is_empty() {
            CheckResult::pass_with_message("questions", format!("{} questions", bank.len()))
        } else {
            CheckResult::fail("questions", invalid.join("; "))
        });

        let duplicates = bank.duplicate_ids();
        checks.push(if duplicates.is_empty() {
            CheckResult::pass("unique_question_ids")
        } else {
            CheckResult::fail(
                "unique_question_ids",
                format!("Duplicate question IDs: {}", duplicates.join(", ")),
            )
        });

        let missing: Vec<&str> = template
            .selection_blocks
            .iter()
            .filter_map(|block| match &block.method {
                SelectionMethod::Manual { question_ids } => Some(question_ids),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .filter(|id| !bank.contains(id))
            .collect();
        checks.push(if missing.is_empty() {
            CheckResult::pass("manual_references")
        } else {
            CheckResult::pass_with_message(
                "manual_references",
                format!("Unknown question IDs will be skipped: {}", missing.join(", ")),
            )
        });

        Self::new(checks)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, SelectionBlock};

    fn bank() -> QuestionBank {
        QuestionBank::new(vec![
            Question::new("Q1", "p1", vec!["t".into()]),
            Question::new("Q2", "p2", vec!["t".into()]),
        ])
    }

    #[test]
    fn test_report_all_pass() {
        let template = AssessmentTemplate::new("T", "Exam", "exam")
            .with_roster("class.csv")
            .with_block(SelectionBlock::manual("Fixed", ["Q1", "Q9"]));
        let roster = vec![Student::new("Ana", "1")];

        let report = ValidationReport::for_run(&template, &roster, &bank());

        assert!(report.valid, "{:?}", report.checks);
        assert_eq!(report.summary, "All 5 checks passed");
        let manual = report
            .checks
            .iter()
            .find(|c| c.check_name == "manual_references")
            .expect("manual check present");
        assert!(manual.message.as_deref().unwrap_or_default().contains("Q9"));
    }

    #[test]
    fn test_report_collects_failures() {
        let template = AssessmentTemplate::new("T", "Exam", "exam").with_roster("class.csv");
        let bank = QuestionBank::new(vec![
            Question::new("Q1", "p", vec!["t".into()]),
            Question::new("Q1", "", vec!["t".into()]),
        ]);

        let report = ValidationReport::for_run(&template, &[], &bank);

        assert!(!report.valid);
        let failed: Vec<_> = report.failures().map(|c| c.check_name.as_str()).collect();
        assert_eq!(failed, vec!["template", "roster", "questions", "unique_question_ids"]);
        assert_eq!(report.summary, "4 of 5 checks failed");
    }
}
