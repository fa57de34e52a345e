//! Pre-flight validation for questions, rosters, blocks and templates.
//!
//! Every validator is a pure function returning [`ValidationResult`]: either
//! the entity is valid, or a single [`ValidationError`] carries the reason.
//! Nothing in the generation pipeline re-checks these rules, so callers run
//! them before starting a batch.

pub mod report;

pub use report::{CheckResult, ValidationReport};

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{AssessmentTemplate, ImagePosition, Question, SelectionBlock, SelectionMethod, Student};

/// Outcome of a single validator.
pub type ValidationResult = Result<(), ValidationError>;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn fail(reason: impl Into<String>) -> ValidationResult {
    Err(ValidationError::new(reason))
}

/// Checks a question's id, prompt, topics and image descriptor.
pub fn validate_question(question: &Question) -> ValidationResult {
    if is_blank(&question.question_id) {
        return fail("Question ID cannot be empty");
    }
    if question.topics.is_empty() {
        return fail("Question must have at least one topic");
    }
    if is_blank(&question.prompt) {
        return fail("Question prompt cannot be empty");
    }

    if let Some(image) = &question.image {
        if is_blank(&image.path) {
            return fail("Image path cannot be empty");
        }
        if !(image.width_cm > 0.0) {
            return fail("Image width must be positive");
        }
        if !image.position.is_valid() {
            return fail(format!(
                "Image position must be one of: {}",
                ImagePosition::VALID.join(", ")
            ));
        }
    }

    Ok(())
}

/// Rejects `question_id` if it is already taken.
pub fn validate_question_id_unique<'a, I>(question_id: &str, existing_ids: I) -> ValidationResult
where
    I: IntoIterator<Item = &'a str>,
{
    if existing_ids.into_iter().any(|id| id == question_id) {
        return fail(format!("Question ID '{}' already exists", question_id));
    }
    Ok(())
}

pub fn validate_student(student: &Student) -> ValidationResult {
    if is_blank(&student.student_name) {
        return fail("Student name cannot be empty");
    }
    if is_blank(&student.student_id) {
        return fail("Student registration number cannot be empty");
    }
    Ok(())
}

/// Checks that a roster is non-empty, has unique registration numbers and
/// that every student is individually valid.
pub fn validate_roster(students: &[Student]) -> ValidationResult {
    if students.is_empty() {
        return fail("Class roster cannot be empty");
    }

    let mut seen = HashSet::new();
    for student in students {
        if !seen.insert(student.student_id.as_str()) {
            return fail(format!(
                "Duplicate registration numbers found in roster: '{}'",
                student.student_id
            ));
        }
    }

    for student in students {
        if let Err(err) = validate_student(student) {
            return fail(format!(
                "Invalid student '{}': {}",
                student.student_name, err.reason
            ));
        }
    }

    Ok(())
}

fn has_positive(quantity: Option<i64>) -> bool {
    matches!(quantity, Some(q) if q > 0)
}

/// Checks that a block carries exactly what its method needs.
pub fn validate_selection_block(block: &SelectionBlock) -> ValidationResult {
    if is_blank(&block.title) {
        return fail("Block title cannot be empty");
    }

    match &block.method {
        SelectionMethod::Manual { question_ids } => {
            if question_ids.is_empty() {
                return fail("Manual selection requires at least one question ID");
            }
        }
        SelectionMethod::RandomAll { quantity } => {
            if !has_positive(*quantity) {
                return fail("Random selection requires a positive quantity");
            }
        }
        SelectionMethod::RandomTopic { quantity, topic } => {
            if !has_positive(*quantity) {
                return fail("Random topic selection requires a positive quantity");
            }
            if topic.as_deref().map_or(true, is_blank) {
                return fail("Random topic selection requires a topic");
            }
        }
        SelectionMethod::RandomDifficulty {
            quantity,
            difficulty,
        } => {
            if !has_positive(*quantity) {
                return fail("Random difficulty selection requires a positive quantity");
            }
            if difficulty.is_none() {
                return fail("Random difficulty selection requires a difficulty level");
            }
        }
        SelectionMethod::RandomType { .. } => {
            return fail("Random type selection is not supported");
        }
        SelectionMethod::Unknown { method, .. } => {
            return fail(format!("Unknown selection method: {}", method));
        }
    }

    Ok(())
}

/// Checks a template's settings and every one of its blocks. The reason for
/// an invalid block names its 1-based position and title.
pub fn validate_template(template: &AssessmentTemplate) -> ValidationResult {
    if is_blank(&template.name) {
        return fail("Template name cannot be empty");
    }
    if is_blank(&template.document_title) {
        return fail("Document title cannot be empty");
    }
    if is_blank(&template.filename_prefix) {
        return fail("Filename prefix cannot be empty");
    }
    if template.roster_path.as_deref().map_or(true, is_blank) {
        return fail("Class roster (CSV path) must be specified");
    }
    if template.selection_blocks.is_empty() {
        return fail("Template must have at least one question selection block");
    }

    for (i, block) in template.selection_blocks.iter().enumerate() {
        if let Err(err) = validate_selection_block(block) {
            return fail(format!("Block {} ('{}'): {}", i + 1, block.title, err.reason));
        }
    }

    Ok(())
}
