//! The value handed to a document renderer for one student.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::locale::{Labels, Locale};
use crate::model::{AssessmentTemplate, Question, QuestionImage, Student};
use crate::selection::BlockSelection;
use crate::summary::VerificationPayload;

/// Key under which the relocated logo name is exposed in `course_info`.
pub const LOGO_KEY: &str = "logo_path";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSettings {
    pub document_title: String,
    pub filename_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub student_name: String,
    pub student_id: String,
}

/// A question as layouts see it. Absent fields are serialized as `null` so
/// that layouts can test them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderQuestion {
    pub question_id: String,
    pub prompt: String,
    pub topics: Vec<String>,
    pub difficulty: Option<String>,
    pub image: Option<QuestionImage>,
}

impl From<&Question> for RenderQuestion {
    fn from(question: &Question) -> Self {
        Self {
            question_id: question.question_id.clone(),
            prompt: question.prompt.clone(),
            topics: question.topics.clone(),
            difficulty: question.difficulty.map(|d| d.as_str().to_string()),
            image: question.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderBlock {
    pub title: String,
    pub questions: Vec<RenderQuestion>,
}

impl From<&BlockSelection> for RenderBlock {
    fn from(selection: &BlockSelection) -> Self {
        Self {
            title: selection.title.clone(),
            questions: selection.questions.iter().map(RenderQuestion::from).collect(),
        }
    }
}

/// Everything a layout can reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    pub document_settings: DocumentSettings,
    pub course_info: BTreeMap<String, String>,
    pub student: StudentInfo,
    pub question_blocks: Vec<RenderBlock>,
    pub generation_date: String,
    /// The verification payload, `S:<id>|R:<run>|B:<blocks>`.
    pub qr_data: String,
    pub babel_lang: String,
    pub labels: Labels,
}

impl RenderContext {
    pub fn new(
        template: &AssessmentTemplate,
        student: &Student,
        selections: &[BlockSelection],
        payload: &VerificationPayload,
        locale: Locale,
        date: NaiveDate,
    ) -> Self {
        Self {
            document_settings: DocumentSettings {
                document_title: template.document_title.clone(),
                filename_prefix: template.filename_prefix.clone(),
            },
            course_info: template.course_info.clone(),
            student: StudentInfo {
                student_name: student.student_name.clone(),
                student_id: student.student_id.clone(),
            },
            question_blocks: selections.iter().map(RenderBlock::from).collect(),
            generation_date: locale.format_date(date),
            qr_data: payload.to_string(),
            babel_lang: locale.babel_language().to_string(),
            labels: locale.labels(),
        }
    }

    /// Exposes a relocated logo as `course_info.logo_path`.
    pub fn with_logo(mut self, logo: Option<&str>) -> Self {
        if let Some(logo) = logo {
            self.course_info.insert(LOGO_KEY.to_string(), logo.to_string());
        }
        self
    }

    pub fn question_count(&self) -> usize {
        self.question_blocks.iter().map(|b| b.questions.len()).sum()
    }
}
