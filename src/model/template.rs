//! Assessment templates and their question selection blocks.
//!
//! On disk a selection block is a flat record (`title`, `method`, and whichever
//! of `quantity`, `topic`, `difficulty`, `question_ids` apply). In memory the
//! method tag and its parameters are one closed enum, [`SelectionMethod`], so
//! selection and validation match on a single value instead of strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::question::Difficulty;

/// How a block picks its questions.
///
/// Parameters are optional so that incomplete blocks can be loaded and then
/// reported by validation; selection treats a missing parameter as "nothing
/// to select".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMethod {
    /// Explicit question ids, in order.
    Manual { question_ids: Vec<String> },
    /// Uniform sample from the whole bank.
    RandomAll { quantity: Option<i64> },
    /// Uniform sample among questions carrying `topic`.
    RandomTopic {
        quantity: Option<i64>,
        topic: Option<String>,
    },
    /// Uniform sample among questions of one difficulty tier.
    RandomDifficulty {
        quantity: Option<i64>,
        difficulty: Option<Difficulty>,
    },
    /// Reserved. Never satisfiable.
    RandomType { quantity: Option<i64> },
    /// A method tag this version does not know.
    Unknown { method: String, quantity: Option<i64> },
}

impl SelectionMethod {
    pub const MANUAL: &'static str = "manual";
    pub const RANDOM_ALL: &'static str = "random_all";
    pub const RANDOM_TOPIC: &'static str = "random_topic";
    pub const RANDOM_DIFFICULTY: &'static str = "random_difficulty";
    pub const RANDOM_TYPE: &'static str = "random_type";

    /// The on-disk method tag.
    pub fn tag(&self) -> &str {
        match self {
            SelectionMethod::Manual { .. } => Self::MANUAL,
            SelectionMethod::RandomAll { .. } => Self::RANDOM_ALL,
            SelectionMethod::RandomTopic { .. } => Self::RANDOM_TOPIC,
            SelectionMethod::RandomDifficulty { .. } => Self::RANDOM_DIFFICULTY,
            SelectionMethod::RandomType { .. } => Self::RANDOM_TYPE,
            SelectionMethod::Unknown { method, .. } => method,
        }
    }

    /// The configured quantity, if the method carries one.
    pub fn quantity(&self) -> Option<i64> {
        match self {
            SelectionMethod::Manual { .. } => None,
            SelectionMethod::RandomAll { quantity }
            | SelectionMethod::RandomTopic { quantity, .. }
            | SelectionMethod::RandomDifficulty { quantity, .. }
            | SelectionMethod::RandomType { quantity }
            | SelectionMethod::Unknown { quantity, .. } => *quantity,
        }
    }
}

/// A named request contributing a subset of questions to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BlockRecord", into = "BlockRecord")]
pub struct SelectionBlock {
    pub title: String,
    pub method: SelectionMethod,
}

impl SelectionBlock {
    pub fn new(title: impl Into<String>, method: SelectionMethod) -> Self {
        Self {
            title: title.into(),
            method,
        }
    }

    pub fn manual<I, S>(title: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            title,
            SelectionMethod::Manual {
                question_ids: ids.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn random_all(title: impl Into<String>, quantity: i64) -> Self {
        Self::new(
            title,
            SelectionMethod::RandomAll {
                quantity: Some(quantity),
            },
        )
    }

    pub fn random_topic(title: impl Into<String>, topic: impl Into<String>, quantity: i64) -> Self {
        Self::new(
            title,
            SelectionMethod::RandomTopic {
                quantity: Some(quantity),
                topic: Some(topic.into()),
            },
        )
    }

    pub fn random_difficulty(title: impl Into<String>, difficulty: Difficulty, quantity: i64) -> Self {
        Self::new(
            title,
            SelectionMethod::RandomDifficulty {
                quantity: Some(quantity),
                difficulty: Some(difficulty),
            },
        )
    }
}

/// Flat on-disk shape of a selection block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BlockRecord {
    title: String,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    question_ids: Vec<String>,
}

impl From<BlockRecord> for SelectionBlock {
    fn from(record: BlockRecord) -> Self {
        let BlockRecord {
            title,
            method,
            quantity,
            topic,
            difficulty,
            question_ids,
        } = record;

        let method = match method.as_str() {
            SelectionMethod::MANUAL => SelectionMethod::Manual {
                question_ids: question_ids
                    .into_iter()
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect(),
            },
            SelectionMethod::RANDOM_ALL => SelectionMethod::RandomAll { quantity },
            SelectionMethod::RANDOM_TOPIC => SelectionMethod::RandomTopic { quantity, topic },
            SelectionMethod::RANDOM_DIFFICULTY => SelectionMethod::RandomDifficulty {
                quantity,
                difficulty: difficulty.as_deref().and_then(Difficulty::parse),
            },
            SelectionMethod::RANDOM_TYPE => SelectionMethod::RandomType { quantity },
            _ => SelectionMethod::Unknown { method, quantity },
        };

        SelectionBlock { title, method }
    }
}

impl From<SelectionBlock> for BlockRecord {
    fn from(block: SelectionBlock) -> Self {
        let mut record = BlockRecord {
            title: block.title,
            method: block.method.tag().to_string(),
            quantity: block.method.quantity(),
            ..Default::default()
        };
        match block.method {
            SelectionMethod::Manual { question_ids } => record.question_ids = question_ids,
            SelectionMethod::RandomTopic { topic, .. } => record.topic = topic,
            SelectionMethod::RandomDifficulty { difficulty, .. } => {
                record.difficulty = difficulty.map(|d| d.as_str().to_string())
            }
            _ => {}
        }
        record
    }
}

/// An assessment template: document settings, course info, and the ordered
/// selection blocks applied to every student of a roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TemplateRecord", into = "TemplateRecord")]
pub struct AssessmentTemplate {
    pub name: String,
    pub document_title: String,
    /// Leading part of every output file name.
    pub filename_prefix: String,
    pub course_info: BTreeMap<String, String>,
    pub selection_blocks: Vec<SelectionBlock>,
    pub logo_path: Option<String>,
    /// Reference to the class roster this template is generated for.
    pub roster_path: Option<String>,
}

impl AssessmentTemplate {
    pub fn new(
        name: impl Into<String>,
        document_title: impl Into<String>,
        filename_prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            document_title: document_title.into(),
            filename_prefix: filename_prefix.into(),
            course_info: BTreeMap::new(),
            selection_blocks: Vec::new(),
            logo_path: None,
            roster_path: None,
        }
    }

    pub fn with_block(mut self, block: SelectionBlock) -> Self {
        self.selection_blocks.push(block);
        self
    }

    pub fn with_course_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.course_info.insert(key.into(), value.into());
        self
    }

    pub fn with_roster(mut self, roster: impl Into<String>) -> Self {
        self.roster_path = Some(roster.into());
        self
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo_path = Some(logo.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentSettingsRecord {
    #[serde(default)]
    document_title: String,
    #[serde(default = "default_filename_prefix")]
    filename_prefix: String,
}

impl Default for DocumentSettingsRecord {
    fn default() -> Self {
        Self {
            document_title: String::new(),
            filename_prefix: default_filename_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StudentInfoRecord {
    #[serde(default)]
    csv_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QuestionSelectionRecord {
    #[serde(default)]
    blocks: Vec<SelectionBlock>,
}

/// Nested on-disk shape of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TemplateRecord {
    #[serde(default = "default_template_name")]
    name: String,
    #[serde(default)]
    document_settings: DocumentSettingsRecord,
    #[serde(default)]
    course_info: BTreeMap<String, String>,
    #[serde(default)]
    student_info: StudentInfoRecord,
    #[serde(default)]
    question_selection: QuestionSelectionRecord,
    #[serde(default)]
    logo_path: Option<String>,
}

fn default_template_name() -> String {
    "Unnamed Template".to_string()
}

fn default_filename_prefix() -> String {
    "assessment".to_string()
}

impl From<TemplateRecord> for AssessmentTemplate {
    fn from(record: TemplateRecord) -> Self {
        Self {
            name: record.name,
            document_title: record.document_settings.document_title,
            filename_prefix: record.document_settings.filename_prefix,
            course_info: record.course_info,
            selection_blocks: record.question_selection.blocks,
            logo_path: record.logo_path,
            roster_path: record.student_info.csv_path,
        }
    }
}

impl From<AssessmentTemplate> for TemplateRecord {
    fn from(template: AssessmentTemplate) -> Self {
        Self {
            name: template.name,
            document_settings: DocumentSettingsRecord {
                document_title: template.document_title,
                filename_prefix: template.filename_prefix,
            },
            course_info: template.course_info,
            student_info: StudentInfoRecord {
                csv_path: template.roster_path,
            },
            question_selection: QuestionSelectionRecord {
                blocks: template.selection_blocks,
            },
            logo_path: template.logo_path,
        }
    }
}
