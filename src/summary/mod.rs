//! Compact encoding of what was selected for a student.
//!
//! The blocks summary is a `;`-joined list of `<title>:<method>:<count>`
//! triples. Together with the student and run ids it forms the verification
//! payload `S:<student_id>|R:<run_id>|B:<blocks_summary>` embedded in every
//! generated document. Downstream scanners parse this string, so its shape
//! must not change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{SelectionBlock, SelectionMethod};
use crate::selection::BlockSelection;

/// Removes the encoding's separators (`:` and `;`) and surrounding whitespace.
pub fn sanitize_title(title: &str) -> String {
    title.replace([':', ';'], "").trim().to_string()
}

/// Shortens `random_*` method tags to `rnd_*`; other tags pass through.
pub fn short_method(tag: &str) -> String {
    tag.replace("random_", "rnd_")
}

/// Count reported for a block: the yielded count for manual blocks, the
/// configured quantity otherwise. A block without a quantity reports `None`.
fn block_count(block: &SelectionBlock, selection: &BlockSelection) -> String {
    match &block.method {
        SelectionMethod::Manual { .. } => selection.questions.len().to_string(),
        method => match method.quantity() {
            Some(quantity) => quantity.to_string(),
            None => "None".to_string(),
        },
    }
}

/// Encodes the blocks summary for one student.
///
/// Blocks and selections are paired positionally; extra entries on either
/// side are ignored.
pub fn summarize_blocks(blocks: &[SelectionBlock], selections: &[BlockSelection]) -> String {
    blocks
        .iter()
        .zip(selections)
        .map(|(block, selection)| {
            format!(
                "{}:{}:{}",
                sanitize_title(&block.title),
                short_method(block.method.tag()),
                block_count(block, selection)
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Identifies which student, run and selection produced a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPayload {
    pub student_id: String,
    pub run_id: String,
    pub blocks: String,
}

impl VerificationPayload {
    pub fn new(
        student_id: impl Into<String>,
        run_id: impl Into<String>,
        blocks: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            run_id: run_id.into(),
            blocks: blocks.into(),
        }
    }

    /// Builds the payload straight from a student's selection results.
    pub fn from_selection(
        student_id: impl Into<String>,
        run_id: impl Into<String>,
        blocks: &[SelectionBlock],
        selections: &[BlockSelection],
    ) -> Self {
        Self::new(student_id, run_id, summarize_blocks(blocks, selections))
    }
}

impl fmt::Display for VerificationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S:{}|R:{}|B:{}", self.student_id, self.run_id, self.blocks)
    }
}
