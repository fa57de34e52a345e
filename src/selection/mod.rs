//! Duplicate-avoiding question selection.
//!
//! A selection run walks a template's blocks in declaration order while
//! keeping a set of consumed question ids. Each block only draws from
//! questions not yet consumed, and everything it returns is consumed before
//! the next block runs, so no question appears twice in one student's
//! document. Every run starts from an empty consumed set.
//!
//! Random methods sample uniformly without replacement and silently yield
//! fewer questions when supply is short. Manual blocks skip ids that are
//! unknown or already consumed.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bank::QuestionBank;
use crate::error::SelectionError;
use crate::model::{Question, SelectionBlock, SelectionMethod};

/// Questions chosen for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSelection {
    pub title: String,
    pub questions: Vec<Question>,
}

impl BlockSelection {
    pub fn ids(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.question_id.as_str()).collect()
    }
}

/// Selects questions from a bank according to selection blocks.
pub struct QuestionSelector<'a> {
    bank: &'a QuestionBank,
    rng: ChaCha8Rng,
}

impl<'a> QuestionSelector<'a> {
    /// Creates a selector with a fresh random seed.
    pub fn new(bank: &'a QuestionBank) -> Self {
        Self::with_seed(bank, rand::random())
    }

    /// Creates a selector whose random choices are fixed by `seed`.
    pub fn with_seed(bank: &'a QuestionBank, seed: u64) -> Self {
        Self {
            bank,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Selects questions for a single block, skipping everything in `used_ids`.
    ///
    /// Blocks with missing parameters, reserved or unknown methods yield an
    /// empty list; rejecting them is the job of validation.
    pub fn select_for_block(
        &mut self,
        block: &SelectionBlock,
        used_ids: &HashSet<String>,
    ) -> Vec<Question> {
        match &block.method {
            SelectionMethod::Manual { question_ids } => self.select_manual(question_ids, used_ids),
            SelectionMethod::RandomAll { quantity: Some(q) } => {
                self.sample(*q, used_ids, |_| true)
            }
            SelectionMethod::RandomTopic {
                quantity: Some(q),
                topic: Some(topic),
            } => self.sample(*q, used_ids, |question| question.has_topic(topic)),
            SelectionMethod::RandomDifficulty {
                quantity: Some(q),
                difficulty: Some(difficulty),
            } => {
                let difficulty = *difficulty;
                self.sample(*q, used_ids, |question| question.matches_difficulty(difficulty))
            }
            _ => Vec::new(),
        }
    }

    /// Runs every block in order with one consumed set.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::InconsistentBank`] if a block would hand out a
    /// question id that is already consumed, which only happens when the bank
    /// holds several questions under the same id.
    pub fn select(
        &mut self,
        blocks: &[SelectionBlock],
    ) -> Result<Vec<BlockSelection>, SelectionError> {
        let mut used_ids: HashSet<String> = HashSet::new();
        let mut result = Vec::with_capacity(blocks.len());

        for block in blocks {
            let questions = self.select_for_block(block, &used_ids);

            for q in &questions {
                if !used_ids.insert(q.question_id.clone()) {
                    return Err(SelectionError::InconsistentBank(format!(
                        "question '{}' was selected twice (block '{}')",
                        q.question_id, block.title
                    )));
                }
            }

            debug!(
                block = %block.title,
                method = block.method.tag(),
                selected = questions.len(),
                "Block selected"
            );

            result.push(BlockSelection {
                title: block.title.clone(),
                questions,
            });
        }

        Ok(result)
    }

    fn select_manual(&self, question_ids: &[String], used_ids: &HashSet<String>) -> Vec<Question> {
        // an id listed twice in one block is consumed by its first occurrence
        let mut listed: HashSet<&str> = HashSet::new();
        question_ids
            .iter()
            .filter(|id| !used_ids.contains(id.as_str()) && listed.insert(id.as_str()))
            .filter_map(|id| self.bank.get(id))
            .cloned()
            .collect()
    }

    fn sample<F>(&mut self, quantity: i64, used_ids: &HashSet<String>, filter: F) -> Vec<Question>
    where
        F: Fn(&Question) -> bool,
    {
        let mut available: Vec<&Question> = self
            .bank
            .iter()
            .filter(|q| !used_ids.contains(&q.question_id) && filter(*q))
            .collect();

        let sample_size = usize::try_from(quantity).unwrap_or(0).min(available.len());
        if sample_size == 0 {
            return Vec::new();
        }

        available.shuffle(&mut self.rng);
        available.truncate(sample_size);
        available.into_iter().cloned().collect()
    }
}

/// Selects questions for all blocks of a template for one student.
pub fn select_for_template(
    bank: &QuestionBank,
    blocks: &[SelectionBlock],
) -> Result<Vec<BlockSelection>, SelectionError> {
    QuestionSelector::new(bank).select(blocks)
}
