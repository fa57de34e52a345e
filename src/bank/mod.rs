//! In-memory question bank.
//!
//! The bank is materialized once per run from a question repository and is
//! shared read-only by every student's selection.

use std::collections::{BTreeSet, HashMap};

use crate::model::{Difficulty, Question};

/// The complete set of questions available to a run.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
    by_id: HashMap<String, usize>,
}

impl QuestionBank {
    /// Builds a bank preserving the given order. If two questions share an id,
    /// lookups by id resolve to the later one.
    pub fn new(questions: Vec<Question>) -> Self {
        let by_id = questions
            .iter()
            .enumerate()
            .map(|(idx, q)| (q.question_id.clone(), idx))
            .collect();
        Self { questions, by_id }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn get(&self, question_id: &str) -> Option<&Question> {
        self.by_id.get(question_id).map(|&idx| &self.questions[idx])
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.by_id.contains_key(question_id)
    }

    /// Ids that appear more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for q in &self.questions {
            if !seen.insert(q.question_id.as_str()) && !duplicates.contains(&q.question_id) {
                duplicates.push(q.question_id.clone());
            }
        }
        duplicates
    }

    /// Sorted unique topic labels across the bank.
    pub fn topics(&self) -> Vec<String> {
        self.questions
            .iter()
            .flat_map(|q| q.topics.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn by_topic(&self, topic: &str) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.has_topic(topic)).collect()
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.matches_difficulty(difficulty))
            .collect()
    }
}

impl From<Vec<Question>> for QuestionBank {
    fn from(questions: Vec<Question>) -> Self {
        Self::new(questions)
    }
}
