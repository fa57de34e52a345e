//! Questions, difficulty tiers and attached images.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Difficulty tier of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Every tier, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Case-insensitive lookup. Returns `None` for empty or unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::parse(s)
            .ok_or_else(|| format!("Invalid difficulty '{}': must be 'easy', 'medium', or 'hard'", s))
    }
}

/// Where an image is placed relative to the question prompt.
///
/// Unrecognised positions are kept verbatim in `Other` so that validation can
/// report them instead of failing at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImagePosition {
    Above,
    Below,
    Left,
    Right,
    Other(String),
}

impl ImagePosition {
    pub const VALID: [&'static str; 4] = ["above", "below", "left", "right"];

    pub fn as_str(&self) -> &str {
        match self {
            ImagePosition::Above => "above",
            ImagePosition::Below => "below",
            ImagePosition::Left => "left",
            ImagePosition::Right => "right",
            ImagePosition::Other(value) => value,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, ImagePosition::Other(_))
    }
}

impl Default for ImagePosition {
    fn default() -> Self {
        ImagePosition::Above
    }
}

impl From<String> for ImagePosition {
    fn from(value: String) -> Self {
        match value.as_str() {
            "above" => ImagePosition::Above,
            "below" => ImagePosition::Below,
            "left" => ImagePosition::Left,
            "right" => ImagePosition::Right,
            _ => ImagePosition::Other(value),
        }
    }
}

impl From<ImagePosition> for String {
    fn from(value: ImagePosition) -> Self {
        value.as_str().to_string()
    }
}

fn default_width_cm() -> f64 {
    10.0
}

/// Image attached to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionImage {
    /// Source path, or the run-relative name once relocated.
    pub path: String,
    /// Rendered width in centimetres.
    #[serde(default = "default_width_cm")]
    pub width_cm: f64,
    #[serde(default)]
    pub position: ImagePosition,
    /// Optional caption.
    #[serde(default)]
    pub description: Option<String>,
}

impl QuestionImage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            width_cm: default_width_cm(),
            position: ImagePosition::default(),
            description: None,
        }
    }
}

/// A question in the question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub prompt: String,
    /// Topic labels in display order. Accepts a comma-separated string on input.
    #[serde(deserialize_with = "topics_from_list_or_string")]
    pub topics: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_difficulty",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<QuestionImage>,
}

impl Question {
    pub fn new(
        question_id: impl Into<String>,
        prompt: impl Into<String>,
        topics: Vec<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            prompt: prompt.into(),
            topics,
            difficulty: None,
            notes: None,
            image: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_image(mut self, image: QuestionImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Case-insensitive topic membership.
    pub fn has_topic(&self, topic: &str) -> bool {
        let wanted = topic.to_lowercase();
        self.topics.iter().any(|t| t.to_lowercase() == wanted)
    }

    pub fn matches_difficulty(&self, difficulty: Difficulty) -> bool {
        self.difficulty == Some(difficulty)
    }

    /// Returns a copy whose image points at `path`. Questions without an image
    /// are returned unchanged.
    pub fn with_image_path(&self, path: impl Into<String>) -> Question {
        let mut updated = self.clone();
        if let Some(image) = updated.image.as_mut() {
            image.path = path.into();
        }
        updated
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TopicsInput {
    List(Vec<String>),
    Joined(String),
}

fn topics_from_list_or_string<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let topics = match TopicsInput::deserialize(deserializer)? {
        TopicsInput::List(list) => list,
        TopicsInput::Joined(joined) => joined
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
    };
    Ok(topics)
}

fn lenient_difficulty<'de, D>(deserializer: D) -> Result<Option<Difficulty>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Difficulty::parse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse(" easy "), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse(""), None);
        assert_eq!(Difficulty::parse("extreme"), None);
        assert!("medium".parse::<Difficulty>().is_ok());
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_has_topic_ignores_case() {
        let q = Question::new("Q1", "Solve x", vec!["Algebra".into(), "Linear".into()]);
        assert!(q.has_topic("algebra"));
        assert!(q.has_topic("LINEAR"));
        assert!(!q.has_topic("geometry"));
    }

    #[test]
    fn test_with_image_path_leaves_original_untouched() {
        let q = Question::new("Q1", "Look", vec!["Geo".into()])
            .with_image(QuestionImage::new("/data/img/triangle.png"));
        let moved = q.with_image_path("triangle.png");

        assert_eq!(moved.image.as_ref().map(|i| i.path.as_str()), Some("triangle.png"));
        assert_eq!(
            q.image.as_ref().map(|i| i.path.as_str()),
            Some("/data/img/triangle.png")
        );
    }

    #[test]
    fn test_deserialize_question_with_joined_topics() {
        let json = r#"{
            "question_id": "Q7",
            "prompt": "Define entropy",
            "topics": "physics, thermo",
            "difficulty": "Medium",
            "image": {"path": "e.png", "position": "sideways"}
        }"#;
        let q: Question = serde_json::from_str(json).expect("question should parse");

        assert_eq!(q.topics, vec!["physics".to_string(), "thermo".to_string()]);
        assert_eq!(q.difficulty, Some(Difficulty::Medium));
        let image = q.image.expect("image present");
        assert_eq!(image.width_cm, 10.0);
        assert_eq!(image.position, ImagePosition::Other("sideways".to_string()));
        assert!(!image.position.is_valid());
    }

    #[test]
    fn test_unknown_difficulty_loads_as_none() {
        let json = r#"{"question_id": "Q1", "prompt": "p", "topics": ["t"], "difficulty": "brutal"}"#;
        let q: Question = serde_json::from_str(json).expect("question should parse");
        assert_eq!(q.difficulty, None);
    }
}
