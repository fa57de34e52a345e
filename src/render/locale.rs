//! Document languages and their label sets.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Language used for the fixed labels and the date of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    PtBr,
}

const PT_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Fixed strings printed by the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub course: String,
    pub professor: String,
    pub student: String,
    pub id: String,
    pub date: String,
    pub question: String,
    /// Joins the current and last page numbers ("3 of 5").
    pub page_of: String,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::PtBr => "pt_br",
        }
    }

    /// Accepts `en`, `pt_br`, `pt-BR`, `pt` and similar spellings.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        if value.starts_with("pt") {
            Some(Locale::PtBr)
        } else if value.starts_with("en") {
            Some(Locale::En)
        } else {
            None
        }
    }

    /// Detects the language from `LC_ALL`, `LC_MESSAGES` and `LANG`, in that
    /// order. The first variable that is set decides; Portuguese locales map
    /// to [`Locale::PtBr`], everything else to [`Locale::En`].
    pub fn detect() -> Self {
        Self::detect_from(|key| std::env::var(key).ok())
    }

    fn detect_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.is_empty())
            .map(|value| {
                if value.to_lowercase().starts_with("pt") {
                    Locale::PtBr
                } else {
                    Locale::En
                }
            })
            .unwrap_or_default()
    }

    /// The `babel` package option for this language.
    pub fn babel_language(&self) -> &'static str {
        match self {
            Locale::En => "english",
            Locale::PtBr => "brazilian",
        }
    }

    pub fn labels(&self) -> Labels {
        let (course, professor, student, id, date, question, page_of) = match self {
            Locale::En => ("Course", "Professor", "Student", "ID", "Date", "Question", "of"),
            Locale::PtBr => (
                "Disciplina",
                "Professor",
                "Aluno",
                "Matrícula",
                "Data",
                "Questão",
                "de",
            ),
        };
        Labels {
            course: course.to_string(),
            professor: professor.to_string(),
            student: student.to_string(),
            id: id.to_string(),
            date: date.to_string(),
            question: question.to_string(),
            page_of: page_of.to_string(),
        }
    }

    /// Long-form date: `March 05, 2024` or `05 de março de 2024`.
    pub fn format_date(&self, date: NaiveDate) -> String {
        match self {
            Locale::En => date.format("%B %d, %Y").to_string(),
            Locale::PtBr => format!(
                "{:02} de {} de {}",
                date.day(),
                PT_MONTHS[date.month0() as usize],
                date.year()
            ),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::parse(s).ok_or_else(|| format!("Unsupported locale '{}': expected 'en' or 'pt_br'", s))
    }
}
