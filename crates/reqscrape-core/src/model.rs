use serde::{Deserialize, Serialize};

/// Spreadsheet column titles, in output order.
pub const COLUMNS: [&str; 4] = ["Document", "Heading 1", "Heading 2", "Requirement Text"];

/// A located occurrence of a pattern in a document-wide text buffer.
///
/// Offsets are byte positions into the same flattened text, so heading and
/// requirement matches from one document are directly comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextMatch {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// One spreadsheet row: a requirement attributed to the section it falls under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRow {
    pub document: String,
    pub heading: String,
    /// Second heading level. Headings are not nested, so this stays empty.
    #[serde(default)]
    pub subheading: String,
    pub requirement: String,
}

impl RequirementRow {
    pub fn new(document: &str, heading: &str, requirement: &str) -> Self {
        Self {
            document: document.to_string(),
            heading: heading.to_string(),
            subheading: String::new(),
            requirement: requirement.to_string(),
        }
    }

    /// Cell values in column order.
    pub fn cells(&self) -> [&str; 4] {
        [
            &self.document,
            &self.heading,
            &self.subheading,
            &self.requirement,
        ]
    }
}

/// What to do with requirements that start before the first heading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreamblePolicy {
    #[default]
    Drop,
    /// Emit them under a synthetic heading with this label.
    Attribute(String),
}

/// A document that could not be processed; the rest of the batch continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document: String,
    pub reason: String,
}
