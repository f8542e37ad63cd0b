//! Quiz answer book for video tasks.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating the answer book.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Answer at index {index} has an empty title")]
    EmptyTitle { index: usize },

    #[error("Answer at index {index} ({title}) is empty")]
    EmptyAnswer { index: usize, title: String },

    #[error("Duplicate answer title found: {title}")]
    DuplicateTitle { title: String },

    #[error("Failed to read answers file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse answers file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A known answer for one quiz title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizAnswer {
    pub title: String,
    pub answer: String,
}

/// Answer book as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerBook {
    #[serde(default)]
    pub youtube_answers: Vec<QuizAnswer>,
}

impl AnswerBook {
    /// Loads the answer book from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AnswerError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the answer book to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), AnswerError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Finds the answer whose title matches exactly, ignoring case.
    #[must_use]
    pub fn lookup(&self, title: &str) -> Option<&str> {
        let wanted = title.to_lowercase();
        self.youtube_answers
            .iter()
            .find(|a| a.title.to_lowercase() == wanted)
            .map(|a| a.answer.as_str())
            .filter(|answer| !answer.trim().is_empty())
    }

    /// Returns the first validation problem, if any.
    pub fn validate(&self) -> Result<(), AnswerError> {
        self.validate_all().into_iter().next().map_or(Ok(()), Err)
    }

    /// Collects every validation problem.
    #[must_use]
    pub fn validate_all(&self) -> Vec<AnswerError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (index, entry) in self.youtube_answers.iter().enumerate() {
            if entry.title.trim().is_empty() {
                errors.push(AnswerError::EmptyTitle { index });
                continue;
            }
            if entry.answer.trim().is_empty() {
                errors.push(AnswerError::EmptyAnswer {
                    index,
                    title: entry.title.clone(),
                });
            }
            if !seen.insert(entry.title.to_lowercase()) {
                errors.push(AnswerError::DuplicateTitle {
                    title: entry.title.clone(),
                });
            }
        }

        errors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.youtube_answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.youtube_answers.is_empty()
    }

    /// Creates an example answer book.
    #[must_use]
    pub fn example() -> Self {
        Self {
            youtube_answers: vec![
                QuizAnswer {
                    title: "How To Earn Crypto".to_owned(),
                    answer: "DOGE".to_owned(),
                },
                QuizAnswer {
                    title: "What Is An Airdrop".to_owned(),
                    answer: "FREE".to_owned(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(entries: &[(&str, &str)]) -> AnswerBook {
        AnswerBook {
            youtube_answers: entries
                .iter()
                .map(|(t, a)| QuizAnswer {
                    title: (*t).to_owned(),
                    answer: (*a).to_owned(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        let book = book(&[("Crypto Basics", "WALLET")]);
        assert_eq!(book.lookup("crypto basics"), Some("WALLET"));
        assert_eq!(book.lookup("CRYPTO BASICS"), Some("WALLET"));
    }

    #[test]
    fn test_lookup_requires_exact_title() {
        let book = book(&[("Crypto Basics", "WALLET")]);
        assert_eq!(book.lookup("Crypto Basics 2"), None);
        assert_eq!(book.lookup("Crypto"), None);
    }

    #[test]
    fn test_lookup_skips_blank_answers() {
        let book = book(&[("Empty", ""), ("Spaces", " \t")]);
        assert_eq!(book.lookup("Empty"), None);
        assert_eq!(book.lookup("spaces"), None);
    }

    #[test]
    fn test_parse_file_format() {
        let json = r#"{"youtube_answers":[{"title":"A","answer":"B"}]}"#;
        let book: AnswerBook = serde_json::from_str(json).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.lookup("a"), Some("B"));
    }

    #[test]
    fn test_validation_duplicate_title() {
        let book = book(&[("Title", "x"), ("TITLE", "y")]);
        assert!(matches!(
            book.validate(),
            Err(AnswerError::DuplicateTitle { .. })
        ));
    }

    #[test]
    fn test_validation_empty_fields() {
        let book = book(&[("", "x"), ("Title", " ")]);
        let errors = book.validate_all();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], AnswerError::EmptyTitle { index: 0 }));
        assert!(matches!(errors[1], AnswerError::EmptyAnswer { index: 1, .. }));
    }

    #[test]
    fn test_example_is_valid() {
        assert!(AnswerBook::example().validate().is_ok());
    }
}
