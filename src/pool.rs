//! The question pool document and its data model.
//!
//! The pool is a YAML list of exams. Each exam turns into one slash command at startup, and a
//! command invocation serves a random question from that exam.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Failures while loading the question pool document.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("question pool file not found at '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("failed reading question pool file")]
    Io(#[from] io::Error),
    #[error("failed parsing question pool YAML")]
    Parse(#[from] serde_yaml::Error),
}

/// One exam in the pool.
#[derive(Clone, Debug, Deserialize)]
pub struct Exam {
    /// Human-readable exam name, shown in question embed titles.
    pub meta_name: String,
    /// Longer description of what the exam covers.
    pub meta_description: String,
    /// Name of the slash command serving this exam. Unique across the pool, single token.
    pub command_name: String,
    /// Description shown in the Discord command picker.
    pub command_description: String,
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Question {
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Id of the correct entry in `choices`.
    pub correct_choice: u32,
    /// Optional rationale shown alongside the graded reply.
    #[serde(default)]
    pub explanation: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "multiple choice")]
    MultipleChoice,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    /// Unique within a question.
    pub id: u32,
    pub text: String,
}

impl Question {
    /// Text of the correct choice, if the pool entry is well formed.
    pub fn correct_choice_text(&self) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| choice.id == self.correct_choice)
            .map(|choice| choice.text.as_str())
    }
}

/// Load the question pool from the given YAML file.
///
/// Deliberately uncached: the pool is small and reads are rare, so every call re-reads and
/// re-parses the document. Command handlers therefore pick up pool edits without a restart.
pub fn load_pool(path: &Path) -> Result<Vec<Exam>, PoolError> {
    if !path.exists() {
        return Err(PoolError::NotFound(path.to_owned()));
    }

    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Find the exam registered under the given command name. Linear scan, first match wins.
pub fn lookup_exam<'a>(pool: &'a [Exam], command_name: &str) -> Option<&'a Exam> {
    pool.iter().find(|exam| exam.command_name == command_name)
}
