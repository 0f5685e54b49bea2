// src/models/question.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::grading::CorrectAnswer;

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub letter: String,
    pub text: String,
}

/// Row shape of the 'questions' table joined with its category name.
/// Option rows are fetched separately and attached in `QuestionView`.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub text: String,
    pub explanation: Option<String>,
    pub points: i64,
    pub category: String,
    pub license_class: String,
    /// Set for single-answer questions.
    pub correct_option: Option<String>,
    /// Set for multi-answer questions.
    pub correct_options: Option<Vec<String>>,
}

impl QuestionRow {
    /// Answer key from the two mutually exclusive columns.
    pub fn answer_key(&self) -> CorrectAnswer {
        match &self.correct_options {
            Some(letters) => CorrectAnswer::multiple(letters),
            None => CorrectAnswer::single(self.correct_option.as_deref().unwrap_or_default()),
        }
    }
}

/// A question with its option rows attached.
#[derive(Debug, Clone)]
pub struct QuestionView {
    pub row: QuestionRow,
    pub options: Vec<QuestionOption>,
}

/// Wire shape of a question, matching the client contract:
/// `correctAnswer` is a letter or an array of letters, `multi` tells the
/// client which form controls to render.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: i64,
    pub text: String,
    pub explanation: Option<String>,
    pub points: i64,
    pub category: String,
    pub license_class: String,
    pub options: Vec<QuestionOption>,
    pub correct_answer: serde_json::Value,
    pub multi: bool,
}

impl From<QuestionView> for QuestionDto {
    fn from(view: QuestionView) -> Self {
        let key = view.row.answer_key();
        let (correct_answer, multi) = match &key {
            CorrectAnswer::Single(letter) => (serde_json::Value::String(letter.clone()), false),
            CorrectAnswer::Multiple(letters) => (
                serde_json::Value::Array(
                    letters
                        .iter()
                        .map(|l| serde_json::Value::String(l.clone()))
                        .collect(),
                ),
                true,
            ),
        };

        let mut options = view.options;
        options.sort_by(|a, b| a.letter.cmp(&b.letter));

        QuestionDto {
            id: view.row.id,
            text: view.row.text,
            explanation: view.row.explanation,
            points: view.row.points,
            category: view.row.category,
            license_class: view.row.license_class,
            options,
            correct_answer,
            multi,
        }
    }
}

/// Correct answer as submitted when creating or updating a question:
/// a bare letter, or an array of letters for multi-answer questions.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswerInput {
    Single(String),
    Multiple(Vec<String>),
}

/// DTO for creating or replacing a question together with its options.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(range(min = 1))]
    pub points: i64,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub correct_answer: CorrectAnswerInput,
    #[validate(custom(function = validate_options))]
    pub options: Vec<OptionInput>,
    pub license_class: Option<String>,
}

// The Validate derive attaches rejected field values to the error params,
// so option inputs must also be Serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionInput {
    pub letter: String,
    pub text: String,
}

fn validate_options(options: &[OptionInput]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    let mut letters = BTreeSet::new();
    for opt in options {
        if opt.letter.is_empty() || opt.text.is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_invalid"));
        }
        if !letters.insert(opt.letter.to_lowercase()) {
            return Err(validator::ValidationError::new("option_letter_duplicated"));
        }
    }
    Ok(())
}

impl UpsertQuestionRequest {
    pub fn answer_key(&self) -> CorrectAnswer {
        match &self.correct_answer {
            CorrectAnswerInput::Single(letter) => CorrectAnswer::single(letter),
            CorrectAnswerInput::Multiple(letters) => CorrectAnswer::multiple(letters),
        }
    }

    pub fn license_class_or_default(&self) -> String {
        self.license_class
            .as_deref()
            .unwrap_or("B")
            .to_uppercase()
    }

    /// The correct letter(s) must name letters that actually exist among
    /// the question's options.
    pub fn check_answer_letters(&self) -> Result<(), String> {
        let letters: BTreeSet<String> = self
            .options
            .iter()
            .map(|o| o.letter.to_lowercase())
            .collect();

        let covered = match self.answer_key() {
            CorrectAnswer::Single(letter) => letters.contains(&letter),
            CorrectAnswer::Multiple(key) => {
                !key.is_empty() && key.iter().all(|l| letters.contains(l))
            }
        };

        if covered {
            Ok(())
        } else {
            Err("Correct answer letters must match the question's options.".to_string())
        }
    }
}
