// src/grading.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Answer key of a question: one letter, or the exact set of letters that
/// must all be selected. Letters are lowercased on construction so
/// comparisons use a single canonical case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectAnswer {
    Single(String),
    Multiple(BTreeSet<String>),
}

impl CorrectAnswer {
    pub fn single(letter: &str) -> Self {
        CorrectAnswer::Single(letter.to_lowercase())
    }

    pub fn multiple<I, S>(letters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CorrectAnswer::Multiple(
            letters
                .into_iter()
                .map(|l| l.as_ref().to_lowercase())
                .collect(),
        )
    }

    /// Canonical text form, used to snapshot the answer key into a detail
    /// row: the bare letter, or a sorted JSON array for multi-answer keys.
    pub fn canonical(&self) -> String {
        match self {
            CorrectAnswer::Single(letter) => letter.clone(),
            CorrectAnswer::Multiple(letters) => {
                let sorted: Vec<&String> = letters.iter().collect();
                serde_json::to_string(&sorted).unwrap_or_default()
            }
        }
    }
}

/// A user's answer to one question, as it arrives on the wire: a bare
/// letter for single-answer questions, or a checkbox map
/// (`{"a": true, "b": false}`) for multi-answer ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Single(String),
    Multiple(BTreeMap<String, bool>),
}

impl SubmittedAnswer {
    /// Letters the user actually checked, lowercased.
    fn selected_letters(&self) -> BTreeSet<String> {
        match self {
            SubmittedAnswer::Single(letter) => {
                let mut set = BTreeSet::new();
                set.insert(letter.to_lowercase());
                set
            }
            SubmittedAnswer::Multiple(boxes) => boxes
                .iter()
                .filter(|(_, checked)| **checked)
                .map(|(letter, _)| letter.to_lowercase())
                .collect(),
        }
    }

    /// Canonical serialization for storage: a bare letter, or the sorted
    /// JSON array of checked letters. `[c, a]` and `[a, c]` produce the
    /// same text, so round-tripping reproduces the set regardless of
    /// submission order.
    pub fn canonical(&self) -> String {
        match self {
            SubmittedAnswer::Single(letter) => letter.to_lowercase(),
            SubmittedAnswer::Multiple(_) => {
                let sorted: Vec<String> = self.selected_letters().into_iter().collect();
                serde_json::to_string(&sorted).unwrap_or_default()
            }
        }
    }
}

/// Outcome of evaluating one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    pub points_awarded: i64,
}

/// Evaluates one submitted answer against a question's answer key.
///
/// * Single-answer: correct iff the submitted letter equals the key.
/// * Multi-answer: correct iff the checked set equals the key set exactly.
///   No partial credit.
/// * Absent answer: incorrect, zero points, never an error.
pub fn evaluate_answer(
    correct: &CorrectAnswer,
    submitted: Option<&SubmittedAnswer>,
    points: i64,
) -> Verdict {
    let is_correct = match (correct, submitted) {
        (_, None) => false,
        (CorrectAnswer::Single(key), Some(SubmittedAnswer::Single(letter))) => {
            letter.to_lowercase() == *key
        }
        (CorrectAnswer::Single(_), Some(SubmittedAnswer::Multiple(_))) => false,
        (CorrectAnswer::Multiple(key), Some(answer)) => answer.selected_letters() == *key,
    };

    Verdict {
        is_correct,
        points_awarded: if is_correct { points } else { 0 },
    }
}

/// The grader's view of a question: just what it needs to score an answer.
#[derive(Debug, Clone)]
pub struct QuestionKey {
    pub id: i64,
    pub points: i64,
    pub correct: CorrectAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "Passed",
            TestStatus::Failed => "Failed",
        }
    }
}

/// Graded summary of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    pub score: i64,
    pub total_questions: i64,
    pub status: TestStatus,
}

/// Per-question record of what was answered and how it was graded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedDetail {
    pub question_id: i64,
    /// Canonical serialization of the submitted answer, `None` if unanswered.
    pub user_answer: Option<String>,
    /// Answer key the row was graded against, snapshotted at grading time.
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Grades a full test: folds `evaluate_answer` over the questions in the
/// order supplied, accumulating the score and building one detail row per
/// question. Answers keyed by an id not in `questions` are ignored;
/// questions with no answer entry are graded as unanswered.
pub fn grade_test(
    questions: &[QuestionKey],
    answers: &HashMap<i64, SubmittedAnswer>,
    pass_threshold: i64,
) -> (AttemptSummary, Vec<GradedDetail>) {
    let mut score = 0;
    let mut details = Vec::with_capacity(questions.len());

    for question in questions {
        let submitted = answers.get(&question.id);
        let verdict = evaluate_answer(&question.correct, submitted, question.points);
        score += verdict.points_awarded;

        details.push(GradedDetail {
            question_id: question.id,
            user_answer: submitted.map(SubmittedAnswer::canonical),
            correct_answer: question.correct.canonical(),
            is_correct: verdict.is_correct,
        });
    }

    let summary = AttemptSummary {
        score,
        total_questions: questions.len() as i64,
        status: if score >= pass_threshold {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        },
    };

    (summary, details)
}
