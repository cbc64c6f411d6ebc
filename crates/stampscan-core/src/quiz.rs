//! # Quiz Gate
//!
//! Records returned by the payload resolver and the pure answer check that
//! gates the stamp.
//!
//! ## Wire Shape
//! ```json
//! {
//!   "stampNo": "QR-ABC-001",
//!   "quizDto": {
//!     "quizNo": 7,
//!     "quizText": "Which river runs through the city?",
//!     "option1": "...", "option2": "...", "option3": "...", "option4": "...",
//!     "answerNo": 2,
//!     "explanation": "..."
//!   },
//!   "stampName": "anything else is kept as-is"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::ValidationResult;
use crate::validation::{validate_choice, OPTION_COUNT};

// =============================================================================
// Stamp Record
// =============================================================================

/// Quiz attached to a stamp, as the backend sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDto {
    pub quiz_no: i64,
    pub quiz_text: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
    /// 1-based index of the correct option.
    pub answer_no: usize,
    #[serde(default)]
    pub explanation: String,
}

/// A stamp as returned by the payload resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampRecord {
    /// The decoded payload this stamp is registered under.
    pub stamp_no: String,

    /// The quiz guarding the stamp, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_dto: Option<QuizDto>,

    /// Fields we do not interpret, passed through to the host.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StampRecord {
    /// Creates a record with no quiz and no extra fields.
    pub fn new(stamp_no: impl Into<String>) -> Self {
        StampRecord {
            stamp_no: stamp_no.into(),
            quiz_dto: None,
            extra: Map::new(),
        }
    }

    /// Attaches a quiz.
    pub fn with_quiz(mut self, quiz: QuizDto) -> Self {
        self.quiz_dto = Some(quiz);
        self
    }
}

// =============================================================================
// Quiz Card
// =============================================================================

/// Display form of a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuizCard {
    pub id: i64,
    pub question: String,
    pub options: [String; OPTION_COUNT],
    /// 1-based index of the correct option.
    pub answer: usize,
    pub explanation: String,
}

/// Result of checking one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnswerVerdict {
    pub correct: bool,
    pub correct_option: String,
    pub explanation: String,
}

impl From<&QuizDto> for QuizCard {
    fn from(dto: &QuizDto) -> Self {
        QuizCard {
            id: dto.quiz_no,
            question: dto.quiz_text.clone(),
            options: [
                dto.option1.clone(),
                dto.option2.clone(),
                dto.option3.clone(),
                dto.option4.clone(),
            ],
            answer: dto.answer_no,
            explanation: dto.explanation.clone(),
        }
    }
}

impl QuizCard {
    /// Builds a card from a resolved stamp. `None` if the stamp has no quiz.
    pub fn from_record(record: &StampRecord) -> Option<Self> {
        record.quiz_dto.as_ref().map(QuizCard::from)
    }

    /// Text of the correct option. Empty if the answer index is out of range.
    pub fn correct_option(&self) -> &str {
        self.answer
            .checked_sub(1)
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Checks a 1-based choice.
    pub fn check(&self, choice: usize) -> ValidationResult<AnswerVerdict> {
        let choice = validate_choice(choice)?;
        Ok(AnswerVerdict {
            correct: choice == self.answer,
            correct_option: self.correct_option().to_string(),
            explanation: self.explanation.clone(),
        })
    }
}
