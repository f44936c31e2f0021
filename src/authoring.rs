//! The lecture-editing draft: local state guarded before submission.
//!
//! A lecture is either a video lecture or an embedded test, never both. The
//! draft keeps the author's edits for both sides at once so nothing is lost
//! while toggling, and only enforces exclusivity when the update body is
//! built. Question edits go through methods that hold the choice-type
//! invariant (at least two options) as a precondition, not a cleanup.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::api::media::VideoInfo;

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerType {
    /// Free text.
    #[default]
    Text,
    /// Exactly one of the listed options.
    SingleChoice,
    /// Any subset of the listed options.
    MultipleChoice,
}

impl AnswerType {
    /// Whether this type presents options to pick from.
    #[must_use]
    pub const fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }
}

/// One test question, as embedded in a lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub answer_type: AnswerType,
    /// Meaningful for choice types; kept verbatim across type toggles so a
    /// round trip loses nothing.
    pub options: Vec<String>,
    /// Empty means ungraded, which is a valid submitted state.
    pub correct_answer: String,
}

impl Default for Question {
    fn default() -> Self {
        Self {
            question_text: String::new(),
            answer_type: AnswerType::Text,
            options: vec![String::new(), String::new()],
            correct_answer: String::new(),
        }
    }
}

/// Draft-editing and submission-validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthoringError {
    #[error("no question at index {0}")]
    UnknownQuestion(usize),

    #[error("question {question} has no option at index {option}")]
    UnknownOption { question: usize, option: usize },

    #[error("question {0} needs at least two options; removal refused")]
    MinimumOptions(usize),

    #[error("question {0}: the correct answer must be one of the options")]
    CorrectAnswerNotAnOption(usize),

    #[error("a test needs at least one question")]
    NoQuestions,
}

/// An editable lecture, video fields and test fields side by side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LectureDraft {
    pub lecture_title: String,
    pub is_preview_free: bool,
    pub video_info: Option<VideoInfo>,
    pub is_test: bool,
    /// Minutes; only submitted for tests.
    pub test_duration: Option<u32>,
    pub test_instructions: String,
    questions: Vec<Question>,
}

impl LectureDraft {
    /// An empty video-lecture draft.
    #[must_use]
    pub fn new(lecture_title: impl Into<String>) -> Self {
        Self {
            lecture_title: lecture_title.into(),
            ..Self::default()
        }
    }

    /// Rehydrates a draft from a fetched lecture document. Unknown or
    /// malformed fields fall back to the empty draft's values.
    #[must_use]
    pub fn from_lecture(lecture: &Value) -> Self {
        let questions = lecture
            .get("questions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            lecture_title: string_field(lecture, "lectureTitle"),
            is_preview_free: bool_field(lecture, "isPreviewFree"),
            video_info: lecture
                .get("videoInfo")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            is_test: bool_field(lecture, "isTest"),
            test_duration: lecture
                .get("testDuration")
                .and_then(Value::as_u64)
                .and_then(|minutes| u32::try_from(minutes).ok()),
            test_instructions: string_field(lecture, "testInstructions"),
            questions,
        }
    }

    /// The questions, read-only. Edits go through the draft methods.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Appends a fresh default question and returns its index.
    pub fn add_question(&mut self) -> usize {
        self.questions.push(Question::default());
        self.questions.len() - 1
    }

    /// Removes a question outright.
    pub fn remove_question(&mut self, index: usize) -> Result<(), AuthoringError> {
        if index >= self.questions.len() {
            return Err(AuthoringError::UnknownQuestion(index));
        }
        self.questions.remove(index);
        Ok(())
    }

    /// Sets a question's prompt.
    pub fn set_question_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), AuthoringError> {
        self.question_mut(index)?.question_text = text.into();
        Ok(())
    }

    /// Switches how a question is answered.
    ///
    /// Options are left exactly as they are, whichever direction the switch
    /// goes, so toggling away from a choice type and back loses nothing.
    pub fn set_answer_type(
        &mut self,
        index: usize,
        answer_type: AnswerType,
    ) -> Result<(), AuthoringError> {
        self.question_mut(index)?.answer_type = answer_type;
        Ok(())
    }

    /// Appends an empty option to a question.
    pub fn add_option(&mut self, index: usize) -> Result<usize, AuthoringError> {
        let question = self.question_mut(index)?;
        question.options.push(String::new());
        Ok(question.options.len() - 1)
    }

    /// Rewrites one option's text.
    pub fn set_option(
        &mut self,
        index: usize,
        option: usize,
        text: impl Into<String>,
    ) -> Result<(), AuthoringError> {
        let question = self.question_mut(index)?;
        let slot = question
            .options
            .get_mut(option)
            .ok_or(AuthoringError::UnknownOption {
                question: index,
                option,
            })?;
        *slot = text.into();
        Ok(())
    }

    /// Removes an option. Refused while the question has only two: choice
    /// questions must keep at least two options, and dropping below the
    /// floor is checked here, before anything is mutated.
    pub fn remove_option(&mut self, index: usize, option: usize) -> Result<(), AuthoringError> {
        let question = self.question_mut(index)?;
        if option >= question.options.len() {
            return Err(AuthoringError::UnknownOption {
                question: index,
                option,
            });
        }
        if question.options.len() <= 2 {
            return Err(AuthoringError::MinimumOptions(index));
        }
        question.options.remove(option);
        Ok(())
    }

    /// Sets a question's correct answer. Empty marks it ungraded.
    pub fn set_correct_answer(
        &mut self,
        index: usize,
        answer: impl Into<String>,
    ) -> Result<(), AuthoringError> {
        self.question_mut(index)?.correct_answer = answer.into();
        Ok(())
    }

    /// Builds the `updateLecture` request body, validating the draft and
    /// enforcing sub-model exclusivity: a test submits no video, a video
    /// lecture submits no test fields and an empty question list.
    pub fn submission_body(&self) -> Result<Value, AuthoringError> {
        if self.is_test {
            self.validate_questions()?;
        }

        let video_info = if self.is_test {
            Value::Null
        } else {
            self.video_info
                .as_ref()
                .map_or(Value::Null, |info| json!(info))
        };

        Ok(json!({
            "lectureTitle": self.lecture_title,
            "videoInfo": video_info,
            "isPreviewFree": self.is_preview_free,
            "isTest": self.is_test,
            "testDuration": if self.is_test { json!(self.test_duration) } else { Value::Null },
            "testInstructions": if self.is_test {
                json!(self.test_instructions)
            } else {
                Value::Null
            },
            "questions": if self.is_test { json!(self.questions) } else { json!([]) },
        }))
    }

    fn validate_questions(&self) -> Result<(), AuthoringError> {
        if self.questions.is_empty() {
            return Err(AuthoringError::NoQuestions);
        }
        for (index, question) in self.questions.iter().enumerate() {
            if question.answer_type.is_choice()
                && !question.correct_answer.is_empty()
                && !question.options.contains(&question.correct_answer)
            {
                return Err(AuthoringError::CorrectAnswerNotAnOption(index));
            }
        }
        Ok(())
    }

    fn question_mut(&mut self, index: usize) -> Result<&mut Question, AuthoringError> {
        self.questions
            .get_mut(index)
            .ok_or(AuthoringError::UnknownQuestion(index))
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn bool_field(value: &Value, field: &str) -> bool {
    value.get(field).and_then(Value::as_bool).unwrap_or(false)
}
