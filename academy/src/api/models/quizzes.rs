//! API request/response models for quizzes.
//!
//! Student-facing question options never carry the `is_correct` flag.

use crate::db::models::quizzes::{GradedAnswer, QuizAttemptDBResponse, QuizWithQuestions};
use crate::types::{ModuleId, OptionId, QuestionId, QuizId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizOptionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: OptionId,
    pub option_text: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: QuestionId,
    pub question_text: String,
    pub order_index: i32,
    pub options: Vec<QuizOptionResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: QuizId,
    #[schema(value_type = String, format = "uuid")]
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: i32,
    pub questions: Vec<QuizQuestionResponse>,
}

impl From<QuizWithQuestions> for QuizResponse {
    fn from(q: QuizWithQuestions) -> Self {
        Self {
            id: q.quiz.id,
            module_id: q.quiz.module_id,
            title: q.quiz.title,
            description: q.quiz.description,
            passing_score: q.quiz.passing_score,
            questions: q
                .questions
                .into_iter()
                .map(|qw| QuizQuestionResponse {
                    id: qw.question.id,
                    question_text: qw.question.question_text,
                    order_index: qw.question.order_index,
                    options: qw
                        .options
                        .into_iter()
                        .map(|o| QuizOptionResponse {
                            id: o.id,
                            option_text: o.option_text,
                            order_index: o.order_index,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    #[schema(value_type = String, format = "uuid")]
    pub question_id: QuestionId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub selected_option_id: Option<OptionId>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuizSubmission {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub question_id: QuestionId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub selected_option_id: Option<OptionId>,
    pub is_correct: bool,
}

impl From<GradedAnswer> for GradedAnswerResponse {
    fn from(a: GradedAnswer) -> Self {
        Self {
            question_id: a.question_id,
            selected_option_id: a.selected_option_id,
            is_correct: a.is_correct,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttemptResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub quiz_id: QuizId,
    #[schema(value_type = String, format = "uuid")]
    pub module_id: ModuleId,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub passed: bool,
    pub attempt_number: i32,
    pub answers: Vec<GradedAnswerResponse>,
    pub completed_at: DateTime<Utc>,
}

impl From<QuizAttemptDBResponse> for QuizAttemptResponse {
    fn from(db: QuizAttemptDBResponse) -> Self {
        Self {
            id: db.id,
            quiz_id: db.quiz_id,
            module_id: db.module_id,
            score: db.score,
            total_questions: db.total_questions,
            correct_answers: db.correct_answers,
            passed: db.passed,
            attempt_number: db.attempt_number,
            answers: db.answers.0.into_iter().map(GradedAnswerResponse::from).collect(),
            completed_at: db.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultResponse {
    pub has_passed: bool,
    /// Best passing attempt, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_attempt: Option<QuizAttemptResponse>,
    pub attempt_count: i64,
}
