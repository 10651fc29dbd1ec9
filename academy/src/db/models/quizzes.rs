//! Database models for module quizzes and scored attempts.

use crate::types::{ModuleId, OptionId, QuestionId, QuizId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QuizCreateDBRequest {
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: i32,
}

#[derive(Debug, Clone)]
pub struct QuestionCreateDBRequest {
    pub quiz_id: QuizId,
    pub question_text: String,
    pub order_index: i32,
}

#[derive(Debug, Clone)]
pub struct OptionCreateDBRequest {
    pub question_id: QuestionId,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizDBResponse {
    pub id: QuizId,
    pub module_id: ModuleId,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuestionDBResponse {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub question_text: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct OptionDBResponse {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

/// A question together with its options, both in display order
#[derive(Debug, Clone)]
pub struct QuestionWithOptions {
    pub question: QuestionDBResponse,
    pub options: Vec<OptionDBResponse>,
}

/// A quiz with its full question tree
#[derive(Debug, Clone)]
pub struct QuizWithQuestions {
    pub quiz: QuizDBResponse,
    pub questions: Vec<QuestionWithOptions>,
}

/// One graded answer, stored in the attempt's `answers` JSONB column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    pub question_id: QuestionId,
    pub selected_option_id: Option<OptionId>,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct QuizAttemptCreateDBRequest {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub module_id: ModuleId,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub passed: bool,
    pub answers: Vec<GradedAnswer>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizAttemptDBResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub module_id: ModuleId,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub passed: bool,
    pub attempt_number: i32,
    pub answers: Json<Vec<GradedAnswer>>,
    pub completed_at: DateTime<Utc>,
}
