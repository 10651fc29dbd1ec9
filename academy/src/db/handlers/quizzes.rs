//! Database repository for module quizzes and quiz attempts.

use crate::db::{
    errors::Result,
    models::quizzes::{
        OptionCreateDBRequest, OptionDBResponse, QuestionCreateDBRequest, QuestionDBResponse, QuestionWithOptions, QuizAttemptCreateDBRequest,
        QuizAttemptDBResponse, QuizCreateDBRequest, QuizDBResponse, QuizWithQuestions,
    },
};
use crate::types::{ModuleId, QuizId, UserId, abbrev_uuid};
use sqlx::types::Json;
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use tracing::instrument;

pub struct Quizzes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Quizzes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The module's quiz with questions and options, each sorted by `order_index`
    #[instrument(skip(self), fields(module_id = %abbrev_uuid(&module_id)), err)]
    pub async fn get_for_module(&mut self, module_id: ModuleId) -> Result<Option<QuizWithQuestions>> {
        let Some(quiz) = sqlx::query_as::<_, QuizDBResponse>(
            "SELECT id, module_id, title, description, passing_score FROM quizzes WHERE module_id = $1",
        )
        .bind(module_id)
        .fetch_optional(&mut *self.db)
        .await?
        else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, QuestionDBResponse>("SELECT * FROM quiz_questions WHERE quiz_id = $1 ORDER BY order_index ASC")
            .bind(quiz.id)
            .fetch_all(&mut *self.db)
            .await?;

        let options = sqlx::query_as::<_, OptionDBResponse>(
            r#"
            SELECT o.*
            FROM quiz_options o
            JOIN quiz_questions q ON q.id = o.question_id
            WHERE q.quiz_id = $1
            ORDER BY o.order_index ASC
            "#,
        )
        .bind(quiz.id)
        .fetch_all(&mut *self.db)
        .await?;

        let mut options_by_question: HashMap<_, Vec<OptionDBResponse>> = HashMap::new();
        for option in options {
            options_by_question.entry(option.question_id).or_default().push(option);
        }

        let questions = questions
            .into_iter()
            .map(|question| QuestionWithOptions {
                options: options_by_question.remove(&question.id).unwrap_or_default(),
                question,
            })
            .collect();

        Ok(Some(QuizWithQuestions { quiz, questions }))
    }

    #[instrument(skip(self, request), fields(module_id = %abbrev_uuid(&request.module_id)), err)]
    pub async fn create_quiz(&mut self, request: &QuizCreateDBRequest) -> Result<QuizDBResponse> {
        let quiz = sqlx::query_as::<_, QuizDBResponse>(
            r#"
            INSERT INTO quizzes (module_id, title, description, passing_score)
            VALUES ($1, $2, $3, $4)
            RETURNING id, module_id, title, description, passing_score
            "#,
        )
        .bind(request.module_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.passing_score)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(quiz)
    }

    #[instrument(skip(self, request), fields(quiz_id = %abbrev_uuid(&request.quiz_id)), err)]
    pub async fn create_question(&mut self, request: &QuestionCreateDBRequest) -> Result<QuestionDBResponse> {
        let question = sqlx::query_as::<_, QuestionDBResponse>(
            "INSERT INTO quiz_questions (quiz_id, question_text, order_index) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(request.quiz_id)
        .bind(&request.question_text)
        .bind(request.order_index)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(question)
    }

    #[instrument(skip(self, request), fields(question_id = %abbrev_uuid(&request.question_id)), err)]
    pub async fn create_option(&mut self, request: &OptionCreateDBRequest) -> Result<OptionDBResponse> {
        let option = sqlx::query_as::<_, OptionDBResponse>(
            "INSERT INTO quiz_options (question_id, option_text, is_correct, order_index) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(request.question_id)
        .bind(&request.option_text)
        .bind(request.is_correct)
        .bind(request.order_index)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(option)
    }

    /// Store a graded attempt, numbering it after the user's previous attempts at this quiz
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), quiz_id = %abbrev_uuid(&request.quiz_id), score = request.score), err)]
    pub async fn insert_attempt(&mut self, request: &QuizAttemptCreateDBRequest) -> Result<QuizAttemptDBResponse> {
        let mut tx = self.db.begin().await?;

        // Serialise concurrent submissions by the same user for the same quiz
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text), hashtext($2::text))")
            .bind(request.user_id)
            .bind(request.quiz_id)
            .execute(&mut *tx)
            .await?;

        let attempt = sqlx::query_as::<_, QuizAttemptDBResponse>(
            r#"
            INSERT INTO quiz_attempts
                (user_id, quiz_id, module_id, score, total_questions, correct_answers, passed, attempt_number, answers)
            VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                (SELECT COALESCE(MAX(attempt_number), 0) + 1 FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2),
                $8
            )
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.quiz_id)
        .bind(request.module_id)
        .bind(request.score)
        .bind(request.total_questions)
        .bind(request.correct_answers)
        .bind(request.passed)
        .bind(Json(&request.answers))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(attempt)
    }

    /// The user's attempts at a quiz, newest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), quiz_id = %abbrev_uuid(&quiz_id)), err)]
    pub async fn list_attempts(&mut self, user_id: UserId, quiz_id: QuizId) -> Result<Vec<QuizAttemptDBResponse>> {
        let attempts = sqlx::query_as::<_, QuizAttemptDBResponse>(
            "SELECT * FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2 ORDER BY completed_at DESC, attempt_number DESC",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(attempts)
    }

    /// Highest scoring passed attempt, earliest on ties
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), quiz_id = %abbrev_uuid(&quiz_id)), err)]
    pub async fn best_passed_attempt(&mut self, user_id: UserId, quiz_id: QuizId) -> Result<Option<QuizAttemptDBResponse>> {
        let attempt = sqlx::query_as::<_, QuizAttemptDBResponse>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = $1 AND quiz_id = $2 AND passed
            ORDER BY score DESC, attempt_number ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(attempt)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), quiz_id = %abbrev_uuid(&quiz_id)), err)]
    pub async fn has_passed(&mut self, user_id: UserId, quiz_id: QuizId) -> Result<bool> {
        Ok(self.best_passed_attempt(user_id, quiz_id).await?.is_some())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), quiz_id = %abbrev_uuid(&quiz_id)), err)]
    pub async fn count_attempts(&mut self, user_id: UserId, quiz_id: QuizId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2")
            .bind(user_id)
            .bind(quiz_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}
