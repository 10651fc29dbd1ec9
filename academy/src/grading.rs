//! Quiz scoring.

use crate::api::models::quizzes::SubmittedAnswer;
use crate::db::models::quizzes::{GradedAnswer, QuizWithQuestions};
use std::collections::HashMap;

/// Outcome of grading one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub passed: bool,
    pub answers: Vec<GradedAnswer>,
}

/// Percentage of correct answers, rounded half up. Zero for an empty quiz.
pub fn score_percent(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (correct * 200 + total) / (total * 2)
}

/// Grade a submission against the quiz's answer key.
///
/// Every question in the quiz is graded exactly once. Unanswered questions and options that do
/// not belong to the question count as incorrect; answers to questions outside the quiz are
/// ignored.
pub fn grade(quiz: &QuizWithQuestions, submitted: &[SubmittedAnswer]) -> Grade {
    let selected: HashMap<_, _> = submitted.iter().map(|a| (a.question_id, a.selected_option_id)).collect();

    let answers: Vec<GradedAnswer> = quiz
        .questions
        .iter()
        .map(|q| {
            let selected_option_id = selected.get(&q.question.id).copied().flatten();
            let is_correct = selected_option_id
                .and_then(|id| q.options.iter().find(|o| o.id == id))
                .is_some_and(|o| o.is_correct);
            GradedAnswer {
                question_id: q.question.id,
                selected_option_id,
                is_correct,
            }
        })
        .collect();

    let total_questions = answers.len() as i32;
    let correct_answers = answers.iter().filter(|a| a.is_correct).count() as i32;
    let score = score_percent(correct_answers, total_questions);

    Grade {
        score,
        total_questions,
        correct_answers,
        passed: total_questions > 0 && score >= quiz.quiz.passing_score,
        answers,
    }
}
