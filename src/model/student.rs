use crate::schema::{answers, attempts, courses, enrollments, lessons, notifications, quizzes};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Deserialize, Serialize, Debug, Clone)]
#[diesel(table_name = courses)]
pub struct CourseResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub image_url: Option<String>,
    pub created_on: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CourseDataResponse {
    pub course: CourseResponse,
    pub lesson_ids: Vec<i64>,
    pub quiz_ids: Vec<i64>,
}

#[derive(Queryable, Selectable, Deserialize, Serialize, Debug)]
#[diesel(table_name = lessons)]
pub struct LessonResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub display_order: i32,
    pub video_url: Option<String>,
    pub document_path: Option<String>,
    pub text_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = enrollments)]
pub struct NewEnrollment {
    pub student_id: i64,
    pub course_id: i64,
    // enrolled_at has a DB default (CURRENT_TIMESTAMP)
    // completed defaults to FALSE
}

#[derive(Queryable, Deserialize, Serialize, Debug)]
pub struct EnrolledCourse {
    pub enrollment_id: i64,
    pub course_id: i64,
    pub title: String,
    pub instructor: String,
    pub enrolled_at: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Queryable, Selectable, Deserialize, Serialize, Debug, Clone)]
#[diesel(table_name = quizzes)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub passing_score: i32,
    pub max_attempts: i32,
    pub time_limit_minutes: Option<i32>,
    pub deadline: Option<DateTime<Utc>>,
    pub display_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ChoiceView {
    pub id: i64,
    pub label: String,
    pub display_order: i32,
    // only disclosed to users allowed to manage quizzes
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_correct: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct QuestionView {
    pub id: i64,
    pub prompt: String,
    pub points: i32,
    pub display_order: i32,
    pub choices: Vec<ChoiceView>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct QuizDataResponse {
    pub quiz: Quiz,
    pub questions: Vec<QuestionView>,
    // calculated fields
    pub available: bool,
    pub enrolled: bool,
    pub completed_attempts: i64,
    pub can_attempt: bool,
    pub attempts: Vec<Attempt>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = attempts)]
pub struct NewAttempt {
    pub student_id: i64,
    pub quiz_id: i64,
    pub started_at: DateTime<Utc>,
    // scores default to zero, finished_at is NULL until grading
}

#[derive(Queryable, Selectable, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = attempts)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub obtained_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub completed: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    pub resumed: bool,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = answers)]
pub struct NewAnswer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub answered_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct GradeResponse {
    pub attempt_id: i64,
    pub obtained_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub finished_at: DateTime<Utc>,
}

impl GradeResponse {
    /// Result as persisted on a completed attempt.
    pub fn from_stored(attempt: &Attempt, fallback_finished_at: DateTime<Utc>) -> Self {
        GradeResponse {
            attempt_id: attempt.id,
            obtained_score: attempt.obtained_score,
            max_score: attempt.max_score,
            percentage: attempt.percentage,
            passed: attempt.passed,
            finished_at: attempt.finished_at.unwrap_or(fallback_finished_at),
        }
    }
}

#[derive(Queryable, Deserialize, Serialize, Debug)]
pub struct AnswerResult {
    pub question_id: i64,
    pub prompt: String,
    pub points: i32,
    pub choice_id: i64,
    pub choice_label: String,
    pub correct: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AttemptResultResponse {
    pub attempt: Attempt,
    pub quiz_title: String,
    pub passing_score: i32,
    pub answers: Vec<AnswerResult>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub quiz_id: Option<i64>,
    pub course_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    // is_read defaults to FALSE
}

#[derive(Queryable, Selectable, Deserialize, Serialize, Debug)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub quiz_id: Option<i64>,
    pub course_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// What a notification points at, so clients can navigate there after
/// marking it read.
#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct NotificationTarget {
    pub quiz_id: Option<i64>,
    pub course_id: Option<i64>,
}
