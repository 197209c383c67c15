use crate::catalog::LessonKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_passing_score() -> i32 {
    70
}

fn default_max_attempts() -> i32 {
    3
}

fn default_points() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CreateCoursePayload {
    pub instructor_id: i64,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ModifyCoursePayload {
    pub instructor_id: i64,
    pub course_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub remove_image: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct DeleteCoursePayload {
    pub instructor_id: i64,
    pub course_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AddLessonPayload {
    pub instructor_id: i64,
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: LessonKind,
    #[serde(default)]
    pub display_order: i32,
    pub video_url: Option<String>,
    pub document_path: Option<String>,
    pub text_content: Option<String>,
}

/// Content fields are only read when `kind` is given, in which case all
/// three content columns are replaced.
#[derive(Deserialize, Serialize, Debug)]
pub struct ModifyLessonPayload {
    pub instructor_id: i64,
    pub lesson_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
    pub kind: Option<LessonKind>,
    pub video_url: Option<String>,
    pub document_path: Option<String>,
    pub text_content: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct DeleteLessonPayload {
    pub instructor_id: i64,
    pub lesson_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CreateQuizPayload {
    pub instructor_id: i64,
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_passing_score")]
    pub passing_score: i32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    pub time_limit_minutes: Option<i32>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ModifyQuizPayload {
    pub instructor_id: i64,
    pub quiz_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub passing_score: Option<i32>,
    pub max_attempts: Option<i32>,
    pub time_limit_minutes: Option<i32>,
    #[serde(default)]
    pub clear_time_limit: bool,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_deadline: bool,
    pub display_order: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct DeleteQuizPayload {
    pub instructor_id: i64,
    pub quiz_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AddQuestionPayload {
    pub instructor_id: i64,
    pub quiz_id: i64,
    pub prompt: String,
    #[serde(default = "default_points")]
    pub points: i32,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ModifyQuestionPayload {
    pub instructor_id: i64,
    pub question_id: i64,
    pub prompt: Option<String>,
    pub points: Option<i32>,
    pub display_order: Option<i32>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct DeleteQuestionPayload {
    pub instructor_id: i64,
    pub question_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AddChoicePayload {
    pub instructor_id: i64,
    pub question_id: i64,
    pub label: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetCourseGradesParams {
    pub instructor_id: i64,
    pub course_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetStudentCourseDetailParams {
    pub instructor_id: i64,
    pub course_id: i64,
    pub student_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GenerateCertificatePayload {
    pub instructor_id: i64,
    pub course_id: i64,
    pub student_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GenerateNotificationsPayload {
    pub instructor_id: i64,
}
