use crate::model::student::Attempt;
use crate::schema::{choices, courses, lessons, questions, quizzes};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{AsChangeset, Insertable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Insertable, Debug)]
#[diesel(table_name = courses)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub image_url: Option<String>,
    // created_on, updated_at have DB defaults
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = courses)]
pub struct CourseChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub image_url: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = lessons)]
pub struct NewLesson {
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub display_order: i32,
    pub video_url: Option<String>,
    pub document_path: Option<String>,
    pub text_content: Option<String>,
    // created_at has a DB default
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = lessons)]
pub struct LessonChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
    // content columns are replaced together, see `LessonContent`
    pub kind: Option<String>,
    pub video_url: Option<Option<String>>,
    pub document_path: Option<Option<String>>,
    pub text_content: Option<Option<String>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = quizzes)]
pub struct NewQuiz {
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub passing_score: i32,
    pub max_attempts: i32,
    pub time_limit_minutes: Option<i32>,
    pub deadline: Option<DateTime<Utc>>,
    pub display_order: i32,
    pub active: bool,
    // created_at has a DB default
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = quizzes)]
pub struct QuizChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub passing_score: Option<i32>,
    pub max_attempts: Option<i32>,
    pub time_limit_minutes: Option<Option<i32>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub display_order: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = questions)]
pub struct NewQuestion {
    pub quiz_id: i64,
    pub prompt: String,
    pub points: i32,
    pub display_order: i32,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = questions)]
pub struct QuestionChangeset {
    pub prompt: Option<String>,
    pub points: Option<i32>,
    pub display_order: Option<i32>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = choices)]
pub struct NewChoice {
    pub question_id: i64,
    pub label: String,
    pub is_correct: bool,
    pub display_order: i32,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct QuizGrade {
    pub quiz_id: i64,
    pub quiz_title: String,
    pub best_attempt_id: Option<i64>,
    pub best_percentage: Option<f64>,
    pub passed: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StudentGrades {
    pub student_id: i64,
    pub username: String,
    pub full_name: String,
    pub enrollment_id: i64,
    pub grades: Vec<QuizGrade>,
    pub average: f64,
    pub quizzes_completed: usize,
    pub total_quizzes: usize,
    pub passed: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CourseGradesResponse {
    pub course_id: i64,
    pub course_title: String,
    pub quiz_ids: Vec<i64>,
    pub students: Vec<StudentGrades>,
    pub total_students: usize,
    pub total_passed: usize,
    pub total_failed: usize,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct QuizAttemptsSummary {
    pub quiz_id: i64,
    pub quiz_title: String,
    // completed attempts, newest first
    pub attempts: Vec<Attempt>,
    pub best_attempt: Option<Attempt>,
    pub total_attempts: usize,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StudentCourseDetailResponse {
    pub course_id: i64,
    pub student_id: i64,
    pub enrollment_id: i64,
    pub enrolled_at: DateTime<Utc>,
    pub completed: bool,
    pub quizzes: Vec<QuizAttemptsSummary>,
    pub overall_average: f64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CertificateResponse {
    pub certificate_id: Uuid,
    pub student_name: String,
    pub course_title: String,
    pub instructor: String,
    pub completion_date: NaiveDate,
    pub average_percentage: f64,
    pub document: String,
}
