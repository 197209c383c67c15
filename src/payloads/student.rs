use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct GetCourseDataParams {
    pub course_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetLessonDataParams {
    pub lesson_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct EnrollPayload {
    pub student_id: i64,
    pub course_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetMyCoursesParams {
    pub student_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetQuizDataParams {
    pub user_id: i64,
    pub quiz_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StartAttemptPayload {
    pub student_id: i64,
    pub quiz_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubmitAnswerPayload {
    pub student_id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct FinalizeAttemptPayload {
    pub student_id: i64,
    pub attempt_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetAttemptResultParams {
    pub user_id: i64,
    pub attempt_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetNotificationsParams {
    pub user_id: i64,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct NotificationPayload {
    pub user_id: i64,
    pub notification_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct MarkAllNotificationsReadPayload {
    pub user_id: i64,
}
