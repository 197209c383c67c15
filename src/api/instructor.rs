use super::helper;
use crate::catalog::{self, LessonContent};
use crate::model::instructor::{
    CertificateResponse, CourseChangeset, CourseGradesResponse, LessonChangeset, NewChoice,
    NewCourse, NewLesson, NewQuestion, NewQuiz, QuestionChangeset, QuizAttemptsSummary,
    QuizChangeset, QuizGrade, StudentCourseDetailResponse, StudentGrades,
};
use crate::model::student::{Attempt, Quiz};
use crate::notify::{self, DeadlineRunSummary, Notice};
use crate::payloads::instructor::{
    AddChoicePayload, AddLessonPayload, AddQuestionPayload, CreateCoursePayload,
    CreateQuizPayload, DeleteCoursePayload, DeleteLessonPayload, DeleteQuestionPayload,
    DeleteQuizPayload, GenerateCertificatePayload, GenerateNotificationsPayload,
    GetCourseGradesParams, GetStudentCourseDetailParams, ModifyCoursePayload,
    ModifyLessonPayload, ModifyQuestionPayload, ModifyQuizPayload,
};
use crate::report::{self, CertificateData};
use crate::roles::Capability;
use crate::{
    errors::AppError,
    response::ApiResponse,
    schema::{
        attempts::dsl as attempts_dsl, choices::dsl as choices_dsl, courses::dsl as courses_dsl,
        enrollments::dsl as enr_dsl, lessons::dsl as lessons_dsl,
        questions::dsl as questions_dsl, quizzes::dsl as quizzes_dsl, users::dsl as users_dsl,
    },
};
use axum::extract::Query;
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Completed attempts of the given students on the given quizzes, keyed by
/// `(student_id, quiz_id)`.
fn load_completed_attempts(
    conn: &mut PgConnection,
    student_ids: &[i64],
    quiz_ids: &[i64],
) -> QueryResult<HashMap<(i64, i64), Vec<Attempt>>> {
    let attempts = attempts_dsl::attempts
        .filter(attempts_dsl::student_id.eq_any(student_ids.to_vec()))
        .filter(attempts_dsl::quiz_id.eq_any(quiz_ids.to_vec()))
        .filter(attempts_dsl::completed.eq(true))
        .order((attempts_dsl::finished_at.desc(), attempts_dsl::id.desc()))
        .select(Attempt::as_select())
        .load(conn)?;

    let mut grouped: HashMap<(i64, i64), Vec<Attempt>> = HashMap::new();
    for attempt in attempts {
        grouped
            .entry((attempt.student_id, attempt.quiz_id))
            .or_default()
            .push(attempt);
    }
    Ok(grouped)
}

fn course_quizzes(conn: &mut PgConnection, course_id: i64) -> QueryResult<Vec<(i64, String)>> {
    quizzes_dsl::quizzes
        .filter(quizzes_dsl::course_id.eq(course_id))
        .order((quizzes_dsl::display_order.asc(), quizzes_dsl::id.asc()))
        .select((quizzes_dsl::id, quizzes_dsl::title))
        .load(conn)
}

fn course_title(conn: &mut PgConnection, course_id: i64) -> Result<String, AppError> {
    courses_dsl::courses
        .find(course_id)
        .select(courses_dsl::title)
        .first::<String>(conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Course with ID {} not found.", course_id)))
}

/// Best attempt per quiz for one student, in the order of `quizzes`.
fn quiz_grades(
    student_id: i64,
    quizzes: &[(i64, String)],
    attempts: &HashMap<(i64, i64), Vec<Attempt>>,
) -> Vec<QuizGrade> {
    quizzes
        .iter()
        .map(|(quiz_id, quiz_title)| {
            let best = attempts
                .get(&(student_id, *quiz_id))
                .and_then(|list| report::best_attempt(list));
            QuizGrade {
                quiz_id: *quiz_id,
                quiz_title: quiz_title.clone(),
                best_attempt_id: best.map(|a| a.id),
                best_percentage: best.map(|a| a.percentage),
                passed: best.is_some_and(|a| a.passed),
            }
        })
        .collect()
}

/// Creates a new course.
///
/// Request Body: `CreateCoursePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The ID of the new course (201 Created).
/// * `403 Forbidden`: If the user may not manage courses.
/// * `404 Not Found`: If the user does not exist.
/// * `422 Unprocessable Entity`: If title or instructor name is blank.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn create_course(
    State(pool): State<Pool>,
    Json(payload): Json<CreateCoursePayload>,
) -> Result<ApiResponse<i64>, AppError> {
    let instructor_id = payload.instructor_id;
    info!(
        "Attempting to create course '{}' requested by user {}",
        payload.title, instructor_id
    );
    debug!("Create course payload: {:?}", payload);

    catalog::require_non_empty("title", &payload.title)?;
    catalog::require_non_empty("instructor", &payload.instructor)?;

    helper::require_capability(&pool, instructor_id, Capability::ManageCourses).await?;

    let new_course = NewCourse {
        title: payload.title.trim().to_string(),
        description: payload.description,
        instructor: payload.instructor.trim().to_string(),
        image_url: payload
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty()),
    };

    let course_id = helper::run_query(&pool, move |conn| {
        diesel::insert_into(courses_dsl::courses)
            .values(&new_course)
            .returning(courses_dsl::id)
            .get_result::<i64>(conn)
    })
    .await?;

    info!("Successfully created course {}", course_id);
    Ok(ApiResponse::created(course_id))
}

/// Modifies an existing course. Fields left out are kept; `remove_image`
/// clears the image.
///
/// Request Body: `ModifyCoursePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the update was successful (200 OK).
/// * `403 Forbidden`: If the user may not manage courses.
/// * `404 Not Found`: If the user or the course does not exist.
/// * `422 Unprocessable Entity`: If a provided title or instructor name is blank.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn modify_course(
    State(pool): State<Pool>,
    Json(payload): Json<ModifyCoursePayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let instructor_id = payload.instructor_id;
    let course_id = payload.course_id;
    info!(
        "Attempting to modify course {} requested by user {}",
        course_id, instructor_id
    );
    debug!("Modify course payload: {:?}", payload);

    if let Some(title) = &payload.title {
        catalog::require_non_empty("title", title)?;
    }
    if let Some(instructor) = &payload.instructor {
        catalog::require_non_empty("instructor", instructor)?;
    }

    helper::require_capability(&pool, instructor_id, Capability::ManageCourses).await?;

    let image_url = if payload.remove_image {
        Some(None)
    } else {
        payload.image_url.map(Some)
    };
    let changeset = CourseChangeset {
        title: payload.title.map(|t| t.trim().to_string()),
        description: payload.description,
        instructor: payload.instructor.map(|i| i.trim().to_string()),
        image_url,
        updated_at: Some(Utc::now()),
    };

    let has_updates = changeset.title.is_some()
        || changeset.description.is_some()
        || changeset.instructor.is_some()
        || changeset.image_url.is_some();

    if !has_updates {
        info!(
            "No update fields provided for course {}. Returning success.",
            course_id
        );
        return Ok(ApiResponse::ok(true));
    }

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::update(courses_dsl::courses.find(course_id))
            .set(&changeset)
            .execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Course", course_id)?;
    info!("Successfully modified course {}", course_id);
    Ok(ApiResponse::ok(true))
}

/// Deletes a course together with its lessons, quizzes, enrollments and
/// everything hanging off them.
///
/// Request Body: `DeleteCoursePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if deleted (200 OK).
/// * `403 Forbidden`: If the user may not manage courses.
/// * `404 Not Found`: If the user or the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn delete_course(
    State(pool): State<Pool>,
    Json(payload): Json<DeleteCoursePayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let course_id = payload.course_id;
    info!(
        "Attempting to delete course {} requested by user {}",
        course_id, payload.instructor_id
    );

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageCourses).await?;

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::delete(courses_dsl::courses.find(course_id)).execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Course", course_id)?;
    info!("Course {} deleted", course_id);
    Ok(ApiResponse::ok(true))
}

/// Adds a lesson to a course and tells the enrolled students about it.
///
/// Request Body: `AddLessonPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The ID of the new lesson (201 Created).
/// * `403 Forbidden`: If the user may not manage courses.
/// * `404 Not Found`: If the user or the course does not exist.
/// * `422 Unprocessable Entity`: If the title is blank or the content does not match the kind.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn add_lesson(
    State(pool): State<Pool>,
    Json(payload): Json<AddLessonPayload>,
) -> Result<ApiResponse<i64>, AppError> {
    let instructor_id = payload.instructor_id;
    let course_id = payload.course_id;
    info!(
        "Attempting to add {} lesson '{}' to course {}",
        payload.kind, payload.title, course_id
    );
    debug!("Add lesson payload: {:?}", payload);

    catalog::require_non_empty("title", &payload.title)?;
    let content = LessonContent::validated(
        payload.kind,
        payload.video_url,
        payload.document_path,
        payload.text_content,
    )?;

    let new_lesson = NewLesson {
        course_id,
        title: payload.title.trim().to_string(),
        description: payload.description,
        kind: payload.kind.as_str().to_string(),
        display_order: payload.display_order,
        video_url: content.video_url,
        document_path: content.document_path,
        text_content: content.text_content,
    };
    let now = Utc::now();

    let (lesson_id, notified) = helper::run_transaction(&pool, move |conn| {
        helper::require_capability_sync(conn, instructor_id, Capability::ManageCourses)?;
        let course_title = course_title(conn, course_id)?;

        let lesson_id = diesel::insert_into(lessons_dsl::lessons)
            .values(&new_lesson)
            .returning(lessons_dsl::id)
            .get_result::<i64>(conn)?;

        let notice = Notice::course_update(&new_lesson.title, &course_title);
        let notified = notify::notify_enrolled_students(conn, course_id, None, &notice, now)?;
        Ok((lesson_id, notified))
    })
    .await?;

    info!(
        "Lesson {} added to course {}, {} students notified",
        lesson_id, course_id, notified
    );
    Ok(ApiResponse::created(lesson_id))
}

/// Modifies a lesson. Content fields are only accepted together with `kind`,
/// in which case they replace the stored content.
///
/// Request Body: `ModifyLessonPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the update was successful (200 OK).
/// * `400 Bad Request`: If content fields are given without `kind`.
/// * `403 Forbidden`: If the user may not manage courses.
/// * `404 Not Found`: If the user or the lesson does not exist.
/// * `422 Unprocessable Entity`: If the title is blank or the content does not match the kind.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn modify_lesson(
    State(pool): State<Pool>,
    Json(payload): Json<ModifyLessonPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let lesson_id = payload.lesson_id;
    info!(
        "Attempting to modify lesson {} requested by user {}",
        lesson_id, payload.instructor_id
    );
    debug!("Modify lesson payload: {:?}", payload);

    if let Some(title) = &payload.title {
        catalog::require_non_empty("title", title)?;
    }

    let content = match payload.kind {
        Some(kind) => Some((
            kind,
            LessonContent::validated(
                kind,
                payload.video_url,
                payload.document_path,
                payload.text_content,
            )?,
        )),
        None => {
            if payload.video_url.is_some()
                || payload.document_path.is_some()
                || payload.text_content.is_some()
            {
                warn!("Lesson {} content given without a kind", lesson_id);
                return Err(AppError::BadRequest(
                    "Lesson content can only be changed together with its kind.".to_string(),
                ));
            }
            None
        }
    };

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageCourses).await?;

    let changeset = match content {
        Some((kind, content)) => LessonChangeset {
            title: payload.title.map(|t| t.trim().to_string()),
            description: payload.description,
            display_order: payload.display_order,
            kind: Some(kind.as_str().to_string()),
            video_url: Some(content.video_url),
            document_path: Some(content.document_path),
            text_content: Some(content.text_content),
        },
        None => LessonChangeset {
            title: payload.title.map(|t| t.trim().to_string()),
            description: payload.description,
            display_order: payload.display_order,
            kind: None,
            video_url: None,
            document_path: None,
            text_content: None,
        },
    };

    let has_updates = changeset.title.is_some()
        || changeset.description.is_some()
        || changeset.display_order.is_some()
        || changeset.kind.is_some();

    if !has_updates {
        info!(
            "No update fields provided for lesson {}. Returning success.",
            lesson_id
        );
        return Ok(ApiResponse::ok(true));
    }

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::update(lessons_dsl::lessons.find(lesson_id))
            .set(&changeset)
            .execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Lesson", lesson_id)?;
    info!("Successfully modified lesson {}", lesson_id);
    Ok(ApiResponse::ok(true))
}

/// Deletes a lesson.
///
/// Request Body: `DeleteLessonPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if deleted (200 OK).
/// * `403 Forbidden`: If the user may not manage courses.
/// * `404 Not Found`: If the user or the lesson does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn delete_lesson(
    State(pool): State<Pool>,
    Json(payload): Json<DeleteLessonPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let lesson_id = payload.lesson_id;
    info!(
        "Attempting to delete lesson {} requested by user {}",
        lesson_id, payload.instructor_id
    );

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageCourses).await?;

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::delete(lessons_dsl::lessons.find(lesson_id)).execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Lesson", lesson_id)?;
    info!("Lesson {} deleted", lesson_id);
    Ok(ApiResponse::ok(true))
}

/// Creates a quiz in a course. Publishing it active notifies the enrolled
/// students.
///
/// Request Body: `CreateQuizPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The ID of the new quiz (201 Created).
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the course does not exist.
/// * `422 Unprocessable Entity`: If the title is blank or a setting is out of range.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn create_quiz(
    State(pool): State<Pool>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<ApiResponse<i64>, AppError> {
    let instructor_id = payload.instructor_id;
    let course_id = payload.course_id;
    info!(
        "Attempting to create quiz '{}' in course {} requested by user {}",
        payload.title, course_id, instructor_id
    );
    debug!("Create quiz payload: {:?}", payload);

    catalog::require_non_empty("title", &payload.title)?;
    catalog::validate_quiz_settings(
        payload.passing_score,
        payload.max_attempts,
        payload.time_limit_minutes,
    )?;

    let new_quiz = NewQuiz {
        course_id,
        title: payload.title.trim().to_string(),
        description: payload.description,
        passing_score: payload.passing_score,
        max_attempts: payload.max_attempts,
        time_limit_minutes: payload.time_limit_minutes,
        deadline: payload.deadline,
        display_order: payload.display_order,
        active: payload.active,
    };
    let now = Utc::now();

    let (quiz_id, notified) = helper::run_transaction(&pool, move |conn| {
        helper::require_capability_sync(conn, instructor_id, Capability::ManageQuizzes)?;
        let course_title = course_title(conn, course_id)?;

        let quiz_id = diesel::insert_into(quizzes_dsl::quizzes)
            .values(&new_quiz)
            .returning(quizzes_dsl::id)
            .get_result::<i64>(conn)?;

        let notified = if new_quiz.active {
            let notice = Notice::new_quiz(&new_quiz.title, &course_title);
            notify::notify_enrolled_students(conn, course_id, Some(quiz_id), &notice, now)?
        } else {
            0
        };
        Ok((quiz_id, notified))
    })
    .await?;

    info!(
        "Quiz {} created in course {}, {} students notified",
        quiz_id, course_id, notified
    );
    Ok(ApiResponse::created(quiz_id))
}

/// Modifies a quiz. The resulting settings are validated as a whole, so a
/// partial change cannot leave the quiz in an invalid state.
///
/// Request Body: `ModifyQuizPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the update was successful (200 OK).
/// * `400 Bad Request`: If a value and its clear flag are both given.
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the quiz does not exist.
/// * `422 Unprocessable Entity`: If the title is blank or a setting is out of range.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn modify_quiz(
    State(pool): State<Pool>,
    Json(payload): Json<ModifyQuizPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let instructor_id = payload.instructor_id;
    let quiz_id = payload.quiz_id;
    info!(
        "Attempting to modify quiz {} requested by user {}",
        quiz_id, instructor_id
    );
    debug!("Modify quiz payload: {:?}", payload);

    if payload.clear_time_limit && payload.time_limit_minutes.is_some() {
        return Err(AppError::BadRequest(
            "time_limit_minutes and clear_time_limit are mutually exclusive.".to_string(),
        ));
    }
    if payload.clear_deadline && payload.deadline.is_some() {
        return Err(AppError::BadRequest(
            "deadline and clear_deadline are mutually exclusive.".to_string(),
        ));
    }
    if let Some(title) = &payload.title {
        catalog::require_non_empty("title", title)?;
    }

    let changeset = QuizChangeset {
        title: payload.title.map(|t| t.trim().to_string()),
        description: payload.description,
        passing_score: payload.passing_score,
        max_attempts: payload.max_attempts,
        time_limit_minutes: if payload.clear_time_limit {
            Some(None)
        } else {
            payload.time_limit_minutes.map(Some)
        },
        deadline: if payload.clear_deadline {
            Some(None)
        } else {
            payload.deadline.map(Some)
        },
        display_order: payload.display_order,
        active: payload.active,
    };

    let has_updates = changeset.title.is_some()
        || changeset.description.is_some()
        || changeset.passing_score.is_some()
        || changeset.max_attempts.is_some()
        || changeset.time_limit_minutes.is_some()
        || changeset.deadline.is_some()
        || changeset.display_order.is_some()
        || changeset.active.is_some();

    helper::run_transaction(&pool, move |conn| {
        helper::require_capability_sync(conn, instructor_id, Capability::ManageQuizzes)?;
        let current = quizzes_dsl::quizzes
            .find(quiz_id)
            .select(Quiz::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with ID {} not found.", quiz_id)))?;

        if !has_updates {
            info!(
                "No update fields provided for quiz {}. Returning success.",
                quiz_id
            );
            return Ok(());
        }

        catalog::validate_quiz_settings(
            changeset.passing_score.unwrap_or(current.passing_score),
            changeset.max_attempts.unwrap_or(current.max_attempts),
            changeset
                .time_limit_minutes
                .unwrap_or(current.time_limit_minutes),
        )?;

        let rows_affected = diesel::update(quizzes_dsl::quizzes.find(quiz_id))
            .set(&changeset)
            .execute(conn)?;
        helper::expect_single_row(rows_affected, "Quiz", quiz_id)
    })
    .await?;

    info!("Successfully modified quiz {}", quiz_id);
    Ok(ApiResponse::ok(true))
}

/// Deletes a quiz with its questions, choices and attempts.
///
/// Request Body: `DeleteQuizPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if deleted (200 OK).
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the quiz does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn delete_quiz(
    State(pool): State<Pool>,
    Json(payload): Json<DeleteQuizPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let quiz_id = payload.quiz_id;
    info!(
        "Attempting to delete quiz {} requested by user {}",
        quiz_id, payload.instructor_id
    );

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageQuizzes).await?;

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::delete(quizzes_dsl::quizzes.find(quiz_id)).execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Quiz", quiz_id)?;
    info!("Quiz {} deleted", quiz_id);
    Ok(ApiResponse::ok(true))
}

/// Adds a question to a quiz.
///
/// Request Body: `AddQuestionPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The ID of the new question (201 Created).
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the quiz does not exist.
/// * `422 Unprocessable Entity`: If the prompt is blank or points are below 1.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn add_question(
    State(pool): State<Pool>,
    Json(payload): Json<AddQuestionPayload>,
) -> Result<ApiResponse<i64>, AppError> {
    let quiz_id = payload.quiz_id;
    info!("Attempting to add a question to quiz {}", quiz_id);
    debug!("Add question payload: {:?}", payload);

    catalog::require_non_empty("prompt", &payload.prompt)?;
    catalog::require_range("points", payload.points, 1, i32::MAX)?;

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageQuizzes).await?;

    let new_question = NewQuestion {
        quiz_id,
        prompt: payload.prompt.trim().to_string(),
        points: payload.points,
        display_order: payload.display_order,
    };

    let question_id = helper::run_transaction(&pool, move |conn| {
        diesel::insert_into(questions_dsl::questions)
            .values(&new_question)
            .returning(questions_dsl::id)
            .get_result::<i64>(conn)
            .map_err(|e| {
                helper::constraint_error(
                    e,
                    || format!("Quiz with ID {} not found.", quiz_id),
                    || "Question already exists.".to_string(),
                )
            })
    })
    .await?;

    info!("Question {} added to quiz {}", question_id, quiz_id);
    Ok(ApiResponse::created(question_id))
}

/// Modifies a question.
///
/// Request Body: `ModifyQuestionPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the update was successful (200 OK).
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the question does not exist.
/// * `422 Unprocessable Entity`: If the prompt is blank or points are below 1.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn modify_question(
    State(pool): State<Pool>,
    Json(payload): Json<ModifyQuestionPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let question_id = payload.question_id;
    info!(
        "Attempting to modify question {} requested by user {}",
        question_id, payload.instructor_id
    );
    debug!("Modify question payload: {:?}", payload);

    if let Some(prompt) = &payload.prompt {
        catalog::require_non_empty("prompt", prompt)?;
    }
    if let Some(points) = payload.points {
        catalog::require_range("points", points, 1, i32::MAX)?;
    }

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageQuizzes).await?;

    let changeset = QuestionChangeset {
        prompt: payload.prompt.map(|p| p.trim().to_string()),
        points: payload.points,
        display_order: payload.display_order,
    };

    if changeset.prompt.is_none() && changeset.points.is_none() && changeset.display_order.is_none()
    {
        info!(
            "No update fields provided for question {}. Returning success.",
            question_id
        );
        return Ok(ApiResponse::ok(true));
    }

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::update(questions_dsl::questions.find(question_id))
            .set(&changeset)
            .execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Question", question_id)?;
    info!("Successfully modified question {}", question_id);
    Ok(ApiResponse::ok(true))
}

/// Deletes a question with its choices and recorded answers.
///
/// Request Body: `DeleteQuestionPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if deleted (200 OK).
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the question does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn delete_question(
    State(pool): State<Pool>,
    Json(payload): Json<DeleteQuestionPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let question_id = payload.question_id;
    info!(
        "Attempting to delete question {} requested by user {}",
        question_id, payload.instructor_id
    );

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageQuizzes).await?;

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::delete(questions_dsl::questions.find(question_id)).execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Question", question_id)?;
    info!("Question {} deleted", question_id);
    Ok(ApiResponse::ok(true))
}

/// Adds an answer option to a question.
///
/// Request Body: `AddChoicePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The ID of the new choice (201 Created).
/// * `403 Forbidden`: If the user may not manage quizzes.
/// * `404 Not Found`: If the user or the question does not exist.
/// * `422 Unprocessable Entity`: If the label is blank.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn add_choice(
    State(pool): State<Pool>,
    Json(payload): Json<AddChoicePayload>,
) -> Result<ApiResponse<i64>, AppError> {
    let question_id = payload.question_id;
    info!("Attempting to add a choice to question {}", question_id);
    debug!("Add choice payload: {:?}", payload);

    catalog::require_non_empty("label", &payload.label)?;

    helper::require_capability(&pool, payload.instructor_id, Capability::ManageQuizzes).await?;

    let new_choice = NewChoice {
        question_id,
        label: payload.label.trim().to_string(),
        is_correct: payload.is_correct,
        display_order: payload.display_order,
    };

    let choice_id = helper::run_transaction(&pool, move |conn| {
        diesel::insert_into(choices_dsl::choices)
            .values(&new_choice)
            .returning(choices_dsl::id)
            .get_result::<i64>(conn)
            .map_err(|e| {
                helper::constraint_error(
                    e,
                    || format!("Question with ID {} not found.", question_id),
                    || "Choice already exists.".to_string(),
                )
            })
    })
    .await?;

    info!("Choice {} added to question {}", choice_id, question_id);
    Ok(ApiResponse::created(choice_id))
}

/// Builds the grade sheet of a course: for every enrolled student the best
/// attempt per quiz, the average over completed quizzes and whether the
/// course is passed.
///
/// Query Parameters:
/// * `instructor_id`: The ID of the requesting user.
/// * `course_id`: The ID of the course.
///
/// Returns (wrapped in `ApiResponse`)
/// * `CourseGradesResponse` (200 OK).
/// * `403 Forbidden`: If the user may not view grades.
/// * `404 Not Found`: If the user or the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_course_grades(
    State(pool): State<Pool>,
    Query(params): Query<GetCourseGradesParams>,
) -> Result<ApiResponse<CourseGradesResponse>, AppError> {
    let instructor_id = params.instructor_id;
    let course_id = params.course_id;
    info!(
        "Fetching grades of course {} for user {}",
        course_id, instructor_id
    );

    let response = helper::run_transaction(&pool, move |conn| {
        helper::require_capability_sync(conn, instructor_id, Capability::ViewGrades)?;
        let course_title = course_title(conn, course_id)?;
        let quizzes = course_quizzes(conn, course_id)?;
        let quiz_ids: Vec<i64> = quizzes.iter().map(|(id, _)| *id).collect();

        let enrolled = enr_dsl::enrollments
            .inner_join(users_dsl::users.on(enr_dsl::student_id.eq(users_dsl::id)))
            .filter(enr_dsl::course_id.eq(course_id))
            .order((users_dsl::username.asc(), users_dsl::id.asc()))
            .select((
                enr_dsl::id,
                users_dsl::id,
                users_dsl::username,
                users_dsl::full_name,
            ))
            .load::<(i64, i64, String, String)>(conn)?;
        let student_ids: Vec<i64> = enrolled.iter().map(|(_, id, ..)| *id).collect();

        let attempts = load_completed_attempts(conn, &student_ids, &quiz_ids)?;

        let students: Vec<StudentGrades> = enrolled
            .into_iter()
            .map(|(enrollment_id, student_id, username, full_name)| {
                let grades = quiz_grades(student_id, &quizzes, &attempts);
                let best: Vec<Option<f64>> = grades.iter().map(|g| g.best_percentage).collect();
                let standing = report::course_standing(&best);
                StudentGrades {
                    student_id,
                    username,
                    full_name,
                    enrollment_id,
                    grades,
                    average: standing.average,
                    quizzes_completed: standing.quizzes_completed,
                    total_quizzes: standing.total_quizzes,
                    passed: standing.passed,
                }
            })
            .collect();

        let total_passed = students.iter().filter(|s| s.passed).count();
        Ok(CourseGradesResponse {
            course_id,
            course_title,
            quiz_ids,
            total_students: students.len(),
            total_passed,
            total_failed: students.len() - total_passed,
            students,
        })
    })
    .await?;

    info!(
        "Course {} grades: {} students, {} passed",
        course_id, response.total_students, response.total_passed
    );
    Ok(ApiResponse::ok(response))
}

/// Retrieves the attempts of one student in a course, grouped by quiz.
///
/// Query Parameters:
/// * `instructor_id`: The ID of the requesting user.
/// * `course_id`: The ID of the course.
/// * `student_id`: The ID of the student.
///
/// Returns (wrapped in `ApiResponse`)
/// * `StudentCourseDetailResponse` (200 OK).
/// * `403 Forbidden`: If the user may not view grades.
/// * `404 Not Found`: If the user does not exist or the student is not enrolled in the course.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_student_course_detail(
    State(pool): State<Pool>,
    Query(params): Query<GetStudentCourseDetailParams>,
) -> Result<ApiResponse<StudentCourseDetailResponse>, AppError> {
    let instructor_id = params.instructor_id;
    let course_id = params.course_id;
    let student_id = params.student_id;
    info!(
        "Fetching detail of student {} in course {} for user {}",
        student_id, course_id, instructor_id
    );

    let response = helper::run_transaction(&pool, move |conn| {
        helper::require_capability_sync(conn, instructor_id, Capability::ViewGrades)?;

        let (enrollment_id, enrolled_at, completed) = enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(student_id))
            .filter(enr_dsl::course_id.eq(course_id))
            .select((enr_dsl::id, enr_dsl::enrolled_at, enr_dsl::completed))
            .first::<(i64, DateTime<Utc>, bool)>(conn)
            .optional()?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Student {} is not enrolled in course {}.",
                    student_id, course_id
                ))
            })?;

        let quizzes = course_quizzes(conn, course_id)?;
        let quiz_ids: Vec<i64> = quizzes.iter().map(|(id, _)| *id).collect();
        let mut attempts = load_completed_attempts(conn, &[student_id], &quiz_ids)?;

        let all_percentages: Vec<f64> = attempts
            .values()
            .flatten()
            .map(|attempt| attempt.percentage)
            .collect();

        let quizzes = quizzes
            .into_iter()
            .map(|(quiz_id, quiz_title)| {
                let attempts = attempts.remove(&(student_id, quiz_id)).unwrap_or_default();
                QuizAttemptsSummary {
                    quiz_id,
                    quiz_title,
                    best_attempt: report::best_attempt(&attempts).cloned(),
                    total_attempts: attempts.len(),
                    attempts,
                }
            })
            .collect();

        Ok(StudentCourseDetailResponse {
            course_id,
            student_id,
            enrollment_id,
            enrolled_at,
            completed,
            quizzes,
            overall_average: report::mean(&all_percentages),
        })
    })
    .await?;

    info!(
        "Student {} in course {}: overall average {:.2}%",
        student_id, course_id, response.overall_average
    );
    Ok(ApiResponse::ok(response))
}

/// Issues a completion certificate and marks the enrollment completed.
///
/// Request Body: `GenerateCertificatePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `CertificateResponse`: Certificate data and rendered document (201 Created).
/// * `403 Forbidden`: If the user may not issue certificates.
/// * `404 Not Found`: If a user or the course does not exist, or the student is not enrolled.
/// * `422 Unprocessable Entity`: If the student has not passed the course.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn generate_certificate(
    State(pool): State<Pool>,
    Json(payload): Json<GenerateCertificatePayload>,
) -> Result<ApiResponse<CertificateResponse>, AppError> {
    let instructor_id = payload.instructor_id;
    let course_id = payload.course_id;
    let student_id = payload.student_id;
    info!(
        "Attempting to issue certificate for student {} in course {} requested by user {}",
        student_id, course_id, instructor_id
    );

    let now = Utc::now();
    let certificate = helper::run_transaction(&pool, move |conn| {
        helper::require_capability_sync(conn, instructor_id, Capability::IssueCertificates)?;

        let (course_title, instructor) = courses_dsl::courses
            .find(course_id)
            .select((courses_dsl::title, courses_dsl::instructor))
            .first::<(String, String)>(conn)
            .optional()?
            .ok_or_else(|| {
                AppError::NotFound(format!("Course with ID {} not found.", course_id))
            })?;

        let enrollment_id = enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(student_id))
            .filter(enr_dsl::course_id.eq(course_id))
            .select(enr_dsl::id)
            .for_update()
            .first::<i64>(conn)
            .optional()?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Student {} is not enrolled in course {}.",
                    student_id, course_id
                ))
            })?;

        let (username, full_name) = users_dsl::users
            .find(student_id)
            .select((users_dsl::username, users_dsl::full_name))
            .first::<(String, String)>(conn)?;

        let quizzes = course_quizzes(conn, course_id)?;
        let quiz_ids: Vec<i64> = quizzes.iter().map(|(id, _)| *id).collect();
        let attempts = load_completed_attempts(conn, &[student_id], &quiz_ids)?;
        let best: Vec<Option<f64>> = quiz_grades(student_id, &quizzes, &attempts)
            .iter()
            .map(|g| g.best_percentage)
            .collect();
        let standing = report::course_standing(&best);

        if !standing.passed {
            warn!(
                "Student {} has not passed course {} ({:.2}%, {}/{} quizzes)",
                student_id,
                course_id,
                standing.average,
                standing.quizzes_completed,
                standing.total_quizzes
            );
            return Err(AppError::UnprocessableEntity(format!(
                "Student {} has not passed course {}: average {:.1}% over {} of {} quizzes.",
                student_id,
                course_id,
                standing.average,
                standing.quizzes_completed,
                standing.total_quizzes
            )));
        }

        let rows_affected = diesel::update(enr_dsl::enrollments.find(enrollment_id))
            .set(enr_dsl::completed.eq(true))
            .execute(conn)?;
        helper::expect_single_row(rows_affected, "Enrollment", enrollment_id)?;

        let data = CertificateData {
            student_name: report::display_name(&full_name, &username),
            course_title,
            instructor,
            completion_date: now.date_naive(),
            average_percentage: standing.average,
        };
        let document = report::render_certificate(&data);

        Ok(CertificateResponse {
            certificate_id: Uuid::new_v4(),
            student_name: data.student_name,
            course_title: data.course_title,
            instructor: data.instructor,
            completion_date: data.completion_date,
            average_percentage: data.average_percentage,
            document,
        })
    })
    .await
    .inspect_err(|e| error!("Certificate for student {} failed: {}", student_id, e))?;

    info!(
        "Issued certificate {} for student {} in course {}",
        certificate.certificate_id, student_id, course_id
    );
    Ok(ApiResponse::created(certificate))
}

/// Runs the deadline reminder generation now.
///
/// Request Body: `GenerateNotificationsPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `DeadlineRunSummary`: Number of urgent and reminder notifications created (200 OK).
/// * `403 Forbidden`: If the user may not trigger notifications.
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn generate_notifications(
    State(pool): State<Pool>,
    Json(payload): Json<GenerateNotificationsPayload>,
) -> Result<ApiResponse<DeadlineRunSummary>, AppError> {
    let instructor_id = payload.instructor_id;
    info!(
        "Deadline notification run requested by user {}",
        instructor_id
    );

    helper::require_capability(&pool, instructor_id, Capability::TriggerNotifications).await?;

    let now = Utc::now();
    let summary = helper::run_query(&pool, move |conn| {
        notify::generate_deadline_notifications(conn, now)
    })
    .await?;

    info!(
        "Deadline notification run created {} notifications",
        summary.total()
    );
    Ok(ApiResponse::ok(summary))
}
