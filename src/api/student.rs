use super::helper;
use crate::engine::{self, AttemptState, EngineError, GradedAnswer, StartRequest};
use crate::model::student::{
    AnswerResult, Attempt, AttemptResultResponse, ChoiceView, CourseDataResponse, CourseResponse,
    EnrolledCourse, GradeResponse, LessonResponse, NewAnswer, NewAttempt, NewEnrollment,
    Notification, NotificationTarget, QuestionView, Quiz, QuizDataResponse, StartAttemptResponse,
};
use crate::notify::Notice;
use crate::payloads::student::{
    EnrollPayload, FinalizeAttemptPayload, GetAttemptResultParams, GetCourseDataParams,
    GetLessonDataParams, GetMyCoursesParams, GetNotificationsParams, GetQuizDataParams,
    MarkAllNotificationsReadPayload, NotificationPayload, StartAttemptPayload, SubmitAnswerPayload,
};
use crate::roles::Capability;
use crate::{
    errors::AppError,
    response::ApiResponse,
    schema::{
        answers::dsl as answers_dsl, attempts::dsl as attempts_dsl, choices::dsl as choices_dsl,
        courses::dsl as courses_dsl, enrollments::dsl as enr_dsl, lessons::dsl as lessons_dsl,
        notifications::dsl as n_dsl, questions::dsl as questions_dsl,
        quizzes::dsl as quizzes_dsl,
    },
};
use axum::extract::Query;
use axum::{extract::State, response::Json};
use chrono::{Duration, Utc};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

/// Lists every course in the catalogue.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<CourseResponse>`: All courses, oldest first (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool))]
pub async fn get_courses(
    State(pool): State<Pool>,
) -> Result<ApiResponse<Vec<CourseResponse>>, AppError> {
    info!("Fetching course catalogue");

    let courses = helper::run_query(&pool, |conn| {
        courses_dsl::courses
            .order(courses_dsl::id.asc())
            .select(CourseResponse::as_select())
            .load(conn)
    })
    .await?;

    info!("Successfully fetched {} courses", courses.len());
    Ok(ApiResponse::ok(courses))
}

/// Retrieves a course together with the IDs of its lessons and quizzes,
/// both in display order.
///
/// Query Parameters:
/// * `course_id`: The ID of the course.
///
/// Returns (wrapped in `ApiResponse`)
/// * `CourseDataResponse` (200 OK).
/// * `404 Not Found`: If the course does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_course_data(
    State(pool): State<Pool>,
    Query(params): Query<GetCourseDataParams>,
) -> Result<ApiResponse<CourseDataResponse>, AppError> {
    let course_id = params.course_id;
    info!("Fetching data for course {}", course_id);

    let data = helper::run_query(&pool, move |conn| {
        let course = courses_dsl::courses
            .find(course_id)
            .select(CourseResponse::as_select())
            .first(conn)
            .optional()?;
        let Some(course) = course else {
            return Ok(None);
        };

        let lesson_ids = lessons_dsl::lessons
            .filter(lessons_dsl::course_id.eq(course_id))
            .order((lessons_dsl::display_order.asc(), lessons_dsl::id.asc()))
            .select(lessons_dsl::id)
            .load::<i64>(conn)?;
        let quiz_ids = quizzes_dsl::quizzes
            .filter(quizzes_dsl::course_id.eq(course_id))
            .order((quizzes_dsl::display_order.asc(), quizzes_dsl::id.asc()))
            .select(quizzes_dsl::id)
            .load::<i64>(conn)?;

        Ok(Some(CourseDataResponse {
            course,
            lesson_ids,
            quiz_ids,
        }))
    })
    .await?;

    match data {
        Some(data) => {
            info!(
                "Successfully fetched course {} with {} lessons and {} quizzes",
                course_id,
                data.lesson_ids.len(),
                data.quiz_ids.len()
            );
            Ok(ApiResponse::ok(data))
        }
        None => {
            error!("Course {} not found", course_id);
            Err(AppError::NotFound(format!(
                "Course with ID {} not found.",
                course_id
            )))
        }
    }
}

/// Retrieves a lesson.
///
/// Query Parameters:
/// * `lesson_id`: The ID of the lesson.
///
/// Returns (wrapped in `ApiResponse`)
/// * `LessonResponse` (200 OK).
/// * `404 Not Found`: If the lesson does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_lesson_data(
    State(pool): State<Pool>,
    Query(params): Query<GetLessonDataParams>,
) -> Result<ApiResponse<LessonResponse>, AppError> {
    let lesson_id = params.lesson_id;
    info!("Fetching lesson {}", lesson_id);

    let lesson = helper::run_query(&pool, move |conn| {
        lessons_dsl::lessons
            .find(lesson_id)
            .select(LessonResponse::as_select())
            .first(conn)
            .optional()
    })
    .await?;

    lesson.map(ApiResponse::ok).ok_or_else(|| {
        error!("Lesson {} not found", lesson_id);
        AppError::NotFound(format!("Lesson with ID {} not found.", lesson_id))
    })
}

/// Enrolls a student in a course.
///
/// Request Body: `EnrollPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The new enrollment ID (201 Created).
/// * `404 Not Found`: If the student or the course does not exist.
/// * `409 Conflict`: If the student is already enrolled.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn enroll(
    State(pool): State<Pool>,
    Json(payload): Json<EnrollPayload>,
) -> Result<ApiResponse<i64>, AppError> {
    let student_id = payload.student_id;
    let course_id = payload.course_id;
    info!(
        "Attempting to enroll student {} in course {}",
        student_id, course_id
    );

    let enrollment_id = helper::run_transaction(&pool, move |conn| {
        diesel::insert_into(enr_dsl::enrollments)
            .values(&NewEnrollment {
                student_id,
                course_id,
            })
            .returning(enr_dsl::id)
            .get_result::<i64>(conn)
            .map_err(|e| {
                helper::constraint_error(
                    e,
                    || {
                        format!(
                            "Student with ID {} or Course with ID {} not found.",
                            student_id, course_id
                        )
                    },
                    || {
                        format!(
                            "Student {} is already enrolled in course {}.",
                            student_id, course_id
                        )
                    },
                )
            })
    })
    .await?;

    info!(
        "Student {} enrolled in course {}, enrollment_id: {}",
        student_id, course_id, enrollment_id
    );
    Ok(ApiResponse::created(enrollment_id))
}

/// Lists the courses a student is enrolled in, most recent enrollment first.
///
/// Query Parameters:
/// * `student_id`: The ID of the student.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<EnrolledCourse>` (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_my_courses(
    State(pool): State<Pool>,
    Query(params): Query<GetMyCoursesParams>,
) -> Result<ApiResponse<Vec<EnrolledCourse>>, AppError> {
    let student_id = params.student_id;
    info!("Fetching enrolled courses of student {}", student_id);

    let courses = helper::run_query(&pool, move |conn| {
        enr_dsl::enrollments
            .inner_join(courses_dsl::courses.on(enr_dsl::course_id.eq(courses_dsl::id)))
            .filter(enr_dsl::student_id.eq(student_id))
            .order((enr_dsl::enrolled_at.desc(), enr_dsl::id.desc()))
            .select((
                enr_dsl::id,
                courses_dsl::id,
                courses_dsl::title,
                courses_dsl::instructor,
                enr_dsl::enrolled_at,
                enr_dsl::completed,
            ))
            .load::<EnrolledCourse>(conn)
    })
    .await?;

    info!(
        "Student {} is enrolled in {} courses",
        student_id,
        courses.len()
    );
    Ok(ApiResponse::ok(courses))
}

/// Retrieves a quiz with its questions and the requesting user's attempts.
///
/// Correct choices are only disclosed to users allowed to manage quizzes.
/// `can_attempt` tells whether a new attempt would be accepted right now.
///
/// Query Parameters:
/// * `user_id`: The ID of the requesting user.
/// * `quiz_id`: The ID of the quiz.
///
/// Returns (wrapped in `ApiResponse`)
/// * `QuizDataResponse` (200 OK).
/// * `404 Not Found`: If the user or the quiz does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_quiz_data(
    State(pool): State<Pool>,
    Query(params): Query<GetQuizDataParams>,
) -> Result<ApiResponse<QuizDataResponse>, AppError> {
    let user_id = params.user_id;
    let quiz_id = params.quiz_id;
    info!("Fetching quiz {} for user {}", quiz_id, user_id);

    let now = Utc::now();
    let data = helper::run_transaction(&pool, move |conn| {
        let role = helper::load_role(conn, user_id)?;
        let quiz = quizzes_dsl::quizzes
            .find(quiz_id)
            .select(Quiz::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with ID {} not found.", quiz_id)))?;

        let enrolled = diesel::select(diesel::dsl::exists(
            enr_dsl::enrollments
                .filter(enr_dsl::student_id.eq(user_id))
                .filter(enr_dsl::course_id.eq(quiz.course_id)),
        ))
        .get_result::<bool>(conn)?;

        let questions = questions_dsl::questions
            .filter(questions_dsl::quiz_id.eq(quiz_id))
            .order((questions_dsl::display_order.asc(), questions_dsl::id.asc()))
            .select((
                questions_dsl::id,
                questions_dsl::prompt,
                questions_dsl::points,
                questions_dsl::display_order,
            ))
            .load::<(i64, String, i32, i32)>(conn)?;
        let question_ids: Vec<i64> = questions.iter().map(|(id, ..)| *id).collect();

        let reveal_answers = role.can(Capability::ManageQuizzes);
        let mut choices_by_question: HashMap<i64, Vec<ChoiceView>> = HashMap::new();
        for (id, question_id, label, is_correct, display_order) in choices_dsl::choices
            .filter(choices_dsl::question_id.eq_any(question_ids))
            .order((choices_dsl::display_order.asc(), choices_dsl::id.asc()))
            .select((
                choices_dsl::id,
                choices_dsl::question_id,
                choices_dsl::label,
                choices_dsl::is_correct,
                choices_dsl::display_order,
            ))
            .load::<(i64, i64, String, bool, i32)>(conn)?
        {
            choices_by_question
                .entry(question_id)
                .or_default()
                .push(ChoiceView {
                    id,
                    label,
                    display_order,
                    is_correct: reveal_answers.then_some(is_correct),
                });
        }

        let questions = questions
            .into_iter()
            .map(|(id, prompt, points, display_order)| QuestionView {
                id,
                prompt,
                points,
                display_order,
                choices: choices_by_question.remove(&id).unwrap_or_default(),
            })
            .collect();

        let attempts = attempts_dsl::attempts
            .filter(attempts_dsl::student_id.eq(user_id))
            .filter(attempts_dsl::quiz_id.eq(quiz_id))
            .order((attempts_dsl::started_at.desc(), attempts_dsl::id.desc()))
            .select(Attempt::as_select())
            .load(conn)?;
        let completed_attempts = attempts.iter().filter(|a| a.completed).count() as i64;

        let start_request = StartRequest {
            quiz_id,
            enrolled,
            active: quiz.active,
            deadline: quiz.deadline,
            completed_attempts,
            max_attempts: quiz.max_attempts,
        };

        Ok(QuizDataResponse {
            available: engine::is_available(quiz.active, quiz.deadline, now),
            can_attempt: engine::check_start(&start_request, now).is_ok(),
            quiz,
            questions,
            enrolled,
            completed_attempts,
            attempts,
        })
    })
    .await?;

    info!(
        "Successfully fetched quiz {} ({} questions) for user {}",
        quiz_id,
        data.questions.len(),
        user_id
    );
    Ok(ApiResponse::ok(data))
}

/// Starts an attempt at a quiz.
///
/// The enrollment row is locked for the duration of the check, so concurrent
/// requests for the same student and quiz are serialized. If the student
/// already has an open attempt it is returned instead of opening another one.
///
/// Request Body: `StartAttemptPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `StartAttemptResponse`: The new attempt (201 Created) or the open one (200 OK).
/// * `403 Forbidden`: If the student is not enrolled in the quiz's course.
/// * `404 Not Found`: If the quiz does not exist.
/// * `409 Conflict`: If all attempts are used up.
/// * `422 Unprocessable Entity`: If the quiz is inactive or past its deadline.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn start_attempt(
    State(pool): State<Pool>,
    Json(payload): Json<StartAttemptPayload>,
) -> Result<ApiResponse<StartAttemptResponse>, AppError> {
    let student_id = payload.student_id;
    let quiz_id = payload.quiz_id;
    info!(
        "Attempting to start attempt on quiz {} for student {}",
        quiz_id, student_id
    );

    let now = Utc::now();
    let (attempt, resumed, time_limit) = helper::run_transaction(&pool, move |conn| {
        let quiz = quizzes_dsl::quizzes
            .find(quiz_id)
            .select(Quiz::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("Quiz {}", quiz_id)))?;

        let enrollment_id = enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(student_id))
            .filter(enr_dsl::course_id.eq(quiz.course_id))
            .select(enr_dsl::id)
            .for_update()
            .first::<i64>(conn)
            .optional()?;

        // Looked up before counting, so an attempt finalized in between is
        // either still open here or already part of the count.
        let open_attempt = attempts_dsl::attempts
            .filter(attempts_dsl::student_id.eq(student_id))
            .filter(attempts_dsl::quiz_id.eq(quiz_id))
            .filter(attempts_dsl::completed.eq(false))
            .select(Attempt::as_select())
            .first(conn)
            .optional()?;

        let completed_attempts = attempts_dsl::attempts
            .filter(attempts_dsl::student_id.eq(student_id))
            .filter(attempts_dsl::quiz_id.eq(quiz_id))
            .filter(attempts_dsl::completed.eq(true))
            .count()
            .get_result::<i64>(conn)?;

        engine::check_start(
            &StartRequest {
                quiz_id,
                enrolled: enrollment_id.is_some(),
                active: quiz.active,
                deadline: quiz.deadline,
                completed_attempts,
                max_attempts: quiz.max_attempts,
            },
            now,
        )?;

        if let Some(open_attempt) = open_attempt {
            return Ok((open_attempt, true, quiz.time_limit_minutes));
        }

        let attempt = diesel::insert_into(attempts_dsl::attempts)
            .values(&NewAttempt {
                student_id,
                quiz_id,
                started_at: now,
            })
            .returning(Attempt::as_returning())
            .get_result(conn)?;
        Ok((attempt, false, quiz.time_limit_minutes))
    })
    .await?;

    let response = StartAttemptResponse {
        attempt_id: attempt.id,
        resumed,
        started_at: attempt.started_at,
        expires_at: time_limit.map(|minutes| attempt.started_at + Duration::minutes(i64::from(minutes))),
    };

    if resumed {
        info!(
            "Student {} resumed open attempt {} on quiz {}",
            student_id, attempt.id, quiz_id
        );
        Ok(ApiResponse::ok(response))
    } else {
        info!(
            "Student {} started attempt {} on quiz {}",
            student_id, attempt.id, quiz_id
        );
        Ok(ApiResponse::created(response))
    }
}

/// Records the chosen option for one question of an open attempt. Answering
/// the same question again replaces the previous choice.
///
/// Request Body: `SubmitAnswerPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The answer ID (200 OK).
/// * `403 Forbidden`: If the attempt belongs to another student.
/// * `404 Not Found`: If the attempt does not exist, the question is not part
///   of the attempt's quiz or the choice does not belong to the question.
/// * `409 Conflict`: If the attempt is already completed.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn submit_answer(
    State(pool): State<Pool>,
    Json(payload): Json<SubmitAnswerPayload>,
) -> Result<ApiResponse<i64>, AppError> {
    info!(
        "Student {} answers question {} of attempt {}",
        payload.student_id, payload.question_id, payload.attempt_id
    );
    debug!("Submit answer payload: {:?}", payload);

    let SubmitAnswerPayload {
        student_id,
        attempt_id,
        question_id,
        choice_id,
    } = payload;
    let now = Utc::now();

    let answer_id = helper::run_transaction(&pool, move |conn| {
        let attempt = attempts_dsl::attempts
            .find(attempt_id)
            .select(Attempt::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("Attempt {}", attempt_id)))?;

        engine::check_answerable(
            attempt.id,
            attempt.student_id,
            student_id,
            AttemptState::of_stored(attempt.completed),
        )?;

        let question_quiz = questions_dsl::questions
            .find(question_id)
            .select(questions_dsl::quiz_id)
            .first::<i64>(conn)
            .optional()?;
        if question_quiz != Some(attempt.quiz_id) {
            return Err(EngineError::NotFound(format!(
                "Question {} in quiz {}",
                question_id, attempt.quiz_id
            ))
            .into());
        }

        let choice_question = choices_dsl::choices
            .find(choice_id)
            .select(choices_dsl::question_id)
            .first::<i64>(conn)
            .optional()?;
        if choice_question != Some(question_id) {
            return Err(EngineError::NotFound(format!(
                "Choice {} of question {}",
                choice_id, question_id
            ))
            .into());
        }

        let answer_id = diesel::insert_into(answers_dsl::answers)
            .values(&NewAnswer {
                attempt_id,
                question_id,
                choice_id,
                answered_at: now,
            })
            .on_conflict((answers_dsl::attempt_id, answers_dsl::question_id))
            .do_update()
            .set((
                answers_dsl::choice_id.eq(choice_id),
                answers_dsl::answered_at.eq(now),
            ))
            .returning(answers_dsl::id)
            .get_result::<i64>(conn)?;
        Ok(answer_id)
    })
    .await?;

    info!(
        "Stored answer {} (choice {}) for question {} of attempt {}",
        answer_id, choice_id, question_id, attempt_id
    );
    Ok(ApiResponse::ok(answer_id))
}

/// Grades an attempt and closes it.
///
/// Calling this again on a completed attempt returns the stored result
/// without changing anything.
///
/// Request Body: `FinalizeAttemptPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `GradeResponse` (200 OK).
/// * `403 Forbidden`: If the attempt belongs to another student.
/// * `404 Not Found`: If the attempt does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn finalize_attempt(
    State(pool): State<Pool>,
    Json(payload): Json<FinalizeAttemptPayload>,
) -> Result<ApiResponse<GradeResponse>, AppError> {
    let student_id = payload.student_id;
    let attempt_id = payload.attempt_id;
    info!(
        "Attempting to finalize attempt {} for student {}",
        attempt_id, student_id
    );

    let now = Utc::now();
    let grade = helper::run_transaction(&pool, move |conn| {
        let attempt = attempts_dsl::attempts
            .find(attempt_id)
            .select(Attempt::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("Attempt {}", attempt_id)))?;
        engine::check_owner(attempt.id, attempt.student_id, student_id)?;

        let (passing_score, quiz_title, course_id) = quizzes_dsl::quizzes
            .find(attempt.quiz_id)
            .select((
                quizzes_dsl::passing_score,
                quizzes_dsl::title,
                quizzes_dsl::course_id,
            ))
            .first::<(i32, String, i64)>(conn)?;

        // Serializes with start_attempt, which counts completed attempts
        // under the same lock.
        enr_dsl::enrollments
            .filter(enr_dsl::student_id.eq(attempt.student_id))
            .filter(enr_dsl::course_id.eq(course_id))
            .select(enr_dsl::id)
            .for_update()
            .first::<i64>(conn)
            .optional()?;

        let graded = answers_dsl::answers
            .inner_join(
                questions_dsl::questions.on(answers_dsl::question_id.eq(questions_dsl::id)),
            )
            .inner_join(choices_dsl::choices.on(answers_dsl::choice_id.eq(choices_dsl::id)))
            .filter(answers_dsl::attempt_id.eq(attempt_id))
            .select((questions_dsl::points, choices_dsl::is_correct))
            .load::<(i32, bool)>(conn)?;
        let outcome = engine::grade(
            graded
                .into_iter()
                .map(|(points, correct)| GradedAnswer { points, correct }),
            passing_score,
        );

        if attempt.completed {
            if outcome.percentage != attempt.percentage {
                warn!(
                    "Regrading completed attempt {} gives {:.2}% instead of stored {:.2}%",
                    attempt_id, outcome.percentage, attempt.percentage
                );
            }
            return Ok(GradeResponse::from_stored(&attempt, now));
        }

        let stored = diesel::update(attempts_dsl::attempts.find(attempt_id))
            .set((
                attempts_dsl::obtained_score.eq(outcome.obtained),
                attempts_dsl::max_score.eq(outcome.max),
                attempts_dsl::percentage.eq(outcome.percentage),
                attempts_dsl::passed.eq(outcome.passed),
                attempts_dsl::completed.eq(true),
                attempts_dsl::finished_at.eq(now),
            ))
            .returning(Attempt::as_returning())
            .get_result(conn)?;

        diesel::insert_into(n_dsl::notifications)
            .values(&Notice::result(&quiz_title, &outcome).addressed_to(
                student_id,
                Some(attempt.quiz_id),
                Some(course_id),
                now,
            ))
            .execute(conn)?;

        Ok(GradeResponse::from_stored(&stored, now))
    })
    .await?;

    info!(
        "Attempt {} graded: {}/{} points, {:.2}%, passed: {}",
        attempt_id, grade.obtained_score, grade.max_score, grade.percentage, grade.passed
    );
    Ok(ApiResponse::ok(grade))
}

/// Retrieves an attempt with every recorded answer.
///
/// Students may only see their own attempts; instructors and admins may see any.
///
/// Query Parameters:
/// * `user_id`: The ID of the requesting user.
/// * `attempt_id`: The ID of the attempt.
///
/// Returns (wrapped in `ApiResponse`)
/// * `AttemptResultResponse` (200 OK).
/// * `403 Forbidden`: If the user may not see the attempt.
/// * `404 Not Found`: If the user or the attempt does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_attempt_result(
    State(pool): State<Pool>,
    Query(params): Query<GetAttemptResultParams>,
) -> Result<ApiResponse<AttemptResultResponse>, AppError> {
    let user_id = params.user_id;
    let attempt_id = params.attempt_id;
    info!("Fetching result of attempt {} for user {}", attempt_id, user_id);

    let result = helper::run_transaction(&pool, move |conn| {
        let role = helper::load_role(conn, user_id)?;
        let attempt = attempts_dsl::attempts
            .find(attempt_id)
            .select(Attempt::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::NotFound(format!("Attempt {}", attempt_id)))?;

        if !role.can(Capability::ViewAnyAttempt) {
            engine::check_owner(attempt.id, attempt.student_id, user_id)?;
        }

        let (quiz_title, passing_score) = quizzes_dsl::quizzes
            .find(attempt.quiz_id)
            .select((quizzes_dsl::title, quizzes_dsl::passing_score))
            .first::<(String, i32)>(conn)?;

        let answers = answers_dsl::answers
            .inner_join(
                questions_dsl::questions.on(answers_dsl::question_id.eq(questions_dsl::id)),
            )
            .inner_join(choices_dsl::choices.on(answers_dsl::choice_id.eq(choices_dsl::id)))
            .filter(answers_dsl::attempt_id.eq(attempt_id))
            .order((questions_dsl::display_order.asc(), questions_dsl::id.asc()))
            .select((
                questions_dsl::id,
                questions_dsl::prompt,
                questions_dsl::points,
                choices_dsl::id,
                choices_dsl::label,
                choices_dsl::is_correct,
            ))
            .load::<AnswerResult>(conn)?;

        Ok(AttemptResultResponse {
            attempt,
            quiz_title,
            passing_score,
            answers,
        })
    })
    .await?;

    info!(
        "Successfully fetched attempt {} with {} answers",
        attempt_id,
        result.answers.len()
    );
    Ok(ApiResponse::ok(result))
}

/// Lists a user's notifications, newest first.
///
/// Query Parameters:
/// * `user_id`: The ID of the user.
/// * `unread_only`: If true, only unread notifications are returned.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<Notification>` (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_notifications(
    State(pool): State<Pool>,
    Query(params): Query<GetNotificationsParams>,
) -> Result<ApiResponse<Vec<Notification>>, AppError> {
    let user_id = params.user_id;
    let unread_only = params.unread_only;
    info!(
        "Fetching notifications of user {} (unread_only: {})",
        user_id, unread_only
    );

    let notifications = helper::run_query(&pool, move |conn| {
        let mut query = n_dsl::notifications
            .filter(n_dsl::user_id.eq(user_id))
            .select(Notification::as_select())
            .into_boxed();
        if unread_only {
            query = query.filter(n_dsl::is_read.eq(false));
        }
        query
            .order((n_dsl::created_at.desc(), n_dsl::id.desc()))
            .load(conn)
    })
    .await?;

    info!(
        "Fetched {} notifications for user {}",
        notifications.len(),
        user_id
    );
    Ok(ApiResponse::ok(notifications))
}

/// Marks one notification as read and returns what it links to.
///
/// Request Body: `NotificationPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `NotificationTarget`: Linked quiz and course, if any (200 OK).
/// * `404 Not Found`: If the notification does not exist or belongs to another user.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn mark_notification_read(
    State(pool): State<Pool>,
    Json(payload): Json<NotificationPayload>,
) -> Result<ApiResponse<NotificationTarget>, AppError> {
    let user_id = payload.user_id;
    let notification_id = payload.notification_id;
    info!(
        "Marking notification {} of user {} as read",
        notification_id, user_id
    );

    let target = helper::run_query(&pool, move |conn| {
        diesel::update(
            n_dsl::notifications
                .filter(n_dsl::id.eq(notification_id))
                .filter(n_dsl::user_id.eq(user_id)),
        )
        .set(n_dsl::is_read.eq(true))
        .returning((n_dsl::quiz_id, n_dsl::course_id))
        .get_result::<(Option<i64>, Option<i64>)>(conn)
        .optional()
    })
    .await?;

    match target {
        Some((quiz_id, course_id)) => {
            info!("Notification {} marked as read", notification_id);
            Ok(ApiResponse::ok(NotificationTarget { quiz_id, course_id }))
        }
        None => {
            warn!(
                "Notification {} not found for user {}",
                notification_id, user_id
            );
            Err(AppError::NotFound(format!(
                "Notification with ID {} not found.",
                notification_id
            )))
        }
    }
}

/// Marks every unread notification of a user as read.
///
/// Request Body: `MarkAllNotificationsReadPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `usize`: Number of notifications that changed (200 OK).
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn mark_all_notifications_read(
    State(pool): State<Pool>,
    Json(payload): Json<MarkAllNotificationsReadPayload>,
) -> Result<ApiResponse<usize>, AppError> {
    let user_id = payload.user_id;
    info!("Marking all notifications of user {} as read", user_id);

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::update(
            n_dsl::notifications
                .filter(n_dsl::user_id.eq(user_id))
                .filter(n_dsl::is_read.eq(false)),
        )
        .set(n_dsl::is_read.eq(true))
        .execute(conn)
    })
    .await?;

    info!(
        "Marked {} notifications of user {} as read",
        rows_affected, user_id
    );
    Ok(ApiResponse::ok(rows_affected))
}

/// Deletes one of the user's notifications.
///
/// Request Body: `NotificationPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if deleted (200 OK).
/// * `404 Not Found`: If the notification does not exist or belongs to another user.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn delete_notification(
    State(pool): State<Pool>,
    Json(payload): Json<NotificationPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let user_id = payload.user_id;
    let notification_id = payload.notification_id;
    info!(
        "Deleting notification {} of user {}",
        notification_id, user_id
    );

    let rows_affected = helper::run_query(&pool, move |conn| {
        diesel::delete(
            n_dsl::notifications
                .filter(n_dsl::id.eq(notification_id))
                .filter(n_dsl::user_id.eq(user_id)),
        )
        .execute(conn)
    })
    .await?;

    helper::expect_single_row(rows_affected, "Notification", notification_id)?;
    info!("Notification {} deleted", notification_id);
    Ok(ApiResponse::ok(true))
}
