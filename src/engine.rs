//! Quiz attempt rules.
//!
//! Everything in here is free of I/O: handlers load the facts from the
//! database, pass them in together with the current time and persist whatever
//! comes back. An attempt moves `NotStarted -> InProgress -> Completed` and
//! never leaves `Completed`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Quiz {0} is not available")]
    QuizUnavailable(i64),

    #[error("All attempts used ({completed} of {max})")]
    AttemptsExhausted { completed: i64, max: i32 },

    #[error("Attempt {0} is already completed")]
    AttemptCompleted(i64),

    #[error("{0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    NotStarted,
    InProgress,
    Completed,
}

impl AttemptState {
    /// State of a persisted attempt row.
    pub fn of_stored(completed: bool) -> Self {
        if completed {
            AttemptState::Completed
        } else {
            AttemptState::InProgress
        }
    }
}

/// A quiz is available iff it is active and its deadline (if any) has not passed.
pub fn is_available(active: bool, deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    active && deadline.is_none_or(|deadline| now <= deadline)
}

/// Facts needed to decide whether a student may open a new attempt.
#[derive(Debug, Clone, Copy)]
pub struct StartRequest {
    pub quiz_id: i64,
    pub enrolled: bool,
    pub active: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub completed_attempts: i64,
    pub max_attempts: i32,
}

pub fn check_start(request: &StartRequest, now: DateTime<Utc>) -> Result<(), EngineError> {
    if !request.enrolled {
        return Err(EngineError::PermissionDenied(format!(
            "student is not enrolled in the course of quiz {}",
            request.quiz_id
        )));
    }
    if !is_available(request.active, request.deadline, now) {
        return Err(EngineError::QuizUnavailable(request.quiz_id));
    }
    if request.completed_attempts >= i64::from(request.max_attempts) {
        return Err(EngineError::AttemptsExhausted {
            completed: request.completed_attempts,
            max: request.max_attempts,
        });
    }
    Ok(())
}

pub fn check_owner(attempt_id: i64, owner_id: i64, requester_id: i64) -> Result<(), EngineError> {
    if owner_id != requester_id {
        return Err(EngineError::PermissionDenied(format!(
            "attempt {} does not belong to user {}",
            attempt_id, requester_id
        )));
    }
    Ok(())
}

/// Answers may only be recorded by the owner of an attempt that is still open.
pub fn check_answerable(
    attempt_id: i64,
    owner_id: i64,
    requester_id: i64,
    state: AttemptState,
) -> Result<(), EngineError> {
    check_owner(attempt_id, owner_id, requester_id)?;
    match state {
        AttemptState::InProgress => Ok(()),
        AttemptState::Completed => Err(EngineError::AttemptCompleted(attempt_id)),
        AttemptState::NotStarted => Err(EngineError::NotFound(format!("Attempt {}", attempt_id))),
    }
}

/// One stored answer as seen by the grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedAnswer {
    pub points: i32,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeOutcome {
    pub obtained: i32,
    pub max: i32,
    pub percentage: f64,
    pub passed: bool,
}

pub fn percentage(obtained: i32, max: i32) -> f64 {
    if max == 0 {
        0.0
    } else {
        f64::from(obtained) / f64::from(max) * 100.0
    }
}

/// Grades the submitted answers of an attempt.
///
/// Only answered questions count: each answer adds its question's points to
/// `max`, and to `obtained` when the chosen option is correct. Questions the
/// student skipped contribute to neither.
pub fn grade<I>(answers: I, passing_score: i32) -> GradeOutcome
where
    I: IntoIterator<Item = GradedAnswer>,
{
    let (obtained, max) = answers
        .into_iter()
        .fold((0, 0), |(obtained, max), answer| {
            let gained = if answer.correct { answer.points } else { 0 };
            (obtained + gained, max + answer.points)
        });
    let percentage = percentage(obtained, max);

    GradeOutcome {
        obtained,
        max,
        percentage,
        passed: percentage >= f64::from(passing_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start_request() -> StartRequest {
        StartRequest {
            quiz_id: 7,
            enrolled: true,
            active: true,
            deadline: None,
            completed_attempts: 0,
            max_attempts: 2,
        }
    }

    #[test]
    fn availability_depends_on_active_flag_and_deadline() {
        let now = Utc::now();
        assert!(is_available(true, None, now));
        assert!(!is_available(false, None, now));
        assert!(is_available(true, Some(now), now));
        assert!(is_available(true, Some(now + Duration::hours(1)), now));
        assert!(!is_available(true, Some(now - Duration::seconds(1)), now));
        assert!(!is_available(false, Some(now + Duration::hours(1)), now));
    }

    #[test]
    fn start_is_allowed_while_attempts_remain() {
        let now = Utc::now();
        let mut request = start_request();
        assert_eq!(check_start(&request, now), Ok(()));
        request.completed_attempts = 1;
        assert_eq!(check_start(&request, now), Ok(()));
    }

    #[test]
    fn start_fails_when_attempts_are_exhausted() {
        let request = StartRequest {
            completed_attempts: 2,
            ..start_request()
        };
        assert_eq!(
            check_start(&request, Utc::now()),
            Err(EngineError::AttemptsExhausted {
                completed: 2,
                max: 2
            })
        );
    }

    #[test]
    fn start_checks_enrollment_before_availability() {
        let now = Utc::now();
        let request = StartRequest {
            enrolled: false,
            active: false,
            ..start_request()
        };
        assert!(matches!(
            check_start(&request, now),
            Err(EngineError::PermissionDenied(_))
        ));
    }

    #[test]
    fn start_fails_after_deadline_even_if_active() {
        let now = Utc::now();
        let request = StartRequest {
            deadline: Some(now - Duration::minutes(5)),
            ..start_request()
        };
        assert_eq!(
            check_start(&request, now),
            Err(EngineError::QuizUnavailable(7))
        );
    }

    #[test]
    fn answers_only_accepted_on_own_open_attempt() {
        assert_eq!(check_answerable(1, 10, 10, AttemptState::InProgress), Ok(()));
        assert!(matches!(
            check_answerable(1, 10, 11, AttemptState::InProgress),
            Err(EngineError::PermissionDenied(_))
        ));
        assert_eq!(
            check_answerable(1, 10, 10, AttemptState::Completed),
            Err(EngineError::AttemptCompleted(1))
        );
    }

    #[test]
    fn grade_all_correct_passes() {
        let answers = [
            GradedAnswer {
                points: 1,
                correct: true,
            },
            GradedAnswer {
                points: 1,
                correct: true,
            },
        ];
        let outcome = grade(answers, 70);
        assert_eq!(outcome.obtained, 2);
        assert_eq!(outcome.max, 2);
        assert_eq!(outcome.percentage, 100.0);
        assert!(outcome.passed);
    }

    #[test]
    fn grade_half_correct_fails_threshold_of_seventy() {
        let answers = [
            GradedAnswer {
                points: 1,
                correct: true,
            },
            GradedAnswer {
                points: 1,
                correct: false,
            },
        ];
        let outcome = grade(answers, 70);
        assert_eq!(outcome.percentage, 50.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn grade_weights_by_points() {
        let answers = [
            GradedAnswer {
                points: 3,
                correct: true,
            },
            GradedAnswer {
                points: 1,
                correct: false,
            },
        ];
        let outcome = grade(answers, 75);
        assert_eq!(outcome.obtained, 3);
        assert_eq!(outcome.max, 4);
        assert_eq!(outcome.percentage, 75.0);
        assert!(outcome.passed);
    }

    #[test]
    fn grade_without_answers_is_zero_percent() {
        let outcome = grade(Vec::new(), 0);
        assert_eq!(outcome.max, 0);
        assert_eq!(outcome.percentage, 0.0);
        // a zero threshold is met by a zero score
        assert!(outcome.passed);

        assert!(!grade(Vec::new(), 1).passed);
    }

    #[test]
    fn regrading_same_answers_is_stable() {
        let answers = vec![
            GradedAnswer {
                points: 2,
                correct: true,
            },
            GradedAnswer {
                points: 1,
                correct: false,
            },
        ];
        assert_eq!(grade(answers.clone(), 60), grade(answers, 60));
    }

    #[test]
    fn stored_state_mapping() {
        assert_eq!(AttemptState::of_stored(false), AttemptState::InProgress);
        assert_eq!(AttemptState::of_stored(true), AttemptState::Completed);
    }
}
