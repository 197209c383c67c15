//! Notification generation.
//!
//! Deadline reminders are produced in batches by [`generate_deadline_notifications`],
//! which is meant to be triggered from outside (an instructor request or a
//! periodic job). Event notices (new quiz, new lesson, graded attempt) are
//! written next to the change that caused them.

use crate::engine::GradeOutcome;
use crate::model::student::NewNotification;
use crate::roles::UnknownVariant;
use crate::schema::{enrollments::dsl as enr_dsl, notifications::dsl as n_dsl, quizzes::dsl as quizzes_dsl};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Deadline,
    NewQuiz,
    Result,
    CourseUpdate,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Deadline => "deadline",
            NotificationKind::NewQuiz => "new_quiz",
            NotificationKind::Result => "result",
            NotificationKind::CourseUpdate => "course_update",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deadline" => Ok(NotificationKind::Deadline),
            "new_quiz" => Ok(NotificationKind::NewQuiz),
            "result" => Ok(NotificationKind::Result),
            "course_update" => Ok(NotificationKind::CourseUpdate),
            other => Err(UnknownVariant {
                kind: "notification kind",
                value: other.to_string(),
            }),
        }
    }
}

/// How close a quiz deadline is, which decides the wording of the reminder
/// and how long to wait before repeating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineTier {
    /// Deadline within the next 24 hours.
    Urgent,
    /// Deadline between 24 hours and 3 days away.
    Reminder,
}

impl DeadlineTier {
    pub const ALL: [DeadlineTier; 2] = [DeadlineTier::Urgent, DeadlineTier::Reminder];

    /// `(start, end]` range of deadlines covered by this tier.
    pub fn window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            DeadlineTier::Urgent => (now, now + Duration::hours(24)),
            DeadlineTier::Reminder => (now + Duration::hours(24), now + Duration::days(3)),
        }
    }

    pub fn cooldown(self) -> Duration {
        match self {
            DeadlineTier::Urgent => Duration::hours(12),
            DeadlineTier::Reminder => Duration::days(2),
        }
    }
}

/// Text and kind of a notification before it is addressed to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn deadline(tier: DeadlineTier, quiz_title: &str) -> Self {
        let (title, message) = match tier {
            DeadlineTier::Urgent => (
                format!("Urgent deadline: {}", quiz_title),
                format!(
                    "The quiz \"{}\" is due in less than 24 hours. Hurry up!",
                    quiz_title
                ),
            ),
            DeadlineTier::Reminder => (
                format!("Upcoming deadline: {}", quiz_title),
                format!("The quiz \"{}\" is due within 3 days.", quiz_title),
            ),
        };
        Notice {
            kind: NotificationKind::Deadline,
            title,
            message,
        }
    }

    pub fn new_quiz(quiz_title: &str, course_title: &str) -> Self {
        Notice {
            kind: NotificationKind::NewQuiz,
            title: format!("New quiz: {}", quiz_title),
            message: format!(
                "A new quiz \"{}\" was published in \"{}\".",
                quiz_title, course_title
            ),
        }
    }

    pub fn course_update(lesson_title: &str, course_title: &str) -> Self {
        Notice {
            kind: NotificationKind::CourseUpdate,
            title: format!("New lesson in {}", course_title),
            message: format!(
                "The lesson \"{}\" was added to \"{}\".",
                lesson_title, course_title
            ),
        }
    }

    pub fn result(quiz_title: &str, outcome: &GradeOutcome) -> Self {
        let verdict = if outcome.passed { "passed" } else { "did not pass" };
        Notice {
            kind: NotificationKind::Result,
            title: format!("Result: {}", quiz_title),
            message: format!(
                "You {} \"{}\" with {:.1}% ({} of {} points).",
                verdict, quiz_title, outcome.percentage, outcome.obtained, outcome.max
            ),
        }
    }

    pub fn addressed_to(
        &self,
        user_id: i64,
        quiz_id: Option<i64>,
        course_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> NewNotification {
        NewNotification {
            user_id,
            kind: self.kind.as_str().to_string(),
            title: self.title.clone(),
            message: self.message.clone(),
            quiz_id,
            course_id,
            created_at: now,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRunSummary {
    pub urgent: usize,
    pub reminders: usize,
}

impl DeadlineRunSummary {
    pub fn total(&self) -> usize {
        self.urgent + self.reminders
    }
}

/// Creates deadline reminders for every enrolled student of every active
/// quiz due within the next three days, skipping students that already got a
/// deadline notice for the quiz within the tier's cooldown.
pub fn generate_deadline_notifications(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
) -> QueryResult<DeadlineRunSummary> {
    conn.transaction(|tx_conn| {
        let mut summary = DeadlineRunSummary::default();
        for tier in DeadlineTier::ALL {
            let created = generate_for_tier(tx_conn, tier, now)?;
            match tier {
                DeadlineTier::Urgent => summary.urgent = created,
                DeadlineTier::Reminder => summary.reminders = created,
            }
        }
        info!(
            "Deadline notification run at {} created {} urgent and {} reminder notifications",
            now, summary.urgent, summary.reminders
        );
        Ok(summary)
    })
}

fn generate_for_tier(
    conn: &mut PgConnection,
    tier: DeadlineTier,
    now: DateTime<Utc>,
) -> QueryResult<usize> {
    let (start, end) = tier.window(now);
    let due_quizzes = quizzes_dsl::quizzes
        .filter(quizzes_dsl::active.eq(true))
        .filter(quizzes_dsl::deadline.gt(start))
        .filter(quizzes_dsl::deadline.le(end))
        .select((quizzes_dsl::id, quizzes_dsl::course_id, quizzes_dsl::title))
        .load::<(i64, i64, String)>(conn)?;
    debug!("{:?} tier: {} quizzes due", tier, due_quizzes.len());

    let mut created = 0;
    for (quiz_id, course_id, quiz_title) in due_quizzes {
        let students = enr_dsl::enrollments
            .filter(enr_dsl::course_id.eq(course_id))
            .select(enr_dsl::student_id)
            .load::<i64>(conn)?;
        if students.is_empty() {
            continue;
        }

        let recently_notified: HashSet<i64> = n_dsl::notifications
            .filter(n_dsl::quiz_id.eq(quiz_id))
            .filter(n_dsl::kind.eq(NotificationKind::Deadline.as_str()))
            .filter(n_dsl::created_at.ge(now - tier.cooldown()))
            .filter(n_dsl::user_id.eq_any(students.clone()))
            .select(n_dsl::user_id)
            .load::<i64>(conn)?
            .into_iter()
            .collect();

        let notice = Notice::deadline(tier, &quiz_title);
        let rows: Vec<NewNotification> = students
            .into_iter()
            .filter(|student_id| !recently_notified.contains(student_id))
            .map(|student_id| notice.addressed_to(student_id, Some(quiz_id), Some(course_id), now))
            .collect();
        if rows.is_empty() {
            continue;
        }

        created += diesel::insert_into(n_dsl::notifications)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(created)
}

/// Addresses `notice` to every student enrolled in `course_id`.
pub fn notify_enrolled_students(
    conn: &mut PgConnection,
    course_id: i64,
    quiz_id: Option<i64>,
    notice: &Notice,
    now: DateTime<Utc>,
) -> QueryResult<usize> {
    let students = enr_dsl::enrollments
        .filter(enr_dsl::course_id.eq(course_id))
        .select(enr_dsl::student_id)
        .load::<i64>(conn)?;
    if students.is_empty() {
        return Ok(0);
    }

    let rows: Vec<NewNotification> = students
        .into_iter()
        .map(|student_id| notice.addressed_to(student_id, quiz_id, Some(course_id), now))
        .collect();
    diesel::insert_into(n_dsl::notifications)
        .values(&rows)
        .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_adjacent_half_open_ranges() {
        let now = Utc::now();
        let (urgent_start, urgent_end) = DeadlineTier::Urgent.window(now);
        let (reminder_start, reminder_end) = DeadlineTier::Reminder.window(now);

        assert_eq!(urgent_start, now);
        assert_eq!(urgent_end, now + Duration::hours(24));
        assert_eq!(reminder_start, urgent_end);
        assert_eq!(reminder_end, now + Duration::days(3));
    }

    #[test]
    fn cooldowns_follow_urgency() {
        assert_eq!(DeadlineTier::Urgent.cooldown(), Duration::hours(12));
        assert_eq!(DeadlineTier::Reminder.cooldown(), Duration::days(2));
    }

    #[test]
    fn deadline_notices_share_one_kind() {
        let urgent = Notice::deadline(DeadlineTier::Urgent, "Final exam");
        let reminder = Notice::deadline(DeadlineTier::Reminder, "Final exam");
        assert_eq!(urgent.kind, NotificationKind::Deadline);
        assert_eq!(reminder.kind, NotificationKind::Deadline);
        assert!(urgent.message.contains("less than 24 hours"));
        assert!(reminder.message.contains("3 days"));
    }

    #[test]
    fn result_notice_reports_score() {
        let outcome = GradeOutcome {
            obtained: 1,
            max: 2,
            percentage: 50.0,
            passed: false,
        };
        let notice = Notice::result("Quiz 1", &outcome);
        assert_eq!(notice.kind, NotificationKind::Result);
        assert_eq!(
            notice.message,
            "You did not pass \"Quiz 1\" with 50.0% (1 of 2 points)."
        );
    }

    #[test]
    fn addressed_notice_carries_references() {
        let now = Utc::now();
        let row = Notice::new_quiz("Quiz", "Rust 101").addressed_to(5, Some(9), Some(3), now);
        assert_eq!(row.user_id, 5);
        assert_eq!(row.kind, "new_quiz");
        assert_eq!(row.quiz_id, Some(9));
        assert_eq!(row.course_id, Some(3));
        assert_eq!(row.created_at, now);
    }
}
