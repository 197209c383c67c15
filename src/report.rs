//! Grade aggregation and certificates.

use crate::model::student::Attempt;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Average (in percent) a student needs over a course's quizzes to pass it.
pub const COURSE_PASS_AVERAGE: f64 = 70.0;

const CERTIFICATE_WIDTH: usize = 64;

/// The completed attempt with the highest percentage; the earliest one wins ties.
pub fn best_attempt(attempts: &[Attempt]) -> Option<&Attempt> {
    attempts
        .iter()
        .filter(|attempt| attempt.completed)
        .min_by(|a, b| match b.percentage.total_cmp(&a.percentage) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        })
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CourseStanding {
    pub average: f64,
    pub quizzes_completed: usize,
    pub total_quizzes: usize,
    pub passed: bool,
}

/// Standing of a student given the best percentage per quiz of the course
/// (`None` for quizzes without a completed attempt).
///
/// The average only covers completed quizzes, but passing also requires every
/// quiz to be completed.
pub fn course_standing(best_percentages: &[Option<f64>]) -> CourseStanding {
    let completed: Vec<f64> = best_percentages.iter().flatten().copied().collect();
    let average = mean(&completed);
    let total_quizzes = best_percentages.len();

    CourseStanding {
        average,
        quizzes_completed: completed.len(),
        total_quizzes,
        passed: average >= COURSE_PASS_AVERAGE && completed.len() == total_quizzes,
    }
}

/// Full name if the user set one, username otherwise.
pub fn display_name(full_name: &str, username: &str) -> String {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        username.to_string()
    } else {
        full_name.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateData {
    pub student_name: String,
    pub course_title: String,
    pub instructor: String,
    pub completion_date: NaiveDate,
    pub average_percentage: f64,
}

/// Renders the fixed-layout certificate document.
pub fn render_certificate(data: &CertificateData) -> String {
    let rule = |c: char| c.to_string().repeat(CERTIFICATE_WIDTH);
    let lines = [
        rule('='),
        String::new(),
        center("CERTIFICATE"),
        String::new(),
        center("Awarded to:"),
        center(&data.student_name),
        String::new(),
        center("For successfully completing the course:"),
        center(&data.course_title),
        String::new(),
        center(&format!("With an average of: {:.1}%", data.average_percentage)),
        String::new(),
        center(&format!("Instructor: {}", data.instructor)),
        center(&format!("Date: {}", data.completion_date.format("%d %B %Y"))),
        String::new(),
        rule('-'),
        center("E-learning Platform - Certificate of Completion"),
        rule('='),
    ];
    let mut document = lines.join("\n");
    document.push('\n');
    document
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    if len >= CERTIFICATE_WIDTH {
        return text.to_string();
    }
    let pad = (CERTIFICATE_WIDTH - len) / 2;
    format!("{}{}", " ".repeat(pad), text).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn attempt(id: i64, percentage: f64, completed: bool) -> Attempt {
        Attempt {
            id,
            student_id: 1,
            quiz_id: 1,
            started_at: Utc::now(),
            finished_at: completed.then(Utc::now),
            obtained_score: 0,
            max_score: 0,
            percentage,
            passed: false,
            completed,
        }
    }

    #[test]
    fn best_attempt_ignores_open_attempts_and_prefers_earliest_tie() {
        let attempts = vec![
            attempt(1, 60.0, true),
            attempt(2, 80.0, true),
            attempt(3, 100.0, false),
            attempt(4, 80.0, true),
        ];
        assert_eq!(best_attempt(&attempts).map(|a| a.id), Some(2));
        assert!(best_attempt(&[attempt(5, 90.0, false)]).is_none());
    }

    #[test]
    fn standing_requires_all_quizzes_completed() {
        let standing = course_standing(&[Some(100.0), None]);
        assert_eq!(standing.average, 100.0);
        assert_eq!(standing.quizzes_completed, 1);
        assert_eq!(standing.total_quizzes, 2);
        assert!(!standing.passed);
    }

    #[test]
    fn standing_passes_at_seventy_average() {
        let standing = course_standing(&[Some(60.0), Some(80.0)]);
        assert_eq!(standing.average, 70.0);
        assert!(standing.passed);

        assert!(!course_standing(&[Some(69.0), Some(70.0)]).passed);
    }

    #[test]
    fn course_without_quizzes_is_not_passed() {
        let standing = course_standing(&[]);
        assert_eq!(standing.average, 0.0);
        assert!(!standing.passed);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(display_name("  ", "jdoe"), "jdoe");
        assert_eq!(display_name("Jane Doe", "jdoe"), "Jane Doe");
    }

    #[test]
    fn certificate_contains_all_fields() {
        let document = render_certificate(&CertificateData {
            student_name: "Jane Doe".to_string(),
            course_title: "Rust 101".to_string(),
            instructor: "Ferris".to_string(),
            completion_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            average_percentage: 87.5,
        });
        assert!(document.contains("CERTIFICATE"));
        assert!(document.contains("Jane Doe"));
        assert!(document.contains("Rust 101"));
        assert!(document.contains("Instructor: Ferris"));
        assert!(document.contains("Date: 01 June 2025"));
        assert!(document.contains("With an average of: 87.5%"));
        assert!(document.lines().all(|line| line.chars().count() <= CERTIFICATE_WIDTH));
    }
}
