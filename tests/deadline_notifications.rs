use chrono::{DateTime, Duration, TimeZone, Utc};
use lightweight_elearning_server::notify::{self, DeadlineRunSummary};
use lightweight_elearning_server::roles::Role;

mod helpers;
use helpers::{
    TestPool, TestQuiz, count_notifications, create_test_course, create_test_quiz,
    create_test_user, enroll_test_student, setup_test_environment,
};

// Each test runs at its own instant far in the future, so quizzes created by
// other tests never fall into its deadline windows.

async fn run_generation(pool: &TestPool, now: DateTime<Utc>) -> DeadlineRunSummary {
    let conn = pool.get().await.expect("Failed to get conn for generation");
    conn.interact(move |conn| notify::generate_deadline_notifications(conn, now))
        .await
        .expect("Interact failed for generation")
        .expect("Deadline generation failed")
}

#[tokio::test]
async fn test_urgent_notification_respects_cooldown() {
    let (_server, pool) = setup_test_environment().await;
    let now = Utc.with_ymd_and_hms(2201, 3, 1, 9, 0, 0).unwrap();
    let student_id = create_test_user(&pool, Role::Student).await;
    let course_id = create_test_course(&pool, "Urgent Course").await;
    enroll_test_student(&pool, student_id, course_id).await;
    create_test_quiz(
        &pool,
        course_id,
        TestQuiz {
            deadline: Some(now + Duration::hours(12)),
            ..TestQuiz::default()
        },
    )
    .await;

    let first = run_generation(&pool, now).await;
    assert!(first.urgent >= 1);
    assert_eq!(count_notifications(&pool, student_id, "deadline").await, 1);

    run_generation(&pool, now).await;
    assert_eq!(count_notifications(&pool, student_id, "deadline").await, 1);

    // still inside the 12h cooldown
    run_generation(&pool, now + Duration::hours(11)).await;
    assert_eq!(count_notifications(&pool, student_id, "deadline").await, 1);
}

#[tokio::test]
async fn test_reminder_escalates_to_urgent() {
    let (_server, pool) = setup_test_environment().await;
    let now = Utc.with_ymd_and_hms(2202, 6, 10, 12, 0, 0).unwrap();
    let student_id = create_test_user(&pool, Role::Student).await;
    let course_id = create_test_course(&pool, "Reminder Course").await;
    enroll_test_student(&pool, student_id, course_id).await;
    create_test_quiz(
        &pool,
        course_id,
        TestQuiz {
            deadline: Some(now + Duration::days(2)),
            ..TestQuiz::default()
        },
    )
    .await;

    let first = run_generation(&pool, now).await;
    assert!(first.reminders >= 1);
    assert_eq!(count_notifications(&pool, student_id, "deadline").await, 1);

    // deadline 1.5 days away: reminder tier, within its 2 day cooldown
    run_generation(&pool, now + Duration::hours(12)).await;
    assert_eq!(count_notifications(&pool, student_id, "deadline").await, 1);

    // deadline 18h away: urgent tier, last notice is older than 12h
    run_generation(&pool, now + Duration::hours(30)).await;
    assert_eq!(count_notifications(&pool, student_id, "deadline").await, 2);
}

#[tokio::test]
async fn test_inactive_and_unenrolled_get_no_reminders() {
    let (_server, pool) = setup_test_environment().await;
    let now = Utc.with_ymd_and_hms(2203, 1, 20, 8, 0, 0).unwrap();
    let enrolled_id = create_test_user(&pool, Role::Student).await;
    let outsider_id = create_test_user(&pool, Role::Student).await;
    let course_id = create_test_course(&pool, "Quiet Course").await;
    enroll_test_student(&pool, enrolled_id, course_id).await;
    create_test_quiz(
        &pool,
        course_id,
        TestQuiz {
            deadline: Some(now + Duration::hours(6)),
            active: false,
            ..TestQuiz::default()
        },
    )
    .await;
    create_test_quiz(
        &pool,
        course_id,
        TestQuiz {
            deadline: Some(now + Duration::days(5)),
            ..TestQuiz::default()
        },
    )
    .await;

    run_generation(&pool, now).await;

    assert_eq!(count_notifications(&pool, enrolled_id, "deadline").await, 0);
    assert_eq!(count_notifications(&pool, outsider_id, "deadline").await, 0);
}
