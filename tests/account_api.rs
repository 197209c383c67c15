use axum::http::StatusCode;
use lightweight_elearning_server::model::account::UserResponse;
use lightweight_elearning_server::payloads::account::{
    BecomeInstructorPayload, RegisterUserPayload,
};
use lightweight_elearning_server::response::ApiResponse;
use uuid::Uuid;

mod helpers;
use helpers::setup_test_environment;

fn unique_username(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

#[tokio::test]
async fn test_register_user_starts_as_student() {
    let (server, _pool) = setup_test_environment().await;
    let username = unique_username("alice");

    let response = server
        .post("/account/register_user")
        .json(&RegisterUserPayload {
            username: username.clone(),
            email: "alice@test.example".to_string(),
            full_name: "Alice Liddell".to_string(),
        })
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: ApiResponse<i64> = response.json();
    assert_eq!(body.status_code, 201);
    let user_id = body.data.unwrap();

    let response = server
        .get(&format!("/account/get_user?user_id={}", user_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<UserResponse> = response.json();
    let user = body.data.unwrap();
    assert_eq!(user.username, username);
    assert_eq!(user.full_name, "Alice Liddell");
    assert_eq!(user.role, "student");
}

#[tokio::test]
async fn test_register_user_duplicate_username() {
    let (server, _pool) = setup_test_environment().await;
    let payload = RegisterUserPayload {
        username: unique_username("bob"),
        email: "bob@test.example".to_string(),
        full_name: String::new(),
    };

    let response = server.post("/account/register_user").json(&payload).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = server.post("/account/register_user").json(&payload).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_user_blank_email() {
    let (server, _pool) = setup_test_environment().await;

    let response = server
        .post("/account/register_user")
        .json(&RegisterUserPayload {
            username: unique_username("carol"),
            email: "  ".to_string(),
            full_name: String::new(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_user_not_found() {
    let (server, _pool) = setup_test_environment().await;

    let response = server.get("/account/get_user?user_id=999999999").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_become_instructor_once() {
    let (server, _pool) = setup_test_environment().await;
    let response = server
        .post("/account/register_user")
        .json(&RegisterUserPayload {
            username: unique_username("dave"),
            email: "dave@test.example".to_string(),
            full_name: "Dave".to_string(),
        })
        .await;
    let body: ApiResponse<i64> = response.json();
    let user_id = body.data.unwrap();
    let payload = BecomeInstructorPayload { user_id };

    let response = server
        .post("/account/become_instructor")
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .post("/account/become_instructor")
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server
        .get(&format!("/account/get_user?user_id={}", user_id))
        .await;
    let body: ApiResponse<UserResponse> = response.json();
    assert_eq!(body.data.unwrap().role, "instructor");
}

#[tokio::test]
async fn test_become_instructor_unknown_user() {
    let (server, _pool) = setup_test_environment().await;

    let response = server
        .post("/account/become_instructor")
        .json(&BecomeInstructorPayload {
            user_id: 999_999_999,
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
