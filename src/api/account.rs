use super::helper;
use crate::catalog;
use crate::model::account::{NewUser, UserResponse};
use crate::payloads::account::{BecomeInstructorPayload, GetUserParams, RegisterUserPayload};
use crate::roles::Role;
use crate::{errors::AppError, response::ApiResponse, schema::users::dsl as users_dsl};
use axum::{
    Json,
    extract::{Query, State},
};
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use tracing::{debug, info, instrument, warn};

/// Registers the profile of a user authenticated by the identity provider.
/// New accounts always start as students.
///
/// Request Body: `RegisterUserPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `i64`: The new user ID (201 Created).
/// * `409 Conflict`: If the username is taken.
/// * `422 Unprocessable Entity`: If username or email is blank.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn register_user(
    State(pool): State<Pool>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<ApiResponse<i64>, AppError> {
    info!("Attempting to register user '{}'", payload.username);
    debug!("Register user payload: {:?}", payload);

    catalog::require_non_empty("username", &payload.username)?;
    catalog::require_non_empty("email", &payload.email)?;

    let username = payload.username.trim().to_string();
    let new_user = NewUser {
        username: username.clone(),
        email: payload.email.trim().to_string(),
        full_name: payload.full_name.trim().to_string(),
        role: Role::Student.as_str().to_string(),
    };

    let user_id = helper::run_transaction(&pool, move |conn| {
        diesel::insert_into(users_dsl::users)
            .values(&new_user)
            .returning(users_dsl::id)
            .get_result::<i64>(conn)
            .map_err(|e| {
                helper::constraint_error(
                    e,
                    || "Referenced record not found.".to_string(),
                    || format!("Username '{}' is already taken.", username),
                )
            })
    })
    .await?;

    info!("Registered user {} as student", user_id);
    Ok(ApiResponse::created(user_id))
}

/// Retrieves a user profile.
///
/// Query Parameters:
/// * `user_id`: The ID of the user.
///
/// Returns (wrapped in `ApiResponse`)
/// * `UserResponse`: The profile (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, params))]
pub async fn get_user(
    State(pool): State<Pool>,
    Query(params): Query<GetUserParams>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user_id = params.user_id;
    info!("Fetching profile of user {}", user_id);

    let user = helper::run_query(&pool, move |conn| {
        users_dsl::users
            .find(user_id)
            .select(UserResponse::as_select())
            .first(conn)
            .optional()
    })
    .await?;

    user.map(ApiResponse::ok).ok_or_else(|| {
        warn!("User {} not found", user_id);
        AppError::NotFound(format!("User with ID {} not found.", user_id))
    })
}

/// Promotes a student to instructor.
///
/// Request Body: `BecomeInstructorPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true once the role changed (200 OK).
/// * `404 Not Found`: If the user does not exist.
/// * `409 Conflict`: If the user already is an instructor or an admin.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(pool, payload))]
pub async fn become_instructor(
    State(pool): State<Pool>,
    Json(payload): Json<BecomeInstructorPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    let user_id = payload.user_id;
    info!("User {} asks to become an instructor", user_id);

    helper::run_transaction(&pool, move |conn| {
        match helper::load_role(conn, user_id)? {
            Role::Instructor => {
                return Err(AppError::Conflict(format!(
                    "User {} already is an instructor.",
                    user_id
                )));
            }
            Role::Admin => {
                return Err(AppError::Conflict(format!(
                    "User {} is an admin and already holds every permission.",
                    user_id
                )));
            }
            Role::Student => {}
        }

        let rows_affected = diesel::update(users_dsl::users.find(user_id))
            .set(users_dsl::role.eq(Role::Instructor.as_str()))
            .execute(conn)?;
        helper::expect_single_row(rows_affected, "User", user_id)
    })
    .await?;

    info!("User {} is now an instructor", user_id);
    Ok(ApiResponse::ok(true))
}
