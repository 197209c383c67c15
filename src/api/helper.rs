use crate::errors::AppError;
use crate::roles::{Capability, Role};
use crate::schema::users::dsl as users_dsl;
use anyhow::anyhow;
use deadpool_diesel::postgres::Pool;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, error, warn};

/// Runs a single query (or a few independent ones) on a pooled connection.
pub(super) async fn run_query<T, F>(pool: &Pool, query: F) -> Result<T, AppError>
where
    F: FnOnce(&mut PgConnection) -> Result<T, DieselError> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool.get().await?;
    debug!("DB connection object obtained from pool for interaction");

    conn.interact(query).await?.map_err(AppError::from)
}

/// Runs `work` inside a database transaction; any `Err` rolls it back.
pub(super) async fn run_transaction<T, F>(pool: &Pool, work: F) -> Result<T, AppError>
where
    F: FnOnce(&mut PgConnection) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool.get().await?;
    debug!("DB connection object obtained from pool for transaction");

    conn.interact(move |conn_sync| conn_sync.transaction(work))
        .await?
}

/// Loads the role of `user_id`.
pub(super) fn load_role(conn: &mut PgConnection, user_id: i64) -> Result<Role, AppError> {
    let stored = users_dsl::users
        .find(user_id)
        .select(users_dsl::role)
        .first::<String>(conn)
        .optional()?;

    match stored {
        Some(tag) => tag.parse::<Role>().map_err(|e| {
            error!("User {} has an unreadable role: {}", user_id, e);
            AppError::InternalServerError(anyhow!(e))
        }),
        None => Err(AppError::NotFound(format!(
            "User with ID {} not found.",
            user_id
        ))),
    }
}

/// Fails with `403 Forbidden` unless the user's role grants `capability`.
pub(super) fn require_capability_sync(
    conn: &mut PgConnection,
    user_id: i64,
    capability: Capability,
) -> Result<Role, AppError> {
    let role = load_role(conn, user_id)?;
    if !role.can(capability) {
        warn!(
            "User {} with role {} lacks capability {:?}",
            user_id, role, capability
        );
        return Err(AppError::Forbidden(format!(
            "User {} is not allowed to perform this action.",
            user_id
        )));
    }
    Ok(role)
}

pub(super) async fn require_capability(
    pool: &Pool,
    user_id: i64,
    capability: Capability,
) -> Result<Role, AppError> {
    let conn = pool.get().await?;
    conn.interact(move |conn_sync| require_capability_sync(conn_sync, user_id, capability))
        .await?
}

/// Translates constraint violations of an insert/update into client errors.
pub(super) fn constraint_error(
    err: DieselError,
    foreign_key_message: impl FnOnce() -> String,
    unique_message: impl FnOnce() -> String,
) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            warn!("Foreign key violation: {}", info.message());
            AppError::NotFound(foreign_key_message())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            warn!("Unique constraint violation: {}", info.message());
            AppError::Conflict(unique_message())
        }
        other => AppError::from(other),
    }
}

/// Ensures an update or delete addressed exactly one row.
pub(super) fn expect_single_row(rows_affected: usize, what: &str, id: i64) -> Result<(), AppError> {
    match rows_affected {
        1 => Ok(()),
        0 => {
            error!("{} {} not found: 0 rows affected", what, id);
            Err(AppError::NotFound(format!(
                "{} with ID {} not found.",
                what, id
            )))
        }
        n => {
            error!("{} {}: {} rows affected, expected 1", what, id, n);
            Err(AppError::InternalServerError(anyhow!(
                "Operation on {} {} affected {} rows, expected 1",
                what,
                id,
                n
            )))
        }
    }
}
