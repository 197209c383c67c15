use crate::cli::Args;
use anyhow::{Context, anyhow};
use axum::Router;
use axum::routing::{get, post};
use axum_keycloak_auth::PassthroughMode;
use axum_keycloak_auth::instance::{KeycloakAuthInstance, KeycloakConfig};
use axum_keycloak_auth::layer::KeycloakAuthLayer;
use deadpool_diesel::Runtime;
use deadpool_diesel::postgres::{Manager, Pool};
use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

pub mod catalog;
pub mod cli;
pub mod engine;
pub mod model;
pub mod notify;
pub mod payloads;
pub mod report;
pub mod response;
pub mod roles;
pub mod schema;

mod api;
mod errors;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn init_router(args: &Args) -> anyhow::Result<Router> {
    if args.run_migrations {
        info!("Running pending database migrations...");
        let mut conn = PgConnection::establish(&args.connection_str)
            .context("Failed to connect to the database for migrations")?;
        run_migrations(&mut conn)?;
    }

    info!("Initializing database pool...");
    let pool = init_pool(&args.connection_str, args.db_pool_max_size)
        .context("Failed to initialize database pool")?;

    info!("Initializing Keycloak authentication layer...");
    let keycloak_layer =
        init_protection_layer(args).context("Failed to initialize Keycloak layer")?;

    info!("Initializing router...");
    Ok(init_router_internal(pool, keycloak_layer))
}

pub fn init_test_router(pool: Pool) -> Router {
    Router::new()
        .nest("/account", account_routes())
        .nest("/student", student_routes())
        .nest("/instructor", instructor_routes())
        .with_state(pool)
}

/// Applies every embedded migration that has not run yet.
pub fn run_migrations(conn: &mut PgConnection) -> anyhow::Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Migration error: {}", e))?;
    info!("Applied {} pending migrations", applied.len());
    Ok(())
}

fn init_router_internal(pool: Pool, keycloak_layer: KeycloakAuthLayer<String>) -> Router {
    let account_api = account_routes().layer(keycloak_layer.clone());
    let student_api = student_routes().layer(keycloak_layer.clone());
    let instructor_api = instructor_routes().layer(keycloak_layer);

    Router::new()
        .nest("/account", account_api)
        .nest("/student", student_api)
        .nest("/instructor", instructor_api)
        .with_state(pool)
}

fn init_pool(conn_str: &str, max_size: u32) -> anyhow::Result<Pool> {
    let manager = Manager::new(conn_str, Runtime::Tokio1);
    let pool = Pool::builder(manager).max_size(max_size as usize).build()?;
    Ok(pool)
}

fn init_protection_layer(args: &Args) -> anyhow::Result<KeycloakAuthLayer<String>> {
    let config = KeycloakConfig::builder()
        .server(args.keycloak_server_url.clone())
        .realm(args.keycloak_realm.clone())
        .build();

    let instance = KeycloakAuthInstance::new(config);

    let layer = KeycloakAuthLayer::builder()
        .instance(instance)
        .passthrough_mode(PassthroughMode::Block)
        .persist_raw_claims(false)
        .expected_audiences(vec![args.keycloak_audiences.clone()])
        .build();

    Ok(layer)
}

fn account_routes() -> Router<Pool> {
    Router::new()
        .route("/register_user", post(api::account::register_user))
        .route("/get_user", get(api::account::get_user))
        .route("/become_instructor", post(api::account::become_instructor))
}

fn student_routes() -> Router<Pool> {
    Router::new()
        .route("/get_courses", get(api::student::get_courses))
        .route("/get_course_data", get(api::student::get_course_data))
        .route("/get_lesson_data", get(api::student::get_lesson_data))
        .route("/enroll", post(api::student::enroll))
        .route("/get_my_courses", get(api::student::get_my_courses))
        .route("/get_quiz_data", get(api::student::get_quiz_data))
        .route("/start_attempt", post(api::student::start_attempt))
        .route("/submit_answer", post(api::student::submit_answer))
        .route("/finalize_attempt", post(api::student::finalize_attempt))
        .route(
            "/get_attempt_result",
            get(api::student::get_attempt_result),
        )
        .route("/get_notifications", get(api::student::get_notifications))
        .route(
            "/mark_notification_read",
            post(api::student::mark_notification_read),
        )
        .route(
            "/mark_all_notifications_read",
            post(api::student::mark_all_notifications_read),
        )
        .route(
            "/delete_notification",
            post(api::student::delete_notification),
        )
}

fn instructor_routes() -> Router<Pool> {
    Router::new()
        .route("/create_course", post(api::instructor::create_course))
        .route("/modify_course", post(api::instructor::modify_course))
        .route("/delete_course", post(api::instructor::delete_course))
        .route("/add_lesson", post(api::instructor::add_lesson))
        .route("/modify_lesson", post(api::instructor::modify_lesson))
        .route("/delete_lesson", post(api::instructor::delete_lesson))
        .route("/create_quiz", post(api::instructor::create_quiz))
        .route("/modify_quiz", post(api::instructor::modify_quiz))
        .route("/delete_quiz", post(api::instructor::delete_quiz))
        .route("/add_question", post(api::instructor::add_question))
        .route("/modify_question", post(api::instructor::modify_question))
        .route("/delete_question", post(api::instructor::delete_question))
        .route("/add_choice", post(api::instructor::add_choice))
        .route(
            "/get_course_grades",
            get(api::instructor::get_course_grades),
        )
        .route(
            "/get_student_course_detail",
            get(api::instructor::get_student_course_detail),
        )
        .route(
            "/generate_certificate",
            post(api::instructor::generate_certificate),
        )
        .route(
            "/generate_notifications",
            post(api::instructor::generate_notifications),
        )
}
