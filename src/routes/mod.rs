use actix_files::{Files, NamedFile};
use actix_multipart::form::MultipartFormConfig;
use actix_session::Session;
use actix_web::{get, http::header, web, HttpResponse, Responder};
use tera::Context;

use crate::{errors::AppError, AppState, TEMPLATES};

pub mod auth;
pub mod bulk_import;
pub mod dashboard;
pub mod flash;
pub mod inventory;
pub mod notifications;
pub mod offers;
pub mod orders;
pub mod users;

pub const TOKEN_KEY: &str = "token";
pub const USER_NAME_KEY: &str = "user_name";

const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        MultipartFormConfig::default()
            .total_limit(UPLOAD_LIMIT)
            .memory_limit(UPLOAD_LIMIT),
    )
    .service(Files::new("/static", "static"))
    .service(favicon_handler)
    .service(auth::login_handler)
    .service(auth::login_form_handler)
    .service(auth::logout_handler)
    .service(dashboard::dashboard_handler)
    .service(inventory::inventory_handler)
    .service(inventory::new_drug_handler)
    .service(inventory::create_drug_handler)
    .service(inventory::export_handler)
    .service(bulk_import::upload_handler)
    .service(bulk_import::preview_handler)
    .service(bulk_import::mapping_handler)
    .service(bulk_import::review_handler)
    .service(bulk_import::commit_handler)
    .service(inventory::edit_drug_handler)
    .service(inventory::update_drug_handler)
    .service(inventory::delete_drug_handler)
    .service(orders::orders_handler)
    .service(orders::order_detail_handler)
    .service(orders::order_status_handler)
    .service(orders::assign_driver_handler)
    .service(users::users_handler)
    .service(users::new_user_handler)
    .service(users::create_user_handler)
    .service(users::user_status_handler)
    .service(offers::offers_handler)
    .service(offers::new_offer_handler)
    .service(offers::create_offer_handler)
    .service(offers::delete_offer_handler)
    .service(notifications::notifications_handler)
    .service(notifications::unread_count_handler)
    .service(notifications::mark_all_read_handler)
    .service(notifications::mark_read_handler);
}

/// Bearer token of the signed-in operator.
pub fn session_token(session: &Session) -> Result<String, AppError> {
    session
        .get::<String>(TOKEN_KEY)?
        .ok_or(AppError::Unauthorized)
}

/// Context every page inside the main layout starts from.
pub fn page_context(session: &Session, state: &AppState, title: &str, active: &str) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("active", active);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context.insert("poll_secs", &state.config.notification_poll_secs);
    context.insert(
        "user_name",
        &session.get::<String>(USER_NAME_KEY).ok().flatten(),
    );
    context.insert("flash", &flash::take(session));
    context
}

pub fn render(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template: {}", e);
        AppError::TemplateError(e)
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

/// Result of a page read. A failure other than an expired session becomes
/// an inline `load_error` banner and the page renders without the data.
pub fn loaded<T>(
    result: Result<T, AppError>,
    context: &mut Context,
    message: &str,
) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            log::error!("{}: {}", message, e);
            context.insert("load_error", &e.user_message(message));
            Ok(None)
        }
    }
}

/// Result of a mutation forwarded to the backend. Success flashes `done`
/// when given; failure flashes the backend's message or `fallback`.
pub fn settle(
    session: &Session,
    result: Result<(), AppError>,
    done: Option<&str>,
    fallback: &str,
) -> Result<bool, AppError> {
    match result {
        Ok(()) => {
            if let Some(done) = done {
                flash::success(session, done)?;
            }
            Ok(true)
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            log::error!("{}: {}", fallback, e);
            flash::error(session, &e.user_message(fallback))?;
            Ok(false)
        }
    }
}

#[get("/favicon.ico")]
pub async fn favicon_handler() -> Result<impl Responder, AppError> {
    Ok(NamedFile::open("static/favicon.svg")?)
}
