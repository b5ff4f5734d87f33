use actix_session::Session;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Serialize;

use crate::{errors::AppError, AppState};

use super::{loaded, page_context, redirect, render, session_token, settle};

#[derive(Serialize)]
struct UnreadCount {
    unread: usize,
}

#[get("/notifications")]
pub async fn notifications_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let mut context = page_context(&session, &state, "Notifications", "notifications");

    let notifications = loaded(
        state.api.list_notifications(&token).await,
        &mut context,
        "Failed to load notifications",
    )?
    .unwrap_or_default();
    let unread = notifications.iter().filter(|n| !n.read).count();

    context.insert("notifications", &notifications);
    context.insert("unread", &unread);
    render("notifications.html", &context)
}

/// Polled by the header bell.
#[get("/notifications/unread")]
pub async fn unread_count_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let notifications = state.api.list_notifications(&token).await?;
    let unread = notifications.iter().filter(|n| !n.read).count();
    Ok(HttpResponse::Ok().json(UnreadCount { unread }))
}

#[post("/notifications/read-all")]
pub async fn mark_all_read_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    settle(
        &session,
        state.api.mark_all_notifications_read(&token).await,
        None,
        "Failed to mark notifications as read",
    )?;
    Ok(redirect("/notifications"))
}

#[post("/notifications/{id}/read")]
pub async fn mark_read_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    settle(
        &session,
        state.api.mark_notification_read(&token, &id).await,
        None,
        "Failed to mark the notification as read",
    )?;
    Ok(redirect("/notifications"))
}
