use actix_identity::Identity;
use actix_session::{Session, SessionExt};
use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    get,
    http::StatusCode,
    middleware::Next,
    post, web, Error, HttpMessage, HttpRequest, Responder,
};
use serde::Deserialize;
use tera::Context;

use crate::{errors::AppError, AppState};

use super::{flash, redirect, render, TOKEN_KEY, USER_NAME_KEY};

#[derive(Deserialize)]
pub struct Login {
    email: String,
    password: String,
}

fn login_page(email: &str, error: Option<&str>) -> Result<actix_web::HttpResponse, AppError> {
    let mut context = Context::new();
    context.insert("title", "Sign in");
    context.insert("email", email);
    context.insert("error", &error);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    render("login.html", &context)
}

#[get("/login")]
pub async fn login_handler(session: Session) -> Result<impl Responder, AppError> {
    if session.get::<String>(TOKEN_KEY)?.is_some() {
        return Ok(redirect("/"));
    }
    let expired = flash::take(&session).map(|f| f.message);
    login_page("", expired.as_deref())
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<Login>,
    state: web::Data<AppState>,
    session: Session,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        let mut resp = login_page(&email, Some("Email and password are required"))?;
        *resp.status_mut() = StatusCode::BAD_REQUEST;
        return Ok(resp);
    }

    let login = match state.api.login(&email, &form.password).await {
        Ok(login) => login,
        Err(e) => {
            log::warn!("Login failed for {}: {}", email, e);
            let message = e.user_message("Sign-in failed. Please check your details.");
            let mut resp = login_page(&email, Some(&message))?;
            *resp.status_mut() = StatusCode::UNAUTHORIZED;
            return Ok(resp);
        }
    };

    session.renew();
    session.insert(TOKEN_KEY, &login.token)?;
    session.insert(USER_NAME_KEY, &login.data.user.name)?;
    Identity::login(&request.extensions(), login.data.user.id.clone())
        .map_err(|e| AppError::IdentityError(e.to_string()))?;

    log::info!("Operator {} signed in", login.data.user.id);
    Ok(redirect("/"))
}

#[post("/logout")]
pub async fn logout_handler(identity: Option<Identity>, session: Session) -> impl Responder {
    match identity {
        Some(identity) => identity.logout(),
        None => session.purge(),
    }
    redirect("/login")
}

/// Drops the whole session once the backend rejects its token, so the next
/// page starts from the login form.
pub async fn evict_expired_session(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let res = next.call(req).await?;
    let expired = res
        .response()
        .error()
        .and_then(|e| e.as_error::<AppError>())
        .is_some_and(AppError::is_unauthorized);
    if expired {
        log::info!("Session token expired, signing out");
        res.request().get_session().purge();
    }
    Ok(res)
}
