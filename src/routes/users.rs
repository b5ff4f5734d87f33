use actix_session::Session;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    lifecycle::AccountAction,
    structs::{RegisterPayload, Role, User, VerificationStatus},
    AppState,
};

use super::{loaded, page_context, redirect, render, session_token, settle};

const LISTED_ROLES: [Role; 3] = [Role::Pharmacist, Role::Driver, Role::Warehouse];
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct RoleQuery {
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Serialize)]
struct RoleTab {
    value: &'static str,
    label: &'static str,
}

fn role_tabs() -> Vec<RoleTab> {
    LISTED_ROLES
        .iter()
        .map(|r| RoleTab {
            value: r.as_str(),
            label: r.plural_label(),
        })
        .collect()
}

#[derive(Serialize)]
struct UserRow {
    #[serde(flatten)]
    user: User,
    status_label: &'static str,
    actions: Vec<AccountAction>,
}

#[get("/users")]
pub async fn users_handler(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<RoleQuery>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let role = query.role.unwrap_or(Role::Pharmacist);
    let mut context = page_context(&session, &state, "Users", "users");

    let users = loaded(
        state.api.list_users(&token, role).await,
        &mut context,
        "Failed to load users",
    )?
    .unwrap_or_default();
    let rows: Vec<UserRow> = users
        .into_iter()
        .map(|user| UserRow {
            status_label: user.status.label(),
            actions: user.status.actions(),
            user,
        })
        .collect();

    context.insert("users", &rows);
    context.insert("tabs", &role_tabs());
    context.insert("role", role.as_str());
    context.insert("role_label", role.plural_label());
    context.insert("can_create", &role.is_staff_created());
    render("users.html", &context)
}

#[derive(Deserialize)]
pub struct AccountStatusForm {
    status: VerificationStatus,
    #[serde(default)]
    role: Option<Role>,
}

#[post("/users/{id}/status")]
pub async fn user_status_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    web::Form(form): web::Form<AccountStatusForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    if settle(
        &session,
        state.api.update_user_status(&token, &id, form.status).await,
        Some("Account status updated"),
        "Failed to update the account status",
    )? {
        log::info!("User {} set to {}", id, form.status.as_str());
    }
    let role = form.role.unwrap_or(Role::Pharmacist);
    Ok(redirect(&format!("/users?role={}", role.as_str())))
}

/// New staff account as typed into the form.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StaffForm {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

impl StaffForm {
    /// Staff accounts are created already verified.
    pub fn to_payload(&self, role: Role) -> Result<RegisterPayload, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_owned()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::ValidationError("Phone number is required".to_owned()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(RegisterPayload {
            name: self.name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            password: self.password.clone(),
            role,
            is_verified: true,
            status: VerificationStatus::Verified,
        })
    }
}

fn staff_role(role: Option<Role>) -> Option<Role> {
    role.filter(Role::is_staff_created)
}

fn user_form_page(
    session: &Session,
    state: &AppState,
    role: Role,
    form: &StaffForm,
    error: Option<&str>,
) -> Result<HttpResponse, AppError> {
    let title = format!("New {}", role.label());
    let mut context = page_context(session, state, &title, "users");
    context.insert("role", role.as_str());
    context.insert("role_label", role.label());
    // never echo the password back
    context.insert("name", &form.name);
    context.insert("phone", &form.phone);
    context.insert("error", &error);
    render("user_form.html", &context)
}

#[get("/users/new")]
pub async fn new_user_handler(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<RoleQuery>,
) -> Result<impl Responder, AppError> {
    session_token(&session)?;
    let Some(role) = staff_role(query.role) else {
        return Ok(redirect("/users"));
    };
    user_form_page(&session, &state, role, &StaffForm::default(), None)
}

#[post("/users")]
pub async fn create_user_handler(
    state: web::Data<AppState>,
    session: Session,
    web::Form(form): web::Form<StaffForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let Some(role) = staff_role(form.role) else {
        return Err(AppError::ValidationError(
            "Only driver and warehouse accounts can be created here".to_owned(),
        ));
    };

    let result = match form.to_payload(role) {
        Ok(payload) => state.api.register_user(&token, &payload).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            log::info!("Created {} account {}", role.as_str(), form.name);
            super::flash::success(&session, "Account created")?;
            Ok(redirect(&format!("/users?role={}", role.as_str())))
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            log::error!("Failed to create {} account: {}", role.as_str(), e);
            let message = e.user_message("Failed to create the account");
            user_form_page(&session, &state, role, &form, Some(&message))
        }
    }
}
