use actix_session::Session;
use actix_web::{get, web, Responder};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    errors::AppError,
    structs::{short_ref, DashboardStats, OrderStatus},
    AppState,
};

use super::{loaded, page_context, render, session_token};

#[derive(Serialize)]
struct RecentOrderRow {
    id: String,
    reference: String,
    status: String,
    status_label: String,
    created_at: Option<DateTime<Utc>>,
}

fn recent_rows(stats: &DashboardStats) -> Vec<RecentOrderRow> {
    stats
        .recent_orders
        .iter()
        .map(|order| {
            let status_label = OrderStatus::parse(&order.status)
                .map(|s| s.label().to_owned())
                .unwrap_or_else(|| order.status.clone());
            RecentOrderRow {
                id: order.id.clone(),
                reference: short_ref(&order.id),
                status: order.status.clone(),
                status_label,
                created_at: order.created_at,
            }
        })
        .collect()
}

#[get("/")]
pub async fn dashboard_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let mut context = page_context(&session, &state, "Dashboard", "dashboard");

    let stats = loaded(
        state.api.dashboard_stats(&token).await,
        &mut context,
        "Failed to load dashboard figures",
    )?;
    if let Some(stats) = stats {
        context.insert("recent_orders", &recent_rows(&stats));
        context.insert("stats", &stats);
    }

    render("dashboard.html", &context)
}
