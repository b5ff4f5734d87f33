use actix_session::Session;
use actix_web::{get, post, web, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    lifecycle::OrderAction,
    pricing::{line_total, OrderTotals},
    structs::{Order, OrderStatus, Role},
    AppState,
};

use super::{flash, loaded, page_context, redirect, render, session_token, settle};

#[derive(Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct StatusTab {
    value: &'static str,
    label: &'static str,
}

fn status_tabs() -> Vec<StatusTab> {
    let mut tabs = vec![StatusTab {
        value: "all",
        label: "All",
    }];
    tabs.extend(OrderStatus::ALL.iter().map(|s| StatusTab {
        value: s.as_str(),
        label: s.label(),
    }));
    tabs
}

#[derive(Serialize)]
struct OrderRow {
    id: String,
    reference: String,
    pharmacist: String,
    driver: String,
    status: OrderStatus,
    status_label: &'static str,
    items: usize,
    created_at: Option<DateTime<Utc>>,
    can_assign: bool,
}

impl OrderRow {
    fn of(order: &Order) -> Self {
        OrderRow {
            id: order.id.clone(),
            reference: order.short_ref(),
            pharmacist: order
                .pharmacist
                .as_ref()
                .map(|p| p.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_owned()),
            driver: order
                .driver
                .as_ref()
                .map(|d| d.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "-".to_owned()),
            status: order.status,
            status_label: order.status.label(),
            items: order.drugs.len(),
            created_at: order.created_at,
            can_assign: order.status.accepts_driver(),
        }
    }
}

/// Matches the short reference or the ordering pharmacy's name.
fn order_matches(order: &Order, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    order.short_ref().to_lowercase().contains(&term)
        || order.id.to_lowercase().contains(&term)
        || order
            .pharmacist
            .as_ref()
            .is_some_and(|p| p.name.to_lowercase().contains(&term))
}

#[get("/orders")]
pub async fn orders_handler(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<OrderQuery>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let mut context = page_context(&session, &state, "Orders", "orders");

    let filter = query
        .status
        .as_deref()
        .and_then(OrderStatus::parse);
    let orders = loaded(
        state.api.list_orders(&token).await,
        &mut context,
        "Failed to load orders",
    )?
    .unwrap_or_default();

    let rows: Vec<OrderRow> = orders
        .iter()
        .filter(|o| filter.map_or(true, |s| o.status == s))
        .filter(|o| order_matches(o, &query.q))
        .map(OrderRow::of)
        .collect();

    context.insert("orders", &rows);
    context.insert("tabs", &status_tabs());
    context.insert("selected", filter.map_or("all", |s| s.as_str()));
    context.insert("q", &query.q);
    render("orders.html", &context)
}

#[derive(Serialize)]
struct LineView {
    name: String,
    quantity: i64,
    price: f64,
    is_bonus: bool,
    total: f64,
}

#[derive(Serialize)]
struct DriverOption {
    id: String,
    name: String,
    phone: String,
}

#[get("/orders/{id}")]
pub async fn order_detail_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    let mut context = page_context(&session, &state, "Order details", "orders");

    let order = match state.api.get_order(&token, &id).await {
        Ok(order) => order,
        Err(AppError::Unauthorized) => return Err(AppError::Unauthorized),
        Err(e) => {
            settle(&session, Err(e), None, "Failed to load the order")?;
            return Ok(redirect("/orders"));
        }
    };

    let lines: Vec<LineView> = order
        .drugs
        .iter()
        .map(|item| LineView {
            name: item.drug.name().to_owned(),
            quantity: item.quantity,
            price: item.price,
            is_bonus: item.is_bonus,
            total: line_total(item),
        })
        .collect();
    let actions: Vec<OrderAction> = order.status.actions();

    if order.status.accepts_driver() {
        let drivers = loaded(
            state.api.list_users(&token, Role::Driver).await,
            &mut context,
            "Failed to load drivers",
        )?
        .unwrap_or_default();
        let options: Vec<DriverOption> = drivers
            .into_iter()
            .map(|d| DriverOption {
                id: d.id,
                name: d.name,
                phone: d.phone,
            })
            .collect();
        context.insert("drivers", &options);
    }

    context.insert("reference", &order.short_ref());
    context.insert("status_label", order.status.label());
    context.insert("totals", &OrderTotals::of(&order));
    context.insert("lines", &lines);
    context.insert("actions", &actions);
    context.insert("accepts_driver", &order.status.accepts_driver());
    context.insert(
        "selected_driver",
        &order.driver.as_ref().and_then(|d| d.id.clone()),
    );
    context.insert("order", &order);
    render("order_detail.html", &context)
}

#[derive(Deserialize)]
pub struct StatusForm {
    status: OrderStatus,
}

#[post("/orders/{id}/status")]
pub async fn order_status_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    web::Form(form): web::Form<StatusForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    if form.status == OrderStatus::Unknown {
        flash::error(&session, "Choose a valid order status")?;
        return Ok(redirect(&format!("/orders/{}", id)));
    }
    if settle(
        &session,
        state.api.update_order_status(&token, &id, form.status).await,
        Some("Order status updated"),
        "Failed to update order status",
    )? {
        log::info!("Order {} moved to {}", id, form.status.as_str());
    }
    Ok(redirect(&format!("/orders/{}", id)))
}

#[derive(Deserialize)]
pub struct DriverForm {
    #[serde(default)]
    driver_id: String,
}

#[post("/orders/{id}/driver")]
pub async fn assign_driver_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    web::Form(form): web::Form<DriverForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    let driver_id = form.driver_id.trim();
    if driver_id.is_empty() {
        flash::error(&session, "Choose a driver first")?;
        return Ok(redirect(&format!("/orders/{}", id)));
    }

    if settle(
        &session,
        state.api.assign_driver(&token, &id, driver_id).await,
        Some("Driver assigned"),
        "Failed to assign the driver",
    )? {
        log::info!("Driver {} assigned to order {}", driver_id, id);
    }
    Ok(redirect(&format!("/orders/{}", id)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{follow, login, test_app, MockBackend};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    fn order(status: &str) -> Value {
        json!({
            "_id": "65f1c2a9e4b0a1b2c3d4e5f6",
            "pharmacist": { "_id": "p1", "name": "Al Shifa Pharmacy", "phone": "0991234567" },
            "driver": { "_id": "drv-2", "name": "Omar" },
            "status": status,
            "createdAt": "2025-03-01T10:00:00.000Z",
            "deliveryAddress": { "street": "Baghdad St", "city": "Damascus" },
            "deliveryFee": 5000,
            "drugs": [
                { "drug": { "name": "Panadol", "price": 1200 }, "quantity": 10, "price": 1200 },
                { "drug": { "name": "Panadol" }, "quantity": 2, "price": 1200, "isBonus": true }
            ]
        })
    }

    fn drivers() -> Value {
        json!({ "data": { "users": [
            { "_id": "drv-1", "name": "Khaled", "phone": "0944", "role": "driver", "status": "verified" },
            { "_id": "drv-2", "name": "Omar", "phone": "0955", "role": "driver", "status": "verified" }
        ] } })
    }

    async fn detail_page(status: &str) -> String {
        let backend = MockBackend::builder()
            .respond(
                "GET",
                "/orders/65f1c2a9e4b0a1b2c3d4e5f6",
                200,
                json!({ "data": { "order": order(status) } }),
            )
            .respond("GET", "/users", 200, drivers())
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/orders/65f1c2a9e4b0a1b2c3d4e5f6")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn pending_order_offers_confirm_and_reject() {
        let page = detail_page("pending").await;
        assert!(page.contains("Confirm order and start preparing"));
        assert!(page.contains("Reject order"));
        assert!(!page.contains("Start delivery"));
        assert!(page.contains("name=\"driver_id\""));
        assert!(page.contains("<option value=\"drv-2\" selected>"));
        // bonus line is free: 10 x 1,200 then 5,000 delivery
        assert!(page.contains("12,000 SYP"));
        assert!(page.contains("17,000 SYP"));
    }

    #[actix_web::test]
    async fn closed_orders_offer_no_actions() {
        for status in ["delivered", "cancelled", "processing"] {
            let page = detail_page(status).await;
            assert!(!page.contains("name=\"status\""), "{}", status);
            assert!(!page.contains("name=\"driver_id\""), "{}", status);
        }
    }

    #[actix_web::test]
    async fn list_filters_by_status_and_search() {
        let mut other = order("delivered");
        other["_id"] = json!("65f1c2a9e4b0a1b2c3ffffff");
        other["pharmacist"] = json!({ "name": "Dar Al Dawa" });
        let backend = MockBackend::builder()
            .respond(
                "GET",
                "/orders",
                200,
                json!({ "data": { "orders": [order("pending"), other] } }),
            )
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/orders?status=pending")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("D4E5F6"));
        assert!(!body.contains("Dar Al Dawa"));

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/orders?q=dawa")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("FFFFFF"));
        assert!(!body.contains("Al Shifa Pharmacy"));
    }

    #[actix_web::test]
    async fn legacy_status_does_not_break_the_list() {
        let mut legacy = order("processing");
        legacy["_id"] = json!("65f1c2a9e4b0a1b2c3aaaaaa");
        let backend = MockBackend::builder()
            .respond(
                "GET",
                "/orders",
                200,
                json!({ "data": { "orders": [order("pending"), legacy] } }),
            )
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/orders").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("D4E5F6"));
        assert!(body.contains("AAAAAA"));
        assert!(body.contains("status-unknown"));
        assert!(!body.contains("Failed to load orders"));
    }

    #[actix_web::test]
    async fn status_change_is_forwarded_and_confirmed() {
        let backend = MockBackend::builder()
            .respond(
                "PATCH",
                "/orders/65f1c2a9e4b0a1b2c3d4e5f6/status",
                200,
                json!({ "status": "success" }),
            )
            .respond(
                "GET",
                "/orders/65f1c2a9e4b0a1b2c3d4e5f6",
                200,
                json!({ "data": { "order": order("confirmed") } }),
            )
            .respond("GET", "/users", 200, drivers())
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/orders/65f1c2a9e4b0a1b2c3d4e5f6/status")
                .cookie(cookie.clone())
                .set_form([("status", "confirmed")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let page = follow!(app, resp, cookie);
        assert!(page.contains("Order status updated"));
        let sent = &backend.calls_to("PATCH", "/orders/65f1c2a9e4b0a1b2c3d4e5f6/status")[0];
        assert_eq!(sent.body, r#"{"status":"confirmed"}"#);
    }

    #[actix_web::test]
    async fn rejected_transition_shows_backend_message() {
        let backend = MockBackend::builder()
            .respond(
                "PATCH",
                "/orders/65f1c2a9e4b0a1b2c3d4e5f6/status",
                400,
                json!({ "message": "Invalid status transition" }),
            )
            .respond(
                "GET",
                "/orders/65f1c2a9e4b0a1b2c3d4e5f6",
                200,
                json!({ "data": { "order": order("pending") } }),
            )
            .respond("GET", "/users", 200, drivers())
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/orders/65f1c2a9e4b0a1b2c3d4e5f6/status")
                .cookie(cookie.clone())
                .set_form([("status", "delivered")])
                .to_request(),
        )
        .await;
        let page = follow!(app, resp, cookie);
        assert!(page.contains("Invalid status transition"));
        assert!(page.contains("Pending"));
    }

    #[actix_web::test]
    async fn driver_must_be_chosen() {
        let backend = MockBackend::builder()
            .respond(
                "GET",
                "/orders/65f1c2a9e4b0a1b2c3d4e5f6",
                200,
                json!({ "data": { "order": order("confirmed") } }),
            )
            .respond("GET", "/users", 200, drivers())
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/orders/65f1c2a9e4b0a1b2c3d4e5f6/driver")
                .cookie(cookie.clone())
                .set_form([("driver_id", "")])
                .to_request(),
        )
        .await;
        let page = follow!(app, resp, cookie);
        assert!(page.contains("Choose a driver first"));
        assert!(backend
            .calls_to("PATCH", "/orders/65f1c2a9e4b0a1b2c3d4e5f6/assign-driver")
            .is_empty());
    }
}
