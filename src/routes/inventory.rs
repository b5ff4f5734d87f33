use actix_session::Session;
use actix_web::{get, http::header, post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::{
    errors::AppError,
    pricing::derive_local_price,
    structs::{Drug, DrugCategory, DrugPayload},
    utils::parse_optional,
    AppState,
};

use super::{loaded, page_context, redirect, render, session_token, settle};

/// Stock at or above this level is considered healthy.
pub const LOW_STOCK_THRESHOLD: i64 = 50;

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct CategoryOption {
    value: &'static str,
    label: &'static str,
}

fn category_options() -> Vec<CategoryOption> {
    DrugCategory::ALL
        .iter()
        .map(|c| CategoryOption {
            value: c.as_str(),
            label: c.label(),
        })
        .collect()
}

/// The drug form as submitted. Numbers stay text until `to_payload` so a
/// rejected submission can be shown back exactly as typed.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct DrugForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub generic_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub category: DrugCategory,
    #[serde(default)]
    pub price_usd: String,
    #[serde(default)]
    pub exchange_rate: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub batch_number: String,
    #[serde(default)]
    pub expiry_date: String,
}

impl DrugForm {
    pub fn blank(exchange_rate: f64) -> Self {
        DrugForm {
            exchange_rate: exchange_rate.to_string(),
            ..DrugForm::default()
        }
    }

    pub fn from_drug(drug: &Drug, exchange_rate: f64) -> Self {
        DrugForm {
            name: drug.name.clone(),
            generic_name: drug.generic_name.clone(),
            manufacturer: drug.manufacturer.clone(),
            category: drug.category,
            price_usd: drug.price_usd.map(|p| p.to_string()).unwrap_or_default(),
            exchange_rate: exchange_rate.to_string(),
            price: drug.price.to_string(),
            quantity: drug.quantity.to_string(),
            batch_number: drug.batch_number.clone(),
            expiry_date: drug
                .expiry_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }

    pub fn to_payload(&self) -> Result<DrugPayload, AppError> {
        for (value, field) in [
            (&self.name, "Trade name"),
            (&self.generic_name, "Generic name"),
            (&self.manufacturer, "Manufacturer"),
            (&self.batch_number, "Batch number"),
            (&self.expiry_date, "Expiry date"),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} is required", field)));
            }
        }
        let expiry_date = NaiveDate::parse_from_str(self.expiry_date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::ValidationError("Expiry date must be a date".to_owned()))?;

        let price_usd = parse_optional::<f64>(&self.price_usd, "USD price")
            .map_err(AppError::ValidationError)?;
        let exchange_rate = parse_optional::<f64>(&self.exchange_rate, "Exchange rate")
            .map_err(AppError::ValidationError)?
            .unwrap_or(0.0);
        let entered_price = parse_optional::<f64>(&self.price, "Price")
            .map_err(AppError::ValidationError)?;
        let price = derive_local_price(price_usd, exchange_rate)
            .or(entered_price)
            .ok_or_else(|| {
                AppError::ValidationError("Enter a USD price and exchange rate".to_owned())
            })?;

        let quantity = parse_optional::<i64>(&self.quantity, "Quantity")
            .map_err(AppError::ValidationError)?
            .ok_or_else(|| AppError::ValidationError("Quantity is required".to_owned()))?;

        Ok(DrugPayload {
            name: self.name.trim().to_owned(),
            generic_name: self.generic_name.trim().to_owned(),
            manufacturer: self.manufacturer.trim().to_owned(),
            price_usd,
            price,
            quantity,
            category: self.category,
            expiry_date: expiry_date.format("%Y-%m-%d").to_string(),
            batch_number: self.batch_number.trim().to_owned(),
        })
    }
}

fn drug_form_page(
    session: &Session,
    state: &AppState,
    form: &DrugForm,
    drug_id: Option<&str>,
    error: Option<&str>,
) -> Result<HttpResponse, AppError> {
    let title = if drug_id.is_some() { "Edit drug" } else { "New drug" };
    let mut context: Context = page_context(session, state, title, "inventory");
    context.insert("form", form);
    context.insert("drug_id", &drug_id);
    context.insert("categories", &category_options());
    context.insert("error", &error);
    render("drug_form.html", &context)
}

#[get("/inventory")]
pub async fn inventory_handler(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let mut context = page_context(&session, &state, "Inventory", "inventory");

    let drugs = loaded(
        state.api.list_drugs(&token).await,
        &mut context,
        "Failed to load the drug list",
    )?
    .unwrap_or_default();
    let total = drugs.len();
    let shown: Vec<Drug> = drugs.into_iter().filter(|d| d.matches(&query.q)).collect();

    context.insert("drugs", &shown);
    context.insert("total", &total);
    context.insert("q", &query.q);
    context.insert("low_stock", &LOW_STOCK_THRESHOLD);
    render("inventory.html", &context)
}

#[get("/inventory/new")]
pub async fn new_drug_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    session_token(&session)?;
    let form = DrugForm::blank(state.config.default_exchange_rate);
    drug_form_page(&session, &state, &form, None, None)
}

#[post("/inventory")]
pub async fn create_drug_handler(
    state: web::Data<AppState>,
    session: Session,
    web::Form(form): web::Form<DrugForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let result = match form.to_payload() {
        Ok(payload) => state.api.create_drug(&token, &payload).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            log::info!("Drug {} created", form.name);
            super::flash::success(&session, "Drug saved")?;
            Ok(redirect("/inventory"))
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            log::error!("Failed to save drug: {}", e);
            let message = e.user_message("Failed to save the drug");
            drug_form_page(&session, &state, &form, None, Some(&message))
        }
    }
}

#[get("/inventory/{id}/edit")]
pub async fn edit_drug_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    match state.api.get_drug(&token, &id).await {
        Ok(drug) => {
            let form = DrugForm::from_drug(&drug, state.config.default_exchange_rate);
            drug_form_page(&session, &state, &form, Some(&id), None)
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            settle(&session, Err(e), None, "Failed to load the drug")?;
            Ok(redirect("/inventory"))
        }
    }
}

#[post("/inventory/{id}")]
pub async fn update_drug_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    web::Form(form): web::Form<DrugForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    let result = match form.to_payload() {
        Ok(payload) => state.api.update_drug(&token, &id, &payload).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            log::info!("Drug {} updated", id);
            super::flash::success(&session, "Changes saved")?;
            Ok(redirect("/inventory"))
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            log::error!("Failed to update drug {}: {}", id, e);
            let message = e.user_message("Failed to save the drug");
            drug_form_page(&session, &state, &form, Some(&id), Some(&message))
        }
    }
}

#[post("/inventory/{id}/delete")]
pub async fn delete_drug_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    if settle(
        &session,
        state.api.delete_drug(&token, &id).await,
        Some("Drug deleted"),
        "Failed to delete the drug",
    )? {
        log::info!("Drug {} deleted", id);
    }
    Ok(redirect("/inventory"))
}

#[get("/inventory/export")]
pub async fn export_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    match state.api.export_template(&token).await {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .content_type("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
            .append_header((
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"inventory_template.xlsx\"",
            ))
            .body(bytes)),
        Err(e) => {
            settle(&session, Err(e), None, "Failed to export the template")?;
            Ok(redirect("/inventory"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{follow, login, test_app, MockBackend};
    use actix_web::http::StatusCode;
    use serde_json::json;

    fn form() -> DrugForm {
        DrugForm {
            name: "Panadol".to_owned(),
            generic_name: "Paracetamol".to_owned(),
            manufacturer: "GSK".to_owned(),
            category: DrugCategory::Analgesic,
            price_usd: "2.5".to_owned(),
            exchange_rate: "15000".to_owned(),
            price: "1".to_owned(),
            quantity: "120".to_owned(),
            batch_number: "B-2291".to_owned(),
            expiry_date: "2027-06-30".to_owned(),
        }
    }

    #[test]
    fn price_is_derived_from_usd_and_rate() {
        let payload = form().to_payload().unwrap();
        assert_eq!(payload.price, 37500.0);
        assert_eq!(payload.price_usd, Some(2.5));
    }

    #[test]
    fn changing_either_input_recomputes_price() {
        let mut changed_rate = form();
        changed_rate.exchange_rate = "14000".to_owned();
        assert_eq!(changed_rate.to_payload().unwrap().price, 35000.0);

        let mut changed_usd = form();
        changed_usd.price_usd = "3".to_owned();
        assert_eq!(changed_usd.to_payload().unwrap().price, 45000.0);
    }

    #[test]
    fn without_usd_price_the_entered_price_stands() {
        let mut f = form();
        f.price_usd = String::new();
        f.price = "9000".to_owned();
        let payload = f.to_payload().unwrap();
        assert_eq!(payload.price, 9000.0);
        assert_eq!(payload.price_usd, None);
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let mut f = form();
        f.batch_number = "  ".to_owned();
        assert_eq!(
            f.to_payload().unwrap_err().to_string(),
            "Batch number is required"
        );
        let mut f = form();
        f.quantity = "many".to_owned();
        assert_eq!(f.to_payload().unwrap_err().to_string(), "Quantity must be a number");
    }

    fn drugs_fixture() -> serde_json::Value {
        json!({ "data": { "drugs": [
            { "_id": "d1", "name": "Panadol", "genericName": "Paracetamol", "price": 37500, "quantity": 12, "category": "analgesic", "expiryDate": "2027-06-30T00:00:00.000Z", "batchNumber": "B1" },
            { "_id": "d2", "name": "Augmentin", "genericName": "Amoxicillin", "price": 80000, "quantity": 300, "category": "antibiotic", "expiryDate": "2026-01-31T00:00:00.000Z", "batchNumber": "B2" }
        ] } })
    }

    #[actix_web::test]
    async fn list_filters_by_search_term() {
        let backend = MockBackend::builder()
            .respond("GET", "/drugs", 200, drugs_fixture())
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = actix_web::test::call_service(
            &app,
            actix_web::test::TestRequest::get().uri("/inventory?q=amox").cookie(cookie).to_request(),
        )
        .await;
        let body = String::from_utf8(actix_web::test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Augmentin"));
        assert!(!body.contains("Panadol"));
    }

    #[actix_web::test]
    async fn create_posts_derived_price() {
        let backend = MockBackend::builder()
            .respond("POST", "/drugs", 201, json!({ "status": "success" }))
            .respond("GET", "/drugs", 200, drugs_fixture())
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = actix_web::test::call_service(
            &app,
            actix_web::test::TestRequest::post()
                .uri("/inventory")
                .cookie(cookie.clone())
                .set_form(form())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let page = follow!(app, resp, cookie);
        assert!(page.contains("Drug saved"));

        let sent: serde_json::Value =
            serde_json::from_str(&backend.calls_to("POST", "/drugs")[0].body).unwrap();
        assert_eq!(sent["price"], 37500.0);
        assert_eq!(sent["priceUSD"], 2.5);
        assert_eq!(sent["genericName"], "Paracetamol");
        assert_eq!(sent["expiryDate"], "2027-06-30");
    }

    #[actix_web::test]
    async fn rejected_save_keeps_form_values_and_shows_message() {
        let backend = MockBackend::builder()
            .respond("POST", "/drugs", 400, json!({ "message": "Batch number already exists" }))
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = actix_web::test::call_service(
            &app,
            actix_web::test::TestRequest::post()
                .uri("/inventory")
                .cookie(cookie)
                .set_form(form())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(actix_web::test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("Batch number already exists"));
        assert!(body.contains("B-2291"));
    }

    #[actix_web::test]
    async fn failed_delete_leaves_list_unchanged() {
        let backend = MockBackend::builder()
            .respond("GET", "/drugs", 200, drugs_fixture())
            .respond("DELETE", "/drugs/d1", 500, json!({}))
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = actix_web::test::call_service(
            &app,
            actix_web::test::TestRequest::post()
                .uri("/inventory/d1/delete")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let page = follow!(app, resp, cookie);
        assert!(page.contains("Failed to delete the drug"));
        assert!(page.contains("Panadol"));
        assert!(page.contains("Augmentin"));
    }

    #[actix_web::test]
    async fn export_streams_template() {
        let backend = MockBackend::builder()
            .respond_bytes("GET", "/import/export", b"PK\x03\x04sheet")
            .start();
        let app = test_app!(backend);
        let cookie = login!(app);

        let resp = actix_web::test::call_service(
            &app,
            actix_web::test::TestRequest::get().uri("/inventory/export").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"inventory_template.xlsx\""
        );
        assert_eq!(actix_web::test::read_body(resp).await.as_ref(), b"PK\x03\x04sheet");
    }
}
