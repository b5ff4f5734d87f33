use actix_session::Session;
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    structs::{Drug, Offer, OfferColor, OfferPayload, OfferType},
    utils::parse_optional,
    AppState,
};

use super::{flash, loaded, page_context, redirect, render, session_token, settle};

/// Drugs listed in the picker at once.
const PICKER_SIZE: usize = 10;

#[derive(Serialize)]
struct OfferCard {
    #[serde(flatten)]
    offer: Offer,
    type_label: &'static str,
    badge: String,
}

/// Short headline of what the offer gives.
fn badge(offer: &Offer) -> String {
    match offer.offer_type {
        OfferType::Discount => match offer.discount_percentage {
            Some(pct) => format!("{}% off", pct),
            None => OfferType::Discount.label().to_owned(),
        },
        OfferType::Bonus => match (offer.bonus_base, offer.bonus_quantity) {
            (Some(base), Some(qty)) => format!("Buy {} get {} free", base, qty),
            _ => OfferType::Bonus.label().to_owned(),
        },
        OfferType::General => OfferType::General.label().to_owned(),
    }
}

#[get("/offers")]
pub async fn offers_handler(
    state: web::Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let mut context = page_context(&session, &state, "Offers", "offers");

    let offers = loaded(
        state.api.list_offers(&token).await,
        &mut context,
        "Failed to load offers",
    )?
    .unwrap_or_default();
    let cards: Vec<OfferCard> = offers
        .into_iter()
        .map(|offer| OfferCard {
            type_label: offer.offer_type.label(),
            badge: badge(&offer),
            offer,
        })
        .collect();

    context.insert("offers", &cards);
    render("offers.html", &context)
}

/// The offer form as submitted; only the fields of the chosen type are read.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct OfferForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(rename = "type", default)]
    pub offer_type: OfferType,
    #[serde(default)]
    pub drug: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub color: OfferColor,
    #[serde(default)]
    pub discount_percentage: String,
    #[serde(default)]
    pub bonus_base: String,
    #[serde(default)]
    pub bonus_quantity: String,
    /// Checkbox: present when ticked.
    #[serde(default)]
    pub free_delivery: Option<String>,
    #[serde(default)]
    pub min_order_value: String,
}

impl OfferForm {
    pub fn to_payload(&self) -> Result<OfferPayload, AppError> {
        let invalid = AppError::ValidationError;
        if self.title.trim().is_empty() {
            return Err(invalid("Title is required".to_owned()));
        }
        let end_date = NaiveDate::parse_from_str(self.end_date.trim(), "%Y-%m-%d")
            .map_err(|_| invalid("End date is required".to_owned()))?;

        let mut payload = OfferPayload {
            title: self.title.trim().to_owned(),
            subtitle: self.subtitle.trim().to_owned(),
            offer_type: self.offer_type,
            drug: Some(self.drug.trim().to_owned()).filter(|d| !d.is_empty()),
            end_date: end_date.format("%Y-%m-%d").to_string(),
            color: self.color,
            discount_percentage: None,
            bonus_base: None,
            bonus_quantity: None,
            free_delivery: self.free_delivery.is_some(),
            min_order_value: None,
        };

        match self.offer_type {
            OfferType::Discount => {
                let pct = parse_optional::<f64>(&self.discount_percentage, "Discount")
                    .map_err(invalid)?
                    .ok_or_else(|| invalid("Discount is required".to_owned()))?;
                if !(pct > 0.0 && pct <= 100.0) {
                    return Err(invalid(
                        "Discount must be above 0 and at most 100".to_owned(),
                    ));
                }
                payload.discount_percentage = Some(pct);
            }
            OfferType::Bonus => {
                let base = parse_optional::<i64>(&self.bonus_base, "Bonus base")
                    .map_err(invalid)?;
                let quantity = parse_optional::<i64>(&self.bonus_quantity, "Bonus quantity")
                    .map_err(invalid)?;
                match (base, quantity) {
                    (Some(base), Some(quantity)) if base > 0 && quantity > 0 => {
                        payload.bonus_base = Some(base);
                        payload.bonus_quantity = Some(quantity);
                    }
                    _ => {
                        return Err(invalid(
                            "Enter how many to buy and how many are free".to_owned(),
                        ))
                    }
                }
            }
            OfferType::General => {}
        }

        if payload.free_delivery {
            payload.min_order_value = parse_optional::<f64>(&self.min_order_value, "Minimum order")
                .map_err(invalid)?;
        }
        Ok(payload)
    }
}

#[derive(Deserialize)]
pub struct PickerQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct PickerOption {
    id: String,
    name: String,
    price: f64,
}

async fn offer_form_page(
    state: &AppState,
    session: &Session,
    token: &str,
    form: &OfferForm,
    q: &str,
    error: Option<&str>,
) -> Result<HttpResponse, AppError> {
    let mut context = page_context(session, state, "New offer", "offers");
    let drugs = loaded(
        state.api.list_drugs(token).await,
        &mut context,
        "Failed to load the drug list",
    )?
    .unwrap_or_default();
    let picker: Vec<PickerOption> = drugs
        .into_iter()
        .filter(|d: &Drug| d.matches(q) || d.id == form.drug)
        .take(PICKER_SIZE)
        .map(|d| PickerOption {
            id: d.id,
            name: d.name,
            price: d.price,
        })
        .collect();

    context.insert("form", form);
    context.insert("drugs", &picker);
    context.insert("q", q);
    context.insert("error", &error);
    render("offer_form.html", &context)
}

#[get("/offers/new")]
pub async fn new_offer_handler(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<PickerQuery>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    offer_form_page(&state, &session, &token, &OfferForm::default(), &query.q, None).await
}

#[post("/offers")]
pub async fn create_offer_handler(
    state: web::Data<AppState>,
    session: Session,
    web::Form(form): web::Form<OfferForm>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let result = match form.to_payload() {
        Ok(payload) => state.api.create_offer(&token, &payload).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            log::info!("Offer {} published", form.title);
            flash::success(&session, "Offer published")?;
            Ok(redirect("/offers"))
        }
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(e) => {
            log::error!("Failed to create offer: {}", e);
            let message = e.user_message("Failed to publish the offer");
            offer_form_page(&state, &session, &token, &form, "", Some(&message)).await
        }
    }
}

#[post("/offers/{id}/delete")]
pub async fn delete_offer_handler(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let token = session_token(&session)?;
    let id = path.into_inner();
    if settle(
        &session,
        state.api.delete_offer(&token, &id).await,
        Some("Offer deleted"),
        "Failed to delete the offer",
    )? {
        log::info!("Offer {} deleted", id);
    }
    Ok(redirect("/offers"))
}
