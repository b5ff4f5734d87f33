use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every backend payload arrives as `{ "status": ..., "data": T }`.
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrugCategory {
    Analgesic,
    Antibiotic,
    Antihistamine,
    Cardiovascular,
    #[default]
    #[serde(other)]
    Other,
}

impl DrugCategory {
    pub const ALL: [DrugCategory; 5] = [
        DrugCategory::Analgesic,
        DrugCategory::Antibiotic,
        DrugCategory::Antihistamine,
        DrugCategory::Cardiovascular,
        DrugCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrugCategory::Analgesic => "analgesic",
            DrugCategory::Antibiotic => "antibiotic",
            DrugCategory::Antihistamine => "antihistamine",
            DrugCategory::Cardiovascular => "cardiovascular",
            DrugCategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DrugCategory::Analgesic => "Analgesics",
            DrugCategory::Antibiotic => "Antibiotics",
            DrugCategory::Antihistamine => "Antihistamines",
            DrugCategory::Cardiovascular => "Cardiovascular",
            DrugCategory::Other => "Other",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub generic_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "priceUSD", default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub category: DrugCategory,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub batch_number: String,
}

impl Drug {
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.generic_name.to_lowercase().contains(&term)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DrugPayload {
    pub name: String,
    pub generic_name: String,
    pub manufacturer: String,
    #[serde(rename = "priceUSD", skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    pub price: f64,
    pub quantity: i64,
    pub category: DrugCategory,
    pub expiry_date: String,
    pub batch_number: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Assigned,
    OutForDelivery,
    Delivered,
    Cancelled,
    /// Legacy or newer backend states; shown but never acted on.
    #[serde(other)]
    Unknown,
}

/// A user reference as the backend populates it inside orders and offers.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartyRef {
    #[serde(rename(deserialize = "_id"), default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
}

/// The `drug` of an order line: a bare id in list responses, populated in
/// order detail responses.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum LineDrug {
    Populated {
        name: String,
        #[serde(default)]
        price: Option<f64>,
    },
    Id(String),
}

impl LineDrug {
    pub fn name(&self) -> &str {
        match self {
            LineDrug::Populated { name, .. } => name,
            LineDrug::Id(id) => id,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub drug: LineDrug,
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub is_bonus: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    #[serde(default)]
    pub pharmacist: Option<PartyRef>,
    #[serde(default)]
    pub warehouse: Option<PartyRef>,
    #[serde(default)]
    pub driver: Option<PartyRef>,
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_address: Option<Address>,
    #[serde(default)]
    pub is_free_delivery: bool,
    #[serde(default)]
    pub delivery_fee: Option<f64>,
    #[serde(default)]
    pub drugs: Vec<LineItem>,
}

impl Order {
    /// Last six characters of the id, upper-cased, as operators quote it.
    pub fn short_ref(&self) -> String {
        short_ref(&self.id)
    }
}

pub fn short_ref(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let start = chars.len().saturating_sub(6);
    chars[start..].iter().collect::<String>().to_uppercase()
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Pharmacist,
    Warehouse,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Pharmacist => "pharmacist",
            Role::Warehouse => "warehouse",
            Role::Driver => "driver",
        }
    }

    pub fn plural_label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrators",
            Role::Pharmacist => "Pharmacists",
            Role::Warehouse => "Warehouses",
            Role::Driver => "Drivers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "administrator",
            Role::Pharmacist => "pharmacist",
            Role::Warehouse => "warehouse",
            Role::Driver => "driver",
        }
    }

    /// Accounts staff may open directly from the dashboard. Pharmacists sign
    /// up themselves and go through license review instead.
    pub fn is_staff_created(&self) -> bool {
        matches!(self, Role::Driver | Role::Warehouse)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    PendingReview,
    Verified,
    Rejected,
    Suspended,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pharmacy_name: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    pub status: VerificationStatus,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub license_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
    pub is_verified: bool,
    pub status: VerificationStatus,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    #[default]
    Discount,
    Bonus,
    General,
}

impl OfferType {
    pub fn label(&self) -> &'static str {
        match self {
            OfferType::Discount => "Discount",
            OfferType::Bonus => "Bonus",
            OfferType::General => "Announcement",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OfferColor {
    Purple,
    Teal,
    Orange,
    #[default]
    #[serde(other)]
    Blue,
}

/// Offers reference drugs by name only; the id is not needed for display.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    #[serde(default)]
    pub drug: Option<NamedRef>,
    #[serde(default)]
    pub warehouse: Option<NamedRef>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub color: OfferColor,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub bonus_quantity: Option<i64>,
    #[serde(default)]
    pub bonus_base: Option<i64>,
    #[serde(default)]
    pub free_delivery: bool,
    #[serde(default)]
    pub min_order_value: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    pub title: String,
    pub subtitle: String,
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drug: Option<String>,
    pub end_date: String,
    pub color: OfferColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_base: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_quantity: Option<i64>,
    pub free_delivery: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_value: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_users: i64,
    #[serde(default)]
    pub total_orders: i64,
    #[serde(default)]
    pub total_sales: Option<f64>,
    #[serde(default)]
    pub low_stock: Option<i64>,
    #[serde(default)]
    pub recent_orders: Vec<RecentOrder>,
}

/// The account returned by `/auth/login`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize, Debug)]
pub struct LoginData {
    pub user: SessionUser,
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub data: LoginData,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub headers: Vec<String>,
    #[serde(default)]
    pub sample_data: Vec<Vec<serde_json::Value>>,
}

impl ImportPreview {
    /// Sample cells as display text; spreadsheets mix strings, numbers and blanks.
    pub fn sample_rows(&self) -> Vec<Vec<String>> {
        self.sample_data
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        serde_json::Value::Null => String::new(),
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}
