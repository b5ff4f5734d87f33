//! Client for the Viatica REST backend.
//!
//! Every call carries the operator's bearer token. Responses are unwrapped
//! from their `data` envelope; a 401 becomes [`AppError::Unauthorized`] and
//! any other failure keeps the backend's `message` for the operator.

use std::time::Duration;

use actix_web::web::Bytes;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::{
    errors::AppError,
    import::{ColumnMapping, PendingImport},
    structs::{
        DashboardStats, Drug, DrugPayload, Envelope, ErrorBody, ImportPreview, LoginResponse,
        Notification, Offer, OfferPayload, Order, OrderStatus, RegisterPayload, Role, User,
        VerificationStatus,
    },
};

#[derive(Deserialize)]
struct DrugList {
    drugs: Vec<Drug>,
}

#[derive(Deserialize)]
struct DrugOne {
    drug: Drug,
}

#[derive(Deserialize)]
struct OrderList {
    orders: Vec<Order>,
}

#[derive(Deserialize)]
struct OrderOne {
    order: Order,
}

#[derive(Deserialize)]
struct UserList {
    users: Vec<User>,
}

#[derive(Deserialize)]
struct OfferList {
    offers: Vec<Offer>,
}

#[derive(Deserialize)]
struct NotificationList {
    notifications: Vec<Notification>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn request(&self, method: Method, token: Option<&str>, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            log::warn!("Backend rejected session token");
            return Err(AppError::Unauthorized);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_default();
        log::error!("Backend answered {}: {}", status, message);
        Err(AppError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AppError> {
        let response = Self::check(builder.send().await?).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(), AppError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn send_json<B: Serialize>(
        &self,
        method: Method,
        token: &str,
        path: &str,
        body: &B,
    ) -> Result<(), AppError> {
        self.execute(self.request(method, Some(token), path).json(body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let response = self
            .request(Method::POST, None, "/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats, AppError> {
        self.fetch(self.request(Method::GET, Some(token), "/admin/dashboard"))
            .await
    }

    pub async fn list_drugs(&self, token: &str) -> Result<Vec<Drug>, AppError> {
        let list: DrugList = self
            .fetch(self.request(Method::GET, Some(token), "/drugs"))
            .await?;
        Ok(list.drugs)
    }

    pub async fn get_drug(&self, token: &str, id: &str) -> Result<Drug, AppError> {
        let one: DrugOne = self
            .fetch(self.request(Method::GET, Some(token), &format!("/drugs/{}", id)))
            .await?;
        Ok(one.drug)
    }

    pub async fn create_drug(&self, token: &str, drug: &DrugPayload) -> Result<(), AppError> {
        self.send_json(Method::POST, token, "/drugs", drug).await
    }

    pub async fn update_drug(&self, token: &str, id: &str, drug: &DrugPayload) -> Result<(), AppError> {
        self.send_json(Method::PUT, token, &format!("/drugs/{}", id), drug)
            .await
    }

    pub async fn delete_drug(&self, token: &str, id: &str) -> Result<(), AppError> {
        self.execute(self.request(Method::DELETE, Some(token), &format!("/drugs/{}", id)))
            .await
    }

    pub async fn list_orders(&self, token: &str) -> Result<Vec<Order>, AppError> {
        let list: OrderList = self
            .fetch(self.request(Method::GET, Some(token), "/orders"))
            .await?;
        Ok(list.orders)
    }

    pub async fn get_order(&self, token: &str, id: &str) -> Result<Order, AppError> {
        let one: OrderOne = self
            .fetch(self.request(Method::GET, Some(token), &format!("/orders/{}", id)))
            .await?;
        Ok(one.order)
    }

    pub async fn update_order_status(
        &self,
        token: &str,
        id: &str,
        status: OrderStatus,
    ) -> Result<(), AppError> {
        self.send_json(
            Method::PATCH,
            token,
            &format!("/orders/{}/status", id),
            &json!({ "status": status }),
        )
        .await
    }

    pub async fn assign_driver(&self, token: &str, id: &str, driver_id: &str) -> Result<(), AppError> {
        self.send_json(
            Method::PATCH,
            token,
            &format!("/orders/{}/assign-driver", id),
            &json!({ "driverId": driver_id }),
        )
        .await
    }

    pub async fn list_users(&self, token: &str, role: Role) -> Result<Vec<User>, AppError> {
        let list: UserList = self
            .fetch(
                self.request(Method::GET, Some(token), "/users")
                    .query(&[("role", role.as_str())]),
            )
            .await?;
        Ok(list.users)
    }

    pub async fn update_user_status(
        &self,
        token: &str,
        id: &str,
        status: VerificationStatus,
    ) -> Result<(), AppError> {
        self.send_json(
            Method::PATCH,
            token,
            &format!("/users/{}/status", id),
            &json!({ "status": status }),
        )
        .await
    }

    pub async fn register_user(&self, token: &str, user: &RegisterPayload) -> Result<(), AppError> {
        self.send_json(Method::POST, token, "/auth/register", user)
            .await
    }

    pub async fn list_offers(&self, token: &str) -> Result<Vec<Offer>, AppError> {
        let list: OfferList = self
            .fetch(self.request(Method::GET, Some(token), "/offers"))
            .await?;
        Ok(list.offers)
    }

    pub async fn create_offer(&self, token: &str, offer: &OfferPayload) -> Result<(), AppError> {
        self.send_json(Method::POST, token, "/offers", offer).await
    }

    pub async fn delete_offer(&self, token: &str, id: &str) -> Result<(), AppError> {
        self.execute(self.request(Method::DELETE, Some(token), &format!("/offers/{}", id)))
            .await
    }

    pub async fn list_notifications(&self, token: &str) -> Result<Vec<Notification>, AppError> {
        let list: NotificationList = self
            .fetch(self.request(Method::GET, Some(token), "/notifications"))
            .await?;
        Ok(list.notifications)
    }

    pub async fn mark_notification_read(&self, token: &str, id: &str) -> Result<(), AppError> {
        self.execute(self.request(
            Method::PATCH,
            Some(token),
            &format!("/notifications/{}/read", id),
        ))
        .await
    }

    pub async fn mark_all_notifications_read(&self, token: &str) -> Result<(), AppError> {
        self.execute(self.request(Method::PATCH, Some(token), "/notifications/mark-all-read"))
            .await
    }

    /// The spreadsheet template the backend hands out for bulk imports.
    pub async fn export_template(&self, token: &str) -> Result<Bytes, AppError> {
        let response = self
            .request(Method::GET, Some(token), "/import/export")
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?)
    }

    fn file_part(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<multipart::Part, AppError> {
        multipart::Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(content_type)
            .map_err(|e| AppError::ValidationError(format!("Unsupported file type: {}", e)))
    }

    pub async fn import_preview(
        &self,
        token: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportPreview, AppError> {
        let form = multipart::Form::new().part("file", Self::file_part(file_name, content_type, bytes)?);
        self.fetch(
            self.request(Method::POST, Some(token), "/import/preview")
                .multipart(form),
        )
        .await
    }

    pub async fn import_commit(
        &self,
        token: &str,
        import: &PendingImport,
        mapping: &ColumnMapping,
    ) -> Result<(), AppError> {
        let mapping = serde_json::to_string(mapping)
            .map_err(|e| AppError::DecodeError(e.to_string()))?;
        let form = multipart::Form::new()
            .part(
                "file",
                Self::file_part(&import.file_name, &import.content_type, import.bytes.clone())?,
            )
            .text("mapping", mapping);
        self.execute(
            self.request(Method::POST, Some(token), "/import/commit")
                .multipart(form),
        )
        .await
    }
}
