//! In-process stand-in for the REST backend, plus helpers to build the
//! dashboard against it.
//!
//! The mock listens on a random local port, answers canned responses keyed
//! by method and path, and records every call it receives.

use std::{
    collections::HashMap,
    net::TcpListener,
    sync::{Arc, Mutex},
};

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
    pub authorization: Option<String>,
}

#[derive(Clone)]
enum Canned {
    Json(u16, Value),
    Bytes(Vec<u8>),
}

#[derive(Clone)]
struct MockState {
    routes: Arc<HashMap<(String, String), Canned>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

pub struct MockBackend {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

pub struct MockBackendBuilder {
    routes: HashMap<(String, String), Canned>,
}

impl MockBackend {
    /// Starts with a working `/auth/login`; override it with `respond`.
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder { routes: HashMap::new() }.respond(
            "POST",
            "/auth/login",
            200,
            json!({
                "status": "success",
                "token": "test-token",
                "data": { "user": { "_id": "admin-1", "name": "Rami", "role": "admin" } }
            }),
        )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }
}

impl MockBackendBuilder {
    pub fn respond(mut self, method: &str, path: &str, status: u16, body: Value) -> Self {
        self.routes
            .insert((method.to_owned(), path.to_owned()), Canned::Json(status, body));
        self
    }

    pub fn respond_bytes(mut self, method: &str, path: &str, bytes: &[u8]) -> Self {
        self.routes
            .insert((method.to_owned(), path.to_owned()), Canned::Bytes(bytes.to_vec()));
        self
    }

    pub fn start(self) -> MockBackend {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            routes: Arc::new(self.routes),
            calls: calls.clone(),
        };

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .app_data(web::PayloadConfig::new(32 * 1024 * 1024))
                .default_service(web::to(answer))
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .unwrap()
        .run();
        actix_web::rt::spawn(server);

        MockBackend {
            base_url: format!("http://{}/api/v1", addr),
            calls,
        }
    }
}

async fn answer(req: HttpRequest, body: web::Bytes, state: web::Data<MockState>) -> HttpResponse {
    let path = req
        .path()
        .strip_prefix("/api/v1")
        .unwrap_or(req.path())
        .to_owned();
    let method = req.method().as_str().to_owned();

    state.calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        path: path.clone(),
        query: req.query_string().to_owned(),
        body: String::from_utf8_lossy(&body).into_owned(),
        authorization: req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    });

    match state.routes.get(&(method, path)) {
        Some(Canned::Json(status, value)) => {
            HttpResponse::build(StatusCode::from_u16(*status).unwrap()).json(value)
        }
        Some(Canned::Bytes(bytes)) => HttpResponse::Ok()
            .content_type("application/octet-stream")
            .body(bytes.clone()),
        None => HttpResponse::NotFound().json(json!({ "message": "Route not mocked" })),
    }
}

/// Builds the dashboard service against a [`MockBackend`].
macro_rules! test_app {
    ($backend:expr) => {{
        let config = $crate::config::Config::for_backend(&$backend.base_url);
        let key = config.cookie_key().unwrap();
        let state = $crate::AppState::new(config).unwrap();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::from_fn(
                    $crate::routes::auth::evict_expired_session,
                ))
                .wrap(actix_identity::IdentityMiddleware::default())
                .wrap($crate::session_middleware(key, false))
                .app_data(actix_web::web::Data::new(state))
                .configure($crate::routes::configure),
        )
        .await
    }};
}

/// Signs in through `/login` and returns the session cookie.
macro_rules! login {
    ($app:expr) => {{
        let resp = actix_web::test::call_service(
            &$app,
            actix_web::test::TestRequest::post()
                .uri("/login")
                .set_form([("email", "admin@viatica.sy"), ("password", "correct horse")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        $crate::test_support::session_cookie(&resp).expect("login sets a session cookie")
    }};
}

pub(crate) use login;
pub(crate) use test_app;

pub fn session_cookie<B>(
    resp: &actix_web::dev::ServiceResponse<B>,
) -> Option<actix_web::cookie::Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == crate::SESSION_COOKIE)
        .map(|c| c.into_owned())
}

/// Follows a mutation's redirect with the refreshed cookie and returns the
/// rendered page body.
macro_rules! follow {
    ($app:expr, $resp:expr, $cookie:expr) => {{
        let location = $resp
            .headers()
            .get("location")
            .expect("redirect location")
            .to_str()
            .unwrap()
            .to_owned();
        let cookie = $crate::test_support::session_cookie(&$resp).unwrap_or($cookie);
        let page = actix_web::test::call_service(
            &$app,
            actix_web::test::TestRequest::get()
                .uri(&location)
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(page.status(), actix_web::http::StatusCode::OK);
        String::from_utf8(actix_web::test::read_body(page).await.to_vec()).unwrap()
    }};
}

pub(crate) use follow;
