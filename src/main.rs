#[macro_use]
extern crate lazy_static;

use actix_files::NamedFile;
use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key,
    http::{Method, StatusCode},
    middleware,
    web::{self, Data},
    App, Either, HttpResponse, HttpServer, Responder,
};
use log::info;
use tera::Tera;

mod api;
mod config;
mod errors;
mod import;
mod lifecycle;
mod pricing;
mod routes;
mod structs;
#[cfg(test)]
mod test_support;
mod utils;

use api::ApiClient;
use config::Config;
use errors::AppError;
use import::ImportStore;

pub const SESSION_COOKIE: &str = "viatica_session";

pub struct AppState {
    pub api: ApiClient,
    pub imports: ImportStore,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        Ok(AppState {
            api: ApiClient::new(&config.api_url, config.api_timeout())?,
            imports: ImportStore::new(config.import_ttl()),
            config,
        })
    }
}

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = match Tera::new("templates/**/*") {
            Ok(t) => t,
            Err(e) => {
                log::error!("Parsing error(s): {}", e);
                ::std::process::exit(1);
            }
        };
        tera.autoescape_on(vec![".html"]);
        tera.register_filter("money", utils::money_filter);
        tera.register_filter("short_ref", utils::short_ref_filter);
        tera
    };
}

pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_secure(secure)
        .build()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load().map_err(|e| {
        log::error!("FATAL: {}", e);
        e
    })?;
    let key = config.cookie_key()?;
    let bind = (config.bind_addr.clone(), config.port);
    let secure = config.secure_cookies;

    info!("Using backend at {}", config.api_url);
    let state = Data::new(AppState::new(config)?);

    info!("Starting HTTP server on http://{}:{}/", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(middleware::from_fn(routes::auth::evict_expired_session))
            .wrap(IdentityMiddleware::default())
            .wrap(session_middleware(key.clone(), secure))
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
            .default_service(web::to(default_handler))
    })
    .bind(bind)?
    .run()
    .await
}

async fn default_handler(req_method: Method) -> Result<impl Responder, std::io::Error> {
    match req_method {
        Method::GET => {
            let file = NamedFile::open("static/404.html")?
                .customize()
                .with_status(StatusCode::NOT_FOUND);
            Ok(Either::Left(file))
        }
        _ => Ok(Either::Right(HttpResponse::MethodNotAllowed().finish())),
    }
}
