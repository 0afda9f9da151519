#[macro_use]
extern crate lazy_static;

use std::{collections::HashMap, sync::Arc, time::Duration};

use actix_files::Files;
use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    middleware,
    web::{self, Data},
    App, HttpServer,
};
use log::info;
use sqlx::SqlitePool;
use tera::Tera;

mod config;
mod db;
mod diagnosis;
mod errors;
mod forms;
mod geo;
mod routes;
mod session;
mod storage;
mod structs;
mod utils;

use config::Config;
use diagnosis::DiagnosisClient;
use errors::AppError;
use geo::Geocoder;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    db_pool: SqlitePool,
    storage: Storage,
    geocoder: Geocoder,
    diagnosis: DiagnosisClient,
    config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config, db_pool: SqlitePool) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let storage = Storage::new(&config.upload_dir).await?;
        let geocoder = Geocoder::new(
            &config.geocoder_url,
            config.hospital_search_radius_m,
            config.hospital_search_limit,
            timeout,
        )?;
        let diagnosis = DiagnosisClient::new(
            &config.gemini_base_url,
            &config.gemini_model,
            config.gemini_api_key.clone(),
            timeout,
        )?;
        Ok(Self {
            db_pool,
            storage,
            geocoder,
            diagnosis,
            config: Arc::new(config),
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
        tera.register_filter("rupees", rupees_filter);
        tera
    };
}

/// `{{ campaign.target_amount | rupees }}` renders paise as `1500.00`.
fn rupees_filter(
    value: &tera::Value,
    _: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let paise = value
        .as_i64()
        .ok_or_else(|| tera::Error::msg("rupees filter expects an integer amount in paise"))?;
    Ok(tera::Value::String(utils::format_rupees(paise)))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;
    let session_key = config.session_key()?;
    let db_pool = db::connect(&config.database_url).await?;
    let bind = (config.host.clone(), config.port);
    let secure_cookies = config.secure_cookies;
    let state = AppState::new(config, db_pool).await?;
    let upload_root = state.storage.root().to_path_buf();

    lazy_static::initialize(&TEMPLATES);
    info!("Starting HTTP server on http://{}:{}/", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(secure_cookies)
                    .build(),
            )
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(state.clone()))
            .service(Files::new("/static", "static"))
            .service(Files::new(storage::PUBLIC_PREFIX, upload_root.clone()))
            .configure(routes::configure)
            .default_service(web::to(routes::default_handler))
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod test_support;
