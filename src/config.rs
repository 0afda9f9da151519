use std::{env, fmt::Display, str::FromStr};

use actix_web::cookie::Key;

use crate::errors::AppError;

/// `Key::from` panics below this length.
const MIN_SESSION_KEY_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_key: String,
    pub secure_cookies: bool,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub admin_emails: Vec<String>,
    pub geocoder_url: String,
    pub hospital_search_radius_m: u32,
    pub hospital_search_limit: u32,
    pub map_tile_url: String,
    pub map_default_lat: f64,
    pub map_default_lon: f64,
    pub dashboard_embed_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://swasta_setu.db".to_owned(),
            host: "0.0.0.0".to_owned(),
            port: 8080,
            session_key: String::new(),
            secure_cookies: false,
            upload_dir: "uploads".to_owned(),
            max_upload_bytes: 5 * 1024 * 1024,
            admin_emails: Vec::new(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_owned(),
            hospital_search_radius_m: 5000,
            hospital_search_limit: 10,
            map_tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_owned(),
            map_default_lat: 28.474388,
            map_default_lon: 77.503990,
            dashboard_embed_url: "https://gsdl.org.in/hfw2/".to_owned(),
            gemini_api_key: None,
            gemini_model: "gemini-pro".to_owned(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_owned(),
            http_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Reads the environment on top of the defaults. `.env` is expected to
    /// be loaded already.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Config::default();
        let session_key = env::var("SESSION_KEY").map_err(|e| {
            log::error!("FATAL: SESSION_KEY environment variable not set");
            AppError::EnvVarError(e)
        })?;

        Ok(Self {
            database_url: load_or("DATABASE_URL", defaults.database_url)?,
            host: load_or("HOST", defaults.host)?,
            port: load_or("PORT", defaults.port)?,
            session_key,
            secure_cookies: load_or("SECURE_COOKIES", defaults.secure_cookies)?,
            upload_dir: load_or("UPLOAD_DIR", defaults.upload_dir)?,
            max_upload_bytes: load_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|raw| parse_email_list(&raw))
                .unwrap_or_default(),
            geocoder_url: load_or("GEOCODER_URL", defaults.geocoder_url)?,
            hospital_search_radius_m: load_or(
                "HOSPITAL_SEARCH_RADIUS_M",
                defaults.hospital_search_radius_m,
            )?,
            hospital_search_limit: load_or(
                "HOSPITAL_SEARCH_LIMIT",
                defaults.hospital_search_limit,
            )?,
            map_tile_url: load_or("MAP_TILE_URL", defaults.map_tile_url)?,
            map_default_lat: load_or("MAP_DEFAULT_LAT", defaults.map_default_lat)?,
            map_default_lon: load_or("MAP_DEFAULT_LON", defaults.map_default_lon)?,
            dashboard_embed_url: load_or("DASHBOARD_EMBED_URL", defaults.dashboard_embed_url)?,
            gemini_api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            gemini_model: load_or("GEMINI_MODEL", defaults.gemini_model)?,
            gemini_base_url: load_or("GEMINI_BASE_URL", defaults.gemini_base_url)?,
            http_timeout_secs: load_or("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
        })
    }

    pub fn session_key(&self) -> Result<Key, AppError> {
        if self.session_key.len() < MIN_SESSION_KEY_BYTES {
            return Err(AppError::ConfigError(format!(
                "SESSION_KEY must be at least {MIN_SESSION_KEY_BYTES} bytes"
            )));
        }
        Ok(Key::from(self.session_key.as_bytes()))
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|admin| admin == email)
    }
}

fn load_or<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        log::warn!("Invalid {key} value: {e}");
        AppError::ConfigError(format!("invalid value for {key}: {e}"))
    })
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}
