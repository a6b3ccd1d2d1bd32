use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL of the card-payment gateway's API.
    pub gateway_base_url: String,
    /// Secret key for the gateway. When unset the server falls back to the
    /// in-memory mock gateway (development only).
    pub gateway_secret_key: Option<String>,
    /// Public origin used to build checkout success/cancel callback URLs.
    pub public_base_url: String,
    pub currency: String,
    /// Browser origins allowed by the CORS layer.
    pub cors_allowed_origins: Vec<String>,
    /// Enables production-only hardening such as the HSTS header.
    pub production: bool,
}

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/fareport".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            gateway_base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            gateway_secret_key: env::var("GATEWAY_SECRET_KEY").ok(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            production: env::var("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}/checkout/success", self.public_base_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/checkout/cancel", self.public_base_url)
    }
}
