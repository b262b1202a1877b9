use std::env;

use anyhow::{Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;
use crate::error::{AppError, AppResult};

pub const DEFAULT_STAMP_ISSUER: &str = "Civil Registry Office";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origin: Option<String>,
    pub aws_endpoint_url: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    pub s3_bucket: String,
    pub google_api_key: Option<String>,
    pub pdfium_library_path: Option<String>,
    pub stamp_issuer: String,
    pub mail: MailConfig,
}

/// SMTP settings. Every field may be absent at startup; `validate` decides
/// whether mail delivery is usable.
#[derive(Clone, Debug, Default)]
pub struct MailConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let aws_endpoint_url = env::var("AWS_ENDPOINT_URL").ok();
        let aws_access_key_id = env::var("AWS_ACCESS_KEY_ID").ok();
        let aws_secret_access_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let aws_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let s3_bucket = env::var("S3_BUCKET").context("S3_BUCKET must be set")?;
        let google_api_key = non_empty_var(&["GOOGLE_API_KEY"]);
        let pdfium_library_path = non_empty_var(&["PDFIUM_LIBRARY_PATH"]);
        let stamp_issuer =
            non_empty_var(&["STAMP_ISSUER"]).unwrap_or_else(|| DEFAULT_STAMP_ISSUER.to_string());
        let mail = MailConfig::from_env()?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            cors_allowed_origin,
            aws_endpoint_url,
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            s3_bucket,
            google_api_key,
            pdfium_library_path,
            stamp_issuer,
            mail,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

impl MailConfig {
    pub fn from_env() -> Result<Self> {
        let port = match non_empty_var(&["SMTP_PORT", "EMAIL_PORT"]) {
            Some(raw) => Some(raw.parse().context("SMTP_PORT must be a valid u16")?),
            None => None,
        };

        Ok(Self {
            host: non_empty_var(&["SMTP_HOST", "EMAIL_HOST"]),
            port,
            username: non_empty_var(&["SMTP_USERNAME", "SMTP_MAIL", "EMAIL_USERNAME"]),
            password: non_empty_var(&["SMTP_PASSWORD", "EMAIL_PASSWORD"]),
            from_address: non_empty_var(&["SMTP_FROM", "EMAIL_FROM"]),
            from_name: non_empty_var(&["SMTP_FROM_NAME"]),
        })
    }

    /// Fails with the first missing transport setting.
    pub fn validate(&self) -> AppResult<()> {
        if self.host.is_none() {
            return Err(AppError::config("mail host is not configured"));
        }
        if self.port.is_none() {
            return Err(AppError::config("mail port is not configured"));
        }
        if self.username.is_none() {
            return Err(AppError::config("mail username is not configured"));
        }
        if self.password.is_none() {
            return Err(AppError::config("mail password is not configured"));
        }
        Ok(())
    }

    pub fn sender_address(&self) -> Option<&str> {
        self.from_address.as_deref().or(self.username.as_deref())
    }
}

fn non_empty_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("*****")).is_err() {
                return "***".to_string();
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
