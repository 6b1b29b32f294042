use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    /// Lifetime used when the user ticks "remember me" at login.
    pub remember_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub sender: String,
    /// Base of the links put into outgoing mail.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
    pub posts_per_page: u32,
    pub storage: StorageConfig,
    pub mail: MailConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET")?;

        let jwt = JwtConfig {
            issuer: env_or("JWT_ISSUER", "postboard"),
            audience: env_or("JWT_AUDIENCE", "postboard-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            remember_ttl_minutes: env_parse("JWT_REMEMBER_TTL_MINUTES", 60 * 24 * 14),
            secret: jwt_secret.clone(),
        };
        let reset = ResetConfig {
            secret: std::env::var("RESET_TOKEN_SECRET").unwrap_or(jwt_secret),
            ttl_seconds: env_parse("RESET_TOKEN_TTL_SECONDS", 1800),
        };
        let posts_per_page = env_parse("POSTS_PER_PAGE", 4u32);
        anyhow::ensure!(posts_per_page > 0, "POSTS_PER_PAGE must be positive");
        anyhow::ensure!(reset.ttl_seconds > 0, "RESET_TOKEN_TTL_SECONDS must be positive");

        let storage = StorageConfig {
            minio_endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
            minio_bucket: env_or("MINIO_BUCKET", "postboard"),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            minio_secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            minio_region: env_or("MINIO_REGION", "us-east-1"),
        };
        let mail = MailConfig {
            sender: env_or("MAIL_SENDER", "noreply@postboard.local"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:8080"),
        };

        Ok(Self {
            database_url,
            jwt,
            reset,
            posts_per_page,
            storage,
            mail,
        })
    }
}
