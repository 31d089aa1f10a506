use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            other => anyhow::bail!("APP_ENV must be development, production or test, got '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: AppEnv,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = match std::env::var("APP_ENV") {
            Ok(raw) => AppEnv::parse(&raw)?,
            Err(_) => AppEnv::Development,
        };
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5000);
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            access_ttl_minutes: std::env::var("JWT_ACCESS_EXPIRATION_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };
        let storage = StorageConfig {
            url: std::env::var("SUPABASE_URL").context("SUPABASE_URL is required")?,
            service_key: std::env::var("SUPABASE_SERVICE_KEY")
                .context("SUPABASE_SERVICE_KEY is required")?,
            bucket: std::env::var("SUPABASE_BUCKET").unwrap_or_else(|_| "user-documents".into()),
        };
        Ok(Self {
            env,
            port,
            database_url,
            jwt,
            storage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the process environment is only mutated from one place.
    #[test]
    fn from_env_requires_secret_and_applies_defaults() {
        for key in [
            "APP_ENV",
            "PORT",
            "DATABASE_URL",
            "JWT_SECRET",
            "JWT_ACCESS_EXPIRATION_MINUTES",
            "SUPABASE_URL",
            "SUPABASE_SERVICE_KEY",
            "SUPABASE_BUCKET",
        ] {
            std::env::remove_var(key);
        }

        std::env::set_var("DATABASE_URL", "postgres://postgres@localhost/oceanwatch");
        std::env::set_var("SUPABASE_URL", "https://project.supabase.co");
        std::env::set_var("SUPABASE_SERVICE_KEY", "service-key");

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        std::env::set_var("JWT_SECRET", "dev-secret");
        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.env, AppEnv::Development);
        assert_eq!(config.port, 5000);
        assert_eq!(config.jwt.access_ttl_minutes, 30);
        assert_eq!(config.storage.bucket, "user-documents");

        std::env::set_var("APP_ENV", "production");
        std::env::set_var("PORT", "8081");
        std::env::set_var("JWT_ACCESS_EXPIRATION_MINUTES", "45");
        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.env, AppEnv::Production);
        assert_eq!(config.port, 8081);
        assert_eq!(config.jwt.access_ttl_minutes, 45);
    }
}
