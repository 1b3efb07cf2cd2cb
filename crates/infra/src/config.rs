use serde::Deserialize;

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub cors_allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBackend {
    Memory,
    Surreal,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3000)?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "respawn")?
            .set_default("surreal_db", "reviews")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")?
            .set_default("jwt_secret", DEV_JWT_SECRET)?
            .set_default("jwt_ttl_secs", 7 * 24 * 60 * 60)?
            .set_default("cors_allowed_origins", "")?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        let config: Self = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.data_backend()?;
        if self.is_production() && self.jwt_secret == DEV_JWT_SECRET {
            anyhow::bail!("jwt_secret must be set in production");
        }
        if self.jwt_ttl_secs == 0 {
            anyhow::bail!("jwt_ttl_secs must be positive");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn is_test(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("test")
    }

    pub fn data_backend(&self) -> anyhow::Result<DataBackend> {
        match self.data_backend.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(DataBackend::Memory),
            "surreal" | "surrealdb" => Ok(DataBackend::Surreal),
            other => anyhow::bail!("unknown data_backend '{other}'"),
        }
    }

    /// Empty when any origin is allowed.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            app_env: "development".into(),
            port: 3000,
            log_level: "info".into(),
            data_backend: "memory".into(),
            surreal_endpoint: "ws://127.0.0.1:8000".into(),
            surreal_ns: "respawn".into(),
            surreal_db: "reviews".into(),
            surreal_user: "root".into(),
            surreal_pass: "root".into(),
            jwt_secret: DEV_JWT_SECRET.into(),
            jwt_ttl_secs: 60,
            cors_allowed_origins: " http://localhost:5173 ,, https://respawn.gg".into(),
        }
    }

    #[test]
    fn production_rejects_dev_secret() {
        let mut config = config();
        assert!(config.validate().is_ok());
        config.app_env = "production".into();
        assert!(config.validate().is_err());
        config.jwt_secret = "a-real-secret".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backend_and_origins_parse() {
        let mut config = config();
        assert_eq!(config.data_backend().unwrap(), DataBackend::Memory);
        config.data_backend = "SurrealDB".into();
        assert_eq!(config.data_backend().unwrap(), DataBackend::Surreal);
        config.data_backend = "mongo".into();
        assert!(config.data_backend().is_err());
        assert_eq!(
            config.cors_origins(),
            vec!["http://localhost:5173", "https://respawn.gg"]
        );
    }
}
