use std::env;

use crate::services::ImportDefaults;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub db_max_connections: u32,
    pub max_upload_mb: usize,
    pub default_centro_id: i32,
    pub default_sede_id: i32,
    pub import_history_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            max_upload_mb: env::var("MAX_UPLOAD_MB")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            default_centro_id: env::var("DEFAULT_CENTRO_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            default_sede_id: env::var("DEFAULT_SEDE_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            import_history_limit: env::var("IMPORT_HISTORY_LIMIT")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
        })
    }

    /// Config for callers that only need a database, such as the CLI
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Config {
            database_url: database_url.into(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            db_max_connections: 5,
            max_upload_mb: 10,
            default_centro_id: 1,
            default_sede_id: 1,
            import_history_limit: 20,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn import_defaults(&self) -> ImportDefaults {
        ImportDefaults {
            centro_id: self.default_centro_id,
            sede_id: self.default_sede_id,
            history_limit: self.import_history_limit,
        }
    }
}
