// src/config.rs
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub football_api_key: String,
    pub football_api_url: String,
    pub port: u16,
    pub host: String,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "livescore".to_string()),
            football_api_key: env::var("FOOTBALL_API_KEY").expect("FOOTBALL_API_KEY must be set"),
            football_api_url: env::var("FOOTBALL_API_URL")
                .unwrap_or_else(|_| "https://api.football-data.org/v4".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
