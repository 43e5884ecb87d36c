use anyhow::Result;
use std::env;

use crate::services::validation::ValidationRules;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub environment: String,
    pub enforce_coordinate_bounds: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/geofence".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            enforce_coordinate_bounds: env::var("ENFORCE_COORDINATE_BOUNDS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            enforce_coordinate_bounds: self.enforce_coordinate_bounds,
        }
    }
}
