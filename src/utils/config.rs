use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default interval between OTP sweeps (5 minutes)
const DEFAULT_OTP_SWEEP_INTERVAL_SECS: u64 = 300;

/// Minimum interval between OTP sweeps
const MIN_OTP_SWEEP_INTERVAL_SECS: u64 = 30;

/// Application configuration loaded from the environment (`.env` supported)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub otp_length: usize,
    pub otp_expiry_minutes: i64,
    pub contact_otp_length: usize,
    pub contact_otp_expiry_minutes: i64,
    pub otp_sweep_interval: Duration,
    pub frontend_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let sweep_secs: u64 = parse_or("OTP_SWEEP_INTERVAL_SECS", DEFAULT_OTP_SWEEP_INTERVAL_SECS)?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 4000)?,
            mongodb_uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "sixloans".to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| "JWT_SECRET is required")?,
            jwt_expiry_hours: parse_or("JWT_EXPIRY_HOURS", 24 * 7)?,
            otp_length: parse_or("OTP_LENGTH", 6)?,
            otp_expiry_minutes: parse_or("OTP_EXPIRY_MINUTES", 10)?,
            contact_otp_length: parse_or("CONTACT_OTP_LENGTH", 4)?,
            contact_otp_expiry_minutes: parse_or("CONTACT_OTP_EXPIRY_MINUTES", 5)?,
            otp_sweep_interval: Duration::from_secs(sweep_secs.max(MIN_OTP_SWEEP_INTERVAL_SECS)),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Configuration used by tests; never reads the environment.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database_name: "sixloans_test".to_string(),
            redis_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            otp_length: 6,
            otp_expiry_minutes: 10,
            contact_otp_length: 4,
            contact_otp_expiry_minutes: 5,
            otp_sweep_interval: Duration::from_secs(DEFAULT_OTP_SWEEP_INTERVAL_SECS),
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}
