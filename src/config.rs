use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Business policy knobs and connection settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub default_due_day: u32,
    pub monthly_interest_percent: f64,
    pub max_refresh_tokens: usize,
    pub refresh_token_ttl_days: i64,
    pub max_failed_logins: u32,
    pub lockout_minutes: i64,
    pub contract_expiry_warning_days: i64,
    pub nearly_full_ratio: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            default_due_day: 10,
            monthly_interest_percent: 1.0,
            max_refresh_tokens: 5,
            refresh_token_ttl_days: 7,
            max_failed_logins: 5,
            lockout_minutes: 120,
            contract_expiry_warning_days: 30,
            nearly_full_ratio: 0.8,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (when present) and then the process environment.
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded environment from .env");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            default_due_day: parse_or(&lookup, "DEFAULT_DUE_DAY", defaults.default_due_day),
            monthly_interest_percent: parse_or(&lookup, "MONTHLY_INTEREST_PERCENT", defaults.monthly_interest_percent),
            max_refresh_tokens: parse_or(&lookup, "MAX_REFRESH_TOKENS", defaults.max_refresh_tokens),
            refresh_token_ttl_days: parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", defaults.refresh_token_ttl_days),
            max_failed_logins: parse_or(&lookup, "MAX_FAILED_LOGINS", defaults.max_failed_logins),
            lockout_minutes: parse_or(&lookup, "LOCKOUT_MINUTES", defaults.lockout_minutes),
            contract_expiry_warning_days: parse_or(
                &lookup,
                "CONTRACT_EXPIRY_WARNING_DAYS",
                defaults.contract_expiry_warning_days,
            ),
            nearly_full_ratio: parse_or(&lookup, "NEARLY_FULL_RATIO", defaults.nearly_full_ratio),
        };

        if !(1..=31).contains(&config.default_due_day) {
            warn!("DEFAULT_DUE_DAY {} is outside 1..=31, using {}", config.default_due_day, defaults.default_due_day);
            config.default_due_day = defaults.default_due_day;
        }
        if config.monthly_interest_percent < 0.0 {
            warn!("MONTHLY_INTEREST_PERCENT cannot be negative, using {}", defaults.monthly_interest_percent);
            config.monthly_interest_percent = defaults.monthly_interest_percent;
        }
        if config.max_refresh_tokens == 0 {
            warn!("MAX_REFRESH_TOKENS must be at least 1, using {}", defaults.max_refresh_tokens);
            config.max_refresh_tokens = defaults.max_refresh_tokens;
        }
        if !(config.nearly_full_ratio > 0.0 && config.nearly_full_ratio <= 1.0) {
            warn!("NEARLY_FULL_RATIO must be in (0, 1], using {}", defaults.nearly_full_ratio);
            config.nearly_full_ratio = defaults.nearly_full_ratio;
        }

        config
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!("Invalid value '{}' for {}: {}. Using default {}", raw, key, e, default);
                default
            }
        },
    }
}
