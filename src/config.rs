use std::env;

use anyhow::{bail, Context};

use crate::locale::LocaleConfig;
use crate::rate_limit::RateLimitConfig;

pub const DEFAULT_MEDIA_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub data_dir: String,
    pub frontend_url: Option<String>,
    pub locale: LocaleConfig,
    pub feed_limit: usize,
    pub recent_chapters_limit: usize,
    pub media_size_limit: usize,
    pub rate_limit_enabled: bool,
    pub rate_limits: RateLimitConfig,
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(v) => v.trim().parse().map_err(|e| anyhow::anyhow!("{name}: {e}")),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let mut locale = LocaleConfig::default();
        if let Ok(lang) = env::var("DEFAULT_LANGUAGE") {
            locale.default_language = lang.trim().to_string();
        }
        if let Ok(list) = env::var("SUPPORTED_LANGUAGES") {
            locale.supported = list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if !locale.supported.contains(&locale.default_language) {
            locale.supported.push(locale.default_language.clone());
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: env::var("DATABASE_URL").ok(),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".into()),
            frontend_url: env::var("FRONTEND_URL").ok(),
            locale,
            feed_limit: parsed("FEED_LIMIT", 20)?,
            recent_chapters_limit: parsed("RECENT_CHAPTERS_LIMIT", 20)?,
            media_size_limit: parsed("MEDIA_SIZE_LIMIT", DEFAULT_MEDIA_SIZE_LIMIT)?,
            rate_limit_enabled: env::var("RL_ENABLED").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(true),
            rate_limits: RateLimitConfig::from_env(),
        })
    }
}
