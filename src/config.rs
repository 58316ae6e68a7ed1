use std::{path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing {0} in environment")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_TABLE: &str = "events";
const DEFAULT_FIRECRAWL_URL: &str = "https://api.firecrawl.dev";
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_REGION: &str = "Hyderabad";
const DEFAULT_COLLEGES: &str = "CBIT,MGIT,VNRVJIET,JNTU,OU";

pub const MAX_WINDOW_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub storage: StorageBackend,
    pub events_table: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub sqlite_path: PathBuf,
    pub firecrawl_api_key: Option<String>,
    pub firecrawl_base_url: String,
    pub firecrawl_poll_interval_ms: u64,
    pub firecrawl_max_polls: u32,
    pub extract_wait_ms: Option<u64>,
    pub search_limit: u32,
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub gemini_max_tokens: u32,
    pub region: String,
    pub colleges: Vec<String>,
    pub window_days: u32,
    pub timezone: Tz,
    pub weekly_interval_hours: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let storage = match get("STORAGE_BACKEND").as_deref() {
            None | Some("supabase") => StorageBackend::Supabase,
            Some("sqlite") => StorageBackend::Sqlite,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let timezone = match get("AGGREGATOR_TIMEZONE") {
            Some(name) => Tz::from_str(&name).map_err(|_| ConfigError::Invalid {
                key: "AGGREGATOR_TIMEZONE",
                value: name.clone(),
            })?,
            None => chrono_tz::Asia::Kolkata,
        };

        let extract_wait_ms = parse_or(&get, "EXTRACT_WAIT_MS", 2000u64)?;
        let window_days = check_window_days(parse_or(&get, "AGGREGATOR_WINDOW_DAYS", 7)?)?;
        let weekly_interval_hours = parse_or(&get, "WEEKLY_UPDATE_INTERVAL_HOURS", 0u64)?;
        if weekly_interval_hours.checked_mul(3600).is_none() {
            return Err(ConfigError::Invalid {
                key: "WEEKLY_UPDATE_INTERVAL_HOURS",
                value: weekly_interval_hours.to_string(),
            });
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            cors_origins: split_list(
                &get("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            ),
            storage,
            events_table: get("EVENTS_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            supabase_url: get("SUPABASE_URL"),
            supabase_key: get("SUPABASE_KEY"),
            sqlite_path: get("SQLITE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(utils::database_path),
            firecrawl_api_key: get("FIRECRAWL_API_KEY"),
            firecrawl_base_url: get("FIRECRAWL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRECRAWL_URL.to_string()),
            firecrawl_poll_interval_ms: parse_or(&get, "FIRECRAWL_POLL_INTERVAL_MS", 2000)?,
            firecrawl_max_polls: parse_or(&get, "FIRECRAWL_MAX_POLLS", 60)?,
            extract_wait_ms: Some(extract_wait_ms).filter(|ms| *ms > 0),
            search_limit: parse_or(&get, "SEARCH_LIMIT", 3)?,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_endpoint: get("GEMINI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_temperature: parse_or(&get, "GEMINI_TEMPERATURE", 0.7)?,
            gemini_max_tokens: parse_or(&get, "GEMINI_MAX_TOKENS", 2048)?,
            region: get("AGGREGATOR_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            colleges: split_list(
                &get("AGGREGATOR_COLLEGES").unwrap_or_else(|| DEFAULT_COLLEGES.to_string()),
            ),
            window_days,
            timezone,
            weekly_interval_hours: Some(weekly_interval_hours).filter(|hours| *hours > 0),
        })
    }

    pub fn supabase_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .supabase_url
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let key = self
            .supabase_key
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_KEY"))?;
        Ok((url, key))
    }

    pub fn firecrawl_key(&self) -> Result<&str, ConfigError> {
        self.firecrawl_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("FIRECRAWL_API_KEY"))
    }

    pub fn weekly_interval(&self) -> Option<Duration> {
        self.weekly_interval_hours
            .and_then(|hours| hours.checked_mul(3600))
            .map(Duration::from_secs)
    }

    pub fn gemini_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))
    }
}

pub fn check_window_days(days: u32) -> Result<u32, ConfigError> {
    if (1..=MAX_WINDOW_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ConfigError::Invalid {
            key: "AGGREGATOR_WINDOW_DAYS",
            value: days.to_string(),
        })
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
