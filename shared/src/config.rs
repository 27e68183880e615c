use crate::{Error, Result, TtlMs};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Default freshness window for cached lists (5 minutes)
pub const DEFAULT_CACHE_EXPIRE_TIME: TtlMs = TtlMs(5 * 60 * 1000);

/// Default capacity of the cache event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Upper bound for the event channel; the buffer is allocated up front
pub const MAX_EVENT_CAPACITY: usize = 65_536;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub cache_expire_time: TtlMs,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_expire_time: DEFAULT_CACHE_EXPIRE_TIME,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Config {
    pub const EXPIRE_TIME_VAR: &str = "LISTCACHE_EXPIRE_TIME_MS";
    pub const EVENT_CAPACITY_VAR: &str = "LISTCACHE_EVENT_CAPACITY";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings from a dotenv file. Variables already set in the process
    /// environment take precedence over the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let read_error =
            |err: dotenvy::Error| Error::InvalidConfig(format!("{}: {err}", path.display()));

        let file_vars = dotenvy::from_path_iter(path)
            .map_err(read_error)?
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(read_error)?;
        info!("Loaded {} variable(s) from {}", file_vars.len(), path.display());

        Ok(Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| file_vars.get(name).cloned())
        }))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cache_expire_time = parse_or(
            &lookup,
            Self::EXPIRE_TIME_VAR,
            DEFAULT_CACHE_EXPIRE_TIME.0,
        );
        let event_capacity = parse_or(&lookup, Self::EVENT_CAPACITY_VAR, DEFAULT_EVENT_CAPACITY);

        let clamped_capacity = event_capacity.clamp(1, MAX_EVENT_CAPACITY);
        if clamped_capacity != event_capacity {
            warn!(
                "{}={event_capacity} is outside 1..={MAX_EVENT_CAPACITY}, using {clamped_capacity}",
                Self::EVENT_CAPACITY_VAR
            );
        }

        Self {
            cache_expire_time: TtlMs(cache_expire_time),
            event_capacity: clamped_capacity,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{name}={raw:?} is not valid, using default {default}");
            default
        }),
        None => default,
    }
}
