use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PREFIX: &str = "AMBULANCE_API";

const DEFAULT_MONGO_HOST: &str = "localhost";
const DEFAULT_MONGO_PORT: u16 = 27017;
const DEFAULT_MONGO_DATABASE: &str = "xdudakm-wac-ambulance-wl";
const DEFAULT_MONGO_COLLECTION: &str = "ambulance";
const DEFAULT_MONGO_TIMEOUT_SECONDS: u64 = 10;

const DEFAULT_EVENTS_TOPIC: &str = "ambulance-events";
const DEFAULT_EVENTS_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub store_backend: StoreBackend,
    pub mongodb: MongoSettings,
    pub events: EventSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Values set explicitly by the wiring code. Anything left `None` falls back
/// to the environment and then to the built-in default.
#[derive(Debug, Clone, Default)]
pub struct MongoOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub host: String,
    pub port: u16,
    pub user_name: String,
    pub password: Secret<String>,
    pub database: String,
    pub collection: String,
    pub timeout: Duration,
}

impl MongoSettings {
    pub fn resolve(overrides: MongoOverrides) -> Self {
        Self::resolve_with(overrides, |key| env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: MongoOverrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_MONGODB_{}", ENV_PREFIX, name));

        let host = overrides
            .host
            .filter(|h| !h.is_empty())
            .or_else(|| var("HOST"))
            .unwrap_or_else(|| DEFAULT_MONGO_HOST.to_string());

        let port = overrides
            .port
            .filter(|p| *p != 0)
            .unwrap_or_else(|| parse_or_default("port", var("PORT"), DEFAULT_MONGO_PORT));

        let user_name = overrides
            .user_name
            .filter(|u| !u.is_empty())
            .or_else(|| var("USERNAME"))
            .unwrap_or_default();

        let password = overrides
            .password
            .filter(|p| !p.is_empty())
            .or_else(|| var("PASSWORD"))
            .unwrap_or_default();

        let database = overrides
            .database
            .filter(|d| !d.is_empty())
            .or_else(|| var("DATABASE"))
            .unwrap_or_else(|| DEFAULT_MONGO_DATABASE.to_string());

        let collection = overrides
            .collection
            .filter(|c| !c.is_empty())
            .or_else(|| var("COLLECTION"))
            .unwrap_or_else(|| DEFAULT_MONGO_COLLECTION.to_string());

        let timeout = overrides.timeout.filter(|t| !t.is_zero()).unwrap_or_else(|| {
            Duration::from_secs(parse_or_default(
                "timeout",
                var("TIMEOUT_SECONDS"),
                DEFAULT_MONGO_TIMEOUT_SECONDS,
            ))
        });

        let settings = Self {
            host,
            port,
            user_name,
            password: Secret::new(password),
            database,
            collection,
            timeout,
        };

        tracing::info!(location = %settings.location(), "MongoDB settings resolved");
        settings
    }

    /// Connection string, credentials included when a user name is set.
    pub fn uri(&self) -> String {
        if self.user_name.is_empty() {
            format!("mongodb://{}:{}", self.host, self.port)
        } else {
            format!(
                "mongodb://{}:{}@{}:{}",
                self.user_name,
                self.password.expose_secret(),
                self.host,
                self.port
            )
        }
    }

    /// Loggable location; never contains the password.
    pub fn location(&self) -> String {
        format!(
            "//{}@{}:{}/{}/{}",
            self.user_name, self.host, self.port, self.database, self.collection
        )
    }
}

#[derive(Debug, Clone)]
pub struct EventSettings {
    /// Base URL of the Kafka REST proxy. Unset means events are only logged.
    pub endpoint: Option<String>,
    pub topic: String,
    pub timeout: Duration,
}

impl EventSettings {
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_EVENTS_{}", ENV_PREFIX, name));

        Self {
            endpoint: var("ENDPOINT").filter(|e| !e.trim().is_empty()),
            topic: var("TOPIC")
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENTS_TOPIC.to_string()),
            timeout: Duration::from_secs(parse_or_default(
                "events timeout",
                var("TIMEOUT_SECONDS"),
                DEFAULT_EVENTS_TIMEOUT_SECONDS,
            )),
        }
    }
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            topic: DEFAULT_EVENTS_TOPIC.to_string(),
            timeout: Duration::from_secs(DEFAULT_EVENTS_TIMEOUT_SECONDS),
        }
    }
}

impl ServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load(ENV_PREFIX)?;
        let lookup = |key: &str| env::var(key).ok();

        let store_backend = match lookup(&format!("{}_STORE", ENV_PREFIX)) {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            None => StoreBackend::Mongo,
        };

        Ok(Self {
            common,
            service_name: "ambulance-service".to_string(),
            store_backend,
            mongodb: MongoSettings::resolve(MongoOverrides::default()),
            events: EventSettings::resolve_with(lookup),
        })
    }
}

/// Parse a numeric setting. Unparseable and zero values are logged and
/// replaced by `default`.
fn parse_or_default<T>(field: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + Default + PartialEq + std::fmt::Display,
{
    let raw = match raw {
        None => return default,
        Some(value) => value,
    };

    match raw.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => parsed,
        _ => {
            tracing::warn!(
                field = field,
                value = %raw,
                fallback = %default,
                "Invalid numeric configuration value, using default"
            );
            default
        }
    }
}
