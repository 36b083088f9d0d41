use std::{env, fmt::Display, fs, io, str::FromStr, time::Duration};

use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::{
    civil_time::{CivilTz, TimeZonePolicy},
    sinks::timescale::DEFAULT_BATCH_SIZE,
    sources::entsoe::DEFAULT_BASE_URL,
    zones::{self, ZoneSpec, ZONES},
};

const DEFAULT_CONFIG_PATH: &str = "ingestion-config.toml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("unknown bidding zone '{0}'")]
    UnknownZone(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntsoeConfig {
    pub api_token: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for EntsoeConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub sslmode: String,
    pub connect_timeout_secs: u64,
    pub statement_timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5432,
            dbname: String::new(),
            user: String::new(),
            password: None,
            sslmode: "require".to_string(),
            connect_timeout_secs: 30,
            statement_timeout_secs: 300,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub lookback_hours: u32,
    pub zone_delay_secs: u64,
    /// Civil timezone for every zone unless `per_zone_tz` is set.
    pub civil_tz: String,
    pub per_zone_tz: bool,
    /// Display codes to import; all registered zones when absent.
    pub zones: Option<Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 48,
            zone_delay_secs: 1,
            civil_tz: CivilTz::BERLIN.name().to_string(),
            per_zone_tz: false,
            zones: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub entsoe: EntsoeConfig,
    pub database: DatabaseConfig,
    pub run: RunConfig,
}

impl AppConfig {
    /// Load `.env`, the optional TOML file at `$INGESTION_CONFIG`, then
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        skip_missing_env_file(dotenvy::dotenv())?;

        let explicit = env::var("INGESTION_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound && explicit.is_none() => None,
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        Self::from_sources(contents.as_deref(), |key| env::var(key).ok())
    }

    pub fn from_sources(
        toml_src: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut cfg: AppConfig = match toml_src {
            Some(src) => toml::from_str(src)?,
            None => AppConfig::default(),
        };

        cfg.apply_env(&env)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let text = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = text("ENTSOE_API_TOKEN") {
            self.entsoe.api_token = v;
        }
        if let Some(v) = parsed(env, "ENTSOE_TIMEOUT_SECONDS")? {
            self.entsoe.request_timeout_secs = v;
        }

        let db = &mut self.database;
        if let Some(v) = text("PG_HOST") {
            db.host = v;
        }
        if let Some(v) = parsed(env, "PG_PORT")? {
            db.port = v;
        }
        if let Some(v) = text("PG_DB") {
            db.dbname = v;
        }
        if let Some(v) = text("PG_USER") {
            db.user = v;
        }
        if let Some(v) = env("PG_PASS") {
            db.password = Some(v);
        }
        if let Some(v) = text("PG_SSLMODE") {
            db.sslmode = v;
        }
        if let Some(v) = parsed(env, "PG_CONNECT_TIMEOUT_SECONDS")? {
            db.connect_timeout_secs = v;
        }
        if let Some(v) = parsed(env, "PG_STATEMENT_TIMEOUT_SECONDS")? {
            db.statement_timeout_secs = v;
        }

        let run = &mut self.run;
        if let Some(v) = parsed(env, "LOOKBACK_HOURS")? {
            run.lookback_hours = v;
        }
        if let Some(v) = parsed(env, "ZONE_DELAY_SECONDS")? {
            run.zone_delay_secs = v;
        }
        if let Some(v) = text("CIVIL_TZ") {
            run.civil_tz = v;
        }
        if let Some(v) = parsed(env, "PER_ZONE_TZ")? {
            run.per_zone_tz = v;
        }
        if let Some(v) = text("ZONES") {
            run.zones = Some(v.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect());
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.entsoe.api_token.trim().is_empty() {
            return Err(ConfigError::Missing("ENTSOE_API_TOKEN"));
        }
        if self.database.host.is_empty() {
            return Err(ConfigError::Missing("PG_HOST"));
        }
        if self.database.dbname.is_empty() {
            return Err(ConfigError::Missing("PG_DB"));
        }
        if self.database.user.is_empty() {
            return Err(ConfigError::Missing("PG_USER"));
        }
        if self.run.lookback_hours == 0 {
            return Err(ConfigError::Invalid {
                key: "LOOKBACK_HOURS",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.database.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "database.batch_size",
                reason: "must be at least 1".to_string(),
            });
        }

        self.ssl_mode()?;
        self.tz_policy()?;
        self.zones()?;
        Ok(())
    }

    fn ssl_mode(&self) -> Result<PgSslMode, ConfigError> {
        PgSslMode::from_str(&self.database.sslmode).map_err(|e| ConfigError::Invalid {
            key: "PG_SSLMODE",
            reason: e.to_string(),
        })
    }

    pub fn pg_connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let db = &self.database;
        let mut options = PgConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .database(&db.dbname)
            .username(&db.user)
            .ssl_mode(self.ssl_mode()?)
            .application_name("generation-ingest")
            .options([("statement_timeout", format!("{}s", db.statement_timeout_secs))]);

        if let Some(password) = &db.password {
            options = options.password(password);
        }
        Ok(options)
    }

    pub fn tz_policy(&self) -> Result<TimeZonePolicy, ConfigError> {
        if self.run.per_zone_tz {
            return Ok(TimeZonePolicy::PerZone);
        }
        CivilTz::parse(&self.run.civil_tz)
            .map(TimeZonePolicy::Fixed)
            .map_err(|e| ConfigError::Invalid {
                key: "CIVIL_TZ",
                reason: e.to_string(),
            })
    }

    /// Zones to import, in registry order.
    pub fn zones(&self) -> Result<Vec<ZoneSpec>, ConfigError> {
        let Some(codes) = &self.run.zones else {
            return Ok(ZONES.to_vec());
        };

        let mut selected = Vec::with_capacity(codes.len());
        for code in codes {
            let zone = zones::find_by_display_code(code).ok_or_else(|| ConfigError::UnknownZone(code.clone()))?;
            if !selected.contains(zone) {
                selected.push(*zone);
            }
        }

        selected.sort_by_key(|z| ZONES.iter().position(|r| r == z));
        Ok(selected)
    }

    pub fn lookback(&self) -> time::Duration {
        time::Duration::hours(i64::from(self.run.lookback_hours))
    }

    pub fn zone_delay(&self) -> Duration {
        Duration::from_secs(self.run.zone_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.entsoe.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connect_timeout_secs)
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn skip_missing_env_file<T>(res: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match res {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::Dotenv(e)),
    }
}

fn parsed<T>(env: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|e| ConfigError::Invalid {
            key,
            reason: format!("'{v}': {e}"),
        }),
    }
}
