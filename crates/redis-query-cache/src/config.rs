//! Connection configuration and layered resolution.
//!
//! The cache is zero-config by default but accepts full overrides from the
//! Spring Boot-style configuration files a host application typically
//! already ships. Sources are probed in order and the first one that yields
//! at least one value wins:
//!
//! 1. `application[-<profile>].yml` - a nested `spring: redis:` map, a
//!    literal dotted `spring.redis` key, or top-level `spring.redis.*`
//!    dotted keys;
//! 2. `application[-<profile>].properties` - flat `spring.redis.*` keys;
//! 3. `redis.properties` - unprefixed keys matching the field names;
//! 4. built-in defaults.
//!
//! The profile suffix comes from the `SPRING_PROFILES_ACTIVE` environment
//! variable. Missing or unparseable files are logged at debug level and
//! skipped; a value that is present but cannot be coerced to its field's
//! type is a fatal [`Error::Configuration`] - an explicit override must
//! never silently fall back to a default.

use crate::error::{Error, Result};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default remote-store host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default remote-store port.
pub const DEFAULT_PORT: u16 = 6379;
/// Default logical database index.
pub const DEFAULT_DATABASE: i64 = 0;
/// Default connection and socket timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

const SPRING_REDIS_KEY: &str = "spring.redis";
const SPRING_REDIS_PREFIX: &str = "spring.redis.";
const PROFILE_ENV: &str = "SPRING_PROFILES_ACTIVE";

/// Resolved connection configuration for the remote store.
///
/// Resolved once per process by [`ConfigSources::resolve`] and reused for
/// the process lifetime; later accesses are pure reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Remote store host.
    pub host: String,
    /// Remote store port.
    pub port: u16,
    /// Optional password; blank values resolve to `None`.
    pub password: Option<String>,
    /// Logical database index.
    pub database: i64,
    /// Optional client name; blank values resolve to `None`.
    pub client_name: Option<String>,
    /// Connection establishment timeout.
    pub connection_timeout: Duration,
    /// Per-operation socket timeout.
    pub so_timeout: Duration,
    /// Pool sizing: maximum total connections (advisory for pooled clients).
    pub max_total: u32,
    /// Pool sizing: maximum idle connections.
    pub max_idle: u32,
    /// Pool sizing: minimum idle connections.
    pub min_idle: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            database: DEFAULT_DATABASE,
            client_name: None,
            connection_timeout: DEFAULT_TIMEOUT,
            so_timeout: DEFAULT_TIMEOUT,
            max_total: 8,
            max_idle: 8,
            min_idle: 0,
        }
    }
}

impl RedisConfig {
    /// Build a configuration from resolved key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if any value fails type coercion.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in entries {
            config.apply(key, value)?;
        }
        Ok(config)
    }

    /// Bind one raw key/value pair onto its field.
    ///
    /// Keys are matched after stripping `-`, `_`, and `.` and lowercasing,
    /// so `clientName`, `client-name`, and `client_name` all bind. Unknown
    /// keys are ignored by table miss.
    fn apply(&mut self, key: &str, raw: &str) -> Result<()> {
        let canonical: String = key
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | '.'))
            .collect::<String>()
            .to_lowercase();

        match canonical.as_str() {
            "host" => {
                self.host = non_blank(raw).unwrap_or_else(|| DEFAULT_HOST.to_string());
            }
            "port" => self.port = parse(key, raw)?,
            "password" => self.password = non_blank(raw),
            "database" => self.database = parse(key, raw)?,
            "clientname" => self.client_name = non_blank(raw),
            "connectiontimeout" => {
                self.connection_timeout = Duration::from_millis(parse(key, raw)?);
            }
            "sotimeout" => self.so_timeout = Duration::from_millis(parse(key, raw)?),
            "maxtotal" => self.max_total = parse(key, raw)?,
            "maxidle" => self.max_idle = parse(key, raw)?,
            "minidle" => self.min_idle = parse(key, raw)?,
            _ => {}
        }
        Ok(())
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        Error::Configuration(format!("invalid value {raw:?} for key '{key}': {e}"))
    })
}

// Blank-check only; a non-blank value is kept verbatim, whitespace included.
fn non_blank(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Where configuration files are probed from, and under which profile.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    base_dir: PathBuf,
    profile: Option<String>,
}

impl ConfigSources {
    /// Probe configuration files under `base_dir`, reading the active
    /// profile from the `SPRING_PROFILES_ACTIVE` environment variable.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let profile = std::env::var(PROFILE_ENV)
            .ok()
            .and_then(|p| non_blank(&p));
        Self {
            base_dir: base_dir.into(),
            profile,
        }
    }

    /// Override the active profile (mainly for tests).
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = non_blank(&profile.into());
        self
    }

    fn application_stem(&self) -> String {
        match &self.profile {
            Some(profile) => format!("application-{profile}"),
            None => "application".to_string(),
        }
    }

    /// Resolve the connection configuration, first matching source wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a source yields a value that
    /// cannot be coerced to its field's declared type.
    pub fn resolve(&self) -> Result<RedisConfig> {
        let stem = self.application_stem();

        let yml = self.base_dir.join(format!("{stem}.yml"));
        if let Some(entries) = load_yml(&yml) {
            if !entries.is_empty() {
                debug!(file = %yml.display(), ?entries, "resolved redis config from yml");
                return RedisConfig::from_entries(
                    entries.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                );
            }
        }

        let properties = self.base_dir.join(format!("{stem}.properties"));
        if let Some(entries) = load_properties(&properties, Some(SPRING_REDIS_PREFIX)) {
            if !entries.is_empty() {
                debug!(file = %properties.display(), ?entries, "resolved redis config from properties");
                return RedisConfig::from_entries(
                    entries.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                );
            }
        }

        let redis_properties = self.base_dir.join("redis.properties");
        if let Some(entries) = load_properties(&redis_properties, None) {
            if !entries.is_empty() {
                debug!(file = %redis_properties.display(), ?entries, "resolved redis config from redis.properties");
                return RedisConfig::from_entries(
                    entries.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                );
            }
        }

        debug!("no redis config found on any probed path, using defaults");
        Ok(RedisConfig::default())
    }
}

/// Load `spring.redis` entries from a hierarchical YAML document.
///
/// Checks a literal dotted `spring.redis` key, then the nested
/// `spring: redis:` map; if neither is present, falls back to scanning
/// top-level dotted `spring.redis.*` keys. Missing or unparseable files
/// yield `None`.
fn load_yml(path: &Path) -> Option<Vec<(String, String)>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "can not read yml file");
            return None;
        }
    };
    let root: serde_yml::Value = match serde_yml::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "can not parse yml file");
            return None;
        }
    };
    let mapping = root.as_mapping()?;

    let nested = mapping
        .get(SPRING_REDIS_KEY)
        .and_then(serde_yml::Value::as_mapping)
        .or_else(|| {
            mapping
                .get("spring")
                .and_then(serde_yml::Value::as_mapping)
                .and_then(|spring| spring.get("redis"))
                .and_then(serde_yml::Value::as_mapping)
        });

    if let Some(redis) = nested {
        let entries = redis
            .iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_to_string(v)?)))
            .collect();
        return Some(entries);
    }

    // one line one config, like ==> spring.redis.host: 127.0.0.1
    let entries = mapping
        .iter()
        .filter_map(|(k, v)| {
            let key = k.as_str()?;
            let suffix = key.strip_prefix(SPRING_REDIS_PREFIX)?;
            let field = suffix.rsplit('.').next().unwrap_or(suffix);
            Some((field.to_string(), scalar_to_string(v)?))
        })
        .collect();
    Some(entries)
}

fn scalar_to_string(value: &serde_yml::Value) -> Option<String> {
    match value {
        serde_yml::Value::String(s) => Some(s.clone()),
        serde_yml::Value::Number(n) => Some(n.to_string()),
        serde_yml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Load entries from a flat Java-style properties file.
///
/// With `prefix`, only matching keys are kept and reduced to the segment
/// after the last `.`; without it, keys are kept verbatim. Missing or
/// unreadable files yield `None`.
fn load_properties(path: &Path, prefix: Option<&str>) -> Option<Vec<(String, String)>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "can not read properties file");
            return None;
        }
    };

    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(split) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..split].trim();
        let value = line[split + 1..].trim();
        if key.is_empty() {
            continue;
        }
        match prefix {
            Some(prefix) => {
                if let Some(suffix) = key.strip_prefix(prefix) {
                    let field = suffix.rsplit('.').next().unwrap_or(suffix);
                    entries.push((field.to_string(), value.to_string()));
                }
            }
            None => entries.push((key.to_string(), value.to_string())),
        }
    }
    Some(entries)
}
