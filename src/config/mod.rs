//! Configuration management for playcheck
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Command-line flags are applied on top by the
//! binary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::capitalize;
use crate::utils::retry::RetryConfig;

/// Longest accepted probe timeout (one day)
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Worker pool and timing
    pub checker: CheckerConfig,

    /// Per-candidate retry and backoff
    pub retry: RetryConfig,

    /// What counts as a reachable location
    pub probe: ProbePolicy,

    /// Source tag to display prefix mapping
    pub sources: SourcePrefixes,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Checker-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Global ceiling on in-flight probe attempts
    pub workers: usize,

    /// Timeout of a single probe attempt in seconds
    pub timeout_secs: f64,

    /// Candidates of one group probed ahead of the earliest undecided one
    pub lookahead: usize,

    /// Log progress every N finished groups
    pub progress_interval: usize,

    /// Optional cap on probe attempts per second across the run
    pub rate_limit: Option<u32>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            timeout_secs: 10.0,
            lookahead: 2,
            progress_interval: 5,
            rate_limit: None,
        }
    }
}

/// HTTP method used for liveness checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    Head,
    Get,
}

impl FromStr for ProbeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "head" => Ok(Self::Head),
            "get" => Ok(Self::Get),
            other => Err(Error::config(format!("unknown probe method: {other}"))),
        }
    }
}

/// Success criterion for a liveness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbePolicy {
    pub method: ProbeMethod,

    /// Follow redirects before judging the status
    pub follow_redirects: bool,

    /// Redirect hops allowed when following
    pub max_redirects: usize,

    /// Treat a final 301/302/303/307/308 response as reachable
    pub redirects_are_reachable: bool,

    /// Re-issue a HEAD answered with 405/501 as a ranged GET in the same attempt
    pub get_fallback: bool,

    /// Retry 4xx answers other than 408/429
    pub retry_client_errors: bool,

    pub user_agent: String,

    /// Non-HTTP schemes checked with a plain TCP handshake
    pub tcp_schemes: Vec<String>,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Head,
            follow_redirects: true,
            max_redirects: 10,
            redirects_are_reachable: true,
            get_fallback: true,
            retry_client_errors: true,
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            ),
            tcp_schemes: ["rtmp", "rtmps", "rtsp", "mms"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ProbePolicy {
    pub fn is_tcp_scheme(&self, scheme: &str) -> bool {
        self.tcp_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

/// Mapping from source tag to the display prefix put in front of `group-title`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePrefixes(BTreeMap<String, String>);

impl Default for SourcePrefixes {
    fn default() -> Self {
        Self::from_pairs([("pk", "Pakistani"), ("in", "Indian"), ("global", "Global")])
    }
}

impl SourcePrefixes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse `tag=Prefix,tag=Prefix`
    pub fn parse(pairs: &str) -> Result<Self> {
        let mut map = BTreeMap::new();
        for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (tag, prefix) = pair
                .split_once('=')
                .ok_or_else(|| Error::config(format!("invalid source prefix: {pair}")))?;
            map.insert(tag.trim().to_string(), prefix.trim().to_string());
        }
        Ok(Self(map))
    }

    pub fn insert(&mut self, tag: impl Into<String>, prefix: impl Into<String>) {
        self.0.insert(tag.into(), prefix.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display prefix for a source tag
    ///
    /// Lookup order: exact key, case-insensitive key, first key contained in
    /// the tag, then the capitalised tag itself.
    pub fn prefix_for(&self, tag: &str) -> String {
        if let Some(prefix) = self.0.get(tag) {
            return prefix.clone();
        }

        let lower = tag.to_lowercase();
        if let Some((_, prefix)) = self.0.iter().find(|(k, _)| k.to_lowercase() == lower) {
            return prefix.clone();
        }

        if let Some((_, prefix)) = self
            .0
            .iter()
            .find(|(k, _)| !k.is_empty() && lower.contains(&k.to_lowercase()))
        {
            return prefix.clone();
        }

        let stem = tag.split('.').next().unwrap_or(tag);
        capitalize(stem)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(workers) = env_parse("PLAYCHECK_WORKERS") {
            config.checker.workers = workers;
        }
        if let Some(timeout) = env_parse("PLAYCHECK_TIMEOUT") {
            config.checker.timeout_secs = timeout;
        }
        if let Some(lookahead) = env_parse("PLAYCHECK_LOOKAHEAD") {
            config.checker.lookahead = lookahead;
        }
        if let Some(rate) = env_parse("PLAYCHECK_RATE_LIMIT") {
            config.checker.rate_limit = Some(rate);
        }
        if let Some(retries) = env_parse("PLAYCHECK_MAX_RETRIES") {
            config.retry.max_retries = retries;
        }
        if let Ok(method) = std::env::var("PLAYCHECK_METHOD") {
            config.probe.method = method.parse()?;
        }
        if let Ok(user_agent) = std::env::var("PLAYCHECK_USER_AGENT") {
            config.probe.user_agent = user_agent;
        }
        if let Ok(sources) = std::env::var("PLAYCHECK_SOURCES") {
            config.sources = SourcePrefixes::parse(&sources)?;
        }
        if let Ok(level) = std::env::var("PLAYCHECK_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("PLAYCHECK_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::with_source(format!("Failed to read config file: {}", path.display()), e)
        })?;

        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.checker.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }

        if !self.checker.timeout_secs.is_finite() || self.checker.timeout_secs <= 0.0 {
            return Err(Error::config("timeout must be a positive number of seconds"));
        }

        if self.checker.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::config(format!(
                "timeout must not exceed {MAX_TIMEOUT_SECS} seconds"
            )));
        }

        if self.checker.lookahead == 0 {
            return Err(Error::config("lookahead must be greater than 0"));
        }

        if self.checker.progress_interval == 0 {
            return Err(Error::config("progress_interval must be greater than 0"));
        }

        if self.checker.rate_limit == Some(0) {
            return Err(Error::config("rate_limit must be positive"));
        }

        if !(self.retry.backoff_multiplier.is_finite() && self.retry.backoff_multiplier >= 1.0) {
            return Err(Error::config("backoff_multiplier must be at least 1.0"));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::config("base_delay_ms must not exceed max_delay_ms"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the value cannot be a duration.
    pub fn request_timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.checker.timeout_secs)
            .map_err(|e| Error::config(format!("invalid timeout: {e}")))
    }
}
