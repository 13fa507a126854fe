//! Server settings layered as defaults, then an optional TOML file named by
//! `HILVAN_CONFIG`, then `HILVAN_*` environment variables.
use hilvan_engine::config::MatchConfig;
use hilvan_engine::scheduler::millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "HILVAN_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSettings {
    pub round_secs: u64,
    pub cleanup_delay_ms: u64,
    pub next_round_delay_ms: u64,
    pub initial_hand_size: usize,
    pub helper_cards: usize,
    pub display_grace_ms: u64,
    pub prepare_grace_ms: u64,
    pub destruction_grace_ms: u64,
    pub resolve_when_all_committed: bool,
    pub seed: Option<u64>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::from(&MatchConfig::default())
    }
}

impl From<&MatchConfig> for MatchSettings {
    fn from(cfg: &MatchConfig) -> Self {
        Self {
            round_secs: cfg.round_duration.as_secs(),
            cleanup_delay_ms: millis(cfg.cleanup_delay),
            next_round_delay_ms: millis(cfg.next_round_delay),
            initial_hand_size: cfg.initial_hand_size,
            helper_cards: cfg.helper_cards_per_player,
            display_grace_ms: millis(cfg.display_grace),
            prepare_grace_ms: millis(cfg.prepare_grace),
            destruction_grace_ms: millis(cfg.destruction_grace),
            resolve_when_all_committed: cfg.resolve_when_all_committed,
            seed: cfg.seed,
        }
    }
}

impl MatchSettings {
    pub fn to_match_config(&self) -> MatchConfig {
        MatchConfig {
            round_duration: Duration::from_secs(self.round_secs),
            cleanup_delay: Duration::from_millis(self.cleanup_delay_ms),
            next_round_delay: Duration::from_millis(self.next_round_delay_ms),
            initial_hand_size: self.initial_hand_size,
            helper_cards_per_player: self.helper_cards,
            display_grace: Duration::from_millis(self.display_grace_ms),
            prepare_grace: Duration::from_millis(self.prepare_grace_ms),
            destruction_grace: Duration::from_millis(self.destruction_grace_ms),
            resolve_when_all_committed: self.resolve_when_all_committed,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub tick_interval_ms: u64,
    pub session_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub event_buffer: usize,
    #[serde(rename = "match")]
    pub match_settings: MatchSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            tick_interval_ms: 100,
            session_ttl_secs: 30 * 60,
            cleanup_interval_secs: 60,
            event_buffer: 1000,
            match_settings: MatchSettings::default(),
        }
    }
}

impl ServerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid("event_buffer must be at least 1".into()));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cleanup_interval_secs must be greater than zero".into(),
            ));
        }
        self.match_settings
            .to_match_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
}

#[derive(Debug, Clone)]
pub struct SettingsResolved {
    pub settings: ServerSettings,
    sources: BTreeMap<&'static str, ValueSource>,
}

impl SettingsResolved {
    /// Where a field's value came from. Fields never overridden report
    /// `Default`.
    pub fn source(&self, field: &str) -> ValueSource {
        self.sources
            .get(field)
            .copied()
            .unwrap_or(ValueSource::Default)
    }

    pub fn sources(&self) -> &BTreeMap<&'static str, ValueSource> {
        &self.sources
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub fn load() -> Result<ServerSettings, ConfigError> {
    load_with_sources().map(|resolved| resolved.settings)
}

pub fn load_with_sources() -> Result<SettingsResolved, ConfigError> {
    load_from(|key| std::env::var(key).ok())
}

/// Resolves settings with `env` standing in for the process environment.
pub fn load_from<F>(env: F) -> Result<SettingsResolved, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = SettingsResolved {
        settings: ServerSettings::default(),
        sources: BTreeMap::new(),
    };

    if let Some(path) = env(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(path);
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let file: FileSettings = toml::from_str(&text)?;
        apply_file(&mut resolved, file);
        tracing::debug!(path = %path.display(), "loaded settings file");
    }

    apply_env(&mut resolved, &env)?;
    resolved.settings.validate()?;
    Ok(resolved)
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    host: Option<String>,
    port: Option<u16>,
    tick_interval_ms: Option<u64>,
    session_ttl_secs: Option<u64>,
    cleanup_interval_secs: Option<u64>,
    event_buffer: Option<usize>,
    #[serde(rename = "match", default)]
    match_settings: FileMatchSettings,
}

#[derive(Debug, Default, Deserialize)]
struct FileMatchSettings {
    round_secs: Option<u64>,
    cleanup_delay_ms: Option<u64>,
    next_round_delay_ms: Option<u64>,
    initial_hand_size: Option<usize>,
    helper_cards: Option<usize>,
    display_grace_ms: Option<u64>,
    prepare_grace_ms: Option<u64>,
    destruction_grace_ms: Option<u64>,
    resolve_when_all_committed: Option<bool>,
    seed: Option<u64>,
}

macro_rules! take {
    ($resolved:expr, $source:expr, $name:literal, $target:expr, $value:expr) => {
        if let Some(v) = $value {
            $target = v;
            $resolved.sources.insert($name, $source);
        }
    };
}

fn apply_file(r: &mut SettingsResolved, f: FileSettings) {
    let src = ValueSource::File;
    take!(r, src, "host", r.settings.host, f.host);
    take!(r, src, "port", r.settings.port, f.port);
    take!(r, src, "tick_interval_ms", r.settings.tick_interval_ms, f.tick_interval_ms);
    take!(r, src, "session_ttl_secs", r.settings.session_ttl_secs, f.session_ttl_secs);
    take!(
        r,
        src,
        "cleanup_interval_secs",
        r.settings.cleanup_interval_secs,
        f.cleanup_interval_secs
    );
    take!(r, src, "event_buffer", r.settings.event_buffer, f.event_buffer);

    let m = f.match_settings;
    take!(
        r,
        src,
        "match.round_secs",
        r.settings.match_settings.round_secs,
        m.round_secs
    );
    take!(
        r,
        src,
        "match.cleanup_delay_ms",
        r.settings.match_settings.cleanup_delay_ms,
        m.cleanup_delay_ms
    );
    take!(
        r,
        src,
        "match.next_round_delay_ms",
        r.settings.match_settings.next_round_delay_ms,
        m.next_round_delay_ms
    );
    take!(
        r,
        src,
        "match.initial_hand_size",
        r.settings.match_settings.initial_hand_size,
        m.initial_hand_size
    );
    take!(
        r,
        src,
        "match.helper_cards",
        r.settings.match_settings.helper_cards,
        m.helper_cards
    );
    take!(
        r,
        src,
        "match.display_grace_ms",
        r.settings.match_settings.display_grace_ms,
        m.display_grace_ms
    );
    take!(
        r,
        src,
        "match.prepare_grace_ms",
        r.settings.match_settings.prepare_grace_ms,
        m.prepare_grace_ms
    );
    take!(
        r,
        src,
        "match.destruction_grace_ms",
        r.settings.match_settings.destruction_grace_ms,
        m.destruction_grace_ms
    );
    take!(
        r,
        src,
        "match.resolve_when_all_committed",
        r.settings.match_settings.resolve_when_all_committed,
        m.resolve_when_all_committed
    );
    take!(
        r,
        src,
        "match.seed",
        r.settings.match_settings.seed,
        m.seed.map(Some)
    );
}

fn apply_env<F>(r: &mut SettingsResolved, env: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let src = ValueSource::Env;
    let var = |key: &str| env(key).filter(|v| !v.is_empty());

    take!(r, src, "host", r.settings.host, var("HILVAN_HOST"));
    take!(
        r,
        src,
        "port",
        r.settings.port,
        parse_var(&var, "HILVAN_PORT")?
    );
    take!(
        r,
        src,
        "tick_interval_ms",
        r.settings.tick_interval_ms,
        parse_var(&var, "HILVAN_TICK_MS")?
    );
    take!(
        r,
        src,
        "session_ttl_secs",
        r.settings.session_ttl_secs,
        parse_var(&var, "HILVAN_SESSION_TTL_SECS")?
    );
    take!(
        r,
        src,
        "match.round_secs",
        r.settings.match_settings.round_secs,
        parse_var(&var, "HILVAN_ROUND_SECS")?
    );
    if let Some(seed) = parse_var::<u64, _>(&var, "HILVAN_SEED")? {
        r.settings.match_settings.seed = Some(seed);
        r.sources.insert("match.seed", src);
    }
    if let Some(raw) = var("HILVAN_RESOLVE_EARLY") {
        let flag = parse_bool(&raw).ok_or_else(|| {
            ConfigError::Invalid(format!("HILVAN_RESOLVE_EARLY: not a boolean: {raw}"))
        })?;
        r.settings.match_settings.resolve_when_all_committed = flag;
        r.sources.insert("match.resolve_when_all_committed", src);
    }
    Ok(())
}

fn parse_var<T, V>(var: &V, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{key}: cannot parse {raw:?}"))),
        None => Ok(None),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
