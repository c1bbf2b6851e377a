use crate::cli::Cli;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, path::PathBuf, str::FromStr, time::Duration};
use tracing::Level;

const TRACE_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_FILE: &str = ".env.local.yaml";

/// Number of top scores kept in the store.
pub const MAX_SCORES: usize = 10;
/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 18;
/// Key holding the serialized leaderboard.
pub const SCORES_KEY: &str = "topScores";
/// Conditional write attempts before a submission gives up.
pub const WRITE_ATTEMPTS: usize = 3;

/// Bump when any asset in `STATIC_ASSETS` changes.
pub const APP_VERSION: &str = "v40";
pub const CACHE_PREFIX: &str = "moon-patrol-cache";
pub const STATIC_ASSETS: [&str; 12] = [
    "/",
    "/index.html",
    "/manifest.json",
    "/icons/android-launchericon-512-512.png",
    "/icons/android-launchericon-192-192.png",
    "/icons/android-launchericon-144-144.png",
    "/icons/android-launchericon-96-96.png",
    "/icons/android-launchericon-72-72.png",
    "/icons/android-launchericon-48-48.png",
    "/css/fonts.css",
    "/fonts/press-start-2p-v15-latin-regular.woff2",
    "/fonts/press-start-2p-v15-latin-regular.ttf",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardConfig {
    pub scores_key: String,
    pub max_scores: usize,
    pub max_name_len: usize,
    pub write_attempts: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        LeaderboardConfig {
            scores_key: SCORES_KEY.to_string(),
            max_scores: MAX_SCORES,
            max_name_len: MAX_NAME_LEN,
            write_attempts: WRITE_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub cache_prefix: String,
    pub version: String,
    pub assets: Vec<String>,
    /// Origin the worker is served from; relative asset paths resolve against it.
    pub origin: String,
}

impl WorkerConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        WorkerConfig {
            cache_prefix: CACHE_PREFIX.to_string(),
            version: APP_VERSION.to_string(),
            assets: STATIC_ASSETS.iter().map(|a| a.to_string()).collect(),
            origin: origin.into(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Caches of this app all share this prefix, whatever their version.
    pub fn cache_name_prefix(&self) -> String {
        format!("{}-", self.cache_prefix)
    }
}

/// Backing store selected for the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StoreBinding {
    Memory,
    File(PathBuf),
}

impl FromStr for StoreBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "memory" => Ok(StoreBinding::Memory),
            other => match other.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(StoreBinding::File(PathBuf::from(path))),
                _ => Err(format!(
                    "unknown store binding '{other}', expected 'memory' or 'file:<path>'"
                )),
            },
        }
    }
}

impl TryFrom<String> for StoreBinding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StoreBinding> for String {
    fn from(binding: StoreBinding) -> Self {
        binding.to_string()
    }
}

impl fmt::Display for StoreBinding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreBinding::Memory => write!(f, "memory"),
            StoreBinding::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

// All settings may be configured via environment variables prefixed with
// HIGHSCORE_. Example: HIGHSCORE_STORE="file:scores.json".
#[derive(Deserialize, Serialize, Debug)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    // Leaving the store unset makes the service answer 500 on every request.
    #[serde(default)]
    pub store: Option<StoreBinding>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default = "default_fetch_timeout_sec")]
    pub fetch_timeout_sec: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trace_level: default_trace_level(),
            bind_address: default_bind_address(),
            store: None,
            origin: None,
            fetch_timeout_sec: default_fetch_timeout_sec(),
        }
    }
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if Path::new(LOCAL_SETTINGS_FILE).exists() {
            figment = figment.merge(Yaml::file(LOCAL_SETTINGS_FILE));
        }
        figment
            .merge(Env::prefixed("HIGHSCORE_"))
            .merge(Serialized::defaults(cli.overrides()))
            .extract()
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_sec)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str.to_uppercase().as_str() {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:8788".to_string()
}

fn default_fetch_timeout_sec() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_store_binding_parse() {
        assert_eq!("memory".parse::<StoreBinding>(), Ok(StoreBinding::Memory));
        assert_eq!(
            "file:/tmp/scores.json".parse::<StoreBinding>(),
            Ok(StoreBinding::File(PathBuf::from("/tmp/scores.json")))
        );
        assert!("file:".parse::<StoreBinding>().is_err());
        assert!("redis://localhost".parse::<StoreBinding>().is_err());
    }

    #[test]
    fn test_trace_level_fallback() {
        assert_eq!(get_trace_level("debug"), Level::DEBUG);
        assert_eq!(get_trace_level("WARN"), Level::WARN);
        assert_eq!(get_trace_level("chatty"), Level::INFO);
    }

    #[test]
    fn test_worker_cache_names() {
        let config = WorkerConfig::new("http://localhost:8788").with_version("v2");
        assert_eq!(config.cache_name(), "moon-patrol-cache-v2");
        assert_eq!(config.cache_name_prefix(), "moon-patrol-cache-");
        assert_eq!(config.assets.len(), STATIC_ASSETS.len());
    }

    #[test]
    fn test_settings_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_SETTINGS_FILE,
                "bind_address: \"0.0.0.0:9000\"\ntrace_level: DEBUG\n",
            )?;
            jail.set_env("HIGHSCORE_STORE", "file:scores.json");

            let cli = Cli::for_tests();
            let settings = Settings::load(&cli)?;

            assert_eq!(settings.bind_address, "0.0.0.0:9000");
            assert_eq!(settings.get_trace_level(), Level::DEBUG);
            assert_eq!(
                settings.store,
                Some(StoreBinding::File(PathBuf::from("scores.json")))
            );
            assert_eq!(settings.fetch_timeout(), Duration::from_secs(10));
            Ok(())
        });
    }

    #[test]
    fn test_settings_cli_overrides_env() {
        Jail::expect_with(|jail| {
            jail.set_env("HIGHSCORE_STORE", "file:scores.json");

            let mut cli = Cli::for_tests();
            cli.store = Some("memory".to_string());
            let settings = Settings::load(&cli)?;

            assert_eq!(settings.store, Some(StoreBinding::Memory));
            assert_eq!(settings.bind_address, "127.0.0.1:8788");
            Ok(())
        });
    }
}
