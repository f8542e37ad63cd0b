//! Application settings and Telegram configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::FALLBACK_REFERRAL_CODE;

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("session.db")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID` and `TG_API_HASH` to be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;
        if api_id <= 0 {
            return Err(ConfigError::InvalidApiId);
        }

        let api_hash = std::env::var("TG_API_HASH")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            session_path,
        })
    }

    /// Display name of the session, taken from the session file stem.
    #[must_use]
    pub fn session_name(&self) -> String {
        self.session_path
            .file_stem()
            .map_or_else(|| "session".to_owned(), |s| s.to_string_lossy().into_owned())
    }
}

/// Inclusive range of seconds to pick a random delay from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct SecondsRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Deserialize)]
struct RawRange {
    min: u64,
    max: u64,
}

impl TryFrom<RawRange> for SecondsRange {
    type Error = ConfigError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl SecondsRange {
    /// Creates a range, rejecting `min > max`.
    pub fn new(min: u64, max: u64) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Parses a `min,max` pair.
    ///
    /// Returns `Ok(None)` when the text is not two integers, so the caller
    /// can fall back to its default.
    pub fn parse(text: &str) -> Result<Option<Self>, ConfigError> {
        let Some((min, max)) = text.split_once(',') else {
            return Ok(None);
        };
        match (min.trim().parse(), max.trim().parse()) {
            (Ok(min), Ok(max)) => Self::new(min, max).map(Some),
            _ => Ok(None),
        }
    }
}

/// Tapper behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapperSettings {
    /// Display name used in log lines.
    pub session_name: String,

    /// Referral code used for most registrations.
    #[serde(default = "default_referral_code")]
    pub referral_code: String,

    /// Idle time between loop iterations.
    #[serde(default = "default_sleep_time")]
    pub sleep_time: SecondsRange,

    /// Whether to delay the first iteration by a random amount.
    #[serde(default = "default_true")]
    pub use_random_delay_in_run: bool,

    /// Range for the startup delay.
    #[serde(default = "default_random_delay")]
    pub random_delay_in_run: SecondsRange,

    /// Whether to send a randomized Android Chrome user agent.
    #[serde(default = "default_true")]
    pub fake_user_agent: bool,

    /// Optional outbound proxy for API traffic.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Path to the quiz answers file.
    #[serde(default = "default_answers_path")]
    pub answers_path: PathBuf,
}

fn default_referral_code() -> String {
    FALLBACK_REFERRAL_CODE.to_owned()
}

fn default_sleep_time() -> SecondsRange {
    SecondsRange {
        min: 7200,
        max: 10800,
    }
}

fn default_random_delay() -> SecondsRange {
    SecondsRange { min: 5, max: 60 }
}

fn default_true() -> bool {
    true
}

fn default_answers_path() -> PathBuf {
    PathBuf::from("youtube_answers.json")
}

impl TapperSettings {
    /// Creates settings with defaults for the given session name.
    #[must_use]
    pub fn with_session_name(session_name: String) -> Self {
        Self {
            session_name,
            referral_code: default_referral_code(),
            sleep_time: default_sleep_time(),
            use_random_delay_in_run: true,
            random_delay_in_run: default_random_delay(),
            fake_user_agent: true,
            proxy: None,
            answers_path: default_answers_path(),
        }
    }

    /// Creates settings from environment variables with defaults.
    pub fn from_env_with_defaults(default_session_name: String) -> Result<Self, ConfigError> {
        let mut settings = Self::with_session_name(
            env_string("SESSION_NAME").unwrap_or(default_session_name),
        );

        if let Some(code) = env_string("REF_ID") {
            settings.referral_code = code;
        }
        if let Some(range) = env_range("SLEEP_TIME")? {
            settings.sleep_time = range;
        }
        if let Some(flag) = env_bool("USE_RANDOM_DELAY_IN_RUN") {
            settings.use_random_delay_in_run = flag;
        }
        if let Some(range) = env_range("RANDOM_DELAY_IN_RUN")? {
            settings.random_delay_in_run = range;
        }
        if let Some(flag) = env_bool("FAKE_USERAGENT") {
            settings.fake_user_agent = flag;
        }
        settings.proxy = env_string("PROXY");
        if let Some(path) = env_string("ANSWERS_PATH") {
            settings.answers_path = PathBuf::from(path);
        }

        Ok(settings)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).and_then(|v| parse_bool(&v))
}

fn env_range(name: &str) -> Result<Option<SecondsRange>, ConfigError> {
    match env_string(name) {
        Some(v) => SecondsRange::parse(&v),
        None => Ok(None),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: u64, max: u64 },
}
