use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{clock, error::ConfigError, retry::RetryPolicy};

pub const ENV_GOOGLE_SERVICE_ACCOUNT: &str = "GOOGLE_SERVICE_ACCOUNT";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_FROM_NUMBER: &str = "TWILIO_FROM_NUMBER";
pub const ENV_RECIPIENT_NUMBER: &str = "MY_PHONE_NUMBER";

const ENV_LOCATION_NAME: &str = "LOCATION_NAME";
const ENV_LOCATION_LAT: &str = "LOCATION_LAT";
const ENV_LOCATION_LNG: &str = "LOCATION_LNG";
const ENV_SPREADSHEET_ID: &str = "WARDROBE_SPREADSHEET_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name, e.g. "Australia/Sydney".
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Sydney".to_string(),
            latitude: -33.8688,
            longitude: 151.2093,
            timezone: "Australia/Sydney".to_string(),
        }
    }
}

/// Thresholds quoted to the model as hard weather rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherRules {
    pub outer_layer_temp_c: f64,
    pub layering_temp_min_c: f64,
    pub layering_temp_max_c: f64,
    pub rain_threshold_pct: f64,
    pub uv_threshold: f64,
}

impl Default for WeatherRules {
    fn default() -> Self {
        Self {
            outer_layer_temp_c: 21.0,
            layering_temp_min_c: 20.0,
            layering_temp_max_c: 24.0,
            rain_threshold_pct: 40.0,
            uv_threshold: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsLimits {
    /// Hard cap applied after the model replies (three SMS segments).
    pub max_chars: usize,
    /// Length the model is asked to stay under.
    pub target_chars: usize,
}

impl Default for SmsLimits {
    fn default() -> Self {
        Self {
            max_chars: 480,
            target_chars: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub lookback_days: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { lookback_days: 7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 200,
            temperature: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_attempts: 3,
            retry_initial_delay_ms: 500,
            retry_max_delay_ms: 5_000,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}

/// Non-secret settings, stored on disk as TOML.
///
/// Example TOML:
/// ```toml
/// spreadsheet_id = "..."
/// recipient_name = "Peter"
///
/// [location]
/// name = "Sydney"
/// timezone = "Australia/Sydney"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spreadsheet_id: String,
    /// Name used in the greeting line of the message.
    pub recipient_name: String,
    /// Optional styling guide embedded verbatim into the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_path: Option<PathBuf>,
    pub location: LocationConfig,
    pub weather_rules: WeatherRules,
    pub sms: SmsLimits,
    pub history: HistorySettings,
    pub model: ModelSettings,
    pub http: HttpSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: "1Cx2KUswPEQypVMUPUTPtLOFQ3oGdme1TcFf7z5BZ_7k".to_string(),
            recipient_name: "Peter".to_string(),
            skill_path: None,
            location: LocationConfig::default(),
            weather_rules: WeatherRules::default(),
            sms: SmsLimits::default(),
            history: HistorySettings::default(),
            model: ModelSettings::default(),
            http: HttpSettings::default(),
        }
    }
}

impl Config {
    /// Load config from the platform config directory, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "daily-outfit", "daily-outfit")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `LOCATION_*` and `WARDROBE_SPREADSHEET_ID` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get(ENV_LOCATION_NAME) {
            self.location.name = name;
        }
        if let Some(lat) = get(ENV_LOCATION_LAT) {
            self.location.latitude = parse_coordinate(ENV_LOCATION_LAT, &lat, 90.0)?;
        }
        if let Some(lng) = get(ENV_LOCATION_LNG) {
            self.location.longitude = parse_coordinate(ENV_LOCATION_LNG, &lng, 180.0)?;
        }
        if let Some(id) = get(ENV_SPREADSHEET_ID) {
            self.spreadsheet_id = id;
        }

        Ok(self)
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        clock::parse_timezone(&self.location.timezone)
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "spreadsheet_id",
                reason: "must not be empty".into(),
            });
        }
        if self.sms.max_chars < 4 {
            return Err(ConfigError::Invalid {
                name: "sms.max_chars",
                reason: "must leave room for the ellipsis".into(),
            });
        }
        if self.history.lookback_days == 0 {
            return Err(ConfigError::Invalid {
                name: "history.lookback_days",
                reason: "must be at least 1".into(),
            });
        }
        if self.http.retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "http.retry_attempts",
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

fn parse_coordinate(name: &'static str, raw: &str, limit: f64) -> Result<f64, ConfigError> {
    let value: f64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("'{raw}' is not a number"),
    })?;

    if !(-limit..=limit).contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("{value} is outside ±{limit}"),
        });
    }

    Ok(value)
}

/// Secrets, read from the environment only.
#[derive(Clone)]
pub struct Credentials {
    /// Service-account key file contents (JSON).
    pub google_service_account: String,
    pub anthropic_api_key: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub recipient_number: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve every secret up front so a missing one fails before any request is made.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(Self {
            google_service_account: require(ENV_GOOGLE_SERVICE_ACCOUNT)?,
            anthropic_api_key: require(ENV_ANTHROPIC_API_KEY)?,
            twilio_account_sid: require(ENV_TWILIO_ACCOUNT_SID)?,
            twilio_auth_token: require(ENV_TWILIO_AUTH_TOKEN)?,
            twilio_from_number: require(ENV_TWILIO_FROM_NUMBER)?,
            recipient_number: require(ENV_RECIPIENT_NUMBER)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("google_service_account", &"<redacted>")
            .field("anthropic_api_key", &"<redacted>")
            .field("twilio_account_sid", &self.twilio_account_sid)
            .field("twilio_auth_token", &"<redacted>")
            .field("twilio_from_number", &self.twilio_from_number)
            .field("recipient_number", &self.recipient_number)
            .finish()
    }
}
