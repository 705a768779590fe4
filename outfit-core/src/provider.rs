use crate::{
    Config, WeatherRequest, WeatherSnapshot, provider::open_meteo::OpenMeteoProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, request: &WeatherRequest) -> anyhow::Result<WeatherSnapshot>;
}

/// Human-readable label for a WMO weather code.
pub fn condition_label(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Construct the weather provider described by the config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = OpenMeteoProvider::new(config.http.timeout(), config.http.retry_policy())?;
    Ok(Box::new(provider))
}

impl WeatherRequest {
    pub fn from_config(config: &Config, now: chrono::DateTime<chrono_tz::Tz>) -> anyhow::Result<Self> {
        Ok(Self {
            latitude: config.location.latitude,
            longitude: config.location.longitude,
            timezone: config.timezone()?,
            now,
        })
    }
}
