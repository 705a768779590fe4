use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    clock,
    error::HttpError,
    model::{WeatherRequest, WeatherSnapshot},
    retry::{RetryPolicy, with_retry},
};

use super::{WeatherProvider, condition_label};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
                              precipitation_probability,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_probability_max,uv_index_max";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenMeteoProvider {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Open-Meteo")?;

        Ok(Self {
            http,
            base_url: OPEN_METEO_URL.to_string(),
            retry,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_forecast(&self, request: &WeatherRequest) -> Result<OmResponse> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", request.latitude.to_string()),
                ("longitude", request.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", request.timezone.name().to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo response body")?;

        if !status.is_success() {
            return Err(HttpError::new("Open-Meteo", status, &body).into());
        }

        serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    #[serde(default)]
    precipitation_probability: Option<f64>,
    weather_code: i64,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
    uv_index_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
    daily: OmDaily,
}

fn first_day(values: &[Option<f64>], field: &str) -> Result<f64> {
    values
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| anyhow!("Open-Meteo response contained no daily {field} value"))
}

fn to_snapshot(parsed: OmResponse, request: &WeatherRequest) -> Result<WeatherSnapshot> {
    let daily = &parsed.daily;

    Ok(WeatherSnapshot {
        temperature_c: parsed.current.temperature_2m,
        feels_like_c: parsed.current.apparent_temperature,
        humidity_pct: parsed.current.relative_humidity_2m,
        wind_speed_kmh: parsed.current.wind_speed_10m,
        rain_chance_pct: parsed.current.precipitation_probability.unwrap_or(0.0),
        condition: condition_label(parsed.current.weather_code).to_string(),
        high_c: first_day(&daily.temperature_2m_max, "high")?,
        low_c: first_day(&daily.temperature_2m_min, "low")?,
        daily_rain_chance_pct: first_day(&daily.precipitation_probability_max, "rain chance")?,
        uv_index: first_day(&daily.uv_index_max, "UV index")?,
        local_time: clock::format_local_time(&request.now),
        date_formatted: clock::format_long_date(&request.now),
    })
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[tracing::instrument(skip(self, request), fields(lat = request.latitude, lon = request.longitude))]
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot> {
        let parsed = with_retry(self.retry, "weather fetch", || self.fetch_forecast(request)).await?;
        to_snapshot(parsed, request)
    }
}
