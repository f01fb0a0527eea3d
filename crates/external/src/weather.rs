//! Current conditions and forecasts from OpenWeatherMap, with a deterministic offline table.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use guardian_core::config::WeatherConfig;
use guardian_core::domain::weather::{DataOrigin, ForecastDay, LogisticsRisk, WeatherReport};
use guardian_core::risk::assess_logistics_risk;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ensure_success, ExternalError};

const SERVICE: &str = "openweathermap";
const RISK_FORECAST_DAYS: u32 = 7;
const SAMPLES_PER_DAY: usize = 8;

#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn origin(&self) -> DataOrigin;

    async fn current(&self, location: &str) -> WeatherReport;

    async fn forecast(&self, location: &str, days: u32) -> Vec<ForecastDay>;

    async fn assess_logistics_risk(&self, location: &str) -> LogisticsRisk {
        let current = self.current(location).await;
        let forecast = self.forecast(location, RISK_FORECAST_DAYS).await;
        assess_logistics_risk(location, current, &forecast, Utc::now())
    }
}

/// Picks the live client when a key is configured, otherwise the offline table.
pub fn weather_source(config: &WeatherConfig) -> Arc<dyn WeatherSource> {
    match &config.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => {
            info!(event_name = "external.weather.mode", mode = "live", "weather client configured");
            Arc::new(OpenWeatherClient::new(config.base_url.clone(), key.clone(), config.timeout_secs))
        }
        _ => {
            warn!(
                event_name = "external.weather.mode",
                mode = "mock",
                "WEATHER_API_KEY not set; using mock weather data"
            );
            Arc::new(MockWeather::default())
        }
    }
}

struct MockCondition {
    key: &'static str,
    temperature: f64,
    condition: &'static str,
    description: &'static str,
    wind_speed: f64,
}

const MOCK_CONDITIONS: &[MockCondition] = &[
    MockCondition { key: "mumbai", temperature: 32.0, condition: "Clear", description: "clear sky", wind_speed: 5.0 },
    MockCondition { key: "kochi", temperature: 28.0, condition: "Rain", description: "heavy intensity rain", wind_speed: 12.0 },
    MockCondition { key: "ho chi minh", temperature: 30.0, condition: "Clouds", description: "scattered clouds", wind_speed: 7.0 },
    MockCondition { key: "california", temperature: 22.0, condition: "Clear", description: "clear sky", wind_speed: 4.0 },
    MockCondition { key: "florida", temperature: 27.0, condition: "Thunderstorm", description: "thunderstorm", wind_speed: 18.0 },
    MockCondition { key: "texas", temperature: 35.0, condition: "Clear", description: "extreme heat", wind_speed: 8.0 },
];

/// Offline weather keyed on well-known supplier and warehouse regions.
#[derive(Clone, Debug, Default)]
pub struct MockWeather {
    anchor: Option<NaiveDate>,
}

impl MockWeather {
    /// Forecast dates start from `anchor` instead of today.
    pub fn anchored(anchor: NaiveDate) -> Self {
        Self { anchor: Some(anchor) }
    }

    pub fn report(&self, location: &str) -> WeatherReport {
        let needle = location.to_lowercase();
        let matched = MOCK_CONDITIONS.iter().find(|entry| needle.contains(entry.key));

        let (temperature, condition, description, wind_speed, humidity) = match matched {
            Some(entry) => {
                (entry.temperature, entry.condition, entry.description, entry.wind_speed, 65.0)
            }
            None => (25.0, "Clear", "clear sky", 5.0, 60.0),
        };

        WeatherReport {
            location: location.to_string(),
            temperature,
            condition: condition.to_string(),
            description: description.to_string(),
            wind_speed,
            humidity,
            timestamp: Utc::now(),
            origin: DataOrigin::Mock,
        }
    }

    pub fn forecast_days(&self, days: u32) -> Vec<ForecastDay> {
        let start = self.anchor.unwrap_or_else(|| Utc::now().date_naive());
        (0..days)
            .map(|i| {
                let rainy = i % 3 == 0;
                ForecastDay {
                    date: start.checked_add_days(Days::new(u64::from(i))).unwrap_or(start),
                    temperature: f64::from(25 + i % 5),
                    condition: if rainy { "Rain" } else { "Clear" }.to_string(),
                    description: if rainy { "light rain" } else { "clear sky" }.to_string(),
                    wind_speed: f64::from(5 + i % 3),
                }
            })
            .collect()
    }
}

#[async_trait]
impl WeatherSource for MockWeather {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Mock
    }

    async fn current(&self, location: &str) -> WeatherReport {
        self.report(location)
    }

    async fn forecast(&self, _location: &str, days: u32) -> Vec<ForecastDay> {
        self.forecast_days(days)
    }
}

pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    fallback: MockWeather,
}

impl OpenWeatherClient {
    pub fn new(base_url: String, api_key: SecretString, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            fallback: MockWeather::default(),
        }
    }

    pub async fn fetch_current(&self, location: &str) -> Result<WeatherReport, ExternalError> {
        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", city_of(location)),
                ("appid", self.api_key.expose_secret()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(ExternalError::request(SERVICE))?;
        let payload: CurrentPayload = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(ExternalError::decode(SERVICE))?;

        let summary = payload.weather.into_iter().next().ok_or_else(|| ExternalError::Decode {
            service: SERVICE,
            message: "weather array is empty".to_string(),
        })?;

        Ok(WeatherReport {
            location: location.to_string(),
            temperature: payload.main.temp,
            condition: summary.main,
            description: summary.description,
            wind_speed: payload.wind.speed,
            humidity: payload.main.humidity,
            timestamp: Utc::now(),
            origin: DataOrigin::Live,
        })
    }

    /// One sample per day from the three-hourly forecast feed.
    pub async fn fetch_forecast(
        &self,
        location: &str,
        days: u32,
    ) -> Result<Vec<ForecastDay>, ExternalError> {
        let count = (days as usize * SAMPLES_PER_DAY).to_string();
        let response = self
            .client
            .get(format!("{}/forecast", self.base_url))
            .query(&[
                ("q", city_of(location)),
                ("appid", self.api_key.expose_secret()),
                ("units", "metric"),
                ("cnt", count.as_str()),
            ])
            .send()
            .await
            .map_err(ExternalError::request(SERVICE))?;
        let payload: ForecastPayload = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(ExternalError::decode(SERVICE))?;

        payload
            .list
            .into_iter()
            .step_by(SAMPLES_PER_DAY)
            .map(|item| {
                let date = parse_forecast_date(&item.dt_txt)?;
                let summary = item.weather.into_iter().next().ok_or_else(|| {
                    ExternalError::Decode {
                        service: SERVICE,
                        message: format!("forecast entry {} has no weather", item.dt_txt),
                    }
                })?;
                Ok(ForecastDay {
                    date,
                    temperature: item.main.temp,
                    condition: summary.main,
                    description: summary.description,
                    wind_speed: item.wind.speed,
                })
            })
            .collect()
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Live
    }

    async fn current(&self, location: &str) -> WeatherReport {
        match self.fetch_current(location).await {
            Ok(report) => report,
            Err(error) => {
                warn!(
                    event_name = "external.weather.fallback",
                    location,
                    error = %error,
                    "weather request failed; using mock conditions"
                );
                self.fallback.report(location)
            }
        }
    }

    async fn forecast(&self, location: &str, days: u32) -> Vec<ForecastDay> {
        match self.fetch_forecast(location, days).await {
            Ok(forecast) => forecast,
            Err(error) => {
                warn!(
                    event_name = "external.weather.fallback",
                    location,
                    error = %error,
                    "forecast request failed; using mock forecast"
                );
                self.fallback.forecast_days(days)
            }
        }
    }
}

fn city_of(location: &str) -> &str {
    location.split(',').next().unwrap_or(location).trim()
}

fn parse_forecast_date(raw: &str) -> Result<NaiveDate, ExternalError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|error| ExternalError::Decode {
            service: SERVICE,
            message: format!("forecast timestamp `{raw}`: {error}"),
        })
}

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    main: MainBlock,
    weather: Vec<ConditionBlock>,
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt_txt: String,
    main: MainBlock,
    weather: Vec<ConditionBlock>,
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}
