use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::alert::Severity;

/// Where a weather reading came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    Mock,
}

impl DataOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: f64,
    pub condition: String,
    pub description: String,
    pub wind_speed: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
    pub origin: DataOrigin,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature: f64,
    pub condition: String,
    pub description: String,
    pub wind_speed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticsRisk {
    pub location: String,
    pub risk_level: Severity,
    pub delay_estimate_days: i64,
    pub risk_factors: Vec<String>,
    pub current_weather: WeatherReport,
    pub assessed_at: DateTime<Utc>,
}

impl LogisticsRisk {
    pub fn is_elevated(&self) -> bool {
        self.risk_level >= Severity::Medium
    }
}
