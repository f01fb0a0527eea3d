//! Weather severity rules for logistics lead times.

use chrono::{DateTime, Utc};

use crate::domain::alert::Severity;
use crate::domain::weather::{ForecastDay, LogisticsRisk, WeatherReport};

const SEVERE_CURRENT: &[&str] = &["thunderstorm", "tornado", "hurricane"];
const ADVERSE_CURRENT: &[&str] = &["rain", "snow", "drizzle"];
const SEVERE_FORECAST: &[&str] = &["thunderstorm", "snow", "hurricane"];

const SEVERE_DELAY_DAYS: i64 = 3;
const ADVERSE_DELAY_DAYS: i64 = 1;
const FORECAST_DELAY_DAYS: i64 = 2;
const ADVERSE_WIND_MS: f64 = 10.0;
const HIGH_WIND_MS: f64 = 15.0;

pub fn assess_logistics_risk(
    location: &str,
    current: WeatherReport,
    forecast: &[ForecastDay],
    assessed_at: DateTime<Utc>,
) -> LogisticsRisk {
    let mut risk_level = Severity::Low;
    let mut risk_factors = Vec::new();
    let mut delay_estimate_days = 0;

    let condition = current.condition.trim().to_ascii_lowercase();
    if SEVERE_CURRENT.contains(&condition.as_str()) {
        risk_level = Severity::High;
        risk_factors.push(format!("Severe weather: {}", current.description));
        delay_estimate_days += SEVERE_DELAY_DAYS;
    } else if ADVERSE_CURRENT.contains(&condition.as_str()) && current.wind_speed > ADVERSE_WIND_MS {
        risk_level = Severity::Medium;
        risk_factors.push(format!("Adverse conditions: {}", current.description));
        delay_estimate_days += ADVERSE_DELAY_DAYS;
    } else if current.wind_speed > HIGH_WIND_MS {
        risk_level = Severity::Medium;
        risk_factors.push(format!("High winds: {} m/s", current.wind_speed));
        delay_estimate_days += ADVERSE_DELAY_DAYS;
    }

    for day in forecast {
        let day_condition = day.condition.trim().to_ascii_lowercase();
        if SEVERE_FORECAST.contains(&day_condition.as_str()) {
            risk_factors.push(format!("Upcoming: {} on {}", day.description, day.date));
            delay_estimate_days += FORECAST_DELAY_DAYS;
            if risk_level == Severity::Low {
                risk_level = Severity::Medium;
            }
        }
    }

    LogisticsRisk {
        location: location.to_string(),
        risk_level,
        delay_estimate_days,
        risk_factors,
        current_weather: current,
        assessed_at,
    }
}

pub fn adjusted_lead_time(lead_time_days: i64, risk: &LogisticsRisk) -> i64 {
    lead_time_days + risk.delay_estimate_days
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{adjusted_lead_time, assess_logistics_risk};
    use crate::domain::alert::Severity;
    use crate::domain::weather::{DataOrigin, ForecastDay, WeatherReport};

    fn report(condition: &str, wind_speed: f64) -> WeatherReport {
        WeatherReport {
            location: "Somewhere".to_string(),
            temperature: 25.0,
            condition: condition.to_string(),
            description: condition.to_ascii_lowercase(),
            wind_speed,
            humidity: 60.0,
            timestamp: Utc::now(),
            origin: DataOrigin::Mock,
        }
    }

    fn day(offset: u32, condition: &str) -> ForecastDay {
        ForecastDay {
            date: NaiveDate::from_ymd_opt(2026, 1, 1 + offset).unwrap_or_default(),
            temperature: 20.0,
            condition: condition.to_string(),
            description: condition.to_ascii_lowercase(),
            wind_speed: 5.0,
        }
    }

    #[test]
    fn severe_current_weather_is_high_risk_with_three_day_delay() {
        let risk = assess_logistics_risk("Florida", report("Thunderstorm", 18.0), &[], Utc::now());
        assert_eq!(risk.risk_level, Severity::High);
        assert_eq!(risk.delay_estimate_days, 3);
        assert_eq!(risk.risk_factors.len(), 1);
    }

    #[test]
    fn rain_needs_wind_to_become_a_risk() {
        let windy = assess_logistics_risk("Kochi", report("Rain", 12.0), &[], Utc::now());
        assert_eq!(windy.risk_level, Severity::Medium);
        assert_eq!(windy.delay_estimate_days, 1);

        let calm = assess_logistics_risk("Kochi", report("Rain", 10.0), &[], Utc::now());
        assert_eq!(calm.risk_level, Severity::Low);
        assert_eq!(calm.delay_estimate_days, 0);
    }

    #[test]
    fn high_wind_alone_is_medium_risk() {
        let risk = assess_logistics_risk("Coast", report("Clear", 16.0), &[], Utc::now());
        assert_eq!(risk.risk_level, Severity::Medium);
        assert_eq!(risk.delay_estimate_days, 1);
    }

    #[test]
    fn severe_forecast_days_add_delay_and_raise_low_risk() {
        let forecast = [day(0, "Snow"), day(1, "Clear"), day(2, "Hurricane"), day(3, "Rain")];
        let risk = assess_logistics_risk("North", report("Clear", 3.0), &forecast, Utc::now());

        assert_eq!(risk.risk_level, Severity::Medium);
        assert_eq!(risk.delay_estimate_days, 4);
        assert_eq!(risk.risk_factors.len(), 2);
    }

    #[test]
    fn forecast_never_lowers_high_risk() {
        let forecast = [day(0, "Thunderstorm")];
        let risk = assess_logistics_risk("Florida", report("Tornado", 3.0), &forecast, Utc::now());

        assert_eq!(risk.risk_level, Severity::High);
        assert_eq!(risk.delay_estimate_days, 5);
        assert_eq!(adjusted_lead_time(7, &risk), 12);
    }
}
