//! Open-Meteo forecast and geocoding endpoints.
//!
//! Requests ask for fixed units (Fahrenheit, mph, inches) and Unix timestamps,
//! so parsing never has to guess at formats.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    Config, WeatherError,
    model::{Conditions, DayForecast, HourForecast, Location, Quantity},
    outcome::Outcome,
};

use super::WeatherService;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,is_day,precipitation,rain";
const HOURLY_FIELDS: &str = "temperature_2m,relative_humidity_2m,precipitation";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum";

const HALF_DAY_SECS: i64 = 12 * 60 * 60;

#[derive(Debug, Clone)]
pub struct OpenMeteoService {
    http: Client,
    forecast_url: String,
    geocoding_url: String,
}

impl OpenMeteoService {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(http, &config.forecast_url, &config.geocoding_url))
    }

    pub fn with_client(
        http: Client,
        forecast_url: impl Into<String>,
        geocoding_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            forecast_url: forecast_url.into(),
            geocoding_url: geocoding_url.into(),
        }
    }

    /// Issue a GET and return the body of a 2xx response.
    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, WeatherError> {
        debug!(url, ?query, "Sending request");

        let res = self.http.get(url).query(query).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(WeatherError::Api { status_code: status.as_u16() });
        }

        Ok(res.text().await?)
    }

    async fn try_fetch_conditions(&self, location: &Location) -> Result<Conditions, WeatherError> {
        let body = self.get_text(&self.forecast_url, &forecast_query(location)).await?;
        let conditions = parse_conditions(&body, Utc::now())?;

        debug!(
            hours = conditions.hourly_forecast.len(),
            days = conditions.daily_forecast.len(),
            "Parsed forecast"
        );
        Ok(conditions)
    }

    async fn try_search_locations(&self, query: &str) -> Result<Vec<Location>, WeatherError> {
        let body = self
            .get_text(&self.geocoding_url, &[("name", query.to_string())])
            .await?;
        let locations = parse_locations(&body)?;

        debug!(matches = locations.len(), "Parsed geocoding results");
        Ok(locations)
    }
}

#[async_trait]
impl WeatherService for OpenMeteoService {
    #[instrument(skip(self, location), fields(location = %location.display_name))]
    async fn fetch_conditions(&self, location: &Location) -> Outcome<Conditions> {
        let result = self.try_fetch_conditions(location).await;
        if let Err(e) = &result {
            warn!(error = %e, "Fetching conditions failed");
        }
        result.into()
    }

    #[instrument(skip(self))]
    async fn search_locations(&self, query: &str) -> Outcome<Vec<Location>> {
        let result = self.try_search_locations(query).await;
        if let Err(e) = &result {
            warn!(error = %e, "Location search failed");
        }
        result.into()
    }
}

fn forecast_query(location: &Location) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", location.latitude.to_string()),
        ("longitude", location.longitude.to_string()),
        ("timezone", location.timezone.clone()),
        ("current", CURRENT_FIELDS.to_string()),
        ("hourly", HOURLY_FIELDS.to_string()),
        ("daily", DAILY_FIELDS.to_string()),
        ("temperature_unit", "fahrenheit".to_string()),
        ("wind_speed_unit", "mph".to_string()),
        ("precipitation_unit", "inch".to_string()),
        ("timeformat", "unixtime".to_string()),
    ]
}

/// Parse a forecast body. `now` is the capture instant that hourly offsets
/// are measured against.
pub fn parse_conditions(body: &str, now: DateTime<Utc>) -> Result<Conditions, WeatherError> {
    let parsed: ForecastResponse = serde_json::from_str(body)?;

    let hourly = parsed.hourly;
    check_columns(
        "hourly",
        hourly.time.len(),
        &[
            ("temperature_2m", hourly.temperature_2m.len()),
            ("relative_humidity_2m", hourly.relative_humidity_2m.len()),
            ("precipitation", hourly.precipitation.len()),
        ],
    )?;

    let zone = parsed.timezone.as_deref().and_then(|name| name.parse::<Tz>().ok());

    let daily = parsed.daily;
    check_columns(
        "daily",
        daily.time.len(),
        &[
            ("temperature_2m_max", daily.temperature_2m_max.len()),
            ("temperature_2m_min", daily.temperature_2m_min.len()),
            ("precipitation_sum", daily.precipitation_sum.len()),
        ],
    )?;

    let hourly_forecast = hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            Ok(HourForecast {
                hours_from_now: hours_from(now, ts)?,
                temperature: Quantity::fahrenheit(hourly.temperature_2m[i]),
                humidity: Quantity::percent(hourly.relative_humidity_2m[i]),
                precipitation: Quantity::inches(hourly.precipitation[i]),
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    let daily_forecast = daily
        .time
        .iter()
        .enumerate()
        .map(|(i, &ts)| {
            Ok(DayForecast {
                calendar_date: local_date(ts, zone, parsed.utc_offset_seconds)?,
                temperature_max: Quantity::fahrenheit(daily.temperature_2m_max[i]),
                temperature_min: Quantity::fahrenheit(daily.temperature_2m_min[i]),
                precipitation_total: Quantity::inches(daily.precipitation_sum[i]),
            })
        })
        .collect::<Result<Vec<_>, WeatherError>>()?;

    let current = parsed.current;
    Ok(Conditions {
        temperature: Quantity::fahrenheit(current.temperature_2m),
        humidity: Quantity::percent(current.relative_humidity_2m),
        precipitation: Quantity::inches(current.precipitation),
        is_day: current.is_day != 0,
        hourly_forecast,
        daily_forecast,
    })
}

/// Parse a geocoding body. A body without `results` means nothing matched.
pub fn parse_locations(body: &str) -> Result<Vec<Location>, WeatherError> {
    let parsed: GeocodingResponse = serde_json::from_str(body)?;

    Ok(parsed
        .results
        .into_iter()
        .map(|r| Location {
            display_name: r.display_name(),
            timezone: r.timezone,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect())
}

fn check_columns(
    block: &str,
    expected: usize,
    columns: &[(&str, usize)],
) -> Result<(), WeatherError> {
    for (name, len) in columns {
        if *len != expected {
            return Err(WeatherError::parse(format!(
                "{block}.{name} has {len} entries but {block}.time has {expected}"
            )));
        }
    }
    Ok(())
}

/// Whole hours from `now` until `timestamp`, truncated toward zero.
fn hours_from(now: DateTime<Utc>, timestamp: i64) -> Result<i64, WeatherError> {
    let at = unix_to_utc(timestamp)?;
    Ok((at - now).num_hours())
}

/// Calendar day of a daily timestamp in the location's timezone.
///
/// Without a known zone, the single reported offset is applied and the result
/// rounded to the nearest day: daily timestamps are local midnights, so a DST
/// change inside the window moves them by at most an hour.
fn local_date(
    timestamp: i64,
    zone: Option<Tz>,
    utc_offset_seconds: i64,
) -> Result<NaiveDate, WeatherError> {
    if let Some(tz) = zone {
        return Ok(unix_to_utc(timestamp)?.with_timezone(&tz).date_naive());
    }

    let shifted = timestamp
        .checked_add(utc_offset_seconds)
        .and_then(|ts| ts.checked_add(HALF_DAY_SECS))
        .ok_or_else(|| WeatherError::parse(format!("timestamp {timestamp} out of range")))?;
    Ok(unix_to_utc(shifted)?.date_naive())
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| WeatherError::parse(format!("timestamp {ts} out of range")))
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i64,
    timezone: Option<String>,
    current: CurrentBlock,
    hourly: HourlyBlock,
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    precipitation: f64,
    is_day: i64,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<i64>,
    temperature_2m: Vec<f64>,
    relative_humidity_2m: Vec<f64>,
    precipitation: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<i64>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_sum: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    admin1: Option<String>,
    admin2: Option<String>,
    country_code: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
}

impl GeocodingResult {
    fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        parts.extend(self.admin1.as_deref());
        parts.extend(self.admin2.as_deref());
        parts.push(&self.country_code);
        parts.join(", ")
    }
}
