use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const FAHRENHEIT: &str = "°F";
pub const PERCENT: &str = "%";
pub const INCHES: &str = "in";

/// A measured value paired with its unit label. Display only, no arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    magnitude: f64,
    unit: String,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Self { magnitude, unit: unit.into() }
    }

    pub fn fahrenheit(magnitude: f64) -> Self {
        Self::new(magnitude, FAHRENHEIT)
    }

    pub fn percent(magnitude: f64) -> Self {
        Self::new(magnitude, PERCENT)
    }

    pub fn inches(magnitude: f64) -> Self {
        Self::new(magnitude, INCHES)
    }

    pub fn as_value(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}{}", self.magnitude, self.unit)
    }
}

/// A named place the service can forecast for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub display_name: String,
    /// IANA timezone name, e.g. "America/Los_Angeles".
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(
        display_name: impl Into<String>,
        timezone: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            timezone: timezone.into(),
            latitude,
            longitude,
        }
    }
}

/// Current conditions plus the hourly and daily outlook for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub temperature: Quantity,
    pub humidity: Quantity,
    pub precipitation: Quantity,
    pub is_day: bool,
    pub hourly_forecast: Vec<HourForecast>,
    pub daily_forecast: Vec<DayForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourForecast {
    /// Whole hours between capture time and this entry, truncated toward zero.
    /// Negative for hours already past.
    pub hours_from_now: i64,
    pub temperature: Quantity,
    pub humidity: Quantity,
    pub precipitation: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    /// Local calendar day at the location.
    pub calendar_date: NaiveDate,
    pub temperature_max: Quantity,
    pub temperature_min: Quantity,
    pub precipitation_total: Quantity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_formats_one_decimal_then_unit() {
        assert_eq!(Quantity::fahrenheit(72.34).to_string(), "72.3°F");
        assert_eq!(Quantity::percent(40.0).to_string(), "40.0%");
        assert_eq!(Quantity::inches(1.26).to_string(), "1.3in");
    }

    #[test]
    fn quantity_exposes_raw_parts() {
        let q = Quantity::new(-3.25, "°C");
        assert!((q.as_value() + 3.25).abs() < f64::EPSILON);
        assert_eq!(q.unit(), "°C");
    }
}
