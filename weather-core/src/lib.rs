//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - The [`Outcome`] carrier for results of asynchronous operations
//! - A [`WeatherService`] abstraction and its Open-Meteo implementation
//! - [`ConditionsFetcher`], a single-flight cache of conditions for one location
//! - Shared domain models (quantities, locations, forecasts)
//!
//! It is used by `weather-cli`, but can also back any other front end.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod outcome;
pub mod provider;

pub use config::Config;
pub use error::WeatherError;
pub use fetcher::{ConditionsFetcher, FetchStatus, RefreshPolicy};
pub use model::{Conditions, DayForecast, HourForecast, Location, Quantity};
pub use outcome::Outcome;
pub use provider::{OpenMeteoService, WeatherService, service_from_config};
