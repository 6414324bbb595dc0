use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config, WeatherError,
    model::{Conditions, Location},
    outcome::Outcome,
};

pub mod open_meteo;

pub use open_meteo::OpenMeteoService;

/// Stateless weather operations. Each call makes one network round trip and
/// reports failure through the returned [`Outcome`], never by panicking.
#[async_trait]
pub trait WeatherService: Send + Sync + Debug {
    /// Current conditions plus hourly and daily forecasts for `location`.
    async fn fetch_conditions(&self, location: &Location) -> Outcome<Conditions>;

    /// Every place matching a free-text query. No match is an empty list.
    async fn search_locations(&self, query: &str) -> Outcome<Vec<Location>>;

    /// The best match for `query`, or `None` when nothing matched.
    async fn search_location(&self, query: &str) -> Outcome<Option<Location>> {
        self.search_locations(query)
            .await
            .map(|locations| locations.into_iter().next())
    }
}

/// Construct the HTTP-backed service from config.
pub fn service_from_config(config: &Config) -> Result<OpenMeteoService, WeatherError> {
    OpenMeteoService::new(config)
}
