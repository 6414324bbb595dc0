use std::{sync::Arc, time::Duration};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::Select;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::debug;
use weather_core::{
    Conditions, ConditionsFetcher, Config, Location, WeatherService, service_from_config,
};

/// How many upcoming hours `show` prints.
const HOURS_SHOWN: usize = 12;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current conditions and the forecast.
    Show {
        /// Place to look up; the configured default location if absent.
        query: Option<String>,

        /// Keep running and refresh every SECS seconds.
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },

    /// List places matching a name.
    Search {
        query: String,
    },

    /// Pick a place and save it as the default location.
    Configure {
        query: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        debug!(?config, "Loaded configuration");

        match self.command {
            Command::Show { query, every } => show(&config, query, every).await,
            Command::Search { query } => search(&config, &query).await,
            Command::Configure { query } => configure(&mut config, &query).await,
        }
    }
}

async fn show(config: &Config, query: Option<String>, every: Option<u64>) -> anyhow::Result<()> {
    let service: Arc<dyn WeatherService> = Arc::new(service_from_config(config)?);

    let location = match query {
        Some(q) => resolve_location(service.as_ref(), &q).await?,
        None => config.default_location.clone(),
    };

    let (tx, mut updates) = mpsc::unbounded_channel();
    let fetcher = ConditionsFetcher::new(location, service, Handle::current(), move || {
        let _ = tx.send(());
    })
    .with_policy(config.refresh_policy);

    loop {
        fetcher.update();
        println!("Loading weather data for {}...", fetcher.location().display_name);

        updates
            .recv()
            .await
            .context("Fetch task ended without reporting a result")?;

        match (fetcher.current_value(), fetcher.current_error()) {
            (Some(conditions), _) => print_conditions(fetcher.location(), &conditions),
            (None, Some(err)) if every.is_some() => eprintln!("Error loading data: {err}"),
            (None, Some(err)) => return Err(anyhow!(err).context("Error loading data")),
            (None, None) => bail!("Fetch completed without a result"),
        }

        let Some(secs) = every else {
            return Ok(());
        };
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

async fn search(config: &Config, query: &str) -> anyhow::Result<()> {
    let service = service_from_config(config)?;
    let locations = service.search_locations(query).await.into_result()?;

    if locations.is_empty() {
        println!("No locations found for '{query}'.");
        return Ok(());
    }

    for location in &locations {
        println!(
            "{}  ({:.4}, {:.4}, {})",
            location.display_name, location.latitude, location.longitude, location.timezone
        );
    }
    Ok(())
}

async fn configure(config: &mut Config, query: &str) -> anyhow::Result<()> {
    let service = service_from_config(config)?;
    let mut locations = service.search_locations(query).await.into_result()?;

    if locations.is_empty() {
        bail!("No locations found for '{query}'.");
    }

    let labels: Vec<String> = locations.iter().map(|l| l.display_name.clone()).collect();
    let choice = Select::new("Default location:", labels)
        .raw_prompt()
        .context("Location selection was cancelled")?;

    let location = locations.swap_remove(choice.index);
    println!("Default location set to {}", location.display_name);

    config.set_default_location(location);
    config.save()?;

    Ok(())
}

async fn resolve_location(service: &dyn WeatherService, query: &str) -> anyhow::Result<Location> {
    service
        .search_location(query)
        .await
        .into_result()?
        .ok_or_else(|| anyhow!("No location found for '{query}'"))
}

fn print_conditions(location: &Location, conditions: &Conditions) {
    let period = if conditions.is_day { "day" } else { "night" };

    println!();
    println!("Weather in {} ({period})", location.display_name);
    println!("  Temperature:   {}", conditions.temperature);
    println!("  Humidity:      {}", conditions.humidity);
    println!("  Precipitation: {}", conditions.precipitation);

    let upcoming = conditions
        .hourly_forecast
        .iter()
        .filter(|h| h.hours_from_now >= 0)
        .take(HOURS_SHOWN);

    println!();
    println!("Next hours:");
    for hour in upcoming {
        println!(
            "  {:>4}  {:>7}  {:>6}  {:>6}",
            hour_label(hour.hours_from_now),
            hour.temperature.to_string(),
            hour.humidity.to_string(),
            hour.precipitation.to_string(),
        );
    }

    println!();
    println!("Daily:");
    for day in &conditions.daily_forecast {
        println!(
            "  {}  high {:>7}  low {:>7}  precip {:>6}",
            day.calendar_date.format("%a %b %d"),
            day.temperature_max.to_string(),
            day.temperature_min.to_string(),
            day.precipitation_total.to_string(),
        );
    }
}

/// Signed hour offset, e.g. `+0h` or `+11h`.
fn hour_label(hours_from_now: i64) -> String {
    format!("{hours_from_now:+}h")
}
