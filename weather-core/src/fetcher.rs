//! Single-flight cache of the latest conditions for one location.
//!
//! [`ConditionsFetcher::update`] never blocks: it spawns the fetch on the
//! Tokio runtime and returns. When the fetch completes the result is stored,
//! the in-flight flag is cleared, and the `on_update` callback runs exactly
//! once. Calls made while a fetch is outstanding are dropped.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::{
    WeatherError,
    model::{Conditions, Location},
    outcome::Outcome,
    provider::WeatherService,
};

/// What happens to the cached result when a refresh begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshPolicy {
    /// Forget the previous result; observers see "loading" until the new one lands.
    #[default]
    #[serde(rename = "clear")]
    ClearOnRefresh,
    /// Keep serving the previous result until the new one replaces it.
    #[serde(rename = "keep_stale")]
    KeepStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// No fetch has started, or the last result was cleared for a refresh.
    Idle,
    Fetching,
    Ready,
    Errored,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct FetchState {
    last_result: Option<Outcome<Conditions>>,
    in_flight: bool,
}

pub struct ConditionsFetcher {
    location: Location,
    service: Arc<dyn WeatherService>,
    runtime: Handle,
    policy: RefreshPolicy,
    // Shared with the completion task so an outstanding fetch never touches
    // freed state after the fetcher is dropped.
    state: Arc<Mutex<FetchState>>,
    on_update: Callback,
}

impl ConditionsFetcher {
    /// `on_update` is invoked once per completed fetch, from a runtime worker
    /// thread. It carries no payload; read the fetcher to see the result.
    pub fn new<F>(
        location: Location,
        service: Arc<dyn WeatherService>,
        runtime: Handle,
        on_update: F,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            location,
            service,
            runtime,
            policy: RefreshPolicy::default(),
            state: Arc::new(Mutex::new(FetchState::default())),
            on_update: Arc::new(on_update),
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Start a background fetch unless one is already running.
    ///
    /// Returns `true` if a new fetch was started, `false` if the call was
    /// coalesced into the outstanding one.
    pub fn update(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.in_flight {
                debug!(location = %self.location.display_name, "Fetch already in flight");
                return false;
            }
            state.in_flight = true;
            if self.policy == RefreshPolicy::ClearOnRefresh {
                state.last_result = None;
            }
        }

        debug!(location = %self.location.display_name, "Starting fetch");

        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        let on_update = Arc::clone(&self.on_update);
        let location = self.location.clone();

        self.runtime.spawn(async move {
            let mut completion = Completion { state, on_update, outcome: None };
            completion.outcome = Some(service.fetch_conditions(&location).await);
        });

        true
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn has_value(&self) -> bool {
        self.state
            .lock()
            .last_result
            .as_ref()
            .is_some_and(Outcome::is_value)
    }

    pub fn has_error(&self) -> bool {
        self.state
            .lock()
            .last_result
            .as_ref()
            .is_some_and(Outcome::is_failure)
    }

    /// A copy of the cached conditions, if the last fetch succeeded.
    pub fn current_value(&self) -> Option<Conditions> {
        self.state
            .lock()
            .last_result
            .as_ref()
            .and_then(Outcome::as_value)
            .cloned()
    }

    /// The cached failure, if the last fetch failed.
    pub fn current_error(&self) -> Option<WeatherError> {
        self.state
            .lock()
            .last_result
            .as_ref()
            .and_then(Outcome::as_failure)
            .cloned()
    }

    /// A copy of whatever result is cached, success or failure.
    pub fn snapshot(&self) -> Option<Outcome<Conditions>> {
        self.state.lock().last_result.clone()
    }

    pub fn status(&self) -> FetchStatus {
        let state = self.state.lock();
        if state.in_flight {
            return FetchStatus::Fetching;
        }
        match &state.last_result {
            None => FetchStatus::Idle,
            Some(Outcome::Value(_)) => FetchStatus::Ready,
            Some(Outcome::Failure(_)) => FetchStatus::Errored,
        }
    }
}

/// Publishes the fetch result when the spawned task ends.
///
/// Runs from `Drop` so a service future that panics or is cancelled still
/// clears the in-flight flag and notifies, recording
/// [`WeatherError::Interrupted`] instead of a result.
struct Completion {
    state: Arc<Mutex<FetchState>>,
    on_update: Callback,
    outcome: Option<Outcome<Conditions>>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            warn!("Fetch task ended without a result");
            Outcome::failure(WeatherError::Interrupted)
        });

        {
            let mut state = self.state.lock();
            state.last_result = Some(outcome);
            state.in_flight = false;
        }

        (self.on_update)();
    }
}

impl fmt::Debug for ConditionsFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionsFetcher")
            .field("location", &self.location)
            .field("service", &self.service)
            .field("policy", &self.policy)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl WeatherService for Unreachable {
        async fn fetch_conditions(&self, _location: &Location) -> Outcome<Conditions> {
            Outcome::failure(WeatherError::Api { status_code: 503 })
        }

        async fn search_locations(&self, _query: &str) -> Outcome<Vec<Location>> {
            Outcome::value(Vec::new())
        }
    }

    fn fullerton() -> Location {
        Location::new("Fullerton, CA", "America/Los_Angeles", 33.8703, -117.9253)
    }

    #[tokio::test]
    async fn new_fetcher_is_idle() {
        let fetcher =
            ConditionsFetcher::new(fullerton(), Arc::new(Unreachable), Handle::current(), || {});

        assert_eq!(fetcher.status(), FetchStatus::Idle);
        assert!(!fetcher.has_value());
        assert!(!fetcher.has_error());
        assert!(fetcher.snapshot().is_none());
        assert_eq!(fetcher.policy(), RefreshPolicy::ClearOnRefresh);
        assert_eq!(fetcher.location().timezone, "America/Los_Angeles");
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_as_error() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let fetcher =
            ConditionsFetcher::new(fullerton(), Arc::new(Unreachable), Handle::current(), move || {
                let _ = tx.send(());
            });

        assert!(fetcher.update());
        rx.recv().await.expect("on_update must fire");

        assert_eq!(fetcher.status(), FetchStatus::Errored);
        assert!(fetcher.has_error());
        assert!(!fetcher.has_value());
        assert_eq!(fetcher.current_error().and_then(|e| e.status_code()), Some(503));
        assert!(fetcher.current_value().is_none());
    }

    #[test]
    fn refresh_policy_serializes_to_short_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            policy: RefreshPolicy,
        }

        let text = toml::to_string(&Wrapper { policy: RefreshPolicy::KeepStale }).unwrap();
        assert_eq!(text.trim(), "policy = \"keep_stale\"");

        let parsed: Wrapper = toml::from_str("policy = \"clear\"").unwrap();
        assert_eq!(parsed.policy, RefreshPolicy::ClearOnRefresh);
    }
}
