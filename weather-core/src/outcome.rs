use crate::WeatherError;

/// The outcome of an asynchronous weather operation: either the produced
/// value or the failure that prevented it.
///
/// Failures travel as data, so a completion handler can hand one to an
/// observer instead of unwinding through it.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Value(T),
    Failure(WeatherError),
}

impl<T> Outcome<T> {
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    pub fn failure(error: WeatherError) -> Self {
        Self::Failure(error)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&WeatherError> {
        match self {
            Self::Value(_) => None,
            Self::Failure(e) => Some(e),
        }
    }

    /// Takes the value out.
    ///
    /// # Panics
    ///
    /// Panics if this is a failure.
    pub fn unwrap_value(self) -> T {
        match self {
            Self::Value(v) => v,
            Self::Failure(e) => panic!("called `Outcome::unwrap_value()` on a failure: {e}"),
        }
    }

    /// Takes the failure out.
    ///
    /// # Panics
    ///
    /// Panics if this is a value.
    pub fn unwrap_failure(self) -> WeatherError {
        match self {
            Self::Value(_) => panic!("called `Outcome::unwrap_failure()` on a value"),
            Self::Failure(e) => e,
        }
    }

    /// Returns the captured failure as `Err`, or `Ok(())` for a value.
    pub fn rethrow_if_failure(&self) -> Result<(), WeatherError> {
        match self {
            Self::Value(_) => Ok(()),
            Self::Failure(e) => Err(e.clone()),
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Value(v) => Outcome::Value(f(v)),
            Self::Failure(e) => Outcome::Failure(e),
        }
    }

    pub fn into_result(self) -> Result<T, WeatherError> {
        self.into()
    }
}

impl<T> From<Result<T, WeatherError>> for Outcome<T> {
    fn from(result: Result<T, WeatherError>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Failure(e),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, WeatherError> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Value(v) => Ok(v),
            Outcome::Failure(e) => Err(e),
        }
    }
}
