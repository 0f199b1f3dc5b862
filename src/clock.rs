//! Injectable time source
//!
//! Every expiry decision made by the provider reads the time through the
//! [`Clock`] trait, so tests can pin or advance time without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock with an adjustable forward offset.
///
/// The offset starts at zero. [`SystemClock::fast_forward`] moves the
/// perceived time forward, which lets a running server be driven past token
/// expiry without waiting.
#[derive(Debug, Default)]
pub struct SystemClock {
    offset_seconds: AtomicI64,
}

impl SystemClock {
    /// Creates a clock reading the system time with no offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the perceived time by `by`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use mockoidc::clock::{Clock, SystemClock};
    ///
    /// let clock = SystemClock::new();
    /// clock.fast_forward(Duration::hours(1));
    /// assert!(clock.now() > Utc::now() + Duration::minutes(59));
    /// ```
    pub fn fast_forward(&self, by: Duration) {
        self.offset_seconds
            .fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.offset_seconds.load(Ordering::SeqCst))
    }
}

/// Clock frozen at a settable instant, with second precision.
#[derive(Debug)]
pub struct FixedClock {
    timestamp: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            timestamp: AtomicI64::new(at.timestamp()),
        }
    }

    /// Moves the clock to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        self.timestamp.store(at.timestamp(), Ordering::SeqCst);
    }

    /// Advances the clock by `by`.
    pub fn advance(&self, by: Duration) {
        self.timestamp.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp.load(Ordering::SeqCst), 0)
            .single()
            .unwrap_or_default()
    }
}
