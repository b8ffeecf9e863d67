// Cooldown values and per-sender invocation tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timestamp type
pub type Timestamp = DateTime<Utc>;

/// Minimum time between two invocations of a command by one sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cooldown {
    duration: Duration,
}

impl Cooldown {
    /// No cooldown
    pub const EMPTY: Cooldown = Cooldown {
        duration: Duration::ZERO,
    };

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Remaining cooldown broken into calendar units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingTime {
    total: Duration,
    days: u64,
    hours: u64,
    minutes: u64,
    seconds: u64,
}

impl RemainingTime {
    /// Seconds are rounded up so a sub-second remainder still reads `1s`
    pub fn from_duration(total: Duration) -> Self {
        let mut secs = total.as_secs();
        if total.subsec_nanos() > 0 {
            secs += 1;
        }

        Self {
            total,
            days: secs / 86_400,
            hours: (secs % 86_400) / 3_600,
            minutes: (secs % 3_600) / 60,
            seconds: secs % 60,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn total_millis(&self) -> u128 {
        self.total.as_millis()
    }

    pub fn days(&self) -> u64 {
        self.days
    }

    pub fn hours(&self) -> u64 {
        self.hours
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.days, "d"),
            (self.hours, "h"),
            (self.minutes, "m"),
            (self.seconds, "s"),
        ]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();

        if parts.is_empty() {
            f.write_str("0s")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        }
    }

    pub fn set(&self, to: Timestamp) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Last-invocation timestamps keyed by (command, sender)
///
/// Entries are never evicted.
pub struct CooldownTracker {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<(String, String), Timestamp>>,
}

impl CooldownTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Pass and refresh the timestamp, or report the remaining time untouched
    pub fn check(&self, command: &str, sender: &str, cooldown: &Cooldown) -> Result<(), RemainingTime> {
        if cooldown.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        let key = (command.to_ascii_lowercase(), sender.to_string());
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(last) = entries.get(&key) {
            let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < cooldown.duration() {
                return Err(RemainingTime::from_duration(cooldown.duration() - elapsed));
            }
        }

        entries.insert(key, now);
        Ok(())
    }

    pub fn last_invocation(&self, command: &str, sender: &str) -> Option<Timestamp> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(&(command.to_ascii_lowercase(), sender.to_string()))
            .copied()
    }

    /// Number of tracked (command, sender) pairs
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
