//! Manual deload overlay
//!
//! A lightweight flag state, independent of any mesocycle, that lets the
//! user enter and leave a deload window by hand. An active window expires
//! on its own seven days after it started; expiry is evaluated whenever the
//! overlay is consulted rather than on a timer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of a manual deload window
pub const DELOAD_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeloadOverlay {
    pub is_in_deload_week: bool,
    pub deload_start_date: Option<DateTime<Utc>>,
    pub last_deload_date: Option<DateTime<Utc>>,
    /// Suppresses deload recommendation banners
    pub is_dismissed: bool,
}

impl DeloadOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a deload window starting now
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.is_in_deload_week = true;
        self.deload_start_date = Some(now);
        self.is_dismissed = false;
        tracing::info!(start = %now, "Deload week started");
    }

    /// Leave the deload window
    pub fn end(&mut self, now: DateTime<Utc>) {
        self.is_in_deload_week = false;
        self.last_deload_date = Some(now);
        tracing::info!(end = %now, "Deload week ended");
    }

    /// Hide recommendation banners without touching the deload window
    pub fn dismiss(&mut self) {
        self.is_dismissed = true;
    }

    /// Let banners show again after a fresh analysis
    pub fn clear_dismissal(&mut self) {
        self.is_dismissed = false;
    }

    /// Back to the initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the active window has run its full length
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.is_in_deload_week, self.deload_start_date) {
            (true, Some(start)) => now - start >= Duration::days(DELOAD_WINDOW_DAYS),
            _ => false,
        }
    }

    /// End an expired window. Returns whether the state changed.
    pub fn check_expiry(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_expired(now) {
            return false;
        }
        tracing::debug!("Deload window expired");
        self.end(now);
        true
    }

    /// Whole days left in the active window
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_in_deload_week {
            return None;
        }
        let start = self.deload_start_date?;
        let elapsed = (now - start).num_days();
        Some((DELOAD_WINDOW_DAYS - elapsed).max(0))
    }
}
