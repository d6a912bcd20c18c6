//! Week-over-week trend detection over weekly summaries
//!
//! All sequences here are most-recent-first, matching the ordering produced
//! by [`WeeklyAggregator`](crate::weekly::WeeklyAggregator).

use serde::{Deserialize, Serialize};

use crate::weekly::{mean_or_zero, WeeklySummary};

/// A window counts as deload-like when its sets fall to this share of the mean
pub const DELOAD_LIKE_SET_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl TrendDirection {
    /// Classify a trend value with a symmetric dead band
    pub fn from_trend(trend: f64, tolerance: f64) -> Self {
        if trend > tolerance {
            TrendDirection::Increasing
        } else if trend < -tolerance {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

/// Mean of successive backward differences `values[i] - values[i + 1]`.
///
/// Positive means the series is rising toward the present. Returns 0 for
/// fewer than two values.
pub fn detect_trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let diffs: Vec<f64> = values.windows(2).map(|pair| pair[0] - pair[1]).collect();
    mean_or_zero(&diffs)
}

/// Weeks since the most recent deload-like window.
///
/// This is a proxy: there is no record of actual deloads, so a window whose
/// completed sets are positive and at most 60% of the mean over active
/// windows is treated as one. Returns the index of the first such window
/// scanning from the most recent, or the window count when none qualifies.
pub fn weeks_since_last_deload(summaries: &[WeeklySummary]) -> usize {
    let active_sets: Vec<f64> = summaries
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.total_sets as f64)
        .collect();

    if active_sets.is_empty() {
        return summaries.len();
    }

    let cutoff = mean_or_zero(&active_sets) * DELOAD_LIKE_SET_RATIO;

    summaries
        .iter()
        .position(|s| s.total_sets > 0 && (s.total_sets as f64) <= cutoff)
        .unwrap_or(summaries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(index: usize, workouts: u32, sets: u32) -> WeeklySummary {
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap() - chrono::Duration::days(7 * index as i64);
        WeeklySummary {
            week_index: index,
            week_start: end - chrono::Duration::days(6),
            week_end: end,
            workout_count: workouts,
            feedback_count: 0,
            total_sets: sets,
            total_volume: 0.0,
            avg_fatigue: 0.0,
            avg_performance: 0.0,
            avg_soreness: 0.0,
            avg_pump: 0.0,
        }
    }

    #[test]
    fn test_trend_of_short_series_is_zero() {
        assert_eq!(detect_trend(&[]), 0.0);
        assert_eq!(detect_trend(&[4.2]), 0.0);
    }

    #[test]
    fn test_trend_sign() {
        // Most recent first: 4, 3, 2 is rising toward the present
        assert!((detect_trend(&[4.0, 3.0, 2.0]) - 1.0).abs() < 1e-9);
        assert!((detect_trend(&[2.0, 3.0, 4.0, 5.0]) + 1.0).abs() < 1e-9);
        assert!((detect_trend(&[3.0, 2.0, 3.0]) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(TrendDirection::from_trend(0.5, 0.1), TrendDirection::Increasing);
        assert_eq!(TrendDirection::from_trend(-0.5, 0.1), TrendDirection::Decreasing);
        assert_eq!(TrendDirection::from_trend(0.05, 0.1), TrendDirection::Stable);
    }

    #[test]
    fn test_weeks_since_deload_finds_light_week() {
        // Mean over active windows = (20 + 20 + 8 + 20) / 4 = 17, cutoff 10.2
        let summaries = vec![
            summary(0, 3, 20),
            summary(1, 3, 20),
            summary(2, 2, 8),
            summary(3, 3, 20),
        ];
        assert_eq!(weeks_since_last_deload(&summaries), 2);
    }

    #[test]
    fn test_weeks_since_deload_ignores_empty_windows() {
        let summaries = vec![
            summary(0, 3, 20),
            summary(1, 0, 0),
            summary(2, 3, 20),
            summary(3, 3, 22),
        ];
        assert_eq!(weeks_since_last_deload(&summaries), 4);
    }

    #[test]
    fn test_weeks_since_deload_without_history() {
        let summaries = vec![summary(0, 0, 0), summary(1, 0, 0)];
        assert_eq!(weeks_since_last_deload(&summaries), 2);
    }
}
