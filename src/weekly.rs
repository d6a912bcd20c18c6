//! Weekly aggregation of workout and feedback history
//!
//! Buckets records into trailing 7-day windows ending on a reference day and
//! reduces each window to scalar summaries. Window 0 is the most recent.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{
    performance_to_five_point, three_level_to_five_point, WorkoutFeedback, WorkoutRecord,
};

/// Number of trailing windows analysed when not configured otherwise
pub const DEFAULT_WINDOW_COUNT: usize = 6;

/// Scalar summary of one trailing 7-day window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    /// 0 = window ending on the reference day
    pub week_index: usize,

    /// First day of the window (inclusive)
    pub week_start: NaiveDate,

    /// Last day of the window (inclusive)
    pub week_end: NaiveDate,

    pub workout_count: u32,

    /// Feedback entries dated inside the window
    pub feedback_count: u32,

    /// Completed sets only
    pub total_sets: u32,

    /// Sum of weight x reps over completed sets
    pub total_volume: f64,

    /// Feedback means on the 1-5 scale; 0 when the window has no feedback
    pub avg_fatigue: f64,
    pub avg_performance: f64,
    pub avg_soreness: f64,
    pub avg_pump: f64,
}

impl WeeklySummary {
    /// Whether any workout was logged in this window
    pub fn is_active(&self) -> bool {
        self.workout_count > 0
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.week_start && date <= self.week_end
    }
}

/// Stateless aggregator over workout and feedback history
pub struct WeeklyAggregator;

impl WeeklyAggregator {
    /// Summarise `window_count` trailing windows ending on `today`
    pub fn summarize(
        workouts: &[WorkoutRecord],
        feedback: &[WorkoutFeedback],
        today: NaiveDate,
        window_count: usize,
    ) -> Vec<WeeklySummary> {
        (0..window_count)
            .map(|index| {
                let week_end = today - Duration::days(7 * index as i64);
                let week_start = week_end - Duration::days(6);
                Self::summarize_window(workouts, feedback, index, week_start, week_end)
            })
            .collect()
    }

    fn summarize_window(
        workouts: &[WorkoutRecord],
        feedback: &[WorkoutFeedback],
        week_index: usize,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> WeeklySummary {
        let in_window = |date: NaiveDate| date >= week_start && date <= week_end;

        let window_workouts: Vec<&WorkoutRecord> =
            workouts.iter().filter(|w| in_window(w.date)).collect();
        let window_feedback: Vec<&WorkoutFeedback> =
            feedback.iter().filter(|f| in_window(f.date)).collect();

        let total_sets = window_workouts.iter().map(|w| w.completed_set_count()).sum();
        let total_volume = window_workouts.iter().map(|w| w.total_volume()).sum();

        let fatigue: Vec<f64> = window_feedback
            .iter()
            .map(|f| three_level_to_five_point(f.fatigue_input()))
            .collect();
        let performance: Vec<f64> = window_feedback
            .iter()
            .map(|f| performance_to_five_point(f.performance_rating))
            .collect();
        let soreness: Vec<f64> = window_feedback
            .iter()
            .map(|f| three_level_to_five_point(f.soreness_rating))
            .collect();
        let pump: Vec<f64> = window_feedback
            .iter()
            .map(|f| three_level_to_five_point(f.pump_rating))
            .collect();

        WeeklySummary {
            week_index,
            week_start,
            week_end,
            workout_count: window_workouts.len() as u32,
            feedback_count: window_feedback.len() as u32,
            total_sets,
            total_volume,
            avg_fatigue: mean_or_zero(&fatigue),
            avg_performance: mean_or_zero(&performance),
            avg_soreness: mean_or_zero(&soreness),
            avg_pump: mean_or_zero(&pump),
        }
    }
}

/// Arithmetic mean, 0 for an empty slice
pub(crate) fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}
