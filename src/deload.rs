//! Deload need detection
//!
//! Six independent heuristics are evaluated over the trailing weekly
//! summaries. Each contributes points according to its severity tier, and
//! the point budgets sum to exactly 100 so the total doubles as a 0-100
//! confidence value.
//!
//! | Signal | Max points |
//! |---|---|
//! | Rising fatigue | 25 |
//! | Declining performance | 25 |
//! | Elevated soreness | 20 |
//! | No rest days | 10 |
//! | Stalled progress | 15 |
//! | Extended training block | 5 |
//!
//! A deload is recommended at confidence 40 or above.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::{Exercise, ExerciseSet, WorkoutFeedback, WorkoutRecord};
use crate::trend::{detect_trend, weeks_since_last_deload};
use crate::weekly::{mean_or_zero, WeeklyAggregator, WeeklySummary, DEFAULT_WINDOW_COUNT};

/// Workouts required before any signal is evaluated
pub const MIN_WORKOUTS_FOR_ANALYSIS: usize = 4;

/// Confidence at or above which a deload is recommended
pub const DELOAD_CONFIDENCE_THRESHOLD: u8 = 40;

/// Suggested deload length
pub const SUGGESTED_DELOAD_DAYS: u32 = 7;

/// Longest run of consecutive training days that is scanned
const MAX_STREAK_LOOKBACK_DAYS: i64 = 30;

/// Weeks of history used for stalled-lift detection
const STALL_LOOKBACK_WEEKS: i64 = 3;

/// Weight increment deloaded loads are rounded to
const WEIGHT_ROUNDING_INCREMENT: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for SignalSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSeverity::Low => write!(f, "low"),
            SignalSeverity::Medium => write!(f, "medium"),
            SignalSeverity::High => write!(f, "high"),
        }
    }
}

/// The six deload heuristics, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    RisingFatigue,
    DecliningPerformance,
    ElevatedSoreness,
    NoRestDays,
    StalledProgress,
    ExtendedTrainingBlock,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::RisingFatigue,
        SignalKind::DecliningPerformance,
        SignalKind::ElevatedSoreness,
        SignalKind::NoRestDays,
        SignalKind::StalledProgress,
        SignalKind::ExtendedTrainingBlock,
    ];

    /// Points awarded per severity tier as (high, medium, low)
    fn tier_points(&self) -> (u32, u32, u32) {
        match self {
            SignalKind::RisingFatigue => (25, 17, 10),
            SignalKind::DecliningPerformance => (25, 17, 10),
            SignalKind::ElevatedSoreness => (20, 14, 8),
            SignalKind::NoRestDays => (10, 7, 4),
            SignalKind::StalledProgress => (15, 10, 6),
            SignalKind::ExtendedTrainingBlock => (5, 3, 2),
        }
    }

    pub fn points(&self, severity: SignalSeverity) -> u32 {
        let (high, medium, low) = self.tier_points();
        match severity {
            SignalSeverity::High => high,
            SignalSeverity::Medium => medium,
            SignalSeverity::Low => low,
        }
    }

    pub fn max_points(&self) -> u32 {
        self.points(SignalSeverity::High)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::RisingFatigue => "Rising Fatigue",
            SignalKind::DecliningPerformance => "Declining Performance",
            SignalKind::ElevatedSoreness => "Elevated Soreness",
            SignalKind::NoRestDays => "No Rest Days",
            SignalKind::StalledProgress => "Stalled Progress",
            SignalKind::ExtendedTrainingBlock => "Extended Training Block",
        }
    }
}

/// One triggered heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeloadSignal {
    pub signal: SignalKind,
    pub description: String,
    pub severity: SignalSeverity,
    /// Observed value that tripped the signal
    pub value: f64,
    /// Threshold it was compared against
    pub threshold: f64,
    pub points: u32,
}

impl DeloadSignal {
    fn new(
        signal: SignalKind,
        severity: SignalSeverity,
        value: f64,
        threshold: f64,
        description: String,
    ) -> Self {
        Self {
            signal,
            description,
            severity,
            value,
            threshold,
            points: signal.points(severity),
        }
    }
}

/// Confidence brackets used to pick the summary wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBracket {
    None,
    Mild,
    Moderate,
    Strong,
}

impl ConfidenceBracket {
    pub fn from_confidence(confidence: u8) -> Self {
        if confidence >= 70 {
            ConfidenceBracket::Strong
        } else if confidence >= 55 {
            ConfidenceBracket::Moderate
        } else if confidence >= DELOAD_CONFIDENCE_THRESHOLD {
            ConfidenceBracket::Mild
        } else {
            ConfidenceBracket::None
        }
    }

    /// Volume and intensity reduction fractions for this bracket
    pub fn reductions(&self) -> (f64, f64) {
        match self {
            ConfidenceBracket::Strong => (0.6, 0.4),
            ConfidenceBracket::Moderate => (0.5, 0.35),
            ConfidenceBracket::Mild => (0.4, 0.3),
            ConfidenceBracket::None => (0.0, 0.0),
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ConfidenceBracket::Strong => {
                "Strong signs of accumulated fatigue. A deload week is strongly recommended."
            }
            ConfidenceBracket::Moderate => {
                "Several fatigue markers are elevated. A deload week is recommended."
            }
            ConfidenceBracket::Mild => {
                "Some fatigue is building up. Consider a lighter week soon."
            }
            ConfidenceBracket::None => "Recovery markers look good. No deload needed right now.",
        }
    }
}

/// Result of a deload analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeloadRecommendation {
    pub needs_deload: bool,
    /// 0-100
    pub confidence: u8,
    pub signals: Vec<DeloadSignal>,
    pub summary: String,
    pub suggested_duration_days: u32,
    /// Fraction of volume to remove (0.0-1.0)
    pub volume_reduction: f64,
    /// Fraction of load to remove (0.0-1.0)
    pub intensity_reduction: f64,
    pub weeks_since_last_deload: usize,
}

impl DeloadRecommendation {
    fn insufficient_history() -> Self {
        Self {
            needs_deload: false,
            confidence: 0,
            signals: Vec::new(),
            summary: "Not enough training history yet. Log at least 4 workouts for a deload assessment."
                .to_string(),
            suggested_duration_days: SUGGESTED_DELOAD_DAYS,
            volume_reduction: 0.0,
            intensity_reduction: 0.0,
            weeks_since_last_deload: 0,
        }
    }

    fn from_signals(signals: Vec<DeloadSignal>, weeks_since_last_deload: usize) -> Self {
        let total_points: u32 = signals.iter().map(|s| s.points).sum();
        // Budgets sum to 100, so points are already a percentage
        let confidence = (100.0 * total_points as f64 / 100.0).round().clamp(0.0, 100.0) as u8;
        let bracket = ConfidenceBracket::from_confidence(confidence);
        let (volume_reduction, intensity_reduction) = bracket.reductions();

        Self {
            needs_deload: confidence >= DELOAD_CONFIDENCE_THRESHOLD,
            confidence,
            signals,
            summary: bracket.summary().to_string(),
            suggested_duration_days: SUGGESTED_DELOAD_DAYS,
            volume_reduction,
            intensity_reduction,
            weeks_since_last_deload,
        }
    }

    pub fn bracket(&self) -> ConfidenceBracket {
        ConfidenceBracket::from_confidence(self.confidence)
    }
}

/// Concrete workout adjustments derived from a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeloadConfig {
    pub volume_multiplier: f64,
    pub intensity_multiplier: f64,
    pub remove_finishers: bool,
    pub max_sets_per_exercise: usize,
}

/// Deload analysis engine
pub struct DeloadAnalyzer {
    window_count: usize,
}

impl Default for DeloadAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeloadAnalyzer {
    /// Create analyzer over the default six trailing weeks
    pub fn new() -> Self {
        DeloadAnalyzer {
            window_count: DEFAULT_WINDOW_COUNT,
        }
    }

    /// Create analyzer over a custom number of trailing weeks
    pub fn with_window_count(window_count: usize) -> Self {
        DeloadAnalyzer {
            window_count: window_count.max(1),
        }
    }

    pub fn window_count(&self) -> usize {
        self.window_count
    }

    /// Assess whether accumulated fatigue warrants a deload as of `today`.
    ///
    /// Pure: identical history and `today` give identical output.
    pub fn analyze(
        &self,
        workouts: &[WorkoutRecord],
        feedback: &[WorkoutFeedback],
        today: NaiveDate,
    ) -> DeloadRecommendation {
        if workouts.len() < MIN_WORKOUTS_FOR_ANALYSIS {
            tracing::debug!(
                workouts = workouts.len(),
                "Skipping deload analysis: insufficient history"
            );
            return DeloadRecommendation::insufficient_history();
        }

        let summaries = WeeklyAggregator::summarize(workouts, feedback, today, self.window_count);
        // Weeks without workouts drop out; weeks without feedback count as 0
        let active: Vec<&WeeklySummary> = summaries.iter().filter(|s| s.is_active()).collect();
        let weeks_since_deload = weeks_since_last_deload(&summaries);

        let signals: Vec<DeloadSignal> = [
            rising_fatigue(&active),
            declining_performance(&active),
            elevated_soreness(&active),
            no_rest_days(workouts, today),
            stalled_progress(workouts, today),
            extended_training_block(weeks_since_deload),
        ]
        .into_iter()
        .flatten()
        .collect();

        for signal in &signals {
            tracing::debug!(
                signal = ?signal.signal,
                severity = %signal.severity,
                value = signal.value,
                threshold = signal.threshold,
                points = signal.points,
                "Deload signal triggered"
            );
        }

        let recommendation = DeloadRecommendation::from_signals(signals, weeks_since_deload);
        tracing::debug!(
            confidence = recommendation.confidence,
            needs_deload = recommendation.needs_deload,
            "Deload analysis complete"
        );
        recommendation
    }
}

/// Analyze with the default window count
pub fn analyze_deload_need(
    workouts: &[WorkoutRecord],
    feedback: &[WorkoutFeedback],
    today: NaiveDate,
) -> DeloadRecommendation {
    DeloadAnalyzer::new().analyze(workouts, feedback, today)
}

fn rising_fatigue(active: &[&WeeklySummary]) -> Option<DeloadSignal> {
    let recent: Vec<f64> = active.iter().take(4).map(|s| s.avg_fatigue).collect();
    let current = *recent.first()?;
    let trend = detect_trend(&recent);

    if !(trend > 0.3 || current >= 4.0) {
        return None;
    }

    let severity = if current >= 4.5 || trend > 0.7 {
        SignalSeverity::High
    } else if current >= 3.5 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };

    let (value, threshold) = if current >= 4.0 { (current, 4.0) } else { (trend, 0.3) };

    Some(DeloadSignal::new(
        SignalKind::RisingFatigue,
        severity,
        value,
        threshold,
        format!(
            "Reported fatigue is {:.1}/5 and trending {:+.2} per week",
            current, trend
        ),
    ))
}

fn declining_performance(active: &[&WeeklySummary]) -> Option<DeloadSignal> {
    let recent: Vec<f64> = active.iter().take(4).map(|s| s.avg_performance).collect();
    let current = *recent.first()?;
    let trend = detect_trend(&recent);

    // Higher is better for performance, so a negative trend is a decline
    if !(trend < -0.2 || current <= 2.5) {
        return None;
    }

    let severity = if current <= 2.0 || trend < -0.6 {
        SignalSeverity::High
    } else if current <= 2.5 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };

    let (value, threshold) = if current <= 2.5 { (current, 2.5) } else { (trend, -0.2) };

    Some(DeloadSignal::new(
        SignalKind::DecliningPerformance,
        severity,
        value,
        threshold,
        format!(
            "Performance is {:.1}/5 and trending {:+.2} per week",
            current, trend
        ),
    ))
}

fn elevated_soreness(active: &[&WeeklySummary]) -> Option<DeloadSignal> {
    let recent: Vec<f64> = active.iter().take(3).map(|s| s.avg_soreness).collect();
    let current = *recent.first()?;
    let average = mean_or_zero(&recent);

    if !(average >= 3.5 || current >= 4.0) {
        return None;
    }

    let severity = if current >= 4.5 {
        SignalSeverity::High
    } else if average >= 4.0 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };

    let (value, threshold) = if current >= 4.0 { (current, 4.0) } else { (average, 3.5) };

    Some(DeloadSignal::new(
        SignalKind::ElevatedSoreness,
        severity,
        value,
        threshold,
        format!(
            "Soreness averages {:.1}/5 over recent weeks ({:.1} this week)",
            average, current
        ),
    ))
}

fn no_rest_days(workouts: &[WorkoutRecord], today: NaiveDate) -> Option<DeloadSignal> {
    let streak = consecutive_training_days(workouts, today);
    if streak < 8 {
        return None;
    }

    let severity = if streak >= 14 {
        SignalSeverity::High
    } else if streak >= 10 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };

    Some(DeloadSignal::new(
        SignalKind::NoRestDays,
        severity,
        streak as f64,
        8.0,
        format!("{} consecutive days of training without a rest day", streak),
    ))
}

fn stalled_progress(workouts: &[WorkoutRecord], today: NaiveDate) -> Option<DeloadSignal> {
    let (stalled, tracked) = stalled_lifts(workouts, today);
    if tracked == 0 {
        return None;
    }

    let ratio = stalled as f64 / tracked as f64;
    if ratio < 0.4 {
        return None;
    }

    let severity = if ratio >= 0.75 {
        SignalSeverity::High
    } else if ratio >= 0.5 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };

    Some(DeloadSignal::new(
        SignalKind::StalledProgress,
        severity,
        ratio,
        0.4,
        format!(
            "{} of {} tracked lifts have not progressed in 3 weeks",
            stalled, tracked
        ),
    ))
}

fn extended_training_block(weeks: usize) -> Option<DeloadSignal> {
    if weeks < 4 {
        return None;
    }

    let severity = if weeks >= 6 {
        SignalSeverity::High
    } else if weeks >= 5 {
        SignalSeverity::Medium
    } else {
        SignalSeverity::Low
    };

    Some(DeloadSignal::new(
        SignalKind::ExtendedTrainingBlock,
        severity,
        weeks as f64,
        4.0,
        format!("{} weeks of training since the last lighter week", weeks),
    ))
}

/// Length of the run of consecutive trained days ending today.
///
/// When nothing is logged today yet the run is counted from yesterday. The
/// scan stops at the first untrained day or after 30 days.
pub fn consecutive_training_days(workouts: &[WorkoutRecord], today: NaiveDate) -> u32 {
    let trained: BTreeSet<NaiveDate> = workouts.iter().map(|w| w.date).collect();

    let mut day = if trained.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while streak < MAX_STREAK_LOOKBACK_DAYS && trained.contains(&day) {
        streak += 1;
        day = day - Duration::days(1);
    }
    streak as u32
}

/// Count lifts whose latest session max did not beat the earlier best.
///
/// Considers loaded sets from the trailing three weeks. Returns
/// `(stalled, tracked)`; an exercise is tracked once it has two sessions.
pub fn stalled_lifts(workouts: &[WorkoutRecord], today: NaiveDate) -> (usize, usize) {
    let cutoff = today - Duration::weeks(STALL_LOOKBACK_WEEKS);

    let mut recent: Vec<&WorkoutRecord> = workouts
        .iter()
        .filter(|w| w.date >= cutoff && w.date <= today)
        .collect();
    recent.sort_by_key(|w| w.date);

    let mut series: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for workout in recent {
        let mut session_max: BTreeMap<&str, f64> = BTreeMap::new();
        for set in workout.completed_sets() {
            if set.weight <= 0.0 {
                continue;
            }
            let best = session_max.entry(set.exercise).or_insert(0.0);
            *best = best.max(set.weight);
        }
        for (exercise, max_weight) in session_max {
            series.entry(exercise).or_default().push(max_weight);
        }
    }

    let mut stalled = 0;
    let mut tracked = 0;
    for weights in series.values() {
        if weights.len() < 2 {
            continue;
        }
        tracked += 1;

        let (latest, earlier) = match weights.split_last() {
            Some(split) => split,
            None => continue,
        };
        let earlier_max = earlier.iter().copied().fold(0.0, f64::max);
        if *latest <= earlier_max {
            stalled += 1;
        }
    }

    (stalled, tracked)
}

/// Translate a recommendation into workout adjustments
pub fn get_deload_config(recommendation: &DeloadRecommendation) -> DeloadConfig {
    DeloadConfig {
        volume_multiplier: 1.0 - recommendation.volume_reduction,
        intensity_multiplier: 1.0 - recommendation.intensity_reduction,
        remove_finishers: recommendation.confidence >= 55,
        max_sets_per_exercise: if recommendation.confidence >= 70 { 2 } else { 3 },
    }
}

/// Produce deloaded copies of planned exercises.
///
/// Each set list is cut to `ceil(count x volume_multiplier)`, capped at
/// `max_sets_per_exercise` and never below one set. Loads are scaled by the
/// intensity multiplier and rounded to the nearest 2.5. Every set comes back
/// incomplete. Finishers are dropped when the config says so.
pub fn apply_deload_to_exercises(exercises: &[Exercise], config: &DeloadConfig) -> Vec<Exercise> {
    exercises
        .iter()
        .filter(|exercise| !(config.remove_finishers && exercise.is_finisher))
        .map(|exercise| {
            let original = exercise.sets.len();
            let keep = if original == 0 {
                0
            } else {
                // Small epsilon keeps float noise from rounding 3.0000001 up to 4
                let scaled = (original as f64 * config.volume_multiplier - 1e-9).ceil() as usize;
                scaled.min(config.max_sets_per_exercise).max(1)
            };

            let sets = exercise
                .sets
                .iter()
                .take(keep)
                .map(|set| ExerciseSet {
                    target_reps: set.target_reps,
                    actual_reps: None,
                    weight: round_to_increment(set.weight * config.intensity_multiplier),
                    completed: false,
                })
                .collect();

            Exercise {
                name: exercise.name.clone(),
                muscle_group: exercise.muscle_group,
                sets,
                is_finisher: exercise.is_finisher,
            }
        })
        .collect()
}

fn round_to_increment(weight: f64) -> f64 {
    (weight / WEIGHT_ROUNDING_INCREMENT).round() * WEIGHT_ROUNDING_INCREMENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoggedSet, MuscleGroup};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn lift(exercise: &str, weight: f64, sets: usize) -> Vec<LoggedSet> {
        (0..sets)
            .map(|_| LoggedSet {
                exercise_name: exercise.to_string(),
                muscle_group: MuscleGroup::Chest,
                weight,
                reps: 8,
                completed: true,
            })
            .collect()
    }

    fn workout_on(days_ago: i64, sets: Vec<LoggedSet>) -> WorkoutRecord {
        WorkoutRecord::new(format!("w{}", days_ago), today() - Duration::days(days_ago), sets)
    }

    fn recommendation_with_confidence(confidence: u8) -> DeloadRecommendation {
        let bracket = ConfidenceBracket::from_confidence(confidence);
        let (volume_reduction, intensity_reduction) = bracket.reductions();
        DeloadRecommendation {
            needs_deload: confidence >= DELOAD_CONFIDENCE_THRESHOLD,
            confidence,
            signals: Vec::new(),
            summary: bracket.summary().to_string(),
            suggested_duration_days: SUGGESTED_DELOAD_DAYS,
            volume_reduction,
            intensity_reduction,
            weeks_since_last_deload: 0,
        }
    }

    #[test]
    fn test_point_budgets_sum_to_100() {
        let total: u32 = SignalKind::ALL.iter().map(|s| s.max_points()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_insufficient_history_is_neutral() {
        let workouts: Vec<WorkoutRecord> = (0..3).map(|d| workout_on(d, lift("Bench", 100.0, 3))).collect();
        let rec = analyze_deload_need(&workouts, &[], today());

        assert!(!rec.needs_deload);
        assert_eq!(rec.confidence, 0);
        assert!(rec.signals.is_empty());
        assert!(rec.summary.contains("Not enough"));
    }

    #[test]
    fn test_consecutive_days_stop_at_gap() {
        let mut workouts: Vec<WorkoutRecord> = (0..9).map(|d| workout_on(d, lift("Bench", 100.0, 1))).collect();
        workouts.push(workout_on(10, lift("Bench", 100.0, 1)));
        assert_eq!(consecutive_training_days(&workouts, today()), 9);

        // Untrained today counts back from yesterday
        let workouts: Vec<WorkoutRecord> = (1..5).map(|d| workout_on(d, lift("Bench", 100.0, 1))).collect();
        assert_eq!(consecutive_training_days(&workouts, today()), 4);
    }

    #[test]
    fn test_consecutive_days_capped_at_lookback() {
        let workouts: Vec<WorkoutRecord> = (0..45).map(|d| workout_on(d, lift("Bench", 100.0, 1))).collect();
        assert_eq!(consecutive_training_days(&workouts, today()), 30);
    }

    #[test]
    fn test_stalled_lift_with_gap() {
        let workouts = vec![
            workout_on(21, lift("Bench", 100.0, 3)),
            workout_on(0, lift("Bench", 95.0, 3)),
        ];
        assert_eq!(stalled_lifts(&workouts, today()), (1, 1));
    }

    #[test]
    fn test_progressing_lift_is_not_stalled() {
        let mut sets = lift("Squat", 200.0, 2);
        sets.extend(lift("Row", 80.0, 2));
        let mut later = lift("Squat", 205.0, 2);
        later.extend(lift("Row", 80.0, 2));

        let workouts = vec![
            workout_on(10, sets),
            workout_on(3, later),
            workout_on(2, lift("Curl", 30.0, 3)),
        ];
        // Squat progressed, Row stalled, Curl has one session
        assert_eq!(stalled_lifts(&workouts, today()), (1, 2));
    }

    #[test]
    fn test_streak_signal_tiers() {
        let workouts: Vec<WorkoutRecord> = (0..14).map(|d| workout_on(d, lift("Bench", 100.0 + d as f64, 1))).collect();
        let signal = no_rest_days(&workouts, today()).unwrap();
        assert_eq!(signal.severity, SignalSeverity::High);
        assert_eq!(signal.points, 10);

        let workouts: Vec<WorkoutRecord> = (0..8).map(|d| workout_on(d, lift("Bench", 100.0, 1))).collect();
        let signal = no_rest_days(&workouts, today()).unwrap();
        assert_eq!(signal.severity, SignalSeverity::Low);
        assert_eq!(signal.points, 4);

        let workouts: Vec<WorkoutRecord> = (0..7).map(|d| workout_on(d, lift("Bench", 100.0, 1))).collect();
        assert!(no_rest_days(&workouts, today()).is_none());
    }

    #[test]
    fn test_extended_block_tiers() {
        assert!(extended_training_block(3).is_none());
        assert_eq!(extended_training_block(4).unwrap().points, 2);
        assert_eq!(extended_training_block(5).unwrap().points, 3);
        assert_eq!(extended_training_block(6).unwrap().points, 5);
    }

    #[test]
    fn test_fatigued_lifter_needs_deload() {
        let mut workouts = Vec::new();
        let mut feedback = Vec::new();
        // Train every day for two weeks with flat loads and poor feedback
        for d in 0..14 {
            let workout = workout_on(d, lift("Bench", 100.0, 4));
            feedback.push(
                WorkoutFeedback::new(workout.id.clone(), workout.date, 0, 2, 3, Some(2)).unwrap(),
            );
            workouts.push(workout);
        }

        let rec = analyze_deload_need(&workouts, &feedback, today());

        let kinds: Vec<SignalKind> = rec.signals.iter().map(|s| s.signal).collect();
        assert!(kinds.contains(&SignalKind::RisingFatigue));
        assert!(kinds.contains(&SignalKind::DecliningPerformance));
        assert!(kinds.contains(&SignalKind::ElevatedSoreness));
        assert!(kinds.contains(&SignalKind::NoRestDays));
        assert!(kinds.contains(&SignalKind::StalledProgress));
        // No light week anywhere in the six-week window
        assert!(kinds.contains(&SignalKind::ExtendedTrainingBlock));
        assert_eq!(rec.weeks_since_last_deload, 6);
        assert_eq!(rec.confidence, 100);
        assert!(rec.needs_deload);
        assert_eq!(rec.bracket(), ConfidenceBracket::Strong);
        assert_eq!(rec.suggested_duration_days, 7);
    }

    #[test]
    fn test_fresh_lifter_does_not_need_deload() {
        let mut workouts = Vec::new();
        let mut feedback = Vec::new();
        // Loads climb toward today; the third week back was a light one
        let plan = [(0i64, 3), (2, 3), (4, 3), (7, 3), (9, 3), (11, 3), (14, 1), (16, 1)];
        for (d, sets) in plan {
            let workout = workout_on(d, lift("Bench", 150.0 - d as f64, sets));
            feedback.push(WorkoutFeedback::new(workout.id.clone(), workout.date, 2, 0, 0, None).unwrap());
            workouts.push(workout);
        }

        let rec = analyze_deload_need(&workouts, &feedback, today());
        assert!(rec.signals.is_empty(), "{:?}", rec.signals);
        assert_eq!(rec.weeks_since_last_deload, 2);
        assert_eq!(rec.confidence, 0);
        assert!(!rec.needs_deload);
        assert_eq!(rec.volume_reduction, 0.0);
    }

    #[test]
    fn test_unrated_training_week_scores_as_zero() {
        let workouts: Vec<WorkoutRecord> = (0..4).map(|d| workout_on(d, lift("Bench", 100.0, 3))).collect();
        let rec = analyze_deload_need(&workouts, &[], today());

        let performance = rec
            .signals
            .iter()
            .find(|s| s.signal == SignalKind::DecliningPerformance)
            .expect("performance signal");
        assert_eq!(performance.value, 0.0);
        assert_eq!(performance.severity, SignalSeverity::High);
        assert_eq!(performance.points, 25);

        // Zero fatigue and soreness stay below their thresholds
        let kinds: Vec<SignalKind> = rec.signals.iter().map(|s| s.signal).collect();
        assert!(!kinds.contains(&SignalKind::RisingFatigue));
        assert!(!kinds.contains(&SignalKind::ElevatedSoreness));

        // 25 performance + 15 stalled + 5 extended block
        assert_eq!(rec.confidence, 45);
        assert!(rec.needs_deload);
    }

    #[test]
    fn test_reduction_tiers() {
        let cases = [(75u8, 0.4, 0.6), (60, 0.5, 0.65), (45, 0.6, 0.7), (30, 1.0, 1.0)];
        for (confidence, volume, intensity) in cases {
            let config = get_deload_config(&recommendation_with_confidence(confidence));
            assert!((config.volume_multiplier - volume).abs() < 1e-9, "{}", confidence);
            assert!((config.intensity_multiplier - intensity).abs() < 1e-9, "{}", confidence);
        }
    }

    #[test]
    fn test_config_flags() {
        let strong = get_deload_config(&recommendation_with_confidence(72));
        assert!(strong.remove_finishers);
        assert_eq!(strong.max_sets_per_exercise, 2);

        let moderate = get_deload_config(&recommendation_with_confidence(55));
        assert!(moderate.remove_finishers);
        assert_eq!(moderate.max_sets_per_exercise, 3);

        let mild = get_deload_config(&recommendation_with_confidence(41));
        assert!(!mild.remove_finishers);
    }

    #[test]
    fn test_apply_deload_to_exercises() {
        let exercises = vec![
            Exercise {
                name: "Bench".to_string(),
                muscle_group: MuscleGroup::Chest,
                is_finisher: false,
                sets: (0..5)
                    .map(|_| ExerciseSet { target_reps: 8, actual_reps: Some(8), weight: 101.0, completed: true })
                    .collect(),
            },
            Exercise {
                name: "Fly".to_string(),
                muscle_group: MuscleGroup::Chest,
                is_finisher: true,
                sets: vec![ExerciseSet { target_reps: 15, actual_reps: None, weight: 20.0, completed: false }],
            },
        ];

        let config = DeloadConfig {
            volume_multiplier: 0.6,
            intensity_multiplier: 0.7,
            remove_finishers: false,
            max_sets_per_exercise: 3,
        };
        let deloaded = apply_deload_to_exercises(&exercises, &config);

        assert_eq!(deloaded.len(), 2);
        assert_eq!(deloaded[0].sets.len(), 3); // ceil(5 * 0.6)
        assert_eq!(deloaded[0].sets[0].weight, 70.0); // 70.7 -> 70.0
        assert!(deloaded[0].sets.iter().all(|s| !s.completed && s.actual_reps.is_none()));
        assert_eq!(deloaded[1].sets.len(), 1); // minimum one set

        let config = DeloadConfig { remove_finishers: true, max_sets_per_exercise: 2, ..config };
        let deloaded = apply_deload_to_exercises(&exercises, &config);
        assert_eq!(deloaded.len(), 1);
        assert_eq!(deloaded[0].sets.len(), 2);
    }
}
