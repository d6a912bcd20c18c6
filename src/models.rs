use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{LiftRsError, Result};

/// Number of feedback entries retained; older entries are dropped first.
pub const MAX_FEEDBACK_ENTRIES: usize = 100;

/// Muscle groups tracked by the volume ledger and fatigue model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Abs,
    Traps,
    Forearms,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 12] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Quads,
        MuscleGroup::Hamstrings,
        MuscleGroup::Glutes,
        MuscleGroup::Calves,
        MuscleGroup::Abs,
        MuscleGroup::Traps,
        MuscleGroup::Forearms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Quads => "quads",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Calves => "calves",
            MuscleGroup::Abs => "abs",
            MuscleGroup::Traps => "traps",
            MuscleGroup::Forearms => "forearms",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MuscleGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chest" => Ok(MuscleGroup::Chest),
            "back" => Ok(MuscleGroup::Back),
            "shoulders" | "delts" => Ok(MuscleGroup::Shoulders),
            "biceps" => Ok(MuscleGroup::Biceps),
            "triceps" => Ok(MuscleGroup::Triceps),
            "quads" | "quadriceps" => Ok(MuscleGroup::Quads),
            "hamstrings" => Ok(MuscleGroup::Hamstrings),
            "glutes" => Ok(MuscleGroup::Glutes),
            "calves" => Ok(MuscleGroup::Calves),
            "abs" | "core" => Ok(MuscleGroup::Abs),
            "traps" => Ok(MuscleGroup::Traps),
            "forearms" => Ok(MuscleGroup::Forearms),
            _ => Err(format!("Unknown muscle group: {}", s)),
        }
    }
}

/// A single logged set in the flat workout shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub exercise_name: String,
    pub muscle_group: MuscleGroup,
    /// Load in the user's unit (lbs or kg)
    pub weight: f64,
    pub reps: u32,
    pub completed: bool,
}

/// A set inside an exercise, carrying planned and achieved reps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub target_reps: u32,
    #[serde(default)]
    pub actual_reps: Option<u32>,
    pub weight: f64,
    #[serde(default)]
    pub completed: bool,
}

impl ExerciseSet {
    /// Reps actually performed, falling back to the target when not recorded
    pub fn performed_reps(&self) -> u32 {
        self.actual_reps.unwrap_or(self.target_reps)
    }
}

/// An exercise with its set list (legacy workout shape and deload input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub sets: Vec<ExerciseSet>,
    /// Accessory work appended after the main lifts
    #[serde(default)]
    pub is_finisher: bool,
}

/// Borrowed, shape-independent view of one completed set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedSet<'a> {
    pub exercise: &'a str,
    pub muscle_group: MuscleGroup,
    pub weight: f64,
    pub reps: u32,
}

impl CompletedSet<'_> {
    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }
}

/// Core workout record
///
/// Records arrive either with a flat `sets` list or in the older
/// `exercises[].sets[]` layout; both may be present on migrated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub sets: Vec<LoggedSet>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl WorkoutRecord {
    pub fn new(id: impl Into<String>, date: NaiveDate, sets: Vec<LoggedSet>) -> Self {
        Self {
            id: id.into(),
            date,
            sets,
            exercises: Vec::new(),
        }
    }

    pub fn from_exercises(id: impl Into<String>, date: NaiveDate, exercises: Vec<Exercise>) -> Self {
        Self {
            id: id.into(),
            date,
            sets: Vec::new(),
            exercises,
        }
    }

    /// All completed sets, flattened across both record shapes
    pub fn completed_sets(&self) -> Vec<CompletedSet<'_>> {
        let flat = self.sets.iter().filter(|s| s.completed).map(|s| CompletedSet {
            exercise: s.exercise_name.as_str(),
            muscle_group: s.muscle_group,
            weight: s.weight,
            reps: s.reps,
        });

        let legacy = self.exercises.iter().flat_map(|exercise| {
            exercise
                .sets
                .iter()
                .filter(|s| s.completed)
                .map(move |s| CompletedSet {
                    exercise: exercise.name.as_str(),
                    muscle_group: exercise.muscle_group,
                    weight: s.weight,
                    reps: s.performed_reps(),
                })
        });

        flat.chain(legacy).collect()
    }

    pub fn completed_set_count(&self) -> u32 {
        self.completed_sets().len() as u32
    }

    /// Sum of weight x reps over completed sets
    pub fn total_volume(&self) -> f64 {
        self.completed_sets().iter().map(|s| s.volume()).sum()
    }

    /// Completed set counts keyed by muscle group
    pub fn sets_per_muscle(&self) -> BTreeMap<MuscleGroup, u32> {
        let mut counts = BTreeMap::new();
        for set in self.completed_sets() {
            *counts.entry(set.muscle_group).or_insert(0) += 1;
        }
        counts
    }
}

/// Post-workout subjective feedback
///
/// Ratings use compact scales: pump and soreness 0-2, performance 0-3 where
/// 0 means the target was exceeded and 3 means it was missed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutFeedback {
    pub id: String,
    pub workout_id: String,
    pub date: NaiveDate,
    pub pump_rating: u8,
    pub soreness_rating: u8,
    pub performance_rating: u8,
    /// Optional general fatigue input (0-2); soreness stands in when absent
    #[serde(default)]
    pub fatigue_rating: Option<u8>,
    pub total_score: i32,
}

impl WorkoutFeedback {
    /// Create validated feedback; `total_score` is derived at submission
    pub fn new(
        workout_id: impl Into<String>,
        date: NaiveDate,
        pump_rating: u8,
        soreness_rating: u8,
        performance_rating: u8,
        fatigue_rating: Option<u8>,
    ) -> Result<Self> {
        if pump_rating > 2 {
            return Err(LiftRsError::Validation(format!(
                "pump rating {} out of range 0-2",
                pump_rating
            )));
        }
        if soreness_rating > 2 {
            return Err(LiftRsError::Validation(format!(
                "soreness rating {} out of range 0-2",
                soreness_rating
            )));
        }
        if performance_rating > 3 {
            return Err(LiftRsError::Validation(format!(
                "performance rating {} out of range 0-3",
                performance_rating
            )));
        }
        if let Some(fatigue) = fatigue_rating {
            if fatigue > 2 {
                return Err(LiftRsError::Validation(format!(
                    "fatigue rating {} out of range 0-2",
                    fatigue
                )));
            }
        }

        let fatigue_input = fatigue_rating.unwrap_or(soreness_rating);
        let total_score = pump_rating as i32 + performance_rating as i32 - fatigue_input as i32;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            workout_id: workout_id.into(),
            date,
            pump_rating,
            soreness_rating,
            performance_rating,
            fatigue_rating,
            total_score,
        })
    }

    /// Raw fatigue input on the 0-2 scale
    pub fn fatigue_input(&self) -> u8 {
        self.fatigue_rating.unwrap_or(self.soreness_rating)
    }
}

/// Append feedback, keeping only the most recent entries
pub fn append_feedback(history: &mut Vec<WorkoutFeedback>, feedback: WorkoutFeedback) {
    history.push(feedback);
    if history.len() > MAX_FEEDBACK_ENTRIES {
        let excess = history.len() - MAX_FEEDBACK_ENTRIES;
        history.drain(..excess);
    }
}

/// Map a 0-2 rating (pump, soreness, fatigue) onto the 1-5 analysis scale.
///
/// 0 -> 1, 1 -> 3, 2 -> 5. Higher means more of the sensation.
pub fn three_level_to_five_point(rating: u8) -> f64 {
    rating.min(2) as f64 * 2.0 + 1.0
}

/// Map a 0-3 performance rating onto the 1-5 analysis scale.
///
/// The raw scale is inverted (0 = exceeded target, 3 = missed target), so
/// the mapping is `5 - rating`: a missed target becomes 2, an exceeded one 5.
/// Higher mapped values mean better performance.
pub fn performance_to_five_point(rating: u8) -> f64 {
    5.0 - rating.min(3) as f64
}
