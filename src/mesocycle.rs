//! Mesocycle periodization
//!
//! A mesocycle is a multi-week block with a planned per-muscle volume
//! progression that ends in a deload week. Lifecycle:
//!
//! ```text
//! planned --start--> active --advance (last week)--> completed
//!                       |--complete----------------> completed
//!                       `--abandon-----------------> abandoned
//! ```
//!
//! While a cycle is active exactly one week is `in_progress`; every week
//! before it is `completed` and every week after it is `upcoming`. At most
//! one cycle in a [`MesoCycleHistory`] is active at a time.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::MuscleGroup;
use crate::volume::VolumeLandmark;

/// Weekly set increase used when a plan does not specify one
pub const DEFAULT_VOLUME_INCREMENT: u32 = 2;

/// Extra weekly sets a focus muscle starts with above MEV
const FOCUS_START_BONUS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MesoCycleStatus {
    Planned,
    Active,
    Completed,
    Abandoned,
}

impl fmt::Display for MesoCycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MesoCycleStatus::Planned => write!(f, "planned"),
            MesoCycleStatus::Active => write!(f, "active"),
            MesoCycleStatus::Completed => write!(f, "completed"),
            MesoCycleStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
    Upcoming,
    InProgress,
    Completed,
}

/// How hard a muscle is pushed during the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusclePriority {
    /// Starts above MEV
    Focus,
    /// Starts at MEV
    #[default]
    Normal,
    /// Starts at maintenance volume
    Maintain,
}

impl MusclePriority {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "focus" | "emphasize" => Ok(Self::Focus),
            "normal" => Ok(Self::Normal),
            "maintain" | "maintenance" => Ok(Self::Maintain),
            _ => anyhow::bail!("Unknown muscle priority: {}", s),
        }
    }

    /// Week-one weekly sets for a manually planned cycle
    pub fn starting_sets(&self, landmark: &VolumeLandmark) -> u32 {
        match self {
            MusclePriority::Focus => landmark.mev + FOCUS_START_BONUS,
            MusclePriority::Normal => landmark.mev,
            MusclePriority::Maintain => landmark.mv,
        }
    }
}

/// One week of a mesocycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MesoCycleWeek {
    pub week_number: u32,
    pub is_deload: bool,
    /// Planned weekly sets per muscle
    pub target_volume: BTreeMap<MuscleGroup, u32>,
    /// Sets actually completed per muscle
    pub completed_volume: BTreeMap<MuscleGroup, u32>,
    pub workout_ids: Vec<String>,
    pub status: WeekStatus,
}

impl MesoCycleWeek {
    fn new(week_number: u32, is_deload: bool, target_volume: BTreeMap<MuscleGroup, u32>) -> Self {
        Self {
            week_number,
            is_deload,
            target_volume,
            completed_volume: BTreeMap::new(),
            workout_ids: Vec::new(),
            status: WeekStatus::Upcoming,
        }
    }
}

/// A periodized training block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MesoCycle {
    pub id: String,
    pub name: String,
    pub status: MesoCycleStatus,
    /// 1-indexed
    pub current_week: u32,
    pub total_weeks: u32,
    pub weeks: Vec<MesoCycleWeek>,
    pub muscle_priorities: BTreeMap<MuscleGroup, MusclePriority>,
    /// Week-one weekly sets per muscle
    pub starting_volume: BTreeMap<MuscleGroup, u32>,
    pub volume_progression_per_week: u32,
    pub total_workouts: u32,
    pub completed_workouts: u32,
    pub program_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl MesoCycle {
    /// Workouts that make up one training week (at least one)
    pub fn workouts_per_week(&self) -> u32 {
        if self.total_weeks == 0 {
            return self.total_workouts.max(1);
        }
        (self.total_workouts / self.total_weeks).max(1)
    }

    pub fn is_active(&self) -> bool {
        self.status == MesoCycleStatus::Active
    }

    pub fn week(&self, week_number: u32) -> Option<&MesoCycleWeek> {
        self.weeks.iter().find(|w| w.week_number == week_number)
    }

    pub fn current(&self) -> Option<&MesoCycleWeek> {
        self.week(self.current_week)
    }

    fn current_mut(&mut self) -> Option<&mut MesoCycleWeek> {
        let number = self.current_week;
        self.weeks.iter_mut().find(|w| w.week_number == number)
    }

    /// Planned sets per muscle for a week
    pub fn week_targets(&self, week_number: u32) -> Option<&BTreeMap<MuscleGroup, u32>> {
        self.week(week_number).map(|w| &w.target_volume)
    }

    /// Planned sets for a muscle in the current week
    pub fn current_target(&self, muscle: MuscleGroup) -> Option<u32> {
        self.week_targets(self.current_week)
            .and_then(|targets| targets.get(&muscle).copied())
    }

    /// Completed workouts as a percentage of the plan
    pub fn progress_percent(&self) -> f64 {
        if self.total_workouts == 0 {
            return 0.0;
        }
        (100.0 * self.completed_workouts as f64 / self.total_workouts as f64).min(100.0)
    }

    /// Muscles covered by the plan
    fn planned_muscles(&self) -> Vec<MuscleGroup> {
        planned_muscles(&self.muscle_priorities)
    }
}

/// Program template a mesocycle can be derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgram {
    pub id: String,
    pub name: String,
    pub duration_weeks: u32,
    pub days_per_week: u32,
    #[serde(default)]
    pub muscle_priorities: BTreeMap<MuscleGroup, MusclePriority>,
    /// Week-one volume as a multiple of MEV
    #[serde(default = "default_starting_multiplier")]
    pub starting_multiplier: f64,
    /// Sets added per muscle each week
    #[serde(default = "default_progression_per_week")]
    pub progression_per_week: f64,
}

fn default_starting_multiplier() -> f64 {
    1.0
}

fn default_progression_per_week() -> f64 {
    DEFAULT_VOLUME_INCREMENT as f64
}

/// Parameters for a hand-built mesocycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MesoCyclePlan {
    pub name: String,
    pub total_weeks: u32,
    pub workouts_per_week: u32,
    #[serde(default)]
    pub muscle_priorities: BTreeMap<MuscleGroup, MusclePriority>,
    #[serde(default = "default_volume_increment")]
    pub volume_increment_per_week: u32,
}

fn default_volume_increment() -> u32 {
    DEFAULT_VOLUME_INCREMENT
}

/// Builds planned mesocycles with their full week plan
pub struct MesoCycleGenerator;

impl MesoCycleGenerator {
    /// Derive a planned cycle from a program template.
    ///
    /// The final week is the deload week and targets MEV. Other weeks target
    /// `MEV x starting_multiplier + week_index x progression`, capped at MRV.
    pub fn from_program(program: &TrainingProgram, now: DateTime<Utc>) -> MesoCycle {
        let total_weeks = program.duration_weeks.max(1);
        let muscles = planned_muscles(&program.muscle_priorities);

        let weeks: Vec<MesoCycleWeek> = (0..total_weeks)
            .map(|week_index| {
                let is_deload = week_index == total_weeks - 1;
                let targets = muscles
                    .iter()
                    .map(|&muscle| {
                        let landmark = VolumeLandmark::for_muscle(muscle);
                        let sets = if is_deload {
                            landmark.mev
                        } else {
                            let planned = landmark.mev as f64 * program.starting_multiplier
                                + week_index as f64 * program.progression_per_week;
                            (planned.round().max(0.0) as u32).min(landmark.mrv)
                        };
                        (muscle, sets)
                    })
                    .collect();
                MesoCycleWeek::new(week_index + 1, is_deload, targets)
            })
            .collect();

        let starting_volume = weeks
            .first()
            .map(|w| w.target_volume.clone())
            .unwrap_or_default();

        MesoCycle {
            id: uuid::Uuid::new_v4().to_string(),
            name: program.name.clone(),
            status: MesoCycleStatus::Planned,
            current_week: 1,
            total_weeks,
            weeks,
            muscle_priorities: program.muscle_priorities.clone(),
            starting_volume,
            volume_progression_per_week: program.progression_per_week.round().max(0.0) as u32,
            total_workouts: program.days_per_week.max(1) * total_weeks,
            completed_workouts: 0,
            program_id: Some(program.id.clone()),
            created_at: now,
            start_date: None,
            end_date: None,
        }
    }

    /// Build a planned cycle from priorities.
    ///
    /// Week one starts at MEV + 2 for focus muscles, MEV for normal ones and
    /// MV for maintained ones, then rises by the weekly increment up to MRV.
    /// The final week drops every muscle to MV as the deload.
    pub fn from_plan(plan: &MesoCyclePlan, now: DateTime<Utc>) -> MesoCycle {
        let total_weeks = plan.total_weeks.max(1);
        let muscles = planned_muscles(&plan.muscle_priorities);

        let starting_volume: BTreeMap<MuscleGroup, u32> = muscles
            .iter()
            .map(|&muscle| {
                let priority = plan.muscle_priorities.get(&muscle).copied().unwrap_or_default();
                (muscle, priority.starting_sets(&VolumeLandmark::for_muscle(muscle)))
            })
            .collect();

        let weeks = (0..total_weeks)
            .map(|week_index| {
                let is_deload = week_index == total_weeks - 1;
                let targets = starting_volume
                    .iter()
                    .map(|(&muscle, &start)| {
                        let landmark = VolumeLandmark::for_muscle(muscle);
                        let sets = if is_deload {
                            landmark.mv
                        } else {
                            (start + week_index * plan.volume_increment_per_week).min(landmark.mrv)
                        };
                        (muscle, sets)
                    })
                    .collect();
                MesoCycleWeek::new(week_index + 1, is_deload, targets)
            })
            .collect();

        MesoCycle {
            id: uuid::Uuid::new_v4().to_string(),
            name: plan.name.clone(),
            status: MesoCycleStatus::Planned,
            current_week: 1,
            total_weeks,
            weeks,
            muscle_priorities: plan.muscle_priorities.clone(),
            starting_volume,
            volume_progression_per_week: plan.volume_increment_per_week,
            total_workouts: plan.workouts_per_week.max(1) * total_weeks,
            completed_workouts: 0,
            program_id: None,
            created_at: now,
            start_date: None,
            end_date: None,
        }
    }
}

/// Every muscle when no priorities are given, otherwise the prioritised ones
fn planned_muscles(priorities: &BTreeMap<MuscleGroup, MusclePriority>) -> Vec<MuscleGroup> {
    if priorities.is_empty() {
        MuscleGroup::ALL.to_vec()
    } else {
        priorities.keys().copied().collect()
    }
}

/// What an accepted week advance did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekAdvance {
    /// Moved on to the given week
    Advanced { from: u32, to: u32 },
    /// The final week closed and the cycle completed
    CycleCompleted,
}

/// All mesocycles plus the pointer to the active one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MesoCycleHistory {
    cycles: Vec<MesoCycle>,
    active_id: Option<String>,
}

impl MesoCycleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts. A pointer that does not name an active
    /// cycle is dropped.
    pub fn from_parts(cycles: Vec<MesoCycle>, active_id: Option<String>) -> Self {
        let active_id = active_id.filter(|id| cycles.iter().any(|c| &c.id == id && c.is_active()));
        Self { cycles, active_id }
    }

    pub fn cycles(&self) -> &[MesoCycle] {
        &self.cycles
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&MesoCycle> {
        self.cycles.iter().find(|c| c.id == id)
    }

    pub fn active(&self) -> Option<&MesoCycle> {
        let id = self.active_id.as_deref()?;
        self.get(id).filter(|c| c.is_active())
    }

    fn active_mut(&mut self) -> Option<&mut MesoCycle> {
        let id = self.active_id.clone()?;
        self.cycles
            .iter_mut()
            .find(|c| c.id == id)
            .filter(|c| c.is_active())
    }

    /// Most recently created cycle that is still planned
    pub fn latest_planned(&self) -> Option<&MesoCycle> {
        self.cycles
            .iter()
            .rev()
            .find(|c| c.status == MesoCycleStatus::Planned)
    }

    /// Store a newly planned cycle
    pub fn create(&mut self, cycle: MesoCycle) -> String {
        let id = cycle.id.clone();
        tracing::info!(id = %id, name = %cycle.name, weeks = cycle.total_weeks, "Mesocycle planned");
        self.cycles.push(cycle);
        id
    }

    /// planned -> active. Rejected when another cycle is already active.
    pub fn start(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        if self.active().is_some() {
            tracing::warn!(id = %id, "Cannot start mesocycle while another is active");
            return false;
        }

        let cycle = match self
            .cycles
            .iter_mut()
            .find(|c| c.id == id && c.status == MesoCycleStatus::Planned)
        {
            Some(cycle) => cycle,
            None => {
                tracing::warn!(id = %id, "No planned mesocycle to start");
                return false;
            }
        };

        cycle.status = MesoCycleStatus::Active;
        cycle.current_week = 1;
        cycle.start_date = Some(now);
        for week in &mut cycle.weeks {
            week.status = if week.week_number == 1 {
                WeekStatus::InProgress
            } else {
                WeekStatus::Upcoming
            };
        }

        tracing::info!(id = %id, "Mesocycle started");
        self.active_id = Some(id.to_string());
        true
    }

    /// Close the current week with the given completed-volume snapshot.
    ///
    /// Returns `None` when no cycle is active.
    pub fn advance_week(
        &mut self,
        completed_volume: BTreeMap<MuscleGroup, u32>,
        now: DateTime<Utc>,
    ) -> Option<WeekAdvance> {
        let cycle = self.active_mut()?;

        if let Some(week) = cycle.current_mut() {
            week.status = WeekStatus::Completed;
            week.completed_volume = completed_volume;
        }

        if cycle.current_week + 1 > cycle.total_weeks {
            cycle.status = MesoCycleStatus::Completed;
            cycle.end_date = Some(now);
            tracing::info!(id = %cycle.id, "Mesocycle completed after final week");
            self.active_id = None;
            return Some(WeekAdvance::CycleCompleted);
        }

        let from = cycle.current_week;
        cycle.current_week += 1;
        if let Some(next) = cycle.current_mut() {
            next.status = WeekStatus::InProgress;
        }

        tracing::info!(id = %cycle.id, from, to = cycle.current_week, "Mesocycle week advanced");
        Some(WeekAdvance::Advanced {
            from,
            to: cycle.current_week,
        })
    }

    /// Count a finished workout against the current week.
    ///
    /// Returns `Some(true)` when the week's workout quota is now met and the
    /// week should advance, `None` when no cycle is active.
    pub fn record_workout(
        &mut self,
        workout_id: &str,
        sets_per_muscle: &BTreeMap<MuscleGroup, u32>,
    ) -> Option<bool> {
        let cycle = self.active_mut()?;
        cycle.completed_workouts += 1;

        if let Some(week) = cycle.current_mut() {
            week.workout_ids.push(workout_id.to_string());
            for (muscle, sets) in sets_per_muscle {
                *week.completed_volume.entry(*muscle).or_insert(0) += sets;
            }
        }

        let per_week = cycle.workouts_per_week();
        Some(cycle.completed_workouts % per_week == 0)
    }

    /// Turn the current week into a deload week with MEV targets.
    ///
    /// Returns whether a cycle was active.
    pub fn trigger_deload(&mut self) -> bool {
        let cycle = match self.active_mut() {
            Some(cycle) => cycle,
            None => return false,
        };

        let muscles = cycle.planned_muscles();
        let week_number = cycle.current_week;
        if let Some(week) = cycle.current_mut() {
            let mut targets: BTreeMap<MuscleGroup, u32> = week
                .target_volume
                .keys()
                .map(|&m| (m, VolumeLandmark::for_muscle(m).mev))
                .collect();
            if targets.is_empty() {
                targets = muscles
                    .into_iter()
                    .map(|m| (m, VolumeLandmark::for_muscle(m).mev))
                    .collect();
            }
            week.target_volume = targets;
            week.is_deload = true;
        }

        tracing::info!(week = week_number, "Deload triggered for current mesocycle week");
        true
    }

    /// active -> completed or abandoned, by request
    pub fn finish(&mut self, status: MesoCycleStatus, now: DateTime<Utc>) -> bool {
        if !matches!(status, MesoCycleStatus::Completed | MesoCycleStatus::Abandoned) {
            return false;
        }

        let cycle = match self.active_mut() {
            Some(cycle) => cycle,
            None => return false,
        };
        cycle.status = status;
        cycle.end_date = Some(now);
        tracing::info!(id = %cycle.id, status = %status, "Mesocycle finished");

        self.active_id = None;
        true
    }
}
