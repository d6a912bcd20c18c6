//! Per-muscle fatigue accumulation and recovery

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::MuscleGroup;

/// Fatigue points added per completed set
pub const FATIGUE_PER_SET: f64 = 5.0;

/// Ceiling of the fatigue scale
pub const MAX_FATIGUE: f64 = 100.0;

/// Fatigue above this flags the muscle for a deload
pub const FATIGUE_DELOAD_THRESHOLD: f64 = 70.0;

/// Sets in one session above which the session counts as hard for a muscle
pub const HARD_SESSION_SETS: u32 = 4;

/// Fatigue points shed per day of recovery
pub const DEFAULT_RECOVERY_RATE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleFatigue {
    pub muscle: MuscleGroup,
    /// 0-100
    pub current_fatigue: f64,
    pub consecutive_hard_sessions: u32,
    pub needs_deload: bool,
    /// Points per day
    pub recovery_rate: f64,
    pub last_trained: Option<NaiveDate>,
}

impl MuscleFatigue {
    pub fn new(muscle: MuscleGroup) -> Self {
        Self {
            muscle,
            current_fatigue: 0.0,
            consecutive_hard_sessions: 0,
            needs_deload: false,
            recovery_rate: DEFAULT_RECOVERY_RATE,
            last_trained: None,
        }
    }

    fn refresh_flag(&mut self) {
        self.needs_deload = self.current_fatigue > FATIGUE_DELOAD_THRESHOLD;
    }
}

/// Fatigue records for every trained muscle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FatigueTracker {
    muscles: BTreeMap<MuscleGroup, MuscleFatigue>,
    /// Day recovery was last applied up to
    #[serde(default)]
    last_recovery: Option<NaiveDate>,
}

impl FatigueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate fatigue from one session's per-muscle set counts.
    ///
    /// Only muscles present in `per_muscle` are touched.
    pub fn record_session(&mut self, per_muscle: &BTreeMap<MuscleGroup, u32>, date: NaiveDate) {
        for (&muscle, &sets) in per_muscle {
            if sets == 0 {
                continue;
            }

            let record = self
                .muscles
                .entry(muscle)
                .or_insert_with(|| MuscleFatigue::new(muscle));

            record.current_fatigue =
                (record.current_fatigue + FATIGUE_PER_SET * sets as f64).min(MAX_FATIGUE);

            if sets > HARD_SESSION_SETS {
                record.consecutive_hard_sessions += 1;
            } else {
                record.consecutive_hard_sessions = 0;
            }

            record.last_trained = Some(record.last_trained.map_or(date, |d| d.max(date)));
            record.refresh_flag();
        }
    }

    /// Apply recovery for the days elapsed since the last call.
    ///
    /// The first call only sets the reference day. Returns whether any
    /// fatigue value changed.
    pub fn recover_until(&mut self, today: NaiveDate) -> bool {
        let days = match self.last_recovery {
            Some(last) if today > last => (today - last).num_days(),
            Some(_) => return false,
            None => {
                self.last_recovery = Some(today);
                return false;
            }
        };

        self.last_recovery = Some(today);
        self.recover(days as f64)
    }

    /// Shed `recovery_rate x days` points from every muscle, floored at 0
    pub fn recover(&mut self, days: f64) -> bool {
        let mut changed = false;
        for record in self.muscles.values_mut() {
            let before = record.current_fatigue;
            record.current_fatigue = (before - record.recovery_rate * days).max(0.0);
            if record.current_fatigue != before {
                changed = true;
            }
            record.refresh_flag();
        }
        changed
    }

    /// Zero every record (deload)
    pub fn reset(&mut self) {
        for record in self.muscles.values_mut() {
            record.current_fatigue = 0.0;
            record.consecutive_hard_sessions = 0;
            record.needs_deload = false;
        }
    }

    pub fn get(&self, muscle: MuscleGroup) -> Option<&MuscleFatigue> {
        self.muscles.get(&muscle)
    }

    pub fn fatigue_for(&self, muscle: MuscleGroup) -> f64 {
        self.get(muscle).map_or(0.0, |r| r.current_fatigue)
    }

    pub fn muscles_needing_deload(&self) -> Vec<MuscleGroup> {
        self.muscles
            .values()
            .filter(|r| r.needs_deload)
            .map(|r| r.muscle)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &MuscleFatigue> {
        self.muscles.values()
    }
}
