//! Weekly volume landmarks and the per-muscle volume ledger
//!
//! # Volume Landmarks
//!
//! Each muscle group has fixed weekly set-count landmarks:
//!
//! - **MV** (maintenance volume): enough to hold current adaptations
//! - **MEV** (minimum effective volume): the least work that still drives growth
//! - **MAV** (maximum adaptive volume): the range where most progress happens
//! - **MRV** (maximum recoverable volume): beyond this, recovery cannot keep up
//!
//! All landmark values are non-zero so ratios against them are always finite.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::MuscleGroup;

/// Sets below MRV that still count as "near" it
const NEAR_MRV_MARGIN: u32 = 2;

/// Weekly set landmarks for one muscle group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLandmark {
    pub mv: u32,
    pub mev: u32,
    pub mav_low: u32,
    pub mav_high: u32,
    pub mrv: u32,
}

impl VolumeLandmark {
    /// Reference landmarks for a muscle group
    pub fn for_muscle(muscle: MuscleGroup) -> Self {
        let (mv, mev, mav_low, mav_high, mrv) = match muscle {
            MuscleGroup::Chest => (8, 10, 12, 20, 22),
            MuscleGroup::Back => (8, 10, 14, 22, 25),
            MuscleGroup::Shoulders => (6, 8, 16, 22, 26),
            MuscleGroup::Biceps => (5, 8, 14, 20, 26),
            MuscleGroup::Triceps => (4, 6, 10, 14, 18),
            MuscleGroup::Quads => (6, 8, 12, 18, 20),
            MuscleGroup::Hamstrings => (4, 6, 10, 16, 20),
            MuscleGroup::Glutes => (2, 4, 8, 12, 16),
            MuscleGroup::Calves => (6, 8, 12, 16, 20),
            MuscleGroup::Abs => (2, 6, 16, 20, 25),
            MuscleGroup::Traps => (2, 4, 12, 20, 26),
            MuscleGroup::Forearms => (2, 4, 10, 16, 20),
        };

        Self {
            mv,
            mev,
            mav_low,
            mav_high,
            mrv,
        }
    }

    /// Classify a weekly set count against these landmarks
    pub fn classify(&self, sets: u32) -> VolumeStatus {
        if sets >= self.mrv {
            VolumeStatus::AtMrv
        } else if sets >= self.mrv.saturating_sub(NEAR_MRV_MARGIN) {
            VolumeStatus::NearMrv
        } else if sets >= self.mav_low {
            VolumeStatus::InMav
        } else if sets >= self.mev {
            VolumeStatus::AtMev
        } else {
            VolumeStatus::BelowMev
        }
    }

    /// Weekly sets as a percentage of MRV
    pub fn percent_of_mrv(&self, sets: u32) -> f64 {
        if self.mrv == 0 {
            return 0.0;
        }
        100.0 * sets as f64 / self.mrv as f64
    }
}

/// Where a muscle's weekly volume sits relative to its landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    BelowMev,
    AtMev,
    InMav,
    NearMrv,
    AtMrv,
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeStatus::BelowMev => write!(f, "below_mev"),
            VolumeStatus::AtMev => write!(f, "at_mev"),
            VolumeStatus::InMav => write!(f, "in_mav"),
            VolumeStatus::NearMrv => write!(f, "near_mrv"),
            VolumeStatus::AtMrv => write!(f, "at_mrv"),
        }
    }
}

/// Sets accumulated per muscle in the current training week
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLedger {
    sets: BTreeMap<MuscleGroup, u32>,
}

impl VolumeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add completed sets for a muscle
    pub fn record_sets(&mut self, muscle: MuscleGroup, count: u32) {
        let entry = self.sets.entry(muscle).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Add every muscle's set count from one workout
    pub fn record_workout(&mut self, per_muscle: &BTreeMap<MuscleGroup, u32>) {
        for (muscle, count) in per_muscle {
            self.record_sets(*muscle, *count);
        }
    }

    pub fn sets_for(&self, muscle: MuscleGroup) -> u32 {
        self.sets.get(&muscle).copied().unwrap_or(0)
    }

    pub fn status_for(&self, muscle: MuscleGroup) -> VolumeStatus {
        VolumeLandmark::for_muscle(muscle).classify(self.sets_for(muscle))
    }

    pub fn percent_of_mrv(&self, muscle: MuscleGroup) -> f64 {
        VolumeLandmark::for_muscle(muscle).percent_of_mrv(self.sets_for(muscle))
    }

    /// Copy of the current per-muscle counts
    pub fn snapshot(&self) -> BTreeMap<MuscleGroup, u32> {
        self.sets.clone()
    }

    pub fn total_sets(&self) -> u32 {
        self.sets.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.values().all(|&count| count == 0)
    }

    /// Zero every muscle
    pub fn reset(&mut self) {
        self.sets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_landmark() -> VolumeLandmark {
        VolumeLandmark {
            mv: 6,
            mev: 10,
            mav_low: 12,
            mav_high: 18,
            mrv: 20,
        }
    }

    #[test]
    fn test_status_ordering() {
        let landmark = sample_landmark();
        assert_eq!(landmark.classify(8), VolumeStatus::BelowMev);
        assert_eq!(landmark.classify(10), VolumeStatus::AtMev);
        assert_eq!(landmark.classify(14), VolumeStatus::InMav);
        assert_eq!(landmark.classify(18), VolumeStatus::NearMrv);
        assert_eq!(landmark.classify(19), VolumeStatus::NearMrv);
        assert_eq!(landmark.classify(20), VolumeStatus::AtMrv);
        assert_eq!(landmark.classify(25), VolumeStatus::AtMrv);
    }

    #[test]
    fn test_reference_landmarks_are_ordered_and_non_zero() {
        for muscle in MuscleGroup::ALL {
            let l = VolumeLandmark::for_muscle(muscle);
            assert!(l.mv > 0, "{} mv", muscle);
            assert!(l.mv <= l.mev && l.mev <= l.mav_low, "{}", muscle);
            assert!(l.mav_low <= l.mav_high && l.mav_high <= l.mrv, "{}", muscle);
        }
    }

    #[test]
    fn test_ledger_accumulates_and_resets() {
        let mut ledger = VolumeLedger::new();
        ledger.record_sets(MuscleGroup::Chest, 4);
        ledger.record_sets(MuscleGroup::Chest, 6);
        ledger.record_sets(MuscleGroup::Back, 3);

        assert_eq!(ledger.sets_for(MuscleGroup::Chest), 10);
        assert_eq!(ledger.status_for(MuscleGroup::Chest), VolumeStatus::AtMev);
        assert_eq!(ledger.status_for(MuscleGroup::Quads), VolumeStatus::BelowMev);
        assert!((ledger.percent_of_mrv(MuscleGroup::Chest) - 100.0 * 10.0 / 22.0).abs() < 1e-9);
        assert_eq!(ledger.total_sets(), 13);

        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.sets_for(MuscleGroup::Chest), 0);
    }

    #[test]
    fn test_ledger_serializes_by_muscle_name() {
        let mut ledger = VolumeLedger::new();
        ledger.record_sets(MuscleGroup::Hamstrings, 7);
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("\"hamstrings\":7"));
        let back: VolumeLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }
}
