//! Combined training state and its transition function
//!
//! Every mutation of the engine goes through [`TrainingState::apply`], which
//! takes the current state and one [`TrainingEvent`] and returns the next
//! state together with the persistence effects the change requires. `apply`
//! never touches storage and never fails: an event that is not valid for the
//! current state yields an unchanged state and no effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fatigue::FatigueTracker;
use crate::mesocycle::{
    MesoCycle, MesoCycleGenerator, MesoCycleHistory, MesoCyclePlan, MesoCycleStatus,
    TrainingProgram, WeekAdvance,
};
use crate::models::{append_feedback, WorkoutFeedback, WorkoutRecord};
use crate::overlay::DeloadOverlay;
use crate::volume::VolumeLedger;

/// Fixed keys of the persisted key-value boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKey {
    MesoCycles,
    ActiveMesoCycle,
    WeeklyVolume,
    MuscleFatigue,
    WorkoutFeedback,
    DeloadOverlay,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        StorageKey::MesoCycles,
        StorageKey::ActiveMesoCycle,
        StorageKey::WeeklyVolume,
        StorageKey::MuscleFatigue,
        StorageKey::WorkoutFeedback,
        StorageKey::DeloadOverlay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::MesoCycles => "mesocycles",
            StorageKey::ActiveMesoCycle => "active_mesocycle",
            StorageKey::WeeklyVolume => "weekly_volume",
            StorageKey::MuscleFatigue => "muscle_fatigue",
            StorageKey::WorkoutFeedback => "workout_feedback",
            StorageKey::DeloadOverlay => "deload_overlay",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A write the storage adapter should perform after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistEffect {
    Persist { key: StorageKey, value: String },
    Remove { key: StorageKey },
}

impl PersistEffect {
    pub fn key(&self) -> StorageKey {
        match self {
            PersistEffect::Persist { key, .. } | PersistEffect::Remove { key } => *key,
        }
    }
}

/// Discrete inputs to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    CreateMesoCycle(MesoCyclePlan),
    CreateMesoCycleFromProgram(TrainingProgram),
    StartMesoCycle { id: String },
    AdvanceWeek,
    RecordWorkoutCompletion(WorkoutRecord),
    TriggerDeload,
    AbandonMesoCycle,
    CompleteMesoCycle,
    SubmitFeedback(WorkoutFeedback),
    StartDeloadOverlay,
    EndDeloadOverlay,
    DismissDeloadOverlay,
    ResetDeloadOverlay,
    /// A deload analysis finished; lifts any banner dismissal
    DeloadAnalysisRun,
    /// Periodic check: fatigue recovery and overlay expiry
    DayBoundary,
}

impl TrainingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrainingEvent::CreateMesoCycle(_) => "create_mesocycle",
            TrainingEvent::CreateMesoCycleFromProgram(_) => "create_mesocycle_from_program",
            TrainingEvent::StartMesoCycle { .. } => "start_mesocycle",
            TrainingEvent::AdvanceWeek => "advance_week",
            TrainingEvent::RecordWorkoutCompletion(_) => "record_workout_completion",
            TrainingEvent::TriggerDeload => "trigger_deload",
            TrainingEvent::AbandonMesoCycle => "abandon_mesocycle",
            TrainingEvent::CompleteMesoCycle => "complete_mesocycle",
            TrainingEvent::SubmitFeedback(_) => "submit_feedback",
            TrainingEvent::StartDeloadOverlay => "start_deload_overlay",
            TrainingEvent::EndDeloadOverlay => "end_deload_overlay",
            TrainingEvent::DismissDeloadOverlay => "dismiss_deload_overlay",
            TrainingEvent::ResetDeloadOverlay => "reset_deload_overlay",
            TrainingEvent::DeloadAnalysisRun => "deload_analysis_run",
            TrainingEvent::DayBoundary => "day_boundary",
        }
    }
}

/// Output of one transition
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: TrainingState,
    pub effects: Vec<PersistEffect>,
}

impl Transition {
    /// True when the event left the state untouched
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Everything the engine remembers between events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingState {
    pub mesocycles: MesoCycleHistory,
    pub volume: VolumeLedger,
    pub fatigue: FatigueTracker,
    /// Read through [`TrainingState::overlay_at`] so expiry is applied
    pub(crate) overlay: DeloadOverlay,
    pub feedback: Vec<WorkoutFeedback>,
}

impl TrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event, producing the next state and its persistence effects
    pub fn apply(&self, event: TrainingEvent, now: DateTime<Utc>) -> Transition {
        let event_name = event.name();
        let mut next = self.clone();

        match event {
            TrainingEvent::CreateMesoCycle(plan) => {
                next.mesocycles.create(MesoCycleGenerator::from_plan(&plan, now));
            }
            TrainingEvent::CreateMesoCycleFromProgram(program) => {
                next.mesocycles
                    .create(MesoCycleGenerator::from_program(&program, now));
            }
            TrainingEvent::StartMesoCycle { id } => {
                if next.mesocycles.start(&id, now) {
                    next.volume.reset();
                }
            }
            TrainingEvent::AdvanceWeek => {
                next.advance_week(now);
            }
            TrainingEvent::RecordWorkoutCompletion(record) => {
                let per_muscle = record.sets_per_muscle();
                next.volume.record_workout(&per_muscle);
                next.fatigue.record_session(&per_muscle, record.date);

                if next.mesocycles.record_workout(&record.id, &per_muscle) == Some(true) {
                    tracing::debug!(workout = %record.id, "Weekly workout quota met");
                    next.advance_week(now);
                }
            }
            TrainingEvent::TriggerDeload => {
                if next.mesocycles.trigger_deload() {
                    next.volume.reset();
                    next.fatigue.reset();
                }
            }
            TrainingEvent::AbandonMesoCycle => {
                if next.mesocycles.finish(MesoCycleStatus::Abandoned, now) {
                    next.volume.reset();
                }
            }
            TrainingEvent::CompleteMesoCycle => {
                if next.mesocycles.finish(MesoCycleStatus::Completed, now) {
                    next.volume.reset();
                }
            }
            TrainingEvent::SubmitFeedback(feedback) => {
                append_feedback(&mut next.feedback, feedback);
            }
            TrainingEvent::StartDeloadOverlay => {
                next.overlay.check_expiry(now);
                next.overlay.start(now);
            }
            TrainingEvent::EndDeloadOverlay => {
                next.overlay.check_expiry(now);
                if next.overlay.is_in_deload_week {
                    next.overlay.end(now);
                }
            }
            TrainingEvent::DismissDeloadOverlay => {
                next.overlay.check_expiry(now);
                next.overlay.dismiss();
            }
            TrainingEvent::ResetDeloadOverlay => {
                next.overlay.reset();
            }
            TrainingEvent::DeloadAnalysisRun => {
                next.overlay.clear_dismissal();
            }
            TrainingEvent::DayBoundary => {
                next.overlay.check_expiry(now);
                next.fatigue.recover_until(now.date_naive());
            }
        }

        let effects = self.effects_towards(&next);
        if effects.is_empty() {
            tracing::debug!(event = event_name, "Event left state unchanged");
        } else {
            tracing::debug!(event = event_name, effects = effects.len(), "Transition applied");
        }

        Transition {
            state: next,
            effects,
        }
    }

    fn advance_week(&mut self, now: DateTime<Utc>) {
        let snapshot = self.volume.snapshot();
        match self.mesocycles.advance_week(snapshot, now) {
            Some(WeekAdvance::Advanced { .. }) | Some(WeekAdvance::CycleCompleted) => {
                self.volume.reset();
            }
            None => {
                tracing::warn!("Week advance requested without an active mesocycle");
            }
        }
    }

    pub fn active_mesocycle(&self) -> Option<&MesoCycle> {
        self.mesocycles.active()
    }

    /// The overlay as of `now`, with an expired deload window already ended
    pub fn overlay_at(&self, now: DateTime<Utc>) -> DeloadOverlay {
        let mut overlay = self.overlay.clone();
        overlay.check_expiry(now);
        overlay
    }

    /// Effects that bring storage from `self` to `next`
    fn effects_towards(&self, next: &TrainingState) -> Vec<PersistEffect> {
        StorageKey::ALL
            .iter()
            .filter(|&&key| !self.same_component(next, key))
            .filter_map(|&key| match next.component_json(key) {
                Ok(Some(value)) => Some(PersistEffect::Persist { key, value }),
                Ok(None) => Some(PersistEffect::Remove { key }),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to serialize state component");
                    None
                }
            })
            .collect()
    }

    fn same_component(&self, other: &TrainingState, key: StorageKey) -> bool {
        match key {
            StorageKey::MesoCycles => self.mesocycles.cycles() == other.mesocycles.cycles(),
            StorageKey::ActiveMesoCycle => {
                self.mesocycles.active_id() == other.mesocycles.active_id()
            }
            StorageKey::WeeklyVolume => self.volume == other.volume,
            StorageKey::MuscleFatigue => self.fatigue == other.fatigue,
            StorageKey::WorkoutFeedback => self.feedback == other.feedback,
            StorageKey::DeloadOverlay => self.overlay == other.overlay,
        }
    }

    /// Serialized form of one component, `None` when the key should be absent
    pub fn component_json(&self, key: StorageKey) -> serde_json::Result<Option<String>> {
        let value = match key {
            StorageKey::MesoCycles => serde_json::to_string(self.mesocycles.cycles())?,
            StorageKey::ActiveMesoCycle => match self.mesocycles.active_id() {
                Some(id) => serde_json::to_string(id)?,
                None => return Ok(None),
            },
            StorageKey::WeeklyVolume => serde_json::to_string(&self.volume)?,
            StorageKey::MuscleFatigue => serde_json::to_string(&self.fatigue)?,
            StorageKey::WorkoutFeedback => serde_json::to_string(&self.feedback)?,
            StorageKey::DeloadOverlay => serde_json::to_string(&self.overlay)?,
        };
        Ok(Some(value))
    }

    /// Every component as an effect, for a full snapshot write
    pub fn snapshot_effects(&self) -> Vec<PersistEffect> {
        StorageKey::ALL
            .iter()
            .filter_map(|&key| match self.component_json(key) {
                Ok(Some(value)) => Some(PersistEffect::Persist { key, value }),
                Ok(None) => Some(PersistEffect::Remove { key }),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to serialize state component");
                    None
                }
            })
            .collect()
    }

    /// Rebuild state from persisted component values.
    ///
    /// `lookup` yields the raw value for a key. Missing keys and values that
    /// fail to parse fall back to the component's default.
    pub fn from_components<F>(mut lookup: F) -> Self
    where
        F: FnMut(StorageKey) -> Option<String>,
    {
        let cycles: Vec<MesoCycle> = parse_component(StorageKey::MesoCycles, &mut lookup);
        let active_id: Option<String> = parse_component(StorageKey::ActiveMesoCycle, &mut lookup);

        Self {
            mesocycles: MesoCycleHistory::from_parts(cycles, active_id),
            volume: parse_component(StorageKey::WeeklyVolume, &mut lookup),
            fatigue: parse_component(StorageKey::MuscleFatigue, &mut lookup),
            overlay: parse_component(StorageKey::DeloadOverlay, &mut lookup),
            feedback: parse_component(StorageKey::WorkoutFeedback, &mut lookup),
        }
    }
}

fn parse_component<T, F>(key: StorageKey, lookup: &mut F) -> T
where
    T: serde::de::DeserializeOwned + Default,
    F: FnMut(StorageKey) -> Option<String>,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => return T::default(),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding unreadable persisted value");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesocycle::{MusclePriority, WeekStatus};
    use crate::models::{LoggedSet, MuscleGroup};
    use chrono::{Duration, NaiveDate, TimeZone};
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 5, 18, 0, 0).unwrap()
    }

    fn plan(weeks: u32, per_week: u32) -> MesoCyclePlan {
        let mut priorities = BTreeMap::new();
        priorities.insert(MuscleGroup::Chest, MusclePriority::Focus);
        priorities.insert(MuscleGroup::Quads, MusclePriority::Normal);
        MesoCyclePlan {
            name: "Strength Block".to_string(),
            total_weeks: weeks,
            workouts_per_week: per_week,
            muscle_priorities: priorities,
            volume_increment_per_week: 2,
        }
    }

    fn workout(id: &str, day: u32) -> WorkoutRecord {
        let set = |name: &str, muscle| LoggedSet {
            exercise_name: name.to_string(),
            muscle_group: muscle,
            weight: 100.0,
            reps: 8,
            completed: true,
        };
        WorkoutRecord::new(
            id,
            NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            vec![
                set("Bench Press", MuscleGroup::Chest),
                set("Bench Press", MuscleGroup::Chest),
                set("Squat", MuscleGroup::Quads),
            ],
        )
    }

    fn started(weeks: u32, per_week: u32) -> TrainingState {
        let state = TrainingState::new()
            .apply(TrainingEvent::CreateMesoCycle(plan(weeks, per_week)), now())
            .state;
        let id = state.mesocycles.latest_planned().unwrap().id.clone();
        state
            .apply(TrainingEvent::StartMesoCycle { id }, now())
            .state
    }

    fn keys(transition: &Transition) -> Vec<StorageKey> {
        transition.effects.iter().map(|e| e.key()).collect()
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let state = started(4, 4);
        let before = state.clone();
        let transition = state.apply(TrainingEvent::RecordWorkoutCompletion(workout("w1", 5)), now());

        assert_eq!(state, before);
        assert_eq!(transition.state.volume.sets_for(MuscleGroup::Chest), 2);
    }

    #[test]
    fn test_start_emits_cycle_and_pointer() {
        let state = TrainingState::new()
            .apply(TrainingEvent::CreateMesoCycle(plan(4, 4)), now())
            .state;
        let id = state.mesocycles.latest_planned().unwrap().id.clone();
        let transition = state.apply(TrainingEvent::StartMesoCycle { id }, now());

        assert_eq!(keys(&transition), vec![StorageKey::MesoCycles, StorageKey::ActiveMesoCycle]);
        assert!(transition.state.active_mesocycle().is_some());
    }

    #[test]
    fn test_fourth_workout_auto_advances_week() {
        let mut state = started(4, 4);
        for (i, day) in [5, 6, 7].iter().enumerate() {
            state = state
                .apply(TrainingEvent::RecordWorkoutCompletion(workout(&format!("w{}", i), *day)), now())
                .state;
        }
        assert_eq!(state.active_mesocycle().unwrap().current_week, 1);
        assert_eq!(state.volume.sets_for(MuscleGroup::Chest), 6);

        let transition =
            state.apply(TrainingEvent::RecordWorkoutCompletion(workout("w3", 8)), now());
        let state = transition.state;

        let cycle = state.active_mesocycle().unwrap();
        assert_eq!(cycle.current_week, 2);
        assert_eq!(cycle.completed_workouts, 4);
        assert_eq!(cycle.weeks[0].status, WeekStatus::Completed);
        assert_eq!(cycle.weeks[0].completed_volume[&MuscleGroup::Chest], 8);
        assert_eq!(cycle.weeks[1].status, WeekStatus::InProgress);
        assert!(state.volume.is_empty());
        assert_eq!(state.volume.sets_for(MuscleGroup::Chest), 0);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let state = TrainingState::new();
        for event in [
            TrainingEvent::AdvanceWeek,
            TrainingEvent::TriggerDeload,
            TrainingEvent::AbandonMesoCycle,
            TrainingEvent::CompleteMesoCycle,
            TrainingEvent::EndDeloadOverlay,
            TrainingEvent::StartMesoCycle {
                id: "missing".to_string(),
            },
        ] {
            let transition = state.apply(event, now());
            assert!(transition.is_noop());
            assert_eq!(transition.state, state);
        }
    }

    #[test]
    fn test_workout_without_cycle_still_tracks_volume_and_fatigue() {
        let transition =
            TrainingState::new().apply(TrainingEvent::RecordWorkoutCompletion(workout("w1", 5)), now());
        assert_eq!(
            keys(&transition),
            vec![StorageKey::WeeklyVolume, StorageKey::MuscleFatigue]
        );
        assert_eq!(transition.state.fatigue.fatigue_for(MuscleGroup::Chest), 10.0);
    }

    #[test]
    fn test_trigger_deload_resets_fatigue_and_volume() {
        let state = started(5, 4)
            .apply(TrainingEvent::RecordWorkoutCompletion(workout("w1", 5)), now())
            .state;
        let transition = state.apply(TrainingEvent::TriggerDeload, now());
        assert_eq!(
            keys(&transition),
            vec![
                StorageKey::MesoCycles,
                StorageKey::WeeklyVolume,
                StorageKey::MuscleFatigue
            ]
        );

        let state = transition.state;
        assert!(state.active_mesocycle().unwrap().current().unwrap().is_deload);
        assert_eq!(state.fatigue.fatigue_for(MuscleGroup::Chest), 0.0);
        assert!(state.volume.is_empty());
    }

    #[test]
    fn test_abandon_removes_active_pointer() {
        let transition = started(4, 4).apply(TrainingEvent::AbandonMesoCycle, now());
        assert!(transition
            .effects
            .contains(&PersistEffect::Remove { key: StorageKey::ActiveMesoCycle }));
        assert!(transition.state.active_mesocycle().is_none());
    }

    #[test]
    fn test_feedback_list_is_capped() {
        let mut state = TrainingState::new();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        for i in 0..105 {
            let feedback = WorkoutFeedback::new(format!("w{}", i), date, 1, 1, 1, None).unwrap();
            state = state.apply(TrainingEvent::SubmitFeedback(feedback), now()).state;
        }
        assert_eq!(state.feedback.len(), 100);
        assert_eq!(state.feedback[0].workout_id, "w5");
    }

    #[test]
    fn test_day_boundary_expires_overlay() {
        let eight_days_ago = now() - Duration::days(8);
        let state = TrainingState::new()
            .apply(TrainingEvent::StartDeloadOverlay, eight_days_ago)
            .state;
        assert!(state.overlay.is_in_deload_week);

        let transition = state.apply(TrainingEvent::DayBoundary, now());
        assert!(!transition.state.overlay.is_in_deload_week);
        assert_eq!(transition.state.overlay.last_deload_date, Some(now()));
        // First boundary also records the fatigue reference day
        assert_eq!(
            keys(&transition),
            vec![StorageKey::MuscleFatigue, StorageKey::DeloadOverlay]
        );
    }

    #[test]
    fn test_overlay_read_applies_expiry() {
        let state = TrainingState::new()
            .apply(TrainingEvent::StartDeloadOverlay, now() - Duration::days(7))
            .state;

        let overlay = state.overlay_at(now());
        assert!(!overlay.is_in_deload_week);
        assert_eq!(overlay.last_deload_date, Some(now()));
        // Reading does not mutate the held state
        assert!(state.overlay.is_in_deload_week);

        assert!(state.overlay_at(now() - Duration::days(1)).is_in_deload_week);
    }

    #[test]
    fn test_analysis_run_lifts_dismissal() {
        let dismissed = TrainingState::new()
            .apply(TrainingEvent::DismissDeloadOverlay, now())
            .state;
        assert!(dismissed.overlay.is_dismissed);

        let transition = dismissed.apply(TrainingEvent::DeloadAnalysisRun, now());
        assert!(!transition.state.overlay.is_dismissed);
        assert_eq!(keys(&transition), vec![StorageKey::DeloadOverlay]);

        assert!(TrainingState::new()
            .apply(TrainingEvent::DeloadAnalysisRun, now())
            .is_noop());
    }

    #[test]
    fn test_components_round_trip_through_lookup() {
        let state = started(4, 2)
            .apply(TrainingEvent::RecordWorkoutCompletion(workout("w1", 5)), now())
            .state
            .apply(TrainingEvent::DismissDeloadOverlay, now())
            .state;

        let mut stored = BTreeMap::new();
        for effect in state.snapshot_effects() {
            if let PersistEffect::Persist { key, value } = effect {
                stored.insert(key, value);
            }
        }

        let restored = TrainingState::from_components(|key| stored.get(&key).cloned());
        assert_eq!(restored, state);
    }

    #[test]
    fn test_corrupt_component_falls_back_to_default() {
        let restored = TrainingState::from_components(|key| match key {
            StorageKey::WeeklyVolume => Some("{not json".to_string()),
            StorageKey::DeloadOverlay => Some(r#"{"is_in_deload_week":false,"deload_start_date":null,"last_deload_date":null,"is_dismissed":true}"#.to_string()),
            _ => None,
        });
        assert!(restored.volume.is_empty());
        assert!(restored.overlay.is_dismissed);
    }
}
