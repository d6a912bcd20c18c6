//! Single in-process owner of the training state
//!
//! A session loads state from a [`KeyValueStore`], serializes events through
//! [`TrainingState::apply`], and writes the resulting effects back. Storage
//! failures never reach the caller.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::deload::{DeloadAnalyzer, DeloadRecommendation};
use crate::mesocycle::MesoCycle;
use crate::models::{MuscleGroup, WorkoutRecord};
use crate::overlay::DeloadOverlay;
use crate::state::{TrainingEvent, TrainingState};
use crate::storage::{load_state, EffectExecutor, ExecutionReport, KeyValueStore};
use crate::volume::{VolumeLandmark, VolumeStatus};

pub struct TrainingSession<S: KeyValueStore> {
    state: TrainingState,
    store: S,
    analyzer: DeloadAnalyzer,
}

impl<S: KeyValueStore> TrainingSession<S> {
    /// Load persisted state from `store`
    pub fn load(store: S) -> Self {
        let state = load_state(&store);
        tracing::debug!(
            mesocycles = state.mesocycles.cycles().len(),
            feedback = state.feedback.len(),
            "Training session loaded"
        );
        Self {
            state,
            store,
            analyzer: DeloadAnalyzer::new(),
        }
    }

    /// Use a custom analysis window
    pub fn with_analyzer(mut self, analyzer: DeloadAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Apply an event, persist its effects, and return the new state
    pub fn dispatch(&mut self, event: TrainingEvent, now: DateTime<Utc>) -> &TrainingState {
        self.dispatch_with_report(event, now).0
    }

    /// Like [`dispatch`](Self::dispatch) but also reports persistence results
    pub fn dispatch_with_report(
        &mut self,
        event: TrainingEvent,
        now: DateTime<Utc>,
    ) -> (&TrainingState, ExecutionReport) {
        let transition = self.state.apply(event, now);
        let report = EffectExecutor::execute(&mut self.store, &transition.effects);
        self.state = transition.state;
        (&self.state, report)
    }

    /// Deload analysis over `history` and the session's feedback.
    ///
    /// Each run lifts an earlier banner dismissal.
    pub fn analyze(&mut self, history: &[WorkoutRecord], today: NaiveDate) -> DeloadRecommendation {
        let recommendation = self.analyzer.analyze(history, &self.state.feedback, today);
        let now = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
        self.dispatch(TrainingEvent::DeloadAnalysisRun, now);
        recommendation
    }

    pub fn volume_status(&self, muscle: MuscleGroup) -> VolumeStatus {
        self.state.volume.status_for(muscle)
    }

    pub fn percent_of_mrv(&self, muscle: MuscleGroup) -> f64 {
        self.state.volume.percent_of_mrv(muscle)
    }

    /// Current week's target for the muscle, or its MEV outside a mesocycle
    pub fn recommended_volume(&self, muscle: MuscleGroup) -> u32 {
        self.state
            .active_mesocycle()
            .and_then(|cycle| cycle.current_target(muscle))
            .unwrap_or_else(|| VolumeLandmark::for_muscle(muscle).mev)
    }

    pub fn active_mesocycle(&self) -> Option<&MesoCycle> {
        self.state.active_mesocycle()
    }

    /// Consult the overlay, ending an expired deload window first
    pub fn overlay(&mut self, now: DateTime<Utc>) -> &DeloadOverlay {
        if self.state.overlay.is_expired(now) {
            self.dispatch(TrainingEvent::DayBoundary, now);
        }
        &self.state.overlay
    }

    /// Whether a recommendation should be surfaced to the user
    pub fn should_show_deload_banner(
        &mut self,
        recommendation: &DeloadRecommendation,
        now: DateTime<Utc>,
    ) -> bool {
        let overlay = self.overlay(now);
        recommendation.needs_deload && !overlay.is_dismissed && !overlay.is_in_deload_week
    }
}
