// Library interface for LiftRS modules
// This allows integration tests and the CLI to access the core functionality

pub mod config;
pub mod deload;
pub mod error;
pub mod fatigue;
pub mod logging;
pub mod mesocycle;
pub mod models;
pub mod overlay;
pub mod session;
pub mod state;
pub mod storage;
pub mod trend;
pub mod volume;
pub mod weekly;

// Re-export commonly used types for convenience
pub use models::*;
pub use deload::{
    analyze_deload_need, apply_deload_to_exercises, get_deload_config, DeloadAnalyzer,
    DeloadConfig, DeloadRecommendation, DeloadSignal, SignalKind, SignalSeverity,
};
pub use fatigue::{FatigueTracker, MuscleFatigue};
pub use mesocycle::{
    MesoCycle, MesoCycleGenerator, MesoCycleHistory, MesoCyclePlan, MesoCycleStatus,
    MesoCycleWeek, MusclePriority, TrainingProgram, WeekStatus,
};
pub use overlay::DeloadOverlay;
pub use session::TrainingSession;
pub use state::{PersistEffect, StorageKey, TrainingEvent, TrainingState, Transition};
pub use storage::{EffectExecutor, KeyValueStore, MemoryStore, SqliteStore};
pub use volume::{VolumeLandmark, VolumeLedger, VolumeStatus};
pub use weekly::{WeeklyAggregator, WeeklySummary};
pub use error::{LiftRsError, Result, StorageError};
pub use logging::{LogConfig, LogFormat, LogLevel};
