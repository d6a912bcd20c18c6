use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use liftrs::config::AppConfig;
use liftrs::deload::get_deload_config;
use liftrs::logging::init_logging;
use liftrs::mesocycle::{MesoCycle, MesoCycleStatus, MusclePriority, TrainingProgram, WeekStatus};
use liftrs::models::{MuscleGroup, WorkoutFeedback, WorkoutRecord};
use liftrs::session::TrainingSession;
use liftrs::state::TrainingEvent;
use liftrs::storage::SqliteStore;
use liftrs::volume::{VolumeLandmark, VolumeStatus};
use liftrs::{DeloadRecommendation, SignalSeverity};

/// LiftRS - Deload Detection and Mesocycle Planning CLI
///
/// Tracks weekly training volume per muscle, plans periodized mesocycles,
/// and scores workout history for signs that a deload week is due.
#[derive(Parser)]
#[command(name = "liftrs")]
#[command(author = "LiftRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Deload detection and mesocycle planning CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the database path from the config
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score workout history for deload need
    Analyze {
        /// JSON file with an array of workout records
        #[arg(short = 'H', long)]
        history: PathBuf,

        /// Analysis date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Print the recommendation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record workouts
    Workout {
        #[command(subcommand)]
        action: WorkoutAction,
    },

    /// Record post-workout feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Plan and run mesocycles
    Meso {
        #[command(subcommand)]
        action: MesoAction,
    },

    /// Show this week's volume per muscle
    Volume,

    /// Manual deload week
    Overlay {
        #[command(subcommand)]
        action: OverlayAction,
    },

    /// Configure application settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum WorkoutAction {
    /// Count a finished workout toward volume, fatigue and the active mesocycle
    Complete {
        /// JSON file with one workout record
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum FeedbackAction {
    /// Add feedback for a workout
    Add {
        /// Workout the feedback belongs to
        #[arg(short, long)]
        workout: String,

        /// Pump rating (0-2)
        #[arg(long)]
        pump: u8,

        /// Soreness rating (0-2)
        #[arg(long)]
        soreness: u8,

        /// Performance rating (0 = beat target, 3 = missed target)
        #[arg(long)]
        performance: u8,

        /// General fatigue rating (0-2)
        #[arg(long)]
        fatigue: Option<u8>,

        /// Feedback date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum MesoAction {
    /// Plan a new mesocycle
    Create {
        /// Mesocycle name
        #[arg(short, long, default_value = "Mesocycle")]
        name: String,

        /// Build from a JSON program template instead of priorities
        #[arg(short, long, conflicts_with_all = ["weeks", "per_week", "increment", "focus", "maintain"])]
        program: Option<PathBuf>,

        /// Number of weeks including the deload week
        #[arg(short, long)]
        weeks: Option<u32>,

        /// Workouts per week
        #[arg(long)]
        per_week: Option<u32>,

        /// Sets added per muscle each week
        #[arg(long)]
        increment: Option<u32>,

        /// Muscles to emphasize (comma separated)
        #[arg(long, value_delimiter = ',')]
        focus: Vec<String>,

        /// Muscles to hold at maintenance (comma separated)
        #[arg(long, value_delimiter = ',')]
        maintain: Vec<String>,
    },

    /// Start a planned mesocycle (default: the most recently planned)
    Start {
        #[arg(long)]
        id: Option<String>,
    },

    /// Close the current week
    Advance,

    /// Turn the current week into a deload week
    Deload,

    /// Stop the active mesocycle early
    Abandon,

    /// Mark the active mesocycle completed
    Complete,

    /// Show the active mesocycle
    Status,
}

#[derive(Subcommand)]
enum OverlayAction {
    /// Begin a seven-day deload window
    Start,
    /// End the deload window
    End,
    /// Hide deload recommendations
    Dismiss,
    /// Clear all overlay state
    Reset,
    /// Show overlay state
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init,
}

#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Muscle")]
    muscle: String,
    #[tabled(rename = "Sets")]
    sets: u32,
    #[tabled(rename = "Target")]
    target: u32,
    #[tabled(rename = "MEV")]
    mev: u32,
    #[tabled(rename = "MRV")]
    mrv: u32,
    #[tabled(rename = "% MRV")]
    percent_of_mrv: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deload")]
    deload: String,
    #[tabled(rename = "Planned sets")]
    planned: u32,
    #[tabled(rename = "Completed sets")]
    completed: u32,
    #[tabled(rename = "Workouts")]
    workouts: usize,
}

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Points")]
    points: u32,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let log_config = config.logging.clone().with_verbosity(cli.verbose);
    init_logging(&log_config)?;

    if let Commands::Config { action } = &cli.command {
        return run_config(action, &mut config, cli.config.as_deref());
    }

    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.storage.database_path.clone());
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    let mut session = TrainingSession::load(store).with_analyzer(config.analysis.analyzer());

    let now = Utc::now();
    session.dispatch(TrainingEvent::DayBoundary, now);

    match cli.command {
        Commands::Analyze { history, date, json } => {
            let workouts: Vec<WorkoutRecord> = read_json(&history)?;
            let today = date.unwrap_or_else(|| now.date_naive());
            let recommendation = session.analyze(&workouts, today);

            if json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                let show_banner = session.should_show_deload_banner(&recommendation, now);
                print_recommendation(&recommendation, show_banner);
            }
        }

        Commands::Workout {
            action: WorkoutAction::Complete { file },
        } => {
            let record: WorkoutRecord = read_json(&file)?;
            let sets = record.completed_set_count();
            let week_before = session.active_mesocycle().map(|c| c.current_week);

            let state = session.dispatch(TrainingEvent::RecordWorkoutCompletion(record), now);
            println!("{} {} completed sets recorded", "✓".green(), sets);

            if let (Some(before), Some(cycle)) = (week_before, state.active_mesocycle()) {
                if cycle.current_week != before {
                    println!("{}", format!("Week {} complete, now in week {}", before, cycle.current_week).cyan());
                }
            }
            for muscle in state.fatigue.muscles_needing_deload() {
                println!("{} {} fatigue is high", "!".yellow().bold(), muscle);
            }
        }

        Commands::Feedback {
            action:
                FeedbackAction::Add {
                    workout,
                    pump,
                    soreness,
                    performance,
                    fatigue,
                    date,
                },
        } => {
            let date = date.unwrap_or_else(|| now.date_naive());
            let feedback = WorkoutFeedback::new(workout, date, pump, soreness, performance, fatigue)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let score = feedback.total_score;
            session.dispatch(TrainingEvent::SubmitFeedback(feedback), now);
            println!("{} Feedback saved (score {})", "✓".green(), score);
        }

        Commands::Meso { action } => run_meso(action, &mut session, &config, now)?,

        Commands::Volume => print_volume(&session),

        Commands::Overlay { action } => {
            let event = match action {
                OverlayAction::Start => Some(TrainingEvent::StartDeloadOverlay),
                OverlayAction::End => Some(TrainingEvent::EndDeloadOverlay),
                OverlayAction::Dismiss => Some(TrainingEvent::DismissDeloadOverlay),
                OverlayAction::Reset => Some(TrainingEvent::ResetDeloadOverlay),
                OverlayAction::Status => None,
            };
            if let Some(event) = event {
                session.dispatch(event, now);
            }

            let overlay = session.overlay(now);
            match overlay.days_remaining(now) {
                Some(days) => println!("{} ({} days left)", "In deload week".yellow().bold(), days),
                None => println!("{}", "Not in a deload week".green()),
            }
            if let Some(last) = overlay.last_deload_date {
                println!("  Last deload ended: {}", last.format("%Y-%m-%d"));
            }
            if overlay.is_dismissed {
                println!("  {}", "Deload recommendations dismissed".dimmed());
            }
        }

        Commands::Config { action } => run_config(&action, &mut config, cli.config.as_deref())?,
    }

    Ok(())
}

fn run_config(action: &ConfigAction, config: &mut AppConfig, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
        }
        ConfigAction::Init => {
            let path = path
                .map(Path::to_path_buf)
                .unwrap_or_else(AppConfig::default_config_path);
            config.save_to_file(&path)?;
            println!("{} Configuration written to {}", "✓".green(), path.display());
        }
    }
    Ok(())
}

fn run_meso(
    action: MesoAction,
    session: &mut TrainingSession<SqliteStore>,
    config: &AppConfig,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    match action {
        MesoAction::Create {
            name,
            program,
            weeks,
            per_week,
            increment,
            focus,
            maintain,
        } => {
            let event = match program {
                Some(path) => {
                    let program: TrainingProgram = read_json(&path)?;
                    TrainingEvent::CreateMesoCycleFromProgram(program)
                }
                None => {
                    let mut plan = config.mesocycle.plan(name);
                    if let Some(weeks) = weeks {
                        plan.total_weeks = weeks;
                    }
                    if let Some(per_week) = per_week {
                        plan.workouts_per_week = per_week;
                    }
                    if let Some(increment) = increment {
                        plan.volume_increment_per_week = increment;
                    }
                    plan.muscle_priorities = parse_priorities(&focus, &maintain)?;
                    TrainingEvent::CreateMesoCycle(plan)
                }
            };

            let state = session.dispatch(event, now);
            if let Some(cycle) = state.mesocycles.latest_planned() {
                println!("{} Planned \"{}\" ({} weeks)", "✓".green(), cycle.name, cycle.total_weeks);
                println!("  Id: {}", cycle.id);
                print_weeks(cycle);
            }
        }

        MesoAction::Start { id } => {
            let id = match id {
                Some(id) => id,
                None => session
                    .state()
                    .mesocycles
                    .latest_planned()
                    .map(|c| c.id.clone())
                    .context("No planned mesocycle to start")?,
            };
            let state = session.dispatch(TrainingEvent::StartMesoCycle { id: id.clone() }, now);
            match state.active_mesocycle() {
                Some(cycle) if cycle.id == id => {
                    println!("{} Started \"{}\"", "✓".green(), cycle.name)
                }
                Some(cycle) => println!(
                    "{} \"{}\" is already active; finish it first",
                    "✗".red(),
                    cycle.name
                ),
                None => println!("{} Mesocycle {} cannot be started", "✗".red(), id),
            }
        }

        MesoAction::Advance => {
            let before = session.active_mesocycle().map(|c| c.id.clone());
            let state = session.dispatch(TrainingEvent::AdvanceWeek, now);
            match (before, state.active_mesocycle()) {
                (None, _) => println!("{}", "No active mesocycle".yellow()),
                (Some(_), Some(cycle)) => println!("{} Now in week {}", "✓".green(), cycle.current_week),
                (Some(_), None) => println!("{} Mesocycle completed", "✓".green().bold()),
            }
        }

        MesoAction::Deload => {
            if session.active_mesocycle().is_none() {
                println!("{}", "No active mesocycle".yellow());
            } else {
                session.dispatch(TrainingEvent::TriggerDeload, now);
                println!("{} Current week switched to deload volume", "✓".green());
            }
        }

        MesoAction::Abandon => finish_cycle(
            session,
            TrainingEvent::AbandonMesoCycle,
            MesoCycleStatus::Abandoned,
            now,
        ),

        MesoAction::Complete => finish_cycle(
            session,
            TrainingEvent::CompleteMesoCycle,
            MesoCycleStatus::Completed,
            now,
        ),

        MesoAction::Status => match session.active_mesocycle() {
            Some(cycle) => {
                println!(
                    "{} week {}/{} ({:.0}% of workouts done)",
                    cycle.name.bold(),
                    cycle.current_week,
                    cycle.total_weeks,
                    cycle.progress_percent()
                );
                print_weeks(cycle);
            }
            None => println!("{}", "No active mesocycle".yellow()),
        },
    }

    Ok(())
}

fn finish_cycle(
    session: &mut TrainingSession<SqliteStore>,
    event: TrainingEvent,
    status: MesoCycleStatus,
    now: chrono::DateTime<Utc>,
) {
    match session.active_mesocycle().map(|c| c.name.clone()) {
        Some(name) => {
            session.dispatch(event, now);
            println!("{} \"{}\" {}", "✓".green(), name, status);
        }
        None => println!("{}", "No active mesocycle".yellow()),
    }
}

fn parse_priorities(
    focus: &[String],
    maintain: &[String],
) -> Result<BTreeMap<MuscleGroup, MusclePriority>> {
    let mut priorities = BTreeMap::new();
    for (names, priority) in [(focus, MusclePriority::Focus), (maintain, MusclePriority::Maintain)] {
        for name in names {
            let muscle: MuscleGroup = name.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            priorities.insert(muscle, priority);
        }
    }
    // Named muscles alone would narrow the plan, so fill in the rest as normal
    if !priorities.is_empty() {
        for muscle in MuscleGroup::ALL {
            priorities.entry(muscle).or_insert(MusclePriority::Normal);
        }
    }
    Ok(priorities)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_recommendation(recommendation: &DeloadRecommendation, show_banner: bool) {
    let headline = format!("Deload confidence: {}%", recommendation.confidence);
    if recommendation.needs_deload {
        println!("{}", headline.red().bold());
    } else {
        println!("{}", headline.green().bold());
    }
    println!("{}", recommendation.summary);
    println!("  Weeks since last light week: {}", recommendation.weeks_since_last_deload);

    if !recommendation.signals.is_empty() {
        let rows: Vec<SignalRow> = recommendation
            .signals
            .iter()
            .map(|s| SignalRow {
                signal: s.signal.label().to_string(),
                severity: match s.severity {
                    SignalSeverity::High => s.severity.to_string().red().to_string(),
                    SignalSeverity::Medium => s.severity.to_string().yellow().to_string(),
                    SignalSeverity::Low => s.severity.to_string(),
                },
                points: s.points,
                detail: s.description.clone(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if show_banner {
        let deload = get_deload_config(recommendation);
        println!(
            "{}",
            format!(
                "Suggested: {} days at {:.0}% volume and {:.0}% load, max {} sets per exercise{}",
                recommendation.suggested_duration_days,
                deload.volume_multiplier * 100.0,
                deload.intensity_multiplier * 100.0,
                deload.max_sets_per_exercise,
                if deload.remove_finishers { ", no finishers" } else { "" }
            )
            .yellow()
        );
    }
}

fn print_volume(session: &TrainingSession<SqliteStore>) {
    let rows: Vec<VolumeRow> = MuscleGroup::ALL
        .iter()
        .map(|&muscle| {
            let landmark = VolumeLandmark::for_muscle(muscle);
            let status = session.volume_status(muscle);
            let label = status.to_string();
            VolumeRow {
                muscle: muscle.to_string(),
                sets: session.state().volume.sets_for(muscle),
                target: session.recommended_volume(muscle),
                mev: landmark.mev,
                mrv: landmark.mrv,
                percent_of_mrv: format!("{:.0}%", session.percent_of_mrv(muscle)),
                status: match status {
                    VolumeStatus::AtMrv => label.red().to_string(),
                    VolumeStatus::NearMrv => label.yellow().to_string(),
                    VolumeStatus::BelowMev => label.dimmed().to_string(),
                    VolumeStatus::AtMev | VolumeStatus::InMav => label.green().to_string(),
                },
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_weeks(cycle: &MesoCycle) {
    let rows: Vec<WeekRow> = cycle
        .weeks
        .iter()
        .map(|week| WeekRow {
            week: week.week_number,
            status: match week.status {
                WeekStatus::Upcoming => "upcoming".to_string(),
                WeekStatus::InProgress => "in progress".cyan().to_string(),
                WeekStatus::Completed => "completed".green().to_string(),
            },
            deload: if week.is_deload { "yes".to_string() } else { String::new() },
            planned: week.target_volume.values().sum(),
            completed: week.completed_volume.values().sum(),
            workouts: week.workout_ids.len(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}
