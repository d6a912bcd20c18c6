use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use liftrs::{
    deload, weekly, LoggedSet, MesoCyclePlan, MuscleGroup, TrainingEvent, TrainingState,
    WorkoutFeedback, WorkoutRecord,
};
use std::collections::BTreeMap;

/// Benchmarks for deload analysis and state transitions
///
/// Analysis is recomputed from the full history on every call, so these
/// track how it scales with history length.

fn bench_deload_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Deload Analysis");
    let today = bench_today();

    for &days in &[14, 42, 180, 730] {
        let (workouts, feedback) = create_history(days);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(
            BenchmarkId::new("analyze_deload_need", days),
            &(workouts, feedback),
            |b, (workouts, feedback)| {
                b.iter(|| deload::analyze_deload_need(black_box(workouts), black_box(feedback), today));
            },
        );
    }

    group.finish();
}

fn bench_weekly_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Weekly Aggregation");
    let today = bench_today();

    for &days in &[42, 365] {
        let (workouts, feedback) = create_history(days);

        group.bench_with_input(
            BenchmarkId::new("summarize", days),
            &(workouts, feedback),
            |b, (workouts, feedback)| {
                b.iter(|| {
                    weekly::WeeklyAggregator::summarize(
                        black_box(workouts),
                        black_box(feedback),
                        today,
                        weekly::DEFAULT_WINDOW_COUNT,
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_workout_transition(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 12, 1, 18, 0, 0).unwrap();
    let plan = MesoCyclePlan {
        name: "Bench Block".to_string(),
        total_weeks: 6,
        workouts_per_week: 5,
        muscle_priorities: BTreeMap::new(),
        volume_increment_per_week: 2,
    };

    let state = TrainingState::new().apply(TrainingEvent::CreateMesoCycle(plan), now).state;
    let id = state
        .mesocycles
        .latest_planned()
        .map(|c| c.id.clone())
        .unwrap_or_default();
    let state = state.apply(TrainingEvent::StartMesoCycle { id }, now).state;
    let record = create_workout(0, bench_today());

    c.bench_function("record_workout_completion", |b| {
        b.iter(|| state.apply(TrainingEvent::RecordWorkoutCompletion(black_box(record.clone())), now));
    });
}

fn bench_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
}

fn create_workout(index: usize, date: NaiveDate) -> WorkoutRecord {
    let lifts = [
        ("Bench Press", MuscleGroup::Chest, 185.0),
        ("Barbell Row", MuscleGroup::Back, 155.0),
        ("Squat", MuscleGroup::Quads, 275.0),
        ("Curl", MuscleGroup::Biceps, 35.0),
    ];

    let sets = lifts
        .iter()
        .flat_map(|&(name, muscle, weight)| {
            (0..4).map(move |set| LoggedSet {
                exercise_name: name.to_string(),
                muscle_group: muscle,
                weight: weight + (index % 5) as f64 * 2.5,
                reps: 8 + set % 2,
                completed: true,
            })
        })
        .collect();

    WorkoutRecord::new(format!("bench-{}", index), date, sets)
}

fn create_history(days: usize) -> (Vec<WorkoutRecord>, Vec<WorkoutFeedback>) {
    let today = bench_today();
    let mut workouts = Vec::new();
    let mut feedback = Vec::new();

    for i in 0..days {
        // Rest every third day
        if i % 3 == 2 {
            continue;
        }
        let date = today - Duration::days(i as i64);
        let workout = create_workout(i, date);
        if let Ok(entry) = WorkoutFeedback::new(workout.id.clone(), date, (i % 3) as u8, 1, (i % 4) as u8, None) {
            feedback.push(entry);
        }
        workouts.push(workout);
    }

    (workouts, feedback)
}

criterion_group!(
    benches,
    bench_deload_analysis,
    bench_weekly_aggregation,
    bench_workout_transition
);
criterion_main!(benches);
