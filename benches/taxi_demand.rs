use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taxi_demand::{add_missing_slots, transform_ts_data_into_features_and_target, Observation};

/// Roughly a month of sparse observations over 260 pickup zones.
fn synthetic_observations() -> Vec<Observation> {
    let start: NaiveDateTime = NaiveDate::from_ymd_opt(2022, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    (0..24 * 31)
        .flat_map(|hour| {
            (1..=260u32)
                .filter(move |location| (hour as u32 + location) % 3 != 0)
                .map(move |location| {
                    Observation::new(
                        start + TimeDelta::hours(hour),
                        location,
                        (hour as u32 * 7 + location) % 40,
                    )
                })
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let observations = synthetic_observations();
    let ts_data = add_missing_slots(&observations).unwrap_or_default();

    c.bench_function("add_missing_slots", |b| {
        b.iter(|| add_missing_slots(black_box(&observations)))
    });
    c.bench_function("transform_ts_data_into_features_and_target", |b| {
        b.iter(|| transform_ts_data_into_features_and_target(black_box(&ts_data), 24, 1))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
