use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::NaiveDate;
use vibecast::{score_optimal_range, weighted_score, DailySeries, TimeFilter};

fn fixture_series() -> DailySeries {
    (0..3650)
        .filter_map(|offset| {
            let date = NaiveDate::from_ymd_opt(2010, 1, 1)? + chrono::Duration::days(offset);
            Some((date, 15.0 + (offset % 30) as f64 * 0.5))
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    c.bench_function("score_optimal_range", |b| {
        b.iter(|| score_optimal_range(black_box(27.0), 18.0, 25.0, 2.0))
    });

    let weighted: Vec<(f64, f64)> = (0..16).map(|i| (i as f64 * 6.0, 1.0 + i as f64)).collect();
    c.bench_function("weighted_score", |b| {
        b.iter(|| weighted_score(black_box(&weighted)))
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let series = fixture_series();
    let month = TimeFilter::month(6);
    c.bench_function("aggregate_month_over_10y", |b| {
        b.iter(|| series.aggregate(black_box(&month)))
    });

    let range = TimeFilter::date_range(
        NaiveDate::from_ymd_opt(2013, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2016, 9, 30).unwrap(),
    );
    c.bench_function("aggregate_range_over_10y", |b| {
        b.iter(|| series.aggregate(black_box(&range)))
    });
}

criterion_group!(benches, bench_scoring, bench_aggregation);
criterion_main!(benches);
