//! Daily table to monthly statistics, with derived comfort indices.

use crate::params::{AggregationMethod, ParameterConfig};
use crate::pipeline::daily::DATE_COLUMN;
use crate::pipeline::error::PipelineError;
use polars::prelude::*;
use std::collections::HashSet;

pub const MONTH_COLUMN: &str = "month";
pub const CLOUD_FRACTION: &str = "CLOUD_FRACTION";
pub const RAINY_DAY_COUNT: &str = "RAINY_DAY_COUNT";
pub const RAINY_DAY_FRACTION: &str = "RAINY_DAY_FRACTION";
pub const MILD_SCORE: &str = "MILD_SCORE";
pub const STARGAZING_SCORE: &str = "STARGAZING_SCORE";

const ALLSKY: &str = "ALLSKY_SFC_SW_DWN";
const CLEARSKY: &str = "CLRSKY_SFC_SW_DWN";
const PRECIPITATION: &str = "PRECTOTCORR";
const TEMPERATURE: &str = "T2M";
const HUMIDITY: &str = "RH2M";

const RAINY_DAY_THRESHOLD_MM: f64 = 1.0;
const MILD_OPTIMAL_MIN_C: f64 = 18.0;
const MILD_OPTIMAL_MAX_C: f64 = 25.0;

const DAYS_WITH_DATA: &str = "__days_with_data";

/// Collapses a daily table into one row per calendar month, keyed by the
/// month-start date and sorted ascending.
///
/// Each configured parameter present in the table is aggregated with its
/// declared method. Derived indices are appended afterwards; an index whose
/// source columns are missing is either skipped or filled with nulls, never
/// an error. `CLOUD_FRACTION` is always emitted so downstream readers get a
/// stable schema.
pub fn compute_monthly_statistics(
    daily: &DataFrame,
    parameters: &[ParameterConfig],
) -> Result<DataFrame, PipelineError> {
    if daily.height() == 0 {
        return Err(PipelineError::EmptyDailyTable);
    }

    let mut aggregated: HashSet<&str> = HashSet::new();
    let mut aggs: Vec<Expr> = Vec::new();
    for param in parameters {
        if daily.column(&param.id).is_err() {
            log::debug!("parameter {} absent from daily table, skipping", param.id);
            continue;
        }
        let source = col(param.id.as_str());
        aggs.push(match param.method() {
            AggregationMethod::Mean => source.mean(),
            AggregationMethod::Sum => source.sum(),
            AggregationMethod::Min => source.min(),
            AggregationMethod::Max => source.max(),
        });
        aggregated.insert(param.id.as_str());
    }

    let has_precipitation = daily.column(PRECIPITATION).is_ok();
    if has_precipitation {
        aggs.push(
            col(PRECIPITATION)
                .gt_eq(lit(RAINY_DAY_THRESHOLD_MM))
                .sum()
                .alias(RAINY_DAY_COUNT),
        );
        aggs.push(col(PRECIPITATION).is_not_null().sum().alias(DAYS_WITH_DATA));
    }

    let mut lazy = daily
        .clone()
        .lazy()
        .with_columns([col(DATE_COLUMN)
            .dt()
            .truncate(lit("1mo"))
            .alias(MONTH_COLUMN)])
        .group_by([col(MONTH_COLUMN)])
        .agg(aggs)
        .sort([MONTH_COLUMN], Default::default());

    lazy = lazy.with_columns([cloud_fraction_expr(
        aggregated.contains(ALLSKY) && aggregated.contains(CLEARSKY),
    )]);

    let mut derived: Vec<Expr> = Vec::new();
    if has_precipitation {
        derived.push(
            (col(RAINY_DAY_COUNT).cast(DataType::Float64)
                / col(DAYS_WITH_DATA).cast(DataType::Float64))
            .round(4)
            .alias(RAINY_DAY_FRACTION),
        );
    }
    if aggregated.contains(TEMPERATURE) {
        derived.push(mild_score_expr());
    }
    if aggregated.contains(HUMIDITY) {
        derived.push(stargazing_score_expr());
    }
    if !derived.is_empty() {
        lazy = lazy.with_columns(derived);
    }
    if has_precipitation {
        lazy = lazy.drop([DAYS_WITH_DATA]);
    }

    Ok(lazy.collect()?)
}

/// `clip(1 - allsky/clearsky, 0, 1)`; 0 when the clear-sky reading is zero or
/// missing, all-null when the source columns were never extracted.
fn cloud_fraction_expr(sources_present: bool) -> Expr {
    if !sources_present {
        return lit(NULL).cast(DataType::Float64).alias(CLOUD_FRACTION);
    }
    when(
        col(CLEARSKY)
            .is_null()
            .or(col(CLEARSKY).eq(lit(0.0)))
            .or(col(ALLSKY).is_null()),
    )
    .then(lit(0.0))
    .otherwise((lit(1.0) - col(ALLSKY) / col(CLEARSKY)).clip(lit(0.0), lit(1.0)))
    .alias(CLOUD_FRACTION)
}

/// Triangular comfort score on monthly temperature: 100 at the midpoint of
/// the mild band, falling linearly to 0 at the band edges.
fn mild_score_expr() -> Expr {
    let midpoint = (MILD_OPTIMAL_MIN_C + MILD_OPTIMAL_MAX_C) / 2.0;
    let half_width = (MILD_OPTIMAL_MAX_C - MILD_OPTIMAL_MIN_C) / 2.0;
    ((lit(1.0) - (col(TEMPERATURE) - lit(midpoint)).abs() / lit(half_width))
        .clip(lit(0.0), lit(1.0))
        * lit(100.0))
    .round(2)
    .alias(MILD_SCORE)
}

/// `clip((1 - cloud_fraction) * (1 - humidity/100), 0, 1) * 100`; 0 when
/// either input is missing for the month.
fn stargazing_score_expr() -> Expr {
    when(col(CLOUD_FRACTION).is_null().or(col(HUMIDITY).is_null()))
        .then(lit(0.0))
        .otherwise(
            ((lit(1.0) - col(CLOUD_FRACTION).clip(lit(0.0), lit(1.0)))
                * (lit(1.0) - col(HUMIDITY).clip(lit(0.0), lit(100.0)) / lit(100.0)))
            .clip(lit(0.0), lit(1.0))
                * lit(100.0),
        )
        .round(2)
        .alias(STARGAZING_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::daily::daily_frame;
    use crate::series::point_dump::PointDump;

    fn params() -> Vec<ParameterConfig> {
        vec![
            ParameterConfig::new("T2M", "mean"),
            ParameterConfig::new("PRECTOTCORR", "sum"),
            ParameterConfig::new("T2M_MIN", "min"),
            ParameterConfig::new("T2M_MAX", "max"),
            ParameterConfig::new("ALLSKY_SFC_SW_DWN", "mean"),
            ParameterConfig::new("CLRSKY_SFC_SW_DWN", "mean"),
            ParameterConfig::new("RH2M", "mean"),
        ]
    }

    fn daily_fixture() -> DataFrame {
        // January: mild temps, one rainy day of two observed, clear skies.
        // February: one day, overcast and humid, clear-sky reading of zero.
        let dump = PointDump::from_slice(
            br#"{
            "geometry": {"coordinates": [13.4, 52.5]},
            "properties": {"parameter": {
                "T2M": {"20240110": 20.0, "20240120": 23.0, "20240201": 11.0},
                "T2M_MIN": {"20240110": 15.0, "20240120": 12.0, "20240201": 8.0},
                "T2M_MAX": {"20240110": 24.0, "20240120": 28.0, "20240201": 13.0},
                "PRECTOTCORR": {"20240110": 5.0, "20240120": 0.2, "20240201": 1.0},
                "ALLSKY_SFC_SW_DWN": {"20240110": 4.0, "20240120": 4.0, "20240201": 1.0},
                "CLRSKY_SFC_SW_DWN": {"20240110": 5.0, "20240120": 5.0, "20240201": 0.0},
                "RH2M": {"20240110": 50.0, "20240120": 50.0, "20240201": 90.0}
            }}
        }"#,
        )
        .unwrap();
        daily_frame(&dump).unwrap()
    }

    fn f64_at(df: &DataFrame, column: &str, row: usize) -> Option<f64> {
        df.column(column).unwrap().f64().unwrap().get(row)
    }

    #[test]
    fn one_row_per_month_sorted() {
        let monthly = compute_monthly_statistics(&daily_fixture(), &params()).unwrap();
        assert_eq!(monthly.height(), 2);
        assert!(monthly.column(MONTH_COLUMN).is_ok());
    }

    #[test]
    fn applies_declared_aggregation_methods() {
        let monthly = compute_monthly_statistics(&daily_fixture(), &params()).unwrap();
        assert_eq!(f64_at(&monthly, "T2M", 0), Some(21.5));
        assert_eq!(f64_at(&monthly, "PRECTOTCORR", 0), Some(5.2));
        assert_eq!(f64_at(&monthly, "T2M_MIN", 0), Some(12.0));
        assert_eq!(f64_at(&monthly, "T2M_MAX", 0), Some(28.0));
    }

    #[test]
    fn unknown_aggregation_defaults_to_mean() {
        let params = vec![ParameterConfig::new("T2M", "median")];
        let monthly = compute_monthly_statistics(&daily_fixture(), &params).unwrap();
        assert_eq!(f64_at(&monthly, "T2M", 0), Some(21.5));
    }

    #[test]
    fn rainy_day_count_and_fraction() {
        let monthly = compute_monthly_statistics(&daily_fixture(), &params()).unwrap();
        let counts = monthly.column(RAINY_DAY_COUNT).unwrap();
        assert_eq!(counts.get(0).unwrap().try_extract::<i64>().unwrap(), 1);
        assert_eq!(counts.get(1).unwrap().try_extract::<i64>().unwrap(), 1);
        assert_eq!(f64_at(&monthly, RAINY_DAY_FRACTION, 0), Some(0.5));
        assert_eq!(f64_at(&monthly, RAINY_DAY_FRACTION, 1), Some(1.0));
    }

    #[test]
    fn cloud_fraction_clips_and_handles_zero_clearsky() {
        let monthly = compute_monthly_statistics(&daily_fixture(), &params()).unwrap();
        let january = f64_at(&monthly, CLOUD_FRACTION, 0).unwrap();
        assert!((january - 0.2).abs() < 1e-9);
        // February's clear-sky aggregate is zero, which scores as cloudless
        // rather than dividing by zero.
        assert_eq!(f64_at(&monthly, CLOUD_FRACTION, 1), Some(0.0));
    }

    #[test]
    fn mild_score_peaks_at_band_midpoint() {
        let monthly = compute_monthly_statistics(&daily_fixture(), &params()).unwrap();
        // January mean of 21.5 C sits exactly on the midpoint.
        assert_eq!(f64_at(&monthly, MILD_SCORE, 0), Some(100.0));
        // February's 11 C is far below the band.
        assert_eq!(f64_at(&monthly, MILD_SCORE, 1), Some(0.0));
    }

    #[test]
    fn stargazing_combines_clarity_and_dryness() {
        let monthly = compute_monthly_statistics(&daily_fixture(), &params()).unwrap();
        // January: (1 - 0.2) * (1 - 0.5) = 0.4.
        assert_eq!(f64_at(&monthly, STARGAZING_SCORE, 0), Some(40.0));
        // February: cloud fraction 0, humidity 90 -> 10.
        assert_eq!(f64_at(&monthly, STARGAZING_SCORE, 1), Some(10.0));
    }

    #[test]
    fn missing_sources_yield_null_cloud_fraction() {
        let dump = PointDump::from_slice(
            br#"{
            "geometry": {"coordinates": [0.0, 0.0]},
            "properties": {"parameter": {"T2M": {"20240101": 21.5}}}
        }"#,
        )
        .unwrap();
        let daily = daily_frame(&dump).unwrap();
        let monthly =
            compute_monthly_statistics(&daily, &[ParameterConfig::new("T2M", "mean")]).unwrap();

        assert_eq!(f64_at(&monthly, CLOUD_FRACTION, 0), None);
        assert!(monthly.column(RAINY_DAY_COUNT).is_err());
        assert!(monthly.column(STARGAZING_SCORE).is_err());
        assert_eq!(f64_at(&monthly, MILD_SCORE, 0), Some(100.0));
    }

    #[test]
    fn empty_daily_table_is_an_error() {
        let dump = PointDump::from_slice(
            br#"{"geometry": {"coordinates": [0.0, 0.0]},
                 "properties": {"parameter": {"T2M": {}}}}"#,
        )
        .unwrap();
        let daily = daily_frame(&dump).unwrap();
        let err = compute_monthly_statistics(&daily, &params()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDailyTable));
    }
}
