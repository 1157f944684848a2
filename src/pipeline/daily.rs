//! Raw point dump to daily-resolution DataFrame.

use crate::pipeline::error::PipelineError;
use crate::series::error::SeriesError;
use crate::series::point_dump::{PointDump, DATE_FORMAT, FILL_VALUE};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;

pub const DATE_COLUMN: &str = "date";

/// Reads one raw dump file into a daily frame. See [`daily_frame`].
pub fn load_point_json(path: &Path) -> Result<DataFrame, PipelineError> {
    log::debug!("loading point JSON: {}", path.display());
    let bytes =
        std::fs::read(path).map_err(|e| SeriesError::FileRead(path.to_path_buf(), e))?;
    let dump = PointDump::from_slice(&bytes).map_err(|e| SeriesError::DataCorrupt {
        path: path.to_path_buf(),
        source: e,
    })?;
    daily_frame(&dump)
}

/// Builds a date-sorted daily DataFrame from a parsed dump: one `date` column
/// over the union of every parameter's dates, one Float64 column per
/// parameter. Sentinel readings and dates a parameter lacks become nulls.
pub fn daily_frame(dump: &PointDump) -> Result<DataFrame, PipelineError> {
    let mut all_dates: BTreeSet<NaiveDate> = BTreeSet::new();
    for days in dump.properties.parameter.values() {
        for date_str in days.keys() {
            if let Ok(date) = NaiveDate::parse_from_str(date_str, DATE_FORMAT) {
                all_dates.insert(date);
            }
        }
    }

    // NaiveDate::default() is the Unix epoch.
    let epoch = NaiveDate::default();
    let days_since_epoch: Vec<i32> = all_dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(dump.properties.parameter.len() + 1);
    columns.push(
        Int32Chunked::from_vec(DATE_COLUMN.into(), days_since_epoch)
            .into_date()
            .into_series()
            .into_column(),
    );

    for (param_id, days) in &dump.properties.parameter {
        let values = all_dates.iter().map(|d| {
            days.get(&d.format(DATE_FORMAT).to_string())
                .copied()
                .filter(|v| *v != FILL_VALUE)
        });
        columns.push(
            Float64Chunked::from_iter_options(param_id.as_str().into(), values)
                .into_series()
                .into_column(),
        );
    }

    Ok(DataFrame::new(columns)?)
}
