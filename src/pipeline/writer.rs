//! Persists monthly tables and drives the per-location batch run.

use crate::locations::location_index::{Location, LocationIndex};
use crate::params::ParameterConfig;
use crate::pipeline::daily::load_point_json;
use crate::pipeline::error::PipelineError;
use crate::pipeline::monthly::{compute_monthly_statistics, MONTH_COLUMN};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of one location's batch run.
#[derive(Debug)]
pub struct LocationSummary {
    pub location_id: String,
    pub per_file_tables: usize,
    pub skipped_files: usize,
    pub combined_parquet: PathBuf,
    pub combined_csv: PathBuf,
    pub months: usize,
}

pub fn write_monthly_csv(df: &mut DataFrame, destination: &Path) -> Result<(), PipelineError> {
    ensure_parent(destination)?;
    let mut file = std::fs::File::create(destination)
        .map_err(|e| PipelineError::ArtifactIo(destination.to_path_buf(), e))?;
    CsvWriter::new(&mut file).finish(df)?;
    log::info!("wrote monthly summary: {}", destination.display());
    Ok(())
}

pub fn write_monthly_parquet(df: &mut DataFrame, destination: &Path) -> Result<(), PipelineError> {
    ensure_parent(destination)?;
    let file = std::fs::File::create(destination)
        .map_err(|e| PipelineError::ArtifactIo(destination.to_path_buf(), e))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)?;
    log::info!("wrote monthly summary: {}", destination.display());
    Ok(())
}

/// Writes parquet through a temp file in the destination directory and
/// renames it into place, so online readers only ever see a complete
/// artifact.
pub fn write_monthly_parquet_atomic(
    df: &mut DataFrame,
    destination: &Path,
) -> Result<(), PipelineError> {
    ensure_parent(destination)?;
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| PipelineError::ArtifactIo(destination.to_path_buf(), e))?;
    ParquetWriter::new(temp.as_file_mut())
        .with_compression(ParquetCompression::Snappy)
        .finish(df)?;
    temp.persist(destination)
        .map_err(|e| PipelineError::AtomicReplace(destination.to_path_buf(), e))?;
    log::info!("wrote monthly summary: {}", destination.display());
    Ok(())
}

fn ensure_parent(destination: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| PipelineError::ArtifactIo(destination.to_path_buf(), e))?;
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chunk")
        .to_string()
}

/// Aggregates every raw file of one location into monthly tables under
/// `output_dir`, then writes the combined all-months artifact sorted by
/// month.
///
/// A file that fails to parse or holds no data is logged and skipped; one bad
/// chunk must not block the rest of the batch. Returns `None` when no file
/// produced a table. The combined parquet is replaced atomically since the
/// online side may read it while the batch runs.
pub fn aggregate_location(
    location: &Location,
    parameters: &[ParameterConfig],
    output_dir: &Path,
) -> Result<Option<LocationSummary>, PipelineError> {
    let mut tables: Vec<DataFrame> = Vec::new();
    let mut skipped = 0usize;

    for path in &location.files {
        let table = load_point_json(path).and_then(|daily| {
            compute_monthly_statistics(&daily, parameters)
        });
        let mut monthly = match table {
            Ok(monthly) => monthly,
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };

        let stem = file_stem(path);
        write_monthly_csv(
            &mut monthly,
            &output_dir.join("csv").join(format!("{}__{}.csv", location.id, stem)),
        )?;
        write_monthly_parquet(
            &mut monthly,
            &output_dir
                .join("parquet")
                .join(format!("{}__{}.parquet", location.id, stem)),
        )?;
        tables.push(monthly);
    }

    if tables.is_empty() {
        log::warn!("no JSON files processed for {}", location.id);
        return Ok(None);
    }

    let per_file_tables = tables.len();
    let lazy_tables: Vec<LazyFrame> = tables.into_iter().map(|df| df.lazy()).collect();
    let mut combined = concat(lazy_tables, UnionArgs::default())?
        .sort([MONTH_COLUMN], Default::default())
        .collect()?;

    let combined_parquet = output_dir.join(format!("{}__monthly_summary.parquet", location.id));
    let combined_csv = output_dir.join(format!("{}__monthly_summary.csv", location.id));
    write_monthly_parquet_atomic(&mut combined, &combined_parquet)?;
    write_monthly_csv(&mut combined, &combined_csv)?;

    Ok(Some(LocationSummary {
        location_id: location.id.clone(),
        per_file_tables,
        skipped_files: skipped,
        combined_parquet,
        combined_csv,
        months: combined.height(),
    }))
}

/// Runs the batch over every indexed location, writing next to each
/// location's raw data (`.../<id>_point/monthly/`). The run is assumed
/// exclusive per output tree.
pub async fn run_monthly_pipeline(
    index: &LocationIndex,
    parameters: &[ParameterConfig],
    data_dir: &Path,
) -> Result<Vec<LocationSummary>, PipelineError> {
    let locations: Vec<Location> = index.iter().cloned().collect();
    let parameters = parameters.to_vec();
    let data_dir = data_dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let mut summaries = Vec::new();
        for location in &locations {
            let output_dir = data_dir
                .join("outputs")
                .join(format!("{}_point", location.id))
                .join("monthly");
            match aggregate_location(location, &parameters, &output_dir)? {
                Some(summary) => {
                    log::info!(
                        "aggregated {}: {} months from {} files ({} skipped)",
                        summary.location_id,
                        summary.months,
                        summary.per_file_tables,
                        summary.skipped_files
                    );
                    summaries.push(summary);
                }
                None => continue,
            }
        }
        Ok(summaries)
    })
    .await?
}
