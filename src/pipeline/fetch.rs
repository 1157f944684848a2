//! Raw-dump acquisition against the NASA POWER API.
//!
//! The core never needs the network; these helpers exist so the batch side
//! can refresh a location's `raw/` directory. Requests are chunked by year
//! span because the API caps how much daily data one call may cover.

use crate::params::ParameterConfig;
use crate::pipeline::error::PipelineError;
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio_util::io::StreamReader;

pub const POWER_BASE_URL: &str = "https://power.larc.nasa.gov/api";

/// Global options for POWER API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerOptions {
    pub community: String,
    pub temporal: String,
    pub units: String,
    pub max_year_span: i32,
}

/// Area of interest: either a sampled point (center) or a bounded region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `[lat, lon]` for point extraction.
    #[serde(default)]
    pub center: Option<[f64; 2]>,
    /// `[lat_min, lon_min, lat_max, lon_max]` for region extraction.
    #[serde(default)]
    pub bounding_box: Option<[f64; 4]>,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

/// One fully-built API call for a chunk of years.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub area_key: String,
    pub years: RangeInclusive<i32>,
}

impl FetchRequest {
    pub fn years_label(&self) -> String {
        format!("{}_{}", self.years.start(), self.years.end())
    }
}

/// Consecutive year ranges honoring the API's span cap.
pub fn iter_year_chunks(
    start_year: i32,
    end_year: i32,
    span: i32,
) -> impl Iterator<Item = RangeInclusive<i32>> {
    let span = span.max(1);
    let mut current = start_year;
    std::iter::from_fn(move || {
        if current > end_year {
            return None;
        }
        let chunk_end = (current + span - 1).min(end_year);
        let chunk = current..=chunk_end;
        current = chunk_end + 1;
        Some(chunk)
    })
}

/// Builds the request for one area and year chunk. Regions go to the region
/// endpoint with a bounding box; everything else is point extraction, which
/// requires a center.
pub fn build_request(
    options: &PowerOptions,
    parameters: &[ParameterConfig],
    area_key: &str,
    area: &Area,
    years: RangeInclusive<i32>,
    output_format: &str,
) -> Result<FetchRequest, PipelineError> {
    let parameter_ids: Vec<&str> = parameters.iter().map(|p| p.id.as_str()).collect();
    let mut params: Vec<(String, String)> = vec![
        ("community".into(), options.community.clone()),
        ("parameters".into(), parameter_ids.join(",")),
        ("start".into(), format!("{}0101", years.start())),
        ("end".into(), format!("{}1231", years.end())),
        ("format".into(), output_format.to_string()),
        ("units".into(), options.units.clone()),
    ];

    let endpoint = if let Some(bbox) = area.bounding_box {
        params.push((
            "boundingBox".into(),
            bbox.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ));
        format!("{}/temporal/{}/region", POWER_BASE_URL, options.temporal)
    } else {
        let [lat, lon] = area
            .center
            .ok_or_else(|| PipelineError::MissingCenter(area_key.to_string()))?;
        params.push(("latitude".into(), lat.to_string()));
        params.push(("longitude".into(), lon.to_string()));
        format!("{}/temporal/{}/point", POWER_BASE_URL, options.temporal)
    };

    Ok(FetchRequest {
        endpoint,
        params,
        area_key: area_key.to_string(),
        years,
    })
}

/// Writes raw API responses into an area's structured output directory.
#[derive(Debug, Clone)]
pub struct RawDumpWriter {
    base_dir: PathBuf,
}

impl RawDumpWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.base_dir.join("raw")
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.base_dir.join("manifests")
    }

    pub async fn ensure_dirs(&self) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(self.raw_dir()).await?;
        tokio::fs::create_dir_all(self.manifest_dir()).await?;
        Ok(())
    }

    /// Timestamped target path for one downloaded chunk.
    pub fn target(&self, area: &str, years_label: &str, suffix: &str) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        self.raw_dir()
            .join(format!("{area}__{years_label}__{timestamp}.{suffix}"))
    }

    pub async fn write_manifest(&self, name: &str, content: &str) -> Result<PathBuf, PipelineError> {
        let target = self.manifest_dir().join(name);
        tokio::fs::write(&target, content).await?;
        Ok(target)
    }
}

/// Executes one request and streams the response body to the writer's raw
/// directory. Returns the path of the written file.
pub async fn fetch_chunk(
    client: &reqwest::Client,
    request: &FetchRequest,
    writer: &RawDumpWriter,
) -> Result<PathBuf, PipelineError> {
    log::info!(
        "fetching {} for {} ({})",
        request.endpoint,
        request.area_key,
        request.years_label()
    );

    let response = client
        .get(&request.endpoint)
        .query(&request.params)
        .send()
        .await
        .map_err(|e| PipelineError::NetworkRequest(request.endpoint.clone(), e))?;
    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            return Err(if let Some(status) = e.status() {
                PipelineError::HttpStatus {
                    url: request.endpoint.clone(),
                    status,
                    source: e,
                }
            } else {
                PipelineError::NetworkRequest(request.endpoint.clone(), e)
            });
        }
    };

    writer.ensure_dirs().await?;
    let target = writer.target(&request.area_key, &request.years_label(), "json");

    let stream = response
        .bytes_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
    let mut reader = StreamReader::new(stream);
    let mut file = tokio::fs::File::create(&target).await?;
    tokio::io::copy(&mut reader, &mut file).await?;

    log::info!("wrote raw dump {}", target.display());
    Ok(target)
}
