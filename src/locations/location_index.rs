//! Catalog of sampled point locations with planar nearest-neighbor and
//! radius lookup over an R-tree.

use crate::locations::error::LocationIndexError;
use crate::series::point_dump::PointDump;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::path::{Path, PathBuf};

/// 1 degree of latitude is roughly 111 km. The backing data is sparse point
/// samples, so the flat, latitude-independent conversion is intentional.
pub const KM_PER_DEGREE: f64 = 111.0;

const POINT_DIR_SUFFIX: &str = "_point";
const RAW_DIR_NAME: &str = "raw";

/// One sampled location: identifier, coordinates, and the raw files that
/// contribute to its time series. Built once at index time, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    /// Source files in stable name order; later files win on date overlap.
    pub files: Vec<PathBuf>,
}

impl RTreeObject for Location {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lon])
    }
}

impl PointDistance for Location {
    /// Squared planar degree distance. Not geodesic; the whole system uses
    /// the same approximation.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlon = self.lon - point[1];
        dlat * dlat + dlon * dlon
    }
}

/// Spatial index over every sampled location found under the data directory.
///
/// The expected layout is the pipeline's output tree:
/// `<data_dir>/outputs/<name>_point/raw/*.json`. Coordinates come from the
/// first parseable raw file of each location; locations with no usable file
/// are skipped with a warning rather than failing the build.
#[derive(Debug, Clone)]
pub struct LocationIndex {
    rtree: RTree<Location>,
}

impl LocationIndex {
    /// Scans `data_dir` and builds the index. The scan is blocking disk work,
    /// so it runs on the blocking pool.
    pub async fn new(data_dir: &Path) -> Result<Self, LocationIndexError> {
        let dir = data_dir.to_path_buf();
        let locations = tokio::task::spawn_blocking(move || Self::scan(&dir)).await??;
        log::info!("indexed {} point locations", locations.len());
        Ok(Self {
            rtree: RTree::bulk_load(locations),
        })
    }

    /// Builds an index from already-known locations. Useful for tests and for
    /// callers that manage their own discovery.
    pub fn from_locations(locations: Vec<Location>) -> Self {
        Self {
            rtree: RTree::bulk_load(locations),
        }
    }

    fn scan(data_dir: &Path) -> Result<Vec<Location>, LocationIndexError> {
        let outputs = data_dir.join("outputs");
        if !outputs.is_dir() {
            log::warn!("data outputs directory not found at {}", outputs.display());
            return Ok(Vec::new());
        }

        let mut locations = Vec::new();
        let entries = std::fs::read_dir(&outputs)
            .map_err(|e| LocationIndexError::DirRead(outputs.clone(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| LocationIndexError::DirRead(outputs.clone(), e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_dir() || !name.ends_with(POINT_DIR_SUFFIX) {
                continue;
            }
            let id = name.trim_end_matches(POINT_DIR_SUFFIX).to_string();
            match Self::scan_location(&id, &path.join(RAW_DIR_NAME)) {
                Some(location) => locations.push(location),
                None => log::warn!("no usable raw data for location '{}', skipping", id),
            }
        }
        Ok(locations)
    }

    fn scan_location(id: &str, raw_dir: &Path) -> Option<Location> {
        let entries = std::fs::read_dir(raw_dir).ok()?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        // First parseable file supplies the coordinates; the rest only need
        // to exist here, the loader parses them on demand.
        for file in &files {
            let Ok(bytes) = std::fs::read(file) else {
                continue;
            };
            match PointDump::from_slice(&bytes) {
                Ok(dump) => {
                    if let Some((lat, lon)) = dump.lat_lon() {
                        return Some(Location {
                            id: id.to_string(),
                            lat,
                            lon,
                            files,
                        });
                    }
                }
                Err(e) => {
                    log::warn!("corrupt raw file {} ({}), trying next", file.display(), e)
                }
            }
        }
        None
    }

    /// The location closest to `(lat, lon)` under planar degree distance, or
    /// `None` for an empty index. Equidistant locations resolve to whichever
    /// the tree visits first; the tie-break is not guaranteed stable across
    /// rebuilds.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<&Location> {
        self.rtree.nearest_neighbor(&[lat, lon])
    }

    /// Every location within `radius_deg` planar degrees of `(lat, lon)`,
    /// sorted nearest first.
    pub fn within_degrees(&self, lat: f64, lon: f64, radius_deg: f64) -> Vec<&Location> {
        let mut hits: Vec<(&Location, f64)> = self
            .rtree
            .locate_within_distance([lat, lon], radius_deg * radius_deg)
            .map(|loc| (loc, loc.distance_2(&[lat, lon])))
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.into_iter().map(|(loc, _)| loc).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.rtree.iter()
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}
