//! Serde model for raw NASA POWER point downloads.
//!
//! One dump is a GeoJSON-shaped object with `geometry.coordinates = [lon, lat]`
//! and `properties.parameter = {param_id: {"YYYYMMDD": value, ...}, ...}`.
//! The service's fill sentinel marks missing days and is normalized away here.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Fill value the POWER service uses for missing readings.
pub const FILL_VALUE: f64 = -999.0;

pub(crate) const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Deserialize)]
pub struct PointDump {
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    /// `[lon, lat]`, possibly followed by an elevation element.
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Properties {
    /// Parameter id to `"YYYYMMDD" -> value` daily map.
    pub parameter: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PointDump {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Latitude and longitude of the sampled point, when the dump carries a
    /// well-formed coordinate pair.
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        match self.geometry.coordinates.as_slice() {
            [lon, lat, ..] => Some((*lat, *lon)),
            _ => None,
        }
    }
}

/// All loaded parameter series for one sampled location.
///
/// Produced by merging every raw file registered for the location; immutable
/// afterwards and shared behind an `Arc` by the series cache.
#[derive(Debug, Default, Clone)]
pub struct ParameterStore {
    pub lat: f64,
    pub lon: f64,
    parameters: HashMap<String, super::daily_series::DailySeries>,
}

impl ParameterStore {
    pub fn series(&self, parameter: &str) -> Option<&super::daily_series::DailySeries> {
        self.parameters.get(parameter)
    }

    pub fn parameter_ids(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Merges one raw dump into the store. Overlapping dates for the same
    /// parameter are overwritten, so callers apply dumps in file order to get
    /// last-file-wins semantics. A sentinel in a later file clears the value a
    /// previous file recorded for that date.
    pub fn merge_dump(&mut self, dump: &PointDump) {
        if let Some((lat, lon)) = dump.lat_lon() {
            self.lat = lat;
            self.lon = lon;
        }
        for (param_id, days) in &dump.properties.parameter {
            let series = self.parameters.entry(param_id.clone()).or_default();
            for (date_str, value) in days {
                let Ok(date) = NaiveDate::parse_from_str(date_str, DATE_FORMAT) else {
                    log::debug!("skipping unparsable date key '{}' for {}", date_str, param_id);
                    continue;
                };
                if *value == FILL_VALUE {
                    series.remove(date);
                } else {
                    series.insert(date, *value);
                }
            }
        }
    }
}
