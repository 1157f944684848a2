//! The main entry point for querying climate values and vibe scores.
//!
//! A [`Vibecast`] owns the location index built from a data directory, a
//! bounded cache of per-location parameter stores, and the vibe catalog.
//! Queries resolve a coordinate to the nearest indexed location, load (or
//! reuse) its daily series, and aggregate them through a [`TimeFilter`].

use crate::error::VibecastError;
use crate::locations::location_index::{LocationIndex, KM_PER_DEGREE};
use crate::series::cache::{SeriesCache, DEFAULT_CACHE_CAPACITY};
use crate::series::daily_series::TimeFilter;
use crate::vibes::engine::{VibeEngine, VibeSummary};
use bon::bon;
use ordered_float::OrderedFloat;
use std::collections::HashMap;
use std::path::PathBuf;

/// A geographical coordinate: latitude first, longitude second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

/// A value resolved at one indexed location.
#[derive(Debug, Clone, PartialEq)]
pub struct PointValue {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

/// One month's vibe score, 1 through 12.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyScore {
    pub month: u32,
    pub score: f64,
}

/// Month with the highest score, ties going to the earliest month.
pub fn best_month(scores: &[MonthlyScore]) -> Option<MonthlyScore> {
    scores
        .iter()
        .copied()
        .max_by_key(|s| (OrderedFloat(s.score), std::cmp::Reverse(s.month)))
}

/// The main client for climate queries over a prepared data directory.
pub struct Vibecast {
    index: LocationIndex,
    cache: SeriesCache,
    vibes: VibeEngine,
}

#[bon]
impl Vibecast {
    /// Opens a data directory with an explicit vibe catalog and cache size.
    ///
    /// # Arguments
    ///
    /// * `.data_dir(PathBuf)`: **Required.** Root directory holding `outputs/<id>_point/raw/` dumps.
    /// * `.vibes(Option<VibeEngine>)`: Optional. Vibe catalog; defaults to an empty catalog.
    /// * `.cache_capacity(Option<usize>)`: Optional. Max cached parameter stores. Defaults to 64.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vibecast::{Vibecast, VibeEngine, VibecastError};
    /// # use std::path::Path;
    /// # async fn run() -> Result<(), VibecastError> {
    /// let vibes = VibeEngine::load(Path::new("vibes.json")).await?;
    /// let client = Vibecast::with_config()
    ///     .data_dir("./data".into())
    ///     .vibes(vibes)
    ///     .cache_capacity(16)
    ///     .call()
    ///     .await?;
    /// println!("{} locations indexed", client.locations().len());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn with_config(
        data_dir: PathBuf,
        vibes: Option<VibeEngine>,
        cache_capacity: Option<usize>,
    ) -> Result<Self, VibecastError> {
        let index = LocationIndex::new(&data_dir).await?;
        Ok(Self {
            index,
            cache: SeriesCache::new(cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)),
            vibes: vibes.unwrap_or_default(),
        })
    }

    /// Opens a data directory with defaults: no vibes, default cache size.
    pub async fn new(data_dir: PathBuf) -> Result<Self, VibecastError> {
        Self::with_config().data_dir(data_dir).call().await
    }

    /// All indexed locations as `(id, lat, lon)`, in index order.
    pub fn locations(&self) -> Vec<(&str, f64, f64)> {
        self.index
            .iter()
            .map(|loc| (loc.id.as_str(), loc.lat, loc.lon))
            .collect()
    }

    /// The indexed location closest to a coordinate, if any exist.
    pub fn nearest_location(&self, position: LatLon) -> Option<(&str, f64, f64)> {
        self.index
            .nearest(position.0, position.1)
            .map(|loc| (loc.id.as_str(), loc.lat, loc.lon))
    }

    /// Metadata for every configured vibe.
    pub fn vibes(&self) -> Vec<VibeSummary> {
        self.vibes.list()
    }

    /// Drops a location's cached series so the next query reloads from disk.
    pub async fn invalidate_location(&self, location_id: &str) {
        self.cache.invalidate(location_id).await;
    }

    /// Empties the series cache.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// One parameter's aggregated value at the location nearest a coordinate.
    ///
    /// Returns `Ok(None)` when no location is indexed, the nearest location
    /// lacks the parameter, or the filter selects no observed days.
    ///
    /// # Arguments
    ///
    /// * `.parameter(&str)`: **Required.** Parameter id, e.g. `"T2M"`.
    /// * `.position(LatLon)`: **Required.** Query coordinate.
    /// * `.filter(Option<TimeFilter>)`: Optional. Defaults to the full series.
    #[builder]
    pub async fn value_at_point(
        &self,
        parameter: &str,
        position: LatLon,
        filter: Option<TimeFilter>,
    ) -> Result<Option<f64>, VibecastError> {
        let filter = filter.unwrap_or_else(TimeFilter::all);
        let Some(location) = self.index.nearest(position.0, position.1) else {
            return Ok(None);
        };
        let store = self.cache.get_or_load(location).await?;
        Ok(store
            .series(parameter)
            .and_then(|series| series.aggregate(&filter)))
    }

    /// Several parameters aggregated at the location nearest a coordinate.
    ///
    /// Parameters that do not resolve are simply absent from the map.
    ///
    /// # Arguments
    ///
    /// * `.parameters(&[String])`: **Required.** Parameter ids to resolve.
    /// * `.position(LatLon)`: **Required.** Query coordinate.
    /// * `.filter(Option<TimeFilter>)`: Optional. Defaults to the full series.
    #[builder]
    pub async fn parameter_values(
        &self,
        parameters: &[String],
        position: LatLon,
        filter: Option<TimeFilter>,
    ) -> Result<HashMap<String, f64>, VibecastError> {
        let filter = filter.unwrap_or_else(TimeFilter::all);
        let Some(location) = self.index.nearest(position.0, position.1) else {
            return Ok(HashMap::new());
        };
        let store = self.cache.get_or_load(location).await?;
        Ok(parameters
            .iter()
            .filter_map(|id| {
                store
                    .series(id)
                    .and_then(|series| series.aggregate(&filter))
                    .map(|value| (id.clone(), value))
            })
            .collect())
    }

    /// One parameter's climatology: its aggregate for each calendar month.
    ///
    /// Months with no observed days are absent from the map.
    #[builder]
    pub async fn monthly_values(
        &self,
        parameter: &str,
        position: LatLon,
    ) -> Result<HashMap<u32, f64>, VibecastError> {
        let Some(location) = self.index.nearest(position.0, position.1) else {
            return Ok(HashMap::new());
        };
        let store = self.cache.get_or_load(location).await?;
        let Some(series) = store.series(parameter) else {
            return Ok(HashMap::new());
        };
        Ok((1..=12)
            .filter_map(|month| {
                series
                    .aggregate(&TimeFilter::month(month))
                    .map(|value| (month, value))
            })
            .collect())
    }

    /// One parameter's aggregated value at every location within a radius
    /// of a center, nearest first. NoData locations are omitted; locations
    /// whose raw dumps fail to load are logged and skipped.
    ///
    /// # Arguments
    ///
    /// * `.parameter(&str)`: **Required.** Parameter id.
    /// * `.center(LatLon)`: **Required.** Center of the search circle.
    /// * `.radius_km(f64)`: **Required.** Radius in kilometers, converted at 111 km per degree.
    /// * `.filter(Option<TimeFilter>)`: Optional. Defaults to the full series.
    /// * `.resolution_km(Option<f64>)`: Optional. Accepted for callers that thin
    ///   dense grids; the point index has no grid to thin, so it is ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vibecast::{LatLon, TimeFilter, Vibecast, VibecastError};
    /// # async fn run() -> Result<(), VibecastError> {
    /// let client = Vibecast::new("./data".into()).await?;
    ///
    /// // July temperatures at every location within 150 km of Amsterdam.
    /// let values = client
    ///     .values_in_radius()
    ///     .parameter("T2M")
    ///     .center(LatLon(52.37, 4.89))
    ///     .radius_km(150.0)
    ///     .filter(TimeFilter::month(7))
    ///     .call()
    ///     .await?;
    /// for point in values {
    ///     println!("({}, {}): {:.1}", point.lat, point.lon, point.value);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn values_in_radius(
        &self,
        parameter: &str,
        center: LatLon,
        radius_km: f64,
        filter: Option<TimeFilter>,
        resolution_km: Option<f64>,
    ) -> Result<Vec<PointValue>, VibecastError> {
        if let Some(resolution) = resolution_km {
            log::debug!("resolution_km {resolution} ignored for point-indexed data");
        }
        let filter = filter.unwrap_or_else(TimeFilter::all);
        let radius_deg = radius_km / KM_PER_DEGREE;
        let mut values = Vec::new();
        for location in self.index.within_degrees(center.0, center.1, radius_deg) {
            let store = match self.cache.get_or_load(location).await {
                Ok(store) => store,
                Err(e) => {
                    log::warn!("skipping location '{}': {e}", location.id);
                    continue;
                }
            };
            if let Some(value) = store
                .series(parameter)
                .and_then(|series| series.aggregate(&filter))
            {
                values.push(PointValue {
                    lat: location.lat,
                    lon: location.lon,
                    value,
                });
            }
        }
        Ok(values)
    }

    /// Scores a vibe at the location nearest a coordinate.
    ///
    /// Returns `Ok(None)` when no location is indexed or when any of the
    /// vibe's required parameters fails to resolve at that point and time;
    /// a partial parameter set would silently distort the score.
    ///
    /// # Errors
    ///
    /// [`VibeError::VibeNotFound`] for an unknown vibe id and
    /// [`VibeError::AdvisorNotScorable`] for advisor configs, both wrapped
    /// in [`VibecastError`].
    ///
    /// [`VibeError::VibeNotFound`]: crate::vibes::error::VibeError::VibeNotFound
    /// [`VibeError::AdvisorNotScorable`]: crate::vibes::error::VibeError::AdvisorNotScorable
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vibecast::{LatLon, TimeFilter, Vibecast, VibeEngine, VibecastError};
    /// # use std::path::Path;
    /// # async fn run() -> Result<(), VibecastError> {
    /// let vibes = VibeEngine::load(Path::new("vibes.json")).await?;
    /// let client = Vibecast::with_config()
    ///     .data_dir("./data".into())
    ///     .vibes(vibes)
    ///     .call()
    ///     .await?;
    ///
    /// // How good is September stargazing near Amsterdam?
    /// let score = client
    ///     .vibe_score()
    ///     .vibe("stargazing")
    ///     .position(LatLon(52.37, 4.89))
    ///     .filter(TimeFilter::month(9))
    ///     .call()
    ///     .await?;
    /// match score {
    ///     Some(score) => println!("stargazing: {score:.0}/100"),
    ///     None => println!("no data for this point and month"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn vibe_score(
        &self,
        vibe: &str,
        position: LatLon,
        filter: Option<TimeFilter>,
    ) -> Result<Option<f64>, VibecastError> {
        let required = self.vibes.required_parameters(vibe)?;
        let values = self
            .parameter_values()
            .parameters(&required)
            .position(position)
            .maybe_filter(filter)
            .call()
            .await?;
        if values.len() < required.len() {
            return Ok(None);
        }
        Ok(Some(self.vibes.score(vibe, &values)?))
    }

    /// Scores a vibe for each calendar month at the nearest location.
    ///
    /// Months where any required parameter is absent are skipped. Pair with
    /// [`best_month`] to answer "when should I go".
    #[builder]
    pub async fn monthly_vibe_scores(
        &self,
        vibe: &str,
        position: LatLon,
    ) -> Result<Vec<MonthlyScore>, VibecastError> {
        // Validate the vibe id up front so an unknown vibe errors rather
        // than producing an empty result.
        self.vibes.get(vibe)?;
        let mut scores = Vec::new();
        for month in 1..=12 {
            let score = self
                .vibe_score()
                .vibe(vibe)
                .position(position)
                .filter(TimeFilter::month(month))
                .call()
                .await?;
            if let Some(score) = score {
                scores.push(MonthlyScore { month, score });
            }
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibes::error::VibeError;
    use serde_json::json;
    use std::path::Path;

    fn write_dump(
        data_dir: &Path,
        location_id: &str,
        lat: f64,
        lon: f64,
        parameters: serde_json::Value,
    ) {
        let raw_dir = data_dir
            .join("outputs")
            .join(format!("{location_id}_point"))
            .join("raw");
        std::fs::create_dir_all(&raw_dir).unwrap();
        let dump = json!({
            "geometry": {"coordinates": [lon, lat, 0.0]},
            "properties": {"parameter": parameters}
        });
        std::fs::write(
            raw_dir.join(format!("{location_id}__2020_2021__20220101T000000Z.json")),
            serde_json::to_vec(&dump).unwrap(),
        )
        .unwrap();
    }

    fn catalog() -> VibeEngine {
        VibeEngine::from_json_str(
            r#"{
                "warm_and_dry": {
                    "name": "Warm and dry",
                    "description": "Pleasant heat, little rain",
                    "type": "standard",
                    "parameters": [
                        {"id": "T2M", "weight": 3.0, "scoring": "high_is_better", "min": 0.0, "max": 30.0},
                        {"id": "PRECTOTCORR", "weight": 1.0, "scoring": "low_is_better", "min": 0.0, "max": 10.0}
                    ]
                },
                "packing": {
                    "name": "Packing advisor",
                    "description": "What to bring",
                    "type": "advisor",
                    "parameters": ["T2M", "PRECTOTCORR"]
                }
            }"#,
        )
        .unwrap()
    }

    async fn fixture_client(data_dir: &Path) -> Vibecast {
        // Two locations: a warm dry one at the origin area and a cold wet
        // one two degrees away.
        write_dump(
            data_dir,
            "sunnytown",
            10.0,
            10.0,
            json!({
                "T2M": {"20200115": 24.0, "20200116": 26.0, "20200715": 30.0},
                "PRECTOTCORR": {"20200115": 0.0, "20200116": 2.0, "20200715": 1.0}
            }),
        );
        write_dump(
            data_dir,
            "rainville",
            12.0,
            10.0,
            json!({
                "T2M": {"20200115": 3.0, "20200116": 5.0},
                "PRECTOTCORR": {"20200115": 8.0, "20200116": 10.0}
            }),
        );
        Vibecast::with_config()
            .data_dir(data_dir.to_path_buf())
            .vibes(catalog())
            .call()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn value_at_point_resolves_via_the_nearest_location() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        // (10.4, 10.0) is nearer sunnytown; January mean of 24 and 26.
        let value = client
            .value_at_point()
            .parameter("T2M")
            .position(LatLon(10.4, 10.0))
            .filter(TimeFilter::month(1))
            .call()
            .await
            .unwrap();
        assert_eq!(value, Some(25.0));

        // (11.9, 10.0) snaps to rainville.
        let value = client
            .value_at_point()
            .parameter("T2M")
            .position(LatLon(11.9, 10.0))
            .call()
            .await
            .unwrap();
        assert_eq!(value, Some(4.0));
    }

    #[tokio::test]
    async fn unknown_parameter_is_none_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        let value = client
            .value_at_point()
            .parameter("WS10M")
            .position(LatLon(10.0, 10.0))
            .call()
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn empty_data_dir_yields_no_locations_and_no_values() {
        let dir = tempfile::tempdir().unwrap();
        let client = Vibecast::new(dir.path().to_path_buf()).await.unwrap();

        assert!(client.locations().is_empty());
        assert_eq!(client.nearest_location(LatLon(0.0, 0.0)), None);
        let value = client
            .value_at_point()
            .parameter("T2M")
            .position(LatLon(0.0, 0.0))
            .call()
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn parameter_values_omits_unresolvable_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        let params = vec!["T2M".to_string(), "WS10M".to_string()];
        let values = client
            .parameter_values()
            .parameters(&params)
            .position(LatLon(10.0, 10.0))
            .call()
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert!(values.contains_key("T2M"));
    }

    #[tokio::test]
    async fn monthly_values_cover_only_observed_months() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        let months = client
            .monthly_values()
            .parameter("T2M")
            .position(LatLon(10.0, 10.0))
            .call()
            .await
            .unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[&1], 25.0);
        assert_eq!(months[&7], 30.0);
    }

    #[tokio::test]
    async fn radius_query_returns_nearest_first_and_respects_the_radius() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        // 111 km is one degree: only sunnytown is within reach of (10.5, 10).
        let close = client
            .values_in_radius()
            .parameter("T2M")
            .center(LatLon(10.5, 10.0))
            .radius_km(111.0)
            .call()
            .await
            .unwrap();
        assert_eq!(close.len(), 1);
        assert_eq!(close[0].lat, 10.0);

        // 222 km covers both, sorted nearest first from (10.5, 10).
        let wide = client
            .values_in_radius()
            .parameter("T2M")
            .center(LatLon(10.5, 10.0))
            .radius_km(222.0)
            .call()
            .await
            .unwrap();
        assert_eq!(wide.len(), 2);
        assert_eq!(wide[0].lat, 10.0);
        assert_eq!(wide[1].lat, 12.0);
    }

    #[tokio::test]
    async fn vibe_score_weights_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        // January at sunnytown: T2M 25.0 -> high_is_better over [0, 30]
        // gives 83.33...; PRECTOTCORR 1.0 -> low_is_better over [0, 10]
        // gives 90. Weighted (3, 1): (250 + 90) / 4 = 85.0.
        let score = client
            .vibe_score()
            .vibe("warm_and_dry")
            .position(LatLon(10.0, 10.0))
            .filter(TimeFilter::month(1))
            .call()
            .await
            .unwrap()
            .unwrap();
        assert!((score - 85.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn vibe_score_is_none_when_a_required_parameter_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            dir.path(),
            "dryland",
            0.0,
            0.0,
            json!({"T2M": {"20200115": 20.0}}),
        );
        let client = Vibecast::with_config()
            .data_dir(dir.path().to_path_buf())
            .vibes(catalog())
            .call()
            .await
            .unwrap();

        let score = client
            .vibe_score()
            .vibe("warm_and_dry")
            .position(LatLon(0.0, 0.0))
            .call()
            .await
            .unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn unknown_vibe_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        let err = client
            .vibe_score()
            .vibe("sandcastle")
            .position(LatLon(10.0, 10.0))
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VibecastError::Vibe(VibeError::VibeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn advisors_cannot_be_scored() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        let err = client
            .vibe_score()
            .vibe("packing")
            .position(LatLon(10.0, 10.0))
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VibecastError::Vibe(VibeError::AdvisorNotScorable(_))
        ));
    }

    #[tokio::test]
    async fn monthly_vibe_scores_skip_incomplete_months() {
        let dir = tempfile::tempdir().unwrap();
        let client = fixture_client(dir.path()).await;

        let scores = client
            .monthly_vibe_scores()
            .vibe("warm_and_dry")
            .position(LatLon(10.0, 10.0))
            .call()
            .await
            .unwrap();
        // Only January and July have data for both parameters.
        let months: Vec<u32> = scores.iter().map(|s| s.month).collect();
        assert_eq!(months, vec![1, 7]);

        // July: T2M 30 -> 100, PRECTOTCORR 1 -> 90; (300 + 90) / 4 = 97.5.
        let best = best_month(&scores).unwrap();
        assert_eq!(best.month, 7);
        assert!((best.score - 97.5).abs() < 1e-9);
    }

    #[test]
    fn best_month_ties_go_to_the_earliest_month() {
        let scores = vec![
            MonthlyScore { month: 3, score: 80.0 },
            MonthlyScore { month: 5, score: 80.0 },
            MonthlyScore { month: 9, score: 40.0 },
        ];
        assert_eq!(best_month(&scores).unwrap().month, 3);
        assert_eq!(best_month(&[]), None);
    }
}
