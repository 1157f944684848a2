//! Vibe catalog and scoring engine.
//!
//! A vibe is a named weather mood. Standard vibes carry an ordered list of
//! weighted, independently-scored parameters; advisors only declare which
//! parameters their external rule tables need. The catalog is a declarative
//! JSON document validated once at load; scoring methods are a tagged sum
//! type, so an unknown method is a load-time configuration error rather than
//! a call-time string mismatch.

use crate::vibes::error::VibeError;
use crate::vibes::scoring::{
    score_high_is_better, score_low_is_better, score_optimal_range, weighted_score,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const DEFAULT_FALLOFF_RATE: f64 = 2.0;

fn default_falloff_rate() -> f64 {
    DEFAULT_FALLOFF_RATE
}

/// How one parameter's raw value turns into a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "scoring", rename_all = "snake_case")]
pub enum ScoringMethod {
    LowIsBetter {
        min: f64,
        max: f64,
    },
    HighIsBetter {
        min: f64,
        max: f64,
    },
    OptimalRange {
        optimal_min: f64,
        optimal_max: f64,
        #[serde(default = "default_falloff_rate")]
        falloff_rate: f64,
    },
}

impl ScoringMethod {
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Self::LowIsBetter { min, max } => score_low_is_better(value, min, max),
            Self::HighIsBetter { min, max } => score_high_is_better(value, min, max),
            Self::OptimalRange {
                optimal_min,
                optimal_max,
                falloff_rate,
            } => score_optimal_range(value, optimal_min, optimal_max, falloff_rate),
        }
    }
}

/// One weighted parameter of a standard vibe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VibeParameter {
    pub id: String,
    pub weight: f64,
    #[serde(flatten)]
    pub scoring: ScoringMethod,
}

/// Standard vibes score; advisors defer to external rule tables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VibeKind {
    Standard { parameters: Vec<VibeParameter> },
    Advisor { parameters: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VibeConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: VibeKind,
}

/// Catalog metadata row, for listing available vibes to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct VibeSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_advisor: bool,
}

/// The loaded, immutable vibe catalog plus the scoring entry point.
#[derive(Debug, Clone, Default)]
pub struct VibeEngine {
    vibes: BTreeMap<String, VibeConfig>,
}

impl VibeEngine {
    /// Parses and validates a catalog document: `{vibe_id: config, ...}`.
    pub fn from_json_str(json: &str) -> Result<Self, VibeError> {
        let vibes: BTreeMap<String, VibeConfig> = serde_json::from_str(json)?;
        for (id, config) in &vibes {
            if let VibeKind::Standard { parameters } = &config.kind {
                if parameters.is_empty() {
                    return Err(VibeError::NoParameters(id.clone()));
                }
            }
        }
        log::info!("loaded {} vibes", vibes.len());
        Ok(Self { vibes })
    }

    /// Reads the catalog document from disk.
    pub async fn load(path: &Path) -> Result<Self, VibeError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VibeError::CatalogRead(path.to_path_buf(), e))?;
        Self::from_json_str(std::str::from_utf8(&bytes).map_err(|e| {
            VibeError::CatalogRead(
                path.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?)
    }

    pub fn is_empty(&self) -> bool {
        self.vibes.is_empty()
    }

    pub fn get(&self, vibe_id: &str) -> Result<&VibeConfig, VibeError> {
        self.vibes.get(vibe_id).ok_or_else(|| VibeError::VibeNotFound {
            id: vibe_id.to_string(),
            available: self.vibes.keys().cloned().collect(),
        })
    }

    /// Parameter ids a vibe needs, in declared order.
    pub fn required_parameters(&self, vibe_id: &str) -> Result<Vec<String>, VibeError> {
        let config = self.get(vibe_id)?;
        Ok(match &config.kind {
            VibeKind::Standard { parameters } => {
                parameters.iter().map(|p| p.id.clone()).collect()
            }
            VibeKind::Advisor { parameters } => parameters.clone(),
        })
    }

    pub fn list(&self) -> Vec<VibeSummary> {
        self.vibes
            .iter()
            .map(|(id, config)| VibeSummary {
                id: id.clone(),
                name: config.name.clone().unwrap_or_else(|| id.clone()),
                description: config.description.clone().unwrap_or_default(),
                is_advisor: matches!(config.kind, VibeKind::Advisor { .. }),
            })
            .collect()
    }

    /// Scores a standard vibe against resolved parameter values.
    ///
    /// Parameters without a value are excluded from both the numerator and
    /// the denominator; they do not drag the score toward zero. Advisors are
    /// rejected, they have no numeric scoring by design.
    pub fn score(
        &self,
        vibe_id: &str,
        parameter_values: &HashMap<String, f64>,
    ) -> Result<f64, VibeError> {
        let config = self.get(vibe_id)?;
        let parameters = match &config.kind {
            VibeKind::Standard { parameters } => parameters,
            VibeKind::Advisor { .. } => {
                return Err(VibeError::AdvisorNotScorable(vibe_id.to_string()))
            }
        };

        let scored: Vec<(f64, f64)> = parameters
            .iter()
            .filter_map(|p| {
                parameter_values
                    .get(&p.id)
                    .map(|value| (p.scoring.apply(*value), p.weight))
            })
            .collect();
        Ok(weighted_score(&scored))
    }
}
