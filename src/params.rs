//! Parameter catalog: which climate variables the pipeline extracts and how
//! each one collapses from daily to monthly resolution.

use serde::{Deserialize, Serialize};

/// Statistic used to collapse a parameter's daily values into one monthly
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Mean,
    Sum,
    Min,
    Max,
}

impl AggregationMethod {
    /// Parses the catalog's free-form method strings, accepting the synonyms
    /// the source feeds use. Unknown strings warn and default to `Mean`.
    pub fn parse(parameter_id: &str, method: &str) -> Self {
        match method.to_ascii_lowercase().as_str() {
            "mean" | "avg" => Self::Mean,
            "sum" | "total" => Self::Sum,
            "min" | "minimum" => Self::Min,
            "max" | "maximum" => Self::Max,
            other => {
                log::warn!(
                    "unknown aggregation '{}' for {}, defaulting to mean",
                    other,
                    parameter_id
                );
                Self::Mean
            }
        }
    }
}

/// One entry of the parameter catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub id: String,
    /// Free-form in the catalog document; resolved via
    /// [`AggregationMethod::parse`] when the pipeline runs.
    pub aggregation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ParameterConfig {
    pub fn new(id: &str, aggregation: &str) -> Self {
        Self {
            id: id.to_string(),
            aggregation: aggregation.to_string(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn method(&self) -> AggregationMethod {
        AggregationMethod::parse(&self.id, &self.aggregation)
    }
}
