mod error;
mod locations;
mod params;
mod pipeline;
mod series;
mod vibecast;
mod vibes;

pub use error::VibecastError;
pub use vibecast::*;

pub use params::{AggregationMethod, ParameterConfig};

pub use series::cache::{SeriesCache, DEFAULT_CACHE_CAPACITY};
pub use series::daily_series::{DailySeries, TimeFilter};
pub use series::point_dump::{ParameterStore, PointDump, FILL_VALUE};

pub use locations::location_index::{Location, LocationIndex, KM_PER_DEGREE};

pub use vibes::engine::{
    ScoringMethod, VibeConfig, VibeEngine, VibeKind, VibeParameter, VibeSummary,
    DEFAULT_FALLOFF_RATE,
};
pub use vibes::scoring::{
    score_high_is_better, score_low_is_better, score_optimal_range, weighted_score,
};

pub use pipeline::daily::{daily_frame, load_point_json, DATE_COLUMN};
pub use pipeline::fetch::{
    build_request, fetch_chunk, iter_year_chunks, Area, FetchRequest, PowerOptions, RawDumpWriter,
    POWER_BASE_URL,
};
pub use pipeline::monthly::{
    compute_monthly_statistics, CLOUD_FRACTION, MILD_SCORE, MONTH_COLUMN, RAINY_DAY_COUNT,
    RAINY_DAY_FRACTION, STARGAZING_SCORE,
};
pub use pipeline::writer::{
    aggregate_location, run_monthly_pipeline, write_monthly_csv, write_monthly_parquet,
    write_monthly_parquet_atomic, LocationSummary,
};

pub use locations::error::LocationIndexError;
pub use pipeline::error::PipelineError;
pub use series::error::SeriesError;
pub use vibes::error::VibeError;
