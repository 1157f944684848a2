//! The three scoring shapes and the weighted combination.
//!
//! Every shape maps one raw parameter value to a 0-100 score; the engine then
//! takes the weight-normalized average over the parameters that had a value.

/// Linear score where lower raw values are better (cloud cover for
/// stargazing, say). 100 when `max == min`.
pub fn score_low_is_better(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 100.0;
    }
    let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
    (1.0 - normalized) * 100.0
}

/// Linear score where higher raw values are better (sunshine for beach days).
/// 100 when `max == min`.
pub fn score_high_is_better(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 100.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0) * 100.0
}

/// Flat 100 inside `[optimal_min, optimal_max]`, Gaussian-style falloff
/// outside. `falloff_rate` scales how wide the shoulder is relative to the
/// range width; larger values decay slower.
pub fn score_optimal_range(
    value: f64,
    optimal_min: f64,
    optimal_max: f64,
    falloff_rate: f64,
) -> f64 {
    if (optimal_min..=optimal_max).contains(&value) {
        return 100.0;
    }
    let distance = if value < optimal_min {
        optimal_min - value
    } else {
        value - optimal_max
    };
    let range_width = optimal_max - optimal_min;
    let score = 100.0 * (-(distance / (range_width * falloff_rate)).powi(2)).exp();
    score.max(0.0)
}

/// Weight-normalized average of `(score, weight)` pairs. 0 when the weights
/// sum to 0 (including the empty case).
pub fn weighted_score(scored: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = scored.iter().map(|(_, w)| w).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = scored.iter().map(|(s, w)| s * w).sum();
    weighted_sum / total_weight
}
