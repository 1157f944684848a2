//! Daily time series for a single (location, parameter) pair, plus the
//! temporal aggregation policy applied to online queries.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// A time filter narrowing which daily readings participate in an aggregate.
///
/// Filters are applied in priority order: a calendar month (optionally
/// intersected with a year) beats an explicit date range, which beats the
/// unfiltered full series. See [`DailySeries::aggregate`] for the exact
/// fallback behavior.
///
/// # Examples
///
/// ```
/// use vibecast::TimeFilter;
///
/// let january = TimeFilter::month(1);
/// let january_2024 = TimeFilter::month_of_year(1, 2024);
/// let everything = TimeFilter::all();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TimeFilter {
    /// No filtering: aggregate over the entire series.
    pub fn all() -> Self {
        Self::default()
    }

    /// All readings in calendar month `month` (1-12), across every year.
    pub fn month(month: u32) -> Self {
        Self {
            month: Some(month),
            ..Self::default()
        }
    }

    /// Readings in calendar month `month` of a specific `year`.
    pub fn month_of_year(month: u32, year: i32) -> Self {
        Self {
            month: Some(month),
            year: Some(year),
            ..Self::default()
        }
    }

    /// Readings between `start` and `end`, inclusive.
    pub fn date_range(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }
}

/// An ordered, immutable mapping from calendar date to a daily reading.
///
/// Dates are unique by construction. The source sentinel fill value is
/// normalized away at parse time, so every value held here is a real reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    values: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    pub fn new(values: BTreeMap<NaiveDate, f64>) -> Self {
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }

    pub(crate) fn insert(&mut self, date: NaiveDate, value: f64) {
        self.values.insert(date, value);
    }

    pub(crate) fn remove(&mut self, date: NaiveDate) {
        self.values.remove(&date);
    }

    /// Earliest and latest observed dates, `None` for an empty series.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.values.keys().next()?;
        let last = self.values.keys().next_back()?;
        Some((*first, *last))
    }

    /// Aggregates the series to a single arithmetic mean under `filter`.
    ///
    /// Policy, in priority order:
    ///
    /// 1. `month` set: keep readings in that calendar month. A `year` narrows
    ///    the selection further, except when the requested year lies entirely
    ///    outside the observed year span; then the year filter is silently
    ///    dropped and all years of that month contribute. This is graceful
    ///    degradation, not an error.
    /// 2. `start`/`end` set: both bounds are clamped to the observed date
    ///    span. If clamping inverts the range the filter is abandoned and the
    ///    mean of the entire series is returned.
    /// 3. No filter: mean of the entire series.
    ///
    /// Returns `None` when the filtered selection is empty. Callers must treat
    /// that as "parameter unavailable here", not as a failure.
    pub fn aggregate(&self, filter: &TimeFilter) -> Option<f64> {
        let (min_date, max_date) = self.date_span()?;

        if let Some(month) = filter.month {
            let year = filter.year.filter(|y| (min_date.year()..=max_date.year()).contains(y));
            if filter.year.is_some() && year.is_none() {
                log::debug!(
                    "requested year {:?} outside observed span {}-{}, aggregating over all years",
                    filter.year,
                    min_date.year(),
                    max_date.year()
                );
            }
            return mean(
                self.values
                    .iter()
                    .filter(|(d, _)| d.month() == month && year.is_none_or(|y| d.year() == y))
                    .map(|(_, v)| *v),
            );
        }

        if filter.start.is_some() || filter.end.is_some() {
            let start = filter.start.unwrap_or(min_date).max(min_date);
            let end = filter.end.unwrap_or(max_date).min(max_date);
            if start > end {
                return mean(self.values.values().copied());
            }
            return mean(self.values.range(start..=end).map(|(_, v)| *v));
        }

        mean(self.values.values().copied())
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_series() -> DailySeries {
        [
            (date(2024, 1, 1), 10.0),
            (date(2024, 1, 15), 20.0),
            (date(2024, 2, 1), 30.0),
        ]
        .into_iter()
        .collect()
    }

    fn two_year_series() -> DailySeries {
        [
            (date(2023, 1, 10), 0.0),
            (date(2024, 1, 1), 10.0),
            (date(2024, 1, 15), 20.0),
            (date(2024, 2, 1), 30.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn month_and_year_filter() {
        let series = sample_series();
        assert_eq!(series.aggregate(&TimeFilter::month_of_year(1, 2024)), Some(15.0));
    }

    #[test]
    fn month_without_year_spans_all_years() {
        let series = two_year_series();
        assert_eq!(series.aggregate(&TimeFilter::month(1)), Some(10.0));
    }

    #[test]
    fn year_outside_span_falls_back_to_all_years() {
        let series = two_year_series();
        // 1999 predates the series entirely, so the year filter must be
        // dropped and the result equal the plain month aggregate.
        assert_eq!(
            series.aggregate(&TimeFilter::month_of_year(1, 1999)),
            series.aggregate(&TimeFilter::month(1))
        );
        assert_eq!(series.aggregate(&TimeFilter::month_of_year(1, 1999)), Some(10.0));
    }

    #[test]
    fn year_inside_span_without_matching_month_is_no_data() {
        let series = two_year_series();
        assert_eq!(series.aggregate(&TimeFilter::month_of_year(2, 2023)), None);
    }

    #[test]
    fn empty_month_selection_is_no_data() {
        let series = sample_series();
        assert_eq!(series.aggregate(&TimeFilter::month(7)), None);
    }

    #[test]
    fn range_is_clamped_to_observed_span() {
        let series = sample_series();
        // Requested range starts long before the data; the start bound is
        // pulled up to the first observation.
        let value = series.aggregate(&TimeFilter::date_range(date(1990, 1, 1), date(2024, 1, 31)));
        assert_eq!(value, Some(15.0));
    }

    #[test]
    fn inverted_range_after_clamping_means_whole_series() {
        let series = sample_series();
        // Entirely after the data: the end bound clamps down to the series
        // max while the requested start stays above it, inverting the range.
        let filter = TimeFilter::date_range(date(2030, 1, 1), date(2030, 12, 31));
        let clamped = series.aggregate(&filter);
        assert_eq!(clamped, series.aggregate(&TimeFilter::all()));
        assert_eq!(clamped, Some(20.0));
    }

    #[test]
    fn no_filter_means_whole_series() {
        let series = sample_series();
        assert_eq!(series.aggregate(&TimeFilter::all()), Some(20.0));
    }

    #[test]
    fn empty_series_is_no_data() {
        let series = DailySeries::default();
        assert_eq!(series.aggregate(&TimeFilter::all()), None);
        assert_eq!(series.aggregate(&TimeFilter::month(1)), None);
    }
}
