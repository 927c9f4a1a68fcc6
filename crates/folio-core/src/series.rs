//! Dated value series for a single instrument or a computed portfolio.

use serde::Serialize;

use crate::{CoreError, QuoteDate, ValidationError};

/// Convert an integer number of cents, as delivered by quote sources, to dollars.
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// An ordered sequence of `(date, value)` pairs with a name.
///
/// Dates are expected in chronological order. That ordering is what quote
/// sources deliver and is not re-verified here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    name: String,
    dates: Vec<QuoteDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series from raw `YYYY-MM-DD` strings.
    ///
    /// Fails on the first malformed date or when the lengths differ; no
    /// partially built series is returned.
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        dates: &[S],
        values: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        check_lengths(dates.len(), values.len())?;

        let dates = dates
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let raw = raw.as_ref();
                QuoteDate::parse(raw).map_err(|_| ValidationError::InvalidSeriesDate {
                    index,
                    value: raw.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.into(),
            dates,
            values,
        })
    }

    /// Build a series from dates that are already parsed.
    pub fn from_dates(
        name: impl Into<String>,
        dates: Vec<QuoteDate>,
        values: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        check_lengths(dates.len(), values.len())?;
        Ok(Self {
            name: name.into(),
            dates,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[QuoteDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<QuoteDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<QuoteDate> {
        self.dates.last().copied()
    }

    /// Zipped `(date, value)` pairs, in order.
    pub fn points(&self) -> impl Iterator<Item = (QuoteDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Final value as a percentage of the first: `100 * last / first`.
    pub fn percent_change(&self) -> Result<f64, CoreError> {
        match (self.values.first(), self.values.last()) {
            (Some(first), Some(last)) => Ok(100.0 * last / first),
            _ => Err(CoreError::EmptySeries),
        }
    }

    /// Sum of squared deviations from the mean.
    ///
    /// This is deliberately not divided by `N` (or `N - 1`): charts built on
    /// this statistic expect the unnormalized sum. An empty series yields `0.0`.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.values.iter().sum::<f64>() / self.values.len() as f64;
        self.values
            .iter()
            .map(|value| {
                let deviation = value - mean;
                deviation * deviation
            })
            .sum()
    }

    /// Square root of [`variance`](Self::variance).
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

fn check_lengths(dates: usize, values: usize) -> Result<(), ValidationError> {
    if dates != values {
        return Err(ValidationError::SeriesLengthMismatch { dates, values });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: Vec<f64>) -> TimeSeries {
        let dates: Vec<String> = (1..=values.len())
            .map(|month| format!("2020-{month:02}-01"))
            .collect();
        TimeSeries::new("TEST", &dates, values).expect("valid series")
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = TimeSeries::new("X", &["2020-01-01", "2020-02-01"], vec![1.0])
            .expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::SeriesLengthMismatch {
                dates: 2,
                values: 1
            }
        );
    }

    #[test]
    fn rejects_malformed_date_with_position() {
        let err = TimeSeries::new("X", &["2020-01-01", "01/02/2020"], vec![1.0, 2.0])
            .expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::InvalidSeriesDate { index: 1, .. }
        ));
    }

    #[test]
    fn percent_change_is_last_over_first() {
        assert_eq!(series(vec![50.0, 70.0, 75.0]).percent_change(), Ok(150.0));
    }

    #[test]
    fn percent_change_of_empty_series_fails() {
        let empty = TimeSeries::from_dates("EMPTY", vec![], vec![]).expect("valid");
        assert_eq!(empty.percent_change(), Err(CoreError::EmptySeries));
    }

    #[test]
    fn variance_is_unnormalized_sum_of_squares() {
        let values = series(vec![1.0, 2.0, 3.0]);
        assert_eq!(values.variance(), 2.0);
        assert!((values.standard_deviation() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn variance_of_empty_series_is_zero() {
        let empty = TimeSeries::from_dates("EMPTY", vec![], vec![]).expect("valid");
        assert_eq!(empty.variance(), 0.0);
    }

    #[test]
    fn converts_cents_once() {
        assert_eq!(cents_to_dollars(12_345), 123.45);
    }

    #[test]
    fn serializes_dates_as_strings() {
        let json = serde_json::to_value(series(vec![1.5])).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "name": "TEST", "dates": ["2020-01-01"], "values": [1.5] })
        );
    }
}
