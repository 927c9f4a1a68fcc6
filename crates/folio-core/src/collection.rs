//! Time-aligned collections of series and the allocation arithmetic built on them.
//!
//! A [`TimeSeriesCollection`] is immutable once built: its aligned date range
//! is computed at most once per instance and reused by every lookup. A
//! collection with different members is a different instance, so the memo
//! never goes stale.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::{CoreError, QuoteDate, TimeSeries, ValidationError};

/// Allowed distance of a percent sum from 100.0: one basis point.
pub const PERCENT_SUM_TOLERANCE: f64 = 0.01;

// Absorbs binary rounding in sums such as 60.005 + 39.995.
const SUM_EPSILON: f64 = 1e-9;

/// Check that target weights are finite and sum to 100% within one basis point.
pub fn validate_percents(percents: &[f64]) -> Result<(), ValidationError> {
    if percents.iter().any(|percent| !percent.is_finite()) {
        return Err(ValidationError::NonFiniteValue { field: "percents" });
    }

    let sum: f64 = percents.iter().sum();
    if (sum - 100.0).abs() > PERCENT_SUM_TOLERANCE + SUM_EPSILON {
        return Err(ValidationError::PercentSum { sum });
    }
    Ok(())
}

/// Share quantities held, one per collection member, in member order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Allocation {
    shares: Vec<f64>,
}

impl Allocation {
    pub fn from_shares(shares: Vec<f64>) -> Self {
        Self { shares }
    }

    pub fn shares(&self) -> &[f64] {
        &self.shares
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Alignment {
    /// Index of the first aligned date within each member.
    offsets: Vec<usize>,
    len: usize,
}

/// An ordered set of series sharing a common aligned date range.
#[derive(Debug, Clone)]
pub struct TimeSeriesCollection {
    members: Vec<Arc<TimeSeries>>,
    indices: Vec<HashMap<QuoteDate, usize>>,
    alignment: OnceLock<Alignment>,
}

impl TimeSeriesCollection {
    pub fn new(members: Vec<Arc<TimeSeries>>) -> Self {
        let indices = members
            .iter()
            .map(|series| {
                let mut index = HashMap::with_capacity(series.len());
                for (position, date) in series.dates().iter().enumerate() {
                    index.entry(*date).or_insert(position);
                }
                index
            })
            .collect();

        Self {
            members,
            indices,
            alignment: OnceLock::new(),
        }
    }

    /// Convenience constructor for series that are not shared elsewhere.
    pub fn from_series(series: Vec<TimeSeries>) -> Self {
        Self::new(series.into_iter().map(Arc::new).collect())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Arc<TimeSeries>] {
        &self.members
    }

    pub fn get(&self, index: usize) -> Option<&TimeSeries> {
        self.members.get(index).map(Arc::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|series| series.name()).collect()
    }

    /// True iff every member has a value on `date`.
    pub fn is_defined_on(&self, date: QuoteDate) -> bool {
        self.indices.iter().all(|index| index.contains_key(&date))
    }

    /// The contiguous run of the first member's dates on which every member
    /// is defined. Empty when there are no members or no common dates.
    pub fn aligned_dates(&self) -> &[QuoteDate] {
        let alignment = self.alignment();
        match self.members.first() {
            Some(first) => {
                let start = alignment.offsets[0];
                &first.dates()[start..start + alignment.len]
            }
            None => &[],
        }
    }

    /// Each member's values restricted to [`aligned_dates`](Self::aligned_dates).
    pub fn aligned_values(&self) -> Vec<&[f64]> {
        let alignment = self.alignment();
        self.members
            .iter()
            .zip(&alignment.offsets)
            .map(|(series, &offset)| &series.values()[offset..offset + alignment.len])
            .collect()
    }

    /// Leftmost position in the aligned range at or after `date`.
    pub fn date_index(&self, date: QuoteDate) -> Result<usize, CoreError> {
        let dates = self.aligned_dates();
        match (dates.first(), dates.last()) {
            (Some(&first), Some(&last)) if first <= date && date <= last => {
                Ok(dates.partition_point(|aligned| *aligned < date))
            }
            (Some(&first), Some(&last)) => Err(CoreError::DateOutOfRange {
                date,
                bounds: Some((first, last)),
            }),
            _ => Err(CoreError::DateOutOfRange { date, bounds: None }),
        }
    }

    /// Every member's aligned price on `date`, in member order.
    pub fn prices_at(&self, date: QuoteDate) -> Result<Vec<f64>, CoreError> {
        let position = self.date_index(date)?;
        Ok(self
            .aligned_values()
            .into_iter()
            .map(|values| values[position])
            .collect())
    }

    /// Split `amount` across members by `percents` and convert each share of
    /// the money into a quantity at the prices on `date`.
    pub fn allocate(
        &self,
        amount: f64,
        percents: &[f64],
        date: QuoteDate,
    ) -> Result<Allocation, CoreError> {
        self.check_len(percents.len())?;
        let prices = self.prices_at(date)?;

        let shares = percents
            .iter()
            .zip(prices)
            .map(|(percent, price)| (amount * percent / 100.0) / price)
            .collect();
        Ok(Allocation::from_shares(shares))
    }

    /// Market value of `allocation` at the prices on `date`.
    pub fn value_of(&self, allocation: &Allocation, date: QuoteDate) -> Result<f64, CoreError> {
        self.check_len(allocation.len())?;
        let prices = self.prices_at(date)?;

        Ok(allocation
            .shares()
            .iter()
            .zip(prices)
            .map(|(shares, price)| shares * price)
            .sum())
    }

    /// Re-split the current value of `allocation` on `date` by `percents`.
    /// Total value at the rebalance instant is unchanged.
    pub fn rebalance(
        &self,
        allocation: &Allocation,
        percents: &[f64],
        date: QuoteDate,
    ) -> Result<Allocation, CoreError> {
        let value = self.value_of(allocation, date)?;
        self.allocate(value, percents, date)
    }

    fn check_len(&self, actual: usize) -> Result<(), CoreError> {
        if actual != self.members.len() {
            return Err(CoreError::LengthMismatch {
                expected: self.members.len(),
                actual,
            });
        }
        Ok(())
    }

    fn alignment(&self) -> &Alignment {
        self.alignment.get_or_init(|| self.compute_alignment())
    }

    fn compute_alignment(&self) -> Alignment {
        let empty = Alignment {
            offsets: vec![0; self.members.len()],
            len: 0,
        };
        let Some(first) = self.members.first() else {
            return empty;
        };

        let dates = first.dates();
        let mut start = 0;
        while start < dates.len() && !self.is_defined_on(dates[start]) {
            start += 1;
        }
        let mut end = start;
        while end < dates.len() && self.is_defined_on(dates[end]) {
            end += 1;
        }
        if start == end {
            return empty;
        }

        // `anchor` passed `is_defined_on`, so every member indexes it.
        let anchor = dates[start];
        let Some(offsets) = self
            .indices
            .iter()
            .map(|index| index.get(&anchor).copied())
            .collect::<Option<Vec<usize>>>()
        else {
            return empty;
        };

        // Histories that do not continue contiguously past the anchor are
        // cut short rather than read out of bounds.
        let len = self
            .members
            .iter()
            .zip(&offsets)
            .map(|(series, offset)| series.len() - offset)
            .fold(end - start, usize::min);

        Alignment { offsets, len }
    }
}
