//! Fixed-allocation backtests over aligned monthly quotes.
//!
//! A backtest starts by allocating an initial amount across the collection's
//! members by target percent, then rebalances back to those percents every
//! `rebalance_period` months while valuing the holdings at every date. No
//! transaction costs or slippage are modeled, so a rebalance never changes the
//! portfolio value.

use serde::Serialize;
use tracing::debug;

use folio_core::{
    validate_percents, Allocation, CoreError, QuoteDate, TimeSeries, TimeSeriesCollection,
    ValidationError,
};

pub const MONTHS_PER_YEAR: usize = 12;

/// Rebalance period used when a request does not name one.
pub const DEFAULT_REBALANCE_MONTHS: usize = 12;

/// Name given to the value series a backtest produces.
pub const PORTFOLIO_SERIES_NAME: &str = "portfolio";

/// Portfolio values over a date range, plus the allocation held on each date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestTrace {
    pub series: TimeSeries,
    pub allocations: Vec<Allocation>,
}

/// `{ dates, values }` shape of a single-range backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    pub dates: Vec<QuoteDate>,
    pub values: Vec<f64>,
}

impl From<&TimeSeries> for RangeReport {
    fn from(series: &TimeSeries) -> Self {
        Self {
            dates: series.dates().to_vec(),
            values: series.values().to_vec(),
        }
    }
}

/// Per-window statistics of a multi-window scan, one entry per retained
/// window in chronological order of start date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HorizonReport {
    pub start_dates: Vec<QuoteDate>,
    pub annualized_returns: Vec<f64>,
    pub std_deviations: Vec<f64>,
}

impl HorizonReport {
    pub fn len(&self) -> usize {
        self.start_dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_dates.is_empty()
    }

    /// `(start_date, annualized_return, std_deviation)` triples.
    pub fn windows(&self) -> impl Iterator<Item = (QuoteDate, f64, f64)> + '_ {
        self.start_dates
            .iter()
            .zip(&self.annualized_returns)
            .zip(&self.std_deviations)
            .map(|((date, ret), std)| (*date, *ret, *std))
    }

    fn push(&mut self, start: QuoteDate, annualized_return: f64, std_deviation: f64) {
        self.start_dates.push(start);
        self.annualized_returns.push(annualized_return);
        self.std_deviations.push(std_deviation);
    }
}

/// Target percents bound to the collection they are applied to.
#[derive(Debug, Clone, Copy)]
pub struct BacktestEngine<'a> {
    collection: &'a TimeSeriesCollection,
    percents: &'a [f64],
}

impl<'a> BacktestEngine<'a> {
    /// Checks that there is exactly one percent per member and that the
    /// percents sum to 100 within one basis point.
    pub fn new(
        collection: &'a TimeSeriesCollection,
        percents: &'a [f64],
    ) -> Result<Self, CoreError> {
        if percents.len() != collection.len() {
            return Err(CoreError::LengthMismatch {
                expected: collection.len(),
                actual: percents.len(),
            });
        }
        validate_percents(percents)?;
        Ok(Self {
            collection,
            percents,
        })
    }

    pub fn range(
        &self,
        dates: &[QuoteDate],
        initial_amount: f64,
        rebalance_period: usize,
    ) -> Result<TimeSeries, CoreError> {
        self.range_traced(dates, initial_amount, rebalance_period)
            .map(|trace| trace.series)
    }

    pub fn range_traced(
        &self,
        dates: &[QuoteDate],
        initial_amount: f64,
        rebalance_period: usize,
    ) -> Result<BacktestTrace, CoreError> {
        validate_amount(initial_amount)?;
        if rebalance_period == 0 {
            return Err(ValidationError::ZeroRebalancePeriod.into());
        }
        let Some(&start) = dates.first() else {
            return Err(ValidationError::EmptyDateRange.into());
        };

        let collection = self.collection;
        let mut allocation = collection.allocate(initial_amount, self.percents, start)?;
        let mut values = Vec::with_capacity(dates.len());
        let mut allocations = Vec::with_capacity(dates.len());

        for (index, &date) in dates.iter().enumerate() {
            if index % rebalance_period == 0 {
                allocation = collection.rebalance(&allocation, self.percents, date)?;
            }
            values.push(collection.value_of(&allocation, date)?);
            allocations.push(allocation.clone());
        }

        let series = TimeSeries::from_dates(PORTFOLIO_SERIES_NAME, dates.to_vec(), values)?;
        Ok(BacktestTrace {
            series,
            allocations,
        })
    }

    /// Slide a `12 * horizon_years` month window over the aligned dates in
    /// one-year steps. A trailing window that would run past the last aligned
    /// date is dropped, never padded.
    pub fn horizon(
        &self,
        horizon_years: u32,
        initial_amount: f64,
        rebalance_period: usize,
    ) -> Result<HorizonReport, CoreError> {
        if horizon_years == 0 {
            return Err(ValidationError::HorizonTooShort {
                years: horizon_years,
                min: 1,
            }
            .into());
        }

        let dates = self.collection.aligned_dates();
        let window = MONTHS_PER_YEAR * horizon_years as usize;
        let mut report = HorizonReport::default();

        let mut start = 0;
        while start + window <= dates.len() {
            let series = self.range(&dates[start..start + window], initial_amount, rebalance_period)?;
            report.push(
                dates[start],
                series.percent_change()?,
                series.standard_deviation(),
            );
            start += MONTHS_PER_YEAR;
        }

        debug!(
            horizon_years,
            aligned_months = dates.len(),
            windows = report.len(),
            "horizon scan complete"
        );
        Ok(report)
    }
}

/// Backtest one date range. See [`BacktestEngine::range`].
pub fn backtest_range(
    collection: &TimeSeriesCollection,
    percents: &[f64],
    dates: &[QuoteDate],
    initial_amount: f64,
    rebalance_period: usize,
) -> Result<TimeSeries, CoreError> {
    BacktestEngine::new(collection, percents)?.range(dates, initial_amount, rebalance_period)
}

/// Backtest one date range, keeping the allocation held on each date.
pub fn backtest_range_traced(
    collection: &TimeSeriesCollection,
    percents: &[f64],
    dates: &[QuoteDate],
    initial_amount: f64,
    rebalance_period: usize,
) -> Result<BacktestTrace, CoreError> {
    BacktestEngine::new(collection, percents)?.range_traced(dates, initial_amount, rebalance_period)
}

/// Scan every full horizon window. See [`BacktestEngine::horizon`].
pub fn backtest_horizon(
    collection: &TimeSeriesCollection,
    percents: &[f64],
    horizon_years: u32,
    initial_amount: f64,
    rebalance_period: usize,
) -> Result<HorizonReport, CoreError> {
    BacktestEngine::new(collection, percents)?.horizon(horizon_years, initial_amount, rebalance_period)
}

fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NonFiniteValue {
            field: "initial_amount",
        });
    }
    if amount < 0.0 {
        return Err(ValidationError::NegativeValue {
            field: "initial_amount",
        });
    }
    Ok(())
}
