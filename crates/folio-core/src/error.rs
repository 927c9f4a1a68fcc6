use thiserror::Error;

use crate::data_source::SourceError;
use crate::{QuoteDate, Symbol};

/// Validation and contract errors exposed by `folio-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid date string '{value}' (YYYY-MM-DD is required)")]
    InvalidDate { value: String },
    #[error("invalid date string '{value}' at index {index} (YYYY-MM-DD is required)")]
    InvalidSeriesDate { index: usize, value: String },
    #[error("dates/values must have matching lengths ({dates} dates, {values} values)")]
    SeriesLengthMismatch { dates: usize, values: usize },

    #[error("tickers/percents must have matching length ({tickers} tickers, {percents} percents)")]
    TickerPercentMismatch { tickers: usize, percents: usize },
    #[error("percents must sum to 100% to the nearest basis point (got {sum})")]
    PercentSum { sum: f64 },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("horizon of {years} years is below the minimum of {min}")]
    HorizonTooShort { years: u32, min: u32 },
    #[error("rebalance period must be at least one month")]
    ZeroRebalancePeriod,
    #[error("backtest date range cannot be empty")]
    EmptyDateRange,

    #[error("invalid quote source '{value}', expected one of server, yahoo")]
    InvalidSourceKind { value: String },
    #[error("invalid value for {key}: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
}

/// Top-level error type for core operations.
///
/// `Clone` so a single in-flight fetch failure can be handed to every caller
/// waiting on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("time series is empty")]
    EmptySeries,

    #[error("date {date} is outside the aligned date range{}", describe_bounds(.bounds))]
    DateOutOfRange {
        date: QuoteDate,
        bounds: Option<(QuoteDate, QuoteDate)>,
    },

    #[error("ticker not found in quote cache: {ticker}")]
    CacheMiss { ticker: Symbol },

    #[error("failed to fetch quotes for [{tickers}]: {source}")]
    TickerFetch {
        tickers: String,
        #[source]
        source: SourceError,
    },

    #[error("expected {expected} entries (one per series), got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

fn describe_bounds(bounds: &Option<(QuoteDate, QuoteDate)>) -> String {
    match bounds {
        Some((first, last)) => format!(" {first}..={last}"),
        None => String::from(" (collection has no aligned dates)"),
    }
}

impl CoreError {
    pub(crate) fn ticker_fetch(tickers: &[Symbol], source: SourceError) -> Self {
        let tickers = tickers
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        Self::TickerFetch { tickers, source }
    }
}
