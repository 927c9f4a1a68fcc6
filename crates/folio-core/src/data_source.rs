//! Quote source trait and request/response types.
//!
//! This module defines the adapter contract (`QuoteSource`) that every
//! provider of monthly price histories implements, together with the wire
//! type those providers return.
//!
//! Sources deliver prices as integer cents. [`MonthlyQuotes::into_time_series`]
//! is the single place where cents become dollars.
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_core::{MonthlyQuotesRequest, QuoteSource, QuoteServerSource, Symbol};
//!
//! async fn fetch(source: &QuoteServerSource) -> Result<(), folio_core::SourceError> {
//!     let request = MonthlyQuotesRequest::new(vec![Symbol::parse("VFINX")?])?;
//!     for quotes in source.fetch_monthly(request).await? {
//!         println!("{}: {} months", quotes.name, quotes.dates.len());
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::series::cents_to_dollars;
use crate::{Symbol, TimeSeries, ValidationError};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    InvalidRequest,
    Unavailable,
    NotFound,
    InvalidResponse,
    Internal,
}

/// Structured error returned by quote sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidResponse, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message)
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

/// Request payload for monthly quote histories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyQuotesRequest {
    pub symbols: Vec<Symbol>,
}

impl MonthlyQuotesRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "monthly quotes request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }

    /// Comma-joined symbols, as used in `?s=` query strings and log lines.
    pub fn joined(&self) -> String {
        self.symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// One ticker's monthly closing prices as delivered on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyQuotes {
    /// Ticker symbol the history belongs to.
    pub name: String,
    /// `YYYY-MM-DD` dates in chronological order.
    pub dates: Vec<String>,
    /// Closing prices in integer cents.
    pub values: Vec<i64>,
}

impl MonthlyQuotes {
    pub fn symbol(&self) -> Result<Symbol, ValidationError> {
        Symbol::parse(&self.name)
    }

    /// Validate and convert into a dollar-valued [`TimeSeries`] named by
    /// the normalized ticker.
    pub fn into_time_series(self) -> Result<TimeSeries, ValidationError> {
        let symbol = self.symbol()?;
        let values = self.values.into_iter().map(cents_to_dollars).collect();
        TimeSeries::new(symbol.as_str(), &self.dates, values)
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Quote source adapter contract.
///
/// Implementations must be `Send + Sync`: a single source is shared by the
/// quote cache across every concurrent fetch.
pub trait QuoteSource: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &'static str;

    /// Fetch the full monthly history of every requested symbol in one call.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the upstream is unreachable, reports that a
    /// ticker has no data, or answers with a body that cannot be decoded.
    fn fetch_monthly<'a>(&'a self, req: MonthlyQuotesRequest) -> SourceFuture<'a, Vec<MonthlyQuotes>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_is_rejected() {
        let err = MonthlyQuotesRequest::new(vec![]).expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert!(err.message().contains("symbol"));
    }

    #[test]
    fn wire_quotes_convert_cents_to_dollars() {
        let quotes = MonthlyQuotes {
            name: String::from("vfinx"),
            dates: vec![String::from("2001-01-01"), String::from("2001-02-01")],
            values: vec![12_050, 11_999],
        };
        let series = quotes.into_time_series().expect("valid quotes");
        assert_eq!(series.name(), "VFINX");
        assert_eq!(series.values(), &[120.5, 119.99]);
    }

    #[test]
    fn error_display_includes_code() {
        let err = SourceError::not_found("no data for ZZZZ");
        assert_eq!(err.to_string(), "no data for ZZZZ (source.not_found)");
    }
}
