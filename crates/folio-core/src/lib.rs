//! # Folio Core
//!
//! Time-aligned price series and the quote plumbing behind the folio
//! portfolio backtester.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Quote sources (quote server JSON, Yahoo monthly CSV) |
//! | [`cache`] | Per-ticker quote cache with in-flight deduplication |
//! | [`collection`] | Aligned multi-series collections, allocation and rebalancing |
//! | [`config`] | Quote source configuration from the environment |
//! | [`data_source`] | Quote source trait and wire types |
//! | [`domain`] | `Symbol` and `QuoteDate` value types |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`series`] | Single dated value series and its statistics |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Backtest Engine │
//! └────────┬────────┘
//!          │ tickers
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   QuoteCache    │────▶│  QuoteSource     │──▶ HttpClient
//! │ (per ticker)    │     │  (adapter trait) │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────────┐
//! │ TimeSeriesCollection │
//! │ (aligned dates)      │
//! └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use folio_core::QuoteSourceConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = QuoteSourceConfig::from_env()?.build_cache();
//!     let quotes = cache.fetch(&["VFINX", "VBMFX"]).await?;
//!     let start = quotes.aligned_dates()[0];
//!     let allocation = quotes.allocate(10_000.0, &[60.0, 40.0], start)?;
//!     println!("{:?}", allocation.shares());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod collection;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod series;

pub use adapters::{QuoteServerSource, YahooCsvSource};
pub use cache::QuoteCache;
pub use collection::{validate_percents, Allocation, TimeSeriesCollection, PERCENT_SUM_TOLERANCE};
pub use config::{QuoteSourceConfig, SourceKind};
pub use data_source::{
    MonthlyQuotes, MonthlyQuotesRequest, QuoteSource, SourceError, SourceErrorKind, SourceFuture,
};
pub use domain::{QuoteDate, Symbol};
pub use error::{CoreError, ValidationError};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use series::{cents_to_dollars, TimeSeries};
