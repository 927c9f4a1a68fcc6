//! # Folio Backtest
//!
//! Fixed-allocation portfolio backtests with periodic rebalancing, run over
//! the aligned quotes from [`folio_core`].
//!
//! - [`engine`]: single-range backtests and sliding horizon scans
//! - [`portfolio`]: portfolio requests, validation and run lifecycle
//!
//! ```rust,ignore
//! use folio_backtest::{Portfolio, PortfolioConfig};
//! use folio_core::QuoteSourceConfig;
//!
//! let cache = QuoteSourceConfig::from_env()?.build_cache();
//! let config = PortfolioConfig::new(vec!["VFINX".into(), "VBMFX".into()], vec![60.0, 40.0], 10);
//! let mut portfolio = Portfolio::new(config)?;
//! let report = portfolio.backtest_horizon(&cache).await?;
//! for (start, ret, std) in report.windows() {
//!     println!("{start}: {ret:.2}% (σ {std:.2})");
//! }
//! ```

pub mod engine;
pub mod portfolio;

pub use engine::{
    backtest_horizon, backtest_range, backtest_range_traced, BacktestEngine, BacktestTrace,
    HorizonReport, RangeReport, DEFAULT_REBALANCE_MONTHS, MONTHS_PER_YEAR, PORTFOLIO_SERIES_NAME,
};
pub use portfolio::{
    BacktestState, Portfolio, PortfolioConfig, DEFAULT_INITIAL_AMOUNT, MIN_HORIZON_YEARS,
};
