//! Portfolio requests and their backtest lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use folio_core::{CoreError, QuoteCache, Symbol, TimeSeriesCollection, ValidationError};

use crate::engine::{
    backtest_horizon, backtest_range_traced, BacktestTrace, HorizonReport, DEFAULT_REBALANCE_MONTHS,
};

pub const DEFAULT_INITIAL_AMOUNT: f64 = 10_000.0;

/// Shortest horizon accepted from a portfolio request.
pub const MIN_HORIZON_YEARS: u32 = 2;

fn default_initial_amount() -> f64 {
    DEFAULT_INITIAL_AMOUNT
}

fn default_rebalance_period() -> usize {
    DEFAULT_REBALANCE_MONTHS
}

/// A user's portfolio request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub tickers: Vec<String>,
    pub percents: Vec<f64>,
    #[serde(default = "default_initial_amount")]
    pub initial_amount: f64,
    pub horizon_years: u32,
    #[serde(default = "default_rebalance_period")]
    pub rebalance_period_months: usize,
}

impl PortfolioConfig {
    pub fn new(tickers: Vec<String>, percents: Vec<f64>, horizon_years: u32) -> Self {
        Self {
            tickers,
            percents,
            initial_amount: DEFAULT_INITIAL_AMOUNT,
            horizon_years,
            rebalance_period_months: DEFAULT_REBALANCE_MONTHS,
        }
    }

    pub fn with_initial_amount(mut self, initial_amount: f64) -> Self {
        self.initial_amount = initial_amount;
        self
    }

    pub fn with_rebalance_period_months(mut self, months: usize) -> Self {
        self.rebalance_period_months = months;
        self
    }

    /// Validate the request and return its normalized tickers.
    pub fn validate(&self) -> Result<Vec<Symbol>, ValidationError> {
        let symbols = Symbol::parse_all(&self.tickers)?;
        if self.percents.len() != symbols.len() {
            return Err(ValidationError::TickerPercentMismatch {
                tickers: symbols.len(),
                percents: self.percents.len(),
            });
        }
        if let Some(index) = self.percents.iter().position(|p| !p.is_finite()) {
            debug!(index, "non-finite percent in portfolio request");
            return Err(ValidationError::NonFiniteValue { field: "percents" });
        }
        if self.percents.iter().any(|p| *p < 0.0) {
            return Err(ValidationError::NegativeValue { field: "percents" });
        }
        folio_core::validate_percents(&self.percents)?;

        if !self.initial_amount.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "initial_amount",
            });
        }
        if self.initial_amount < 0.0 {
            return Err(ValidationError::NegativeValue {
                field: "initial_amount",
            });
        }
        if self.horizon_years < MIN_HORIZON_YEARS {
            return Err(ValidationError::HorizonTooShort {
                years: self.horizon_years,
                min: MIN_HORIZON_YEARS,
            });
        }
        if self.rebalance_period_months == 0 {
            return Err(ValidationError::ZeroRebalancePeriod);
        }
        Ok(symbols)
    }
}

/// Where a portfolio is in its fetch-then-run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktestState {
    Configured,
    Fetching,
    Ready,
    Running,
    Results,
    Failed,
}

/// A validated portfolio request and the quotes resolved for it.
///
/// The resolved collection is held here as well as in the session cache so
/// repeated runs never go back to the cache.
#[derive(Debug)]
pub struct Portfolio {
    config: PortfolioConfig,
    symbols: Vec<Symbol>,
    state: BacktestState,
    resolved_quotes: Option<Arc<TimeSeriesCollection>>,
}

impl Portfolio {
    pub fn new(config: PortfolioConfig) -> Result<Self, ValidationError> {
        let symbols = config.validate()?;
        Ok(Self {
            config,
            symbols,
            state: BacktestState::Configured,
            resolved_quotes: None,
        })
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn state(&self) -> BacktestState {
        self.state
    }

    pub fn resolved_quotes(&self) -> Option<&Arc<TimeSeriesCollection>> {
        self.resolved_quotes.as_ref()
    }

    /// Resolve this portfolio's quotes through `cache`, at most once per
    /// successful fetch.
    pub async fn resolve_quotes(
        &mut self,
        cache: &QuoteCache,
    ) -> Result<Arc<TimeSeriesCollection>, CoreError> {
        if let Some(quotes) = &self.resolved_quotes {
            return Ok(Arc::clone(quotes));
        }

        self.state = BacktestState::Fetching;
        match cache.fetch(self.symbols.as_slice()).await {
            Ok(collection) => {
                let quotes = Arc::new(collection);
                self.resolved_quotes = Some(Arc::clone(&quotes));
                self.state = BacktestState::Ready;
                Ok(quotes)
            }
            Err(err) => {
                warn!(error = %err, "portfolio quote fetch failed");
                self.state = BacktestState::Failed;
                Err(err)
            }
        }
    }

    /// Every full `horizon_years` window over the aligned history.
    pub async fn backtest_horizon(&mut self, cache: &QuoteCache) -> Result<HorizonReport, CoreError> {
        let quotes = self.resolve_quotes(cache).await?;
        self.run(|config| {
            backtest_horizon(
                &quotes,
                &config.percents,
                config.horizon_years,
                config.initial_amount,
                config.rebalance_period_months,
            )
        })
    }

    /// One backtest across the whole aligned history.
    pub async fn backtest_history(&mut self, cache: &QuoteCache) -> Result<BacktestTrace, CoreError> {
        let quotes = self.resolve_quotes(cache).await?;
        self.run(|config| {
            backtest_range_traced(
                &quotes,
                &config.percents,
                quotes.aligned_dates(),
                config.initial_amount,
                config.rebalance_period_months,
            )
        })
    }

    fn run<T>(
        &mut self,
        job: impl FnOnce(&PortfolioConfig) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        self.state = BacktestState::Running;
        let outcome = job(&self.config);
        self.state = match &outcome {
            Ok(_) => BacktestState::Results,
            Err(err) => {
                warn!(error = %err, "portfolio backtest failed");
                BacktestState::Failed
            }
        };
        outcome
    }
}
