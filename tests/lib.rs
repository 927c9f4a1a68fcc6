//! Shared fixtures for folio's integration tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

pub use folio_backtest::{
    backtest_horizon, backtest_range, backtest_range_traced, BacktestState, HorizonReport,
    Portfolio, PortfolioConfig,
};
pub use folio_core::{
    CoreError, HttpClient, HttpError, HttpRequest, HttpResponse, MonthlyQuotes,
    MonthlyQuotesRequest, QuoteCache, QuoteDate, QuoteSource, SourceError, SourceErrorKind,
    SourceFuture, Symbol, TimeSeries, TimeSeriesCollection, ValidationError,
};

/// `months` consecutive month-start dates beginning January of `start_year`.
pub fn monthly_dates(start_year: i32, months: usize) -> Vec<String> {
    (0..months)
        .map(|m| format!("{:04}-{:02}-01", start_year + (m / 12) as i32, m % 12 + 1))
        .collect()
}

pub fn monthly_series(name: &str, start_year: i32, values: Vec<f64>) -> TimeSeries {
    TimeSeries::new(name, &monthly_dates(start_year, values.len()), values)
        .expect("fixture series should be valid")
}

/// Quote source serving canned histories, recording every request.
#[derive(Default)]
pub struct ScriptedSource {
    histories: HashMap<String, MonthlyQuotes>,
    calls: Mutex<Vec<Vec<String>>>,
    fail_next: Mutex<HashSet<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `cents` as monthly closes for `ticker` starting January of
    /// `start_year`.
    pub fn with_history(mut self, ticker: &str, start_year: i32, cents: Vec<i64>) -> Self {
        self.histories.insert(
            ticker.to_owned(),
            MonthlyQuotes {
                name: ticker.to_owned(),
                dates: monthly_dates(start_year, cents.len()),
                values: cents,
            },
        );
        self
    }

    /// Fail the next request that includes `ticker`.
    pub fn fail_next(&self, ticker: &str) {
        self.fail_next
            .lock()
            .expect("lock")
            .insert(ticker.to_owned());
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("lock").clone()
    }
}

impl QuoteSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn fetch_monthly<'a>(&'a self, req: MonthlyQuotesRequest) -> SourceFuture<'a, Vec<MonthlyQuotes>> {
        Box::pin(async move {
            let tickers: Vec<String> = req.symbols.iter().map(|s| s.to_string()).collect();
            self.calls.lock().expect("lock").push(tickers.clone());
            tokio::task::yield_now().await;

            {
                let mut failing = self.fail_next.lock().expect("lock");
                if tickers.iter().any(|t| failing.contains(t)) {
                    failing.retain(|t| !tickers.contains(t));
                    return Err(SourceError::unavailable("scripted outage"));
                }
            }

            tickers
                .iter()
                .map(|ticker| {
                    self.histories
                        .get(ticker)
                        .cloned()
                        .ok_or_else(|| SourceError::not_found(format!("no quotes for {ticker}")))
                })
                .collect()
        })
    }
}

/// HTTP client answering from a fixed URL table; unknown URLs get a 404.
#[derive(Default)]
pub struct CannedHttpClient {
    responses: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl CannedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses.insert(
            url.to_owned(),
            HttpResponse {
                status,
                body: body.to_owned(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl HttpClient for CannedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .responses
                .get(&request.url)
                .cloned()
                .unwrap_or(HttpResponse {
                    status: 404,
                    body: String::new(),
                });
            self.requests.lock().expect("lock").push(request);
            Ok(response)
        })
    }
}
