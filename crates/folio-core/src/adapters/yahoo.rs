use std::sync::Arc;

use futures::future::try_join_all;
use serde::Deserialize;

use crate::data_source::{MonthlyQuotes, MonthlyQuotesRequest, QuoteSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest};
use crate::Symbol;

/// Historical monthly CSV endpoint (`?s=TICKER&g=m`).
pub const YAHOO_MONTHLY_CSV_URL: &str = "http://ichart.yahoo.com/table.csv";

/// Fetches monthly closing prices as CSV, one request per ticker.
///
/// The CSV lists the newest month first; rows are reversed into
/// chronological order and closes converted to integer cents.
#[derive(Clone)]
pub struct YahooCsvSource {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: f64,
}

impl YahooCsvSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_base_url(YAHOO_MONTHLY_CSV_URL, http_client)
    }

    pub fn with_base_url(base_url: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn monthly_url(&self, symbol: &Symbol) -> String {
        format!(
            "{}?s={}&g=m",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        )
    }

    async fn fetch_one(&self, symbol: &Symbol) -> Result<MonthlyQuotes, SourceError> {
        let request = HttpRequest::get(self.monthly_url(symbol))
            .with_header("accept", "text/csv")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
        })?;

        if response.status == 404 {
            return Err(SourceError::not_found(format!(
                "yahoo has no monthly data for {symbol}"
            )));
        }
        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo upstream returned status {}",
                response.status
            )));
        }

        parse_monthly_csv(symbol, &response.body)
    }
}

/// Parse a newest-first `Date,...,Close` CSV into chronological cents.
pub fn parse_monthly_csv(symbol: &Symbol, body: &str) -> Result<MonthlyQuotes, SourceError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut dates = Vec::new();
    let mut values = Vec::new();

    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|error| {
            SourceError::invalid_response(format!("malformed yahoo CSV for {symbol}: {error}"))
        })?;
        if !row.close.is_finite() || row.close < 0.0 {
            return Err(SourceError::invalid_response(format!(
                "yahoo CSV for {symbol} has invalid close {} on {}",
                row.close, row.date
            )));
        }
        dates.push(row.date);
        values.push(to_cents(row.close));
    }

    dates.reverse();
    values.reverse();

    Ok(MonthlyQuotes {
        name: symbol.to_string(),
        dates,
        values,
    })
}

fn to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

impl QuoteSource for YahooCsvSource {
    fn name(&self) -> &'static str {
        "yahoo_csv"
    }

    fn fetch_monthly<'a>(&'a self, req: MonthlyQuotesRequest) -> SourceFuture<'a, Vec<MonthlyQuotes>> {
        Box::pin(async move {
            try_join_all(req.symbols.iter().map(|symbol| self.fetch_one(symbol))).await
        })
    }
}
