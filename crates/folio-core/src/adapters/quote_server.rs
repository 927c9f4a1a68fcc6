use std::sync::Arc;

use crate::data_source::{MonthlyQuotes, MonthlyQuotesRequest, QuoteSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest};

/// Client for the quote server's `/quotes/monthly/?s=A,B` endpoint.
///
/// All requested tickers go out in one request; the server answers with a
/// JSON array of `{name, dates, values}` objects (values in cents) and with
/// 404 when any ticker has no data.
#[derive(Clone)]
pub struct QuoteServerSource {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    timeout_ms: Option<u64>,
}

impl QuoteServerSource {
    pub fn new(base_url: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
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

    pub fn monthly_url(&self, req: &MonthlyQuotesRequest) -> String {
        format!(
            "{}/quotes/monthly/?s={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&req.joined())
        )
    }
}

impl QuoteSource for QuoteServerSource {
    fn name(&self) -> &'static str {
        "quote_server"
    }

    fn fetch_monthly<'a>(&'a self, req: MonthlyQuotesRequest) -> SourceFuture<'a, Vec<MonthlyQuotes>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.monthly_url(&req))
                .with_header("accept", "application/json")
                .with_timeout_ms(self.timeout_ms);

            let response = self.http_client.execute(request).await.map_err(|error| {
                SourceError::unavailable(format!("quote server transport error: {}", error.message()))
            })?;

            if response.status == 404 {
                return Err(SourceError::not_found(format!(
                    "quote server has no data for at least one of [{}]",
                    req.joined()
                )));
            }
            if !response.is_success() {
                return Err(SourceError::unavailable(format!(
                    "quote server returned status {}",
                    response.status
                )));
            }

            serde_json::from_str::<Vec<MonthlyQuotes>>(&response.body).map_err(|error| {
                SourceError::invalid_response(format!("quote server returned malformed JSON: {error}"))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::Symbol;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct CannedClient {
        response: Result<HttpResponse, HttpError>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedClient {
        fn new(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpClient for CannedClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.seen.lock().expect("lock").push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn request(tickers: &[&str]) -> MonthlyQuotesRequest {
        MonthlyQuotesRequest::new(Symbol::parse_all(tickers).expect("symbols")).expect("request")
    }

    #[tokio::test]
    async fn decodes_one_history_per_ticker() {
        let body = r#"[
            {"name": "VFINX", "dates": ["2000-01-01", "2000-02-01"], "values": [13000, 12750]},
            {"name": "VBMFX", "dates": ["2000-01-01", "2000-02-01"], "values": [900, 910]}
        ]"#;
        let client = CannedClient::new(Ok(HttpResponse::ok(body)));
        let source = QuoteServerSource::new("http://quotes.test/", client.clone());

        let quotes = source
            .fetch_monthly(request(&["vfinx", "vbmfx"]))
            .await
            .expect("fetch");

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[1].values, vec![900, 910]);

        let seen = client.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://quotes.test/quotes/monthly/?s=VFINX%2CVBMFX");
        assert_eq!(seen[0].timeout_ms, None);
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found() {
        let client = CannedClient::new(Ok(HttpResponse {
            status: 404,
            body: String::new(),
        }));
        let source = QuoteServerSource::new("http://quotes.test", client);

        let err = source
            .fetch_monthly(request(&["NOPE"]))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::NotFound);
        assert!(err.message().contains("NOPE"));
    }

    #[tokio::test]
    async fn transport_and_decode_failures_are_classified() {
        let down = QuoteServerSource::new(
            "http://quotes.test",
            CannedClient::new(Err(HttpError::new("connection refused"))),
        );
        let err = down.fetch_monthly(request(&["VFINX"])).await.expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Unavailable);

        let garbled = QuoteServerSource::new(
            "http://quotes.test",
            CannedClient::new(Ok(HttpResponse::ok("<html>oops</html>"))),
        );
        let err = garbled
            .fetch_monthly(request(&["VFINX"]))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidResponse);
    }
}
