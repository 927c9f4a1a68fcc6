use std::sync::Arc;

use folio_core::{QuoteServerSource, YahooCsvSource};
use folio_tests::{
    CannedHttpClient, MonthlyQuotesRequest, QuoteCache, QuoteSource, SourceErrorKind, Symbol,
};

const SERVER: &str = "http://quotes.test";
const YAHOO: &str = "http://yahoo.test/table.csv";

const SERVER_BODY: &str = r#"[
  {"name":"VFINX","dates":["2013-01-01","2013-02-01","2013-03-01"],"values":[14970,15161,15667]},
  {"name":"VBMFX","dates":["2013-01-01","2013-02-01","2013-03-01"],"values":[1090,1088,1091]}
]"#;

const VFINX_CSV: &str = "Date,Open,High,Low,Close,Volume,Adj Close\n\
2013-03-01,151.00,156.00,150.50,156.67,100,156.67\n\
2013-02-01,149.00,152.00,147.00,151.61,100,151.61\n\
2013-01-01,142.00,150.00,141.00,149.70,100,149.70\n";

const VBMFX_CSV: &str = "Date,Open,High,Low,Close,Volume,Adj Close\n\
2013-03-01,10.9,10.9,10.9,10.91,100,10.91\n\
2013-02-01,10.9,10.9,10.9,10.88,100,10.88\n\
2013-01-01,10.9,10.9,10.9,10.90,100,10.90\n";

struct SourceCase {
    name: &'static str,
    source: Arc<dyn QuoteSource>,
    http: Arc<CannedHttpClient>,
}

fn healthy_cases() -> Vec<SourceCase> {
    let server_http = Arc::new(CannedHttpClient::new().respond(
        &format!("{SERVER}/quotes/monthly/?s=VFINX%2CVBMFX"),
        200,
        SERVER_BODY,
    ));
    let yahoo_http = Arc::new(
        CannedHttpClient::new()
            .respond(&format!("{YAHOO}?s=VFINX&g=m"), 200, VFINX_CSV)
            .respond(&format!("{YAHOO}?s=VBMFX&g=m"), 200, VBMFX_CSV),
    );

    vec![
        SourceCase {
            name: "quote_server",
            source: Arc::new(QuoteServerSource::new(SERVER, server_http.clone())),
            http: server_http,
        },
        SourceCase {
            name: "yahoo_csv",
            source: Arc::new(YahooCsvSource::with_base_url(YAHOO, yahoo_http.clone())),
            http: yahoo_http,
        },
    ]
}

fn request(tickers: &[&str]) -> MonthlyQuotesRequest {
    MonthlyQuotesRequest::new(Symbol::parse_all(tickers).expect("valid symbols"))
        .expect("valid request")
}

#[tokio::test]
async fn every_source_delivers_chronological_cents() {
    for case in healthy_cases() {
        assert_eq!(case.source.name(), case.name);

        let quotes = case
            .source
            .fetch_monthly(request(&["VFINX", "VBMFX"]))
            .await
            .unwrap_or_else(|error| panic!("source '{}' failed: {error}", case.name));

        assert_eq!(quotes.len(), 2, "source '{}': history count", case.name);
        let vfinx = quotes
            .iter()
            .find(|q| q.name == "VFINX")
            .unwrap_or_else(|| panic!("source '{}': VFINX missing", case.name));
        assert_eq!(
            vfinx.dates,
            vec!["2013-01-01", "2013-02-01", "2013-03-01"],
            "source '{}': date order",
            case.name
        );
        assert_eq!(
            vfinx.values,
            vec![14_970, 15_161, 15_667],
            "source '{}': cents",
            case.name
        );
    }
}

#[tokio::test]
async fn every_source_yields_the_same_cached_collection() {
    let mut collections = Vec::new();
    for case in healthy_cases() {
        let cache = QuoteCache::new(case.source.clone());
        let collection = cache
            .fetch(&["VFINX", "VBMFX"])
            .await
            .unwrap_or_else(|error| panic!("source '{}' failed: {error}", case.name));
        assert!(!case.http.requests().is_empty(), "source '{}': no HTTP", case.name);
        collections.push(collection.aligned_values().iter().map(|v| v.to_vec()).collect::<Vec<_>>());
    }

    assert_eq!(collections[0], collections[1]);
    assert_eq!(collections[0][1], vec![10.90, 10.88, 10.91]);
}

#[tokio::test]
async fn requests_carry_no_timeout_unless_configured() {
    for case in healthy_cases() {
        case.source
            .fetch_monthly(request(&["VFINX", "VBMFX"]))
            .await
            .unwrap_or_else(|error| panic!("source '{}' failed: {error}", case.name));
        for sent in case.http.requests() {
            assert_eq!(sent.timeout_ms, None, "source '{}': timeout", case.name);
        }
    }
}

#[tokio::test]
async fn unknown_tickers_are_reported_as_not_found() {
    for case in healthy_cases() {
        let err = case
            .source
            .fetch_monthly(request(&["ZZZZ"]))
            .await
            .expect_err("unknown ticker must fail");
        assert_eq!(
            err.kind(),
            SourceErrorKind::NotFound,
            "source '{}': error kind",
            case.name
        );
    }
}
