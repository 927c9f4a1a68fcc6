//! Session-wide cache of monthly quote histories, keyed by ticker.
//!
//! Different consumers ask for overlapping ticker sets over a session, so the
//! cache works at ticker granularity rather than per request: a second request
//! only goes to the network for the tickers nobody has fetched yet.
//!
//! Entries are write-once. A ticker that is already being fetched is never
//! requested again; later callers attach to the in-flight fetch and share its
//! outcome.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{try_join_all, FutureExt, Shared};
use tracing::{debug, warn};

use crate::data_source::{MonthlyQuotesRequest, QuoteSource, SourceError};
use crate::{CoreError, Symbol, TimeSeries, TimeSeriesCollection, ValidationError};

type FetchFuture = Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send>>;
type SharedFetch = Shared<FetchFuture>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<Symbol, Arc<TimeSeries>>,
    /// In-flight fetches by ticker, tagged with the fetch id that owns them.
    pending: HashMap<Symbol, (u64, SharedFetch)>,
    next_fetch_id: u64,
}

/// Explicit quote cache context, shared by cloning.
#[derive(Clone)]
pub struct QuoteCache {
    source: Arc<dyn QuoteSource>,
    state: Arc<Mutex<CacheState>>,
}

impl Debug for QuoteCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("QuoteCache")
            .field("source", &self.source.name())
            .field("cached", &state.entries.len())
            .field("in_flight", &state.pending.len())
            .finish()
    }
}

impl QuoteCache {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Resolve `tickers` into a collection in exactly the requested order.
    ///
    /// Cached tickers are served from memory, tickers already in flight are
    /// awaited, and the remaining ones are fetched in a single source call.
    /// There is no retry and no timeout; a failed fetch can be re-issued by
    /// calling again.
    pub async fn fetch<S: AsRef<str>>(
        &self,
        tickers: &[S],
    ) -> Result<TimeSeriesCollection, CoreError> {
        let symbols = Symbol::parse_all(tickers)?;
        let waits = self.plan(&symbols);
        if !waits.is_empty() {
            try_join_all(waits).await?;
        }
        self.collection_of(&symbols)
    }

    /// Assemble a collection from cached entries only.
    ///
    /// Fails with [`CoreError::CacheMiss`] naming the first ticker that is not
    /// cached.
    pub fn get_collection<S: AsRef<str>>(
        &self,
        tickers: &[S],
    ) -> Result<TimeSeriesCollection, CoreError> {
        let symbols = Symbol::parse_all(tickers)?;
        self.collection_of(&symbols)
    }

    /// Store `series` under its name unless that ticker is already cached.
    /// Returns whether the series was stored.
    pub fn insert(&self, series: TimeSeries) -> Result<bool, ValidationError> {
        let symbol = Symbol::parse(series.name())?;
        let mut state = lock(&self.state);
        Ok(insert_if_absent(&mut state, symbol, series))
    }

    pub fn contains(&self, ticker: &str) -> bool {
        Symbol::parse(ticker)
            .map(|symbol| lock(&self.state).entries.contains_key(&symbol))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached tickers in sorted order.
    pub fn cached_tickers(&self) -> Vec<Symbol> {
        let mut tickers: Vec<Symbol> = lock(&self.state).entries.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    fn collection_of(&self, symbols: &[Symbol]) -> Result<TimeSeriesCollection, CoreError> {
        let state = lock(&self.state);
        let members = symbols
            .iter()
            .map(|symbol| {
                state
                    .entries
                    .get(symbol)
                    .cloned()
                    .ok_or_else(|| CoreError::CacheMiss {
                        ticker: symbol.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TimeSeriesCollection::new(members))
    }

    /// Decide, under one lock, which fetches this request has to wait for,
    /// starting a new one for tickers nobody is fetching yet.
    fn plan(&self, symbols: &[Symbol]) -> Vec<SharedFetch> {
        let mut state = lock(&self.state);
        let mut waits: Vec<(u64, SharedFetch)> = Vec::new();
        let mut missing: Vec<Symbol> = Vec::new();
        let mut attached: Vec<&Symbol> = Vec::new();

        for symbol in symbols {
            if state.entries.contains_key(symbol) {
                continue;
            }
            if let Some((id, fetch)) = state.pending.get(symbol) {
                if !waits.iter().any(|(waiting, _)| waiting == id) {
                    waits.push((*id, fetch.clone()));
                }
                attached.push(symbol);
                continue;
            }
            if !missing.contains(symbol) {
                missing.push(symbol.clone());
            }
        }

        debug!(
            source = self.source.name(),
            cached = state.entries.len(),
            requested = %join(symbols.iter()),
            in_flight = %join(attached.into_iter()),
            fetching = %join(missing.iter()),
            "resolving quotes"
        );

        if !missing.is_empty() {
            let id = state.next_fetch_id;
            state.next_fetch_id += 1;

            let fetch = self.start_fetch(id, missing.clone());
            for symbol in missing {
                state.pending.insert(symbol, (id, fetch.clone()));
            }
            waits.push((id, fetch));
        }

        waits.into_iter().map(|(_, fetch)| fetch).collect()
    }

    /// Build the shared fetch future. Whoever polls it to completion stores
    /// the results and clears the in-flight markers, so the outcome does not
    /// depend on which caller is still waiting.
    fn start_fetch(&self, id: u64, missing: Vec<Symbol>) -> SharedFetch {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        let fetch: FetchFuture = Box::pin(async move {
            let outcome = fetch_series(source.as_ref(), &missing).await;
            complete_fetch(&state, id, &missing, outcome)
        });
        fetch.shared()
    }
}

async fn fetch_series(
    source: &dyn QuoteSource,
    missing: &[Symbol],
) -> Result<Vec<(Symbol, TimeSeries)>, CoreError> {
    let fail = |error: SourceError| CoreError::ticker_fetch(missing, error);

    let request = MonthlyQuotesRequest::new(missing.to_vec()).map_err(fail)?;
    let quotes = source.fetch_monthly(request).await.map_err(fail)?;

    let mut fetched: Vec<(Symbol, TimeSeries)> = Vec::with_capacity(missing.len());
    for quotes in quotes {
        let symbol = quotes.symbol().map_err(|error| fail(error.into()))?;
        if !missing.contains(&symbol) {
            debug!(ticker = %symbol, "ignoring unrequested history from source");
            continue;
        }
        if fetched.iter().any(|(seen, _)| *seen == symbol) {
            continue;
        }
        let series = quotes.into_time_series().map_err(|error| {
            fail(SourceError::invalid_response(format!(
                "invalid history for {symbol}: {error}"
            )))
        })?;
        fetched.push((symbol, series));
    }

    if let Some(absent) = missing
        .iter()
        .find(|symbol| !fetched.iter().any(|(seen, _)| seen == *symbol))
    {
        return Err(fail(SourceError::invalid_response(format!(
            "source returned no history for {absent}"
        ))));
    }

    Ok(fetched)
}

fn complete_fetch(
    state: &Mutex<CacheState>,
    id: u64,
    missing: &[Symbol],
    outcome: Result<Vec<(Symbol, TimeSeries)>, CoreError>,
) -> Result<(), CoreError> {
    let mut state = lock(state);
    for symbol in missing {
        let owned = matches!(state.pending.get(symbol), Some((owner, _)) if *owner == id);
        if owned {
            state.pending.remove(symbol);
        }
    }

    match outcome {
        Ok(fetched) => {
            for (symbol, series) in fetched {
                insert_if_absent(&mut state, symbol, series);
            }
            Ok(())
        }
        Err(error) => {
            warn!(tickers = %join(missing.iter()), %error, "quote fetch failed");
            Err(error)
        }
    }
}

fn insert_if_absent(state: &mut CacheState, symbol: Symbol, series: TimeSeries) -> bool {
    if state.entries.contains_key(&symbol) {
        return false;
    }
    state.entries.insert(symbol, Arc::new(series));
    true
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn join<'a>(symbols: impl Iterator<Item = &'a Symbol>) -> String {
    symbols.map(Symbol::as_str).collect::<Vec<_>>().join(",")
}
