//! Quote source adapters.
//!
//! | Adapter | Upstream | Requests per fetch |
//! |---------|----------|--------------------|
//! | [`QuoteServerSource`] | `/quotes/monthly/?s=` JSON endpoint | one |
//! | [`YahooCsvSource`] | monthly CSV download | one per ticker |

mod quote_server;
mod yahoo;

pub use quote_server::QuoteServerSource;
pub use yahoo::{parse_monthly_csv, YahooCsvSource, YAHOO_MONTHLY_CSV_URL};
