//! # Domain Types
//!
//! Validated value types shared by every folio component.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Uppercase-normalized ticker, the quote cache key |
//! | [`QuoteDate`] | Calendar date in the fixed `YYYY-MM-DD` quote format |
//!
//! Both enforce their invariants at construction time and serialize as plain
//! strings.

mod date;
mod symbol;

pub use date::QuoteDate;
pub use symbol::Symbol;
