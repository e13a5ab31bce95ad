//! Quote payloads produced by rate sources.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One provider's exchange-rate snapshot for a currency.
///
/// Immutable once produced by an aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Price at which the provider buys USD.
    pub buy_price: Decimal,
    /// Price at which the provider sells USD.
    pub sell_price: Decimal,
    /// Identifier of the provider that produced this quote.
    pub source: String,
}

impl Quote {
    /// Create a new quote.
    pub fn new(buy_price: Decimal, sell_price: Decimal, source: impl Into<String>) -> Self {
        Self {
            buy_price,
            sell_price,
            source: source.into(),
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: buy {} / sell {}",
            self.source, self.buy_price, self.sell_price
        )
    }
}

/// The ordered output of one aggregation pass for a currency.
///
/// May hold fewer entries than there are registered sources, or none at all
/// when every source failed.
pub type QuoteSet = Vec<Quote>;
