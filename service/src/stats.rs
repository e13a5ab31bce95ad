//! Cross-source statistics over one quote set.
//!
//! Pure functions: both are always computed from a single quote set
//! instance, never from quotes spanning two aggregation passes.

use cambio_common::Quote;
use rust_decimal::Decimal;
use serde::Serialize;

/// Arithmetic mean of both price sides across a quote set.
///
/// Both fields are `None` when the input is empty; that is a valid result,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAverages {
    pub average_buy_price: Option<Decimal>,
    pub average_sell_price: Option<Decimal>,
}

impl PriceAverages {
    /// Whether no averages could be computed.
    pub fn is_empty(&self) -> bool {
        self.average_buy_price.is_none() || self.average_sell_price.is_none()
    }
}

/// One source's percentage deviation from the cross-source average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlippageEntry {
    pub buy_price_slippage: Decimal,
    pub sell_price_slippage: Decimal,
    pub source: String,
}

/// Mean buy and sell price across `quotes`, rounded to 4 decimal places.
pub fn average(quotes: &[Quote]) -> PriceAverages {
    if quotes.is_empty() {
        return PriceAverages {
            average_buy_price: None,
            average_sell_price: None,
        };
    }

    let count = Decimal::from(quotes.len());
    let sum_buy: Decimal = quotes.iter().map(|quote| quote.buy_price).sum();
    let sum_sell: Decimal = quotes.iter().map(|quote| quote.sell_price).sum();

    PriceAverages {
        average_buy_price: Some((sum_buy / count).round_dp(4)),
        average_sell_price: Some((sum_sell / count).round_dp(4)),
    }
}

/// Per-source percentage deviation from the averages of `quotes`.
///
/// Empty when the averages are unavailable.
pub fn slippage(quotes: &[Quote]) -> Vec<SlippageEntry> {
    let averages = average(quotes);
    let (Some(average_buy), Some(average_sell)) =
        (averages.average_buy_price, averages.average_sell_price)
    else {
        return Vec::new();
    };

    quotes
        .iter()
        .map(|quote| SlippageEntry {
            buy_price_slippage: deviation_pct(quote.buy_price, average_buy),
            sell_price_slippage: deviation_pct(quote.sell_price, average_sell),
            source: quote.source.clone(),
        })
        .collect()
}

/// `(value - average) / average`, as a percentage rounded to 4 decimal
/// places. A zero average yields zero deviation rather than a division
/// error.
fn deviation_pct(value: Decimal, average: Decimal) -> Decimal {
    if average.is_zero() {
        return Decimal::ZERO;
    }

    ((value - average) / average * Decimal::ONE_HUNDRED).round_dp(4)
}
