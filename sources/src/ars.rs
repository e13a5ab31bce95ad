//! ARS/USD rate sources.
//!
//! Three independent Argentine market pages. All three publish both sides of
//! the quote ("compra"/"venta"); when the sell side cannot be located it is
//! approximated from the buy side with the typical blue-dollar spread.

use async_trait::async_trait;
use cambio_common::Quote;
use rust_decimal::Decimal;
use tracing::debug;

use crate::adapter::RateSource;
use crate::error::{SourceError, SourceResult};
use crate::{extract, http};

const AMBITO_URL: &str = "https://www.ambito.com/contenidos/dolar.html";
const DOLARHOY_URL: &str = "https://www.dolarhoy.com";
const CRONISTA_URL: &str = "https://www.cronista.com/MercadosOnline/moneda.html?id=ARSB";

/// Plausible ARS/USD band; values outside it are page noise.
fn band() -> (Decimal, Decimal) {
    (Decimal::from(50), Decimal::from(2000))
}

/// Spread applied when a page only yields the buy side.
fn sell_markup() -> Decimal {
    // 1.03
    Decimal::new(103, 2)
}

fn quote_from_prices(url: &str, buy_price: Decimal, sell_price: Option<Decimal>) -> Quote {
    let sell_price =
        sell_price.unwrap_or_else(|| (buy_price * sell_markup()).round_dp(4));
    Quote::new(buy_price, sell_price, url)
}

/// Ambito dollar page.
pub struct AmbitoSource {
    client: reqwest::Client,
}

impl AmbitoSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn extract_prices(body: &str) -> Option<(Decimal, Option<Decimal>)> {
        let (min, max) = band();

        let buy = extract::labeled_price(body, "compra", min, max);
        let sell = extract::labeled_price(body, "venta", min, max);

        match buy {
            Some(buy) => Some((buy, sell)),
            // Unlabeled markup: take the first two banded values in order.
            None => {
                let prices = extract::prices_in_band(body, min, max);
                let buy = prices.first().copied()?;
                Some((buy, prices.get(1).copied()))
            }
        }
    }
}

#[async_trait]
impl RateSource for AmbitoSource {
    fn name(&self) -> &str {
        "ambito"
    }

    async fn fetch(&self) -> SourceResult<Quote> {
        let body = http::fetch_document(&self.client, AMBITO_URL).await?;

        let (buy, sell) = Self::extract_prices(&body).ok_or(SourceError::RateNotFound {
            url: AMBITO_URL.to_string(),
        })?;

        debug!(source = self.name(), buy = %buy, "extracted rate");
        Ok(quote_from_prices(AMBITO_URL, buy, sell))
    }
}

/// DolarHoy front page.
pub struct DolarHoySource {
    client: reqwest::Client,
}

impl DolarHoySource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn extract_prices(body: &str) -> Option<(Decimal, Option<Decimal>)> {
        let (min, max) = band();

        let buy = extract::labeled_price(body, "compra", min, max);
        let sell = extract::labeled_price(body, "venta", min, max);

        match buy {
            Some(buy) => Some((buy, sell)),
            // Unlabeled markup: the lowest banded value is the buy side and
            // the highest the sell side.
            None => {
                let mut prices = extract::prices_in_band(body, min, max);
                prices.sort();
                let buy = prices.first().copied()?;
                let sell = (prices.len() > 1).then(|| prices[prices.len() - 1]);
                Some((buy, sell))
            }
        }
    }
}

#[async_trait]
impl RateSource for DolarHoySource {
    fn name(&self) -> &str {
        "dolarhoy"
    }

    async fn fetch(&self) -> SourceResult<Quote> {
        let body = http::fetch_document(&self.client, DOLARHOY_URL).await?;

        let (buy, sell) = Self::extract_prices(&body).ok_or(SourceError::RateNotFound {
            url: DOLARHOY_URL.to_string(),
        })?;

        debug!(source = self.name(), buy = %buy, "extracted rate");
        Ok(quote_from_prices(DOLARHOY_URL, buy, sell))
    }
}

/// Cronista blue-dollar page.
pub struct CronistaSource {
    client: reqwest::Client,
}

impl CronistaSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn extract_prices(body: &str) -> Option<(Decimal, Option<Decimal>)> {
        let (min, max) = band();
        let prices = extract::prices_in_band(body, min, max);

        let buy = prices.first().copied()?;
        let sell = prices.iter().skip(1).find(|value| **value != buy).copied();
        Some((buy, sell))
    }
}

#[async_trait]
impl RateSource for CronistaSource {
    fn name(&self) -> &str {
        "cronista"
    }

    async fn fetch(&self) -> SourceResult<Quote> {
        let body = http::fetch_document(&self.client, CRONISTA_URL).await?;

        let (buy, sell) = Self::extract_prices(&body).ok_or(SourceError::RateNotFound {
            url: CRONISTA_URL.to_string(),
        })?;

        debug!(source = self.name(), buy = %buy, "extracted rate");
        Ok(quote_from_prices(CRONISTA_URL, buy, sell))
    }
}
