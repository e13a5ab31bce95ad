//! Currency codes served by the aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A currency whose USD exchange rate is aggregated.
///
/// Each variant has its own set of registered rate sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Brazilian real.
    Brl,
    /// Argentine peso.
    Ars,
}

impl Currency {
    /// All supported currencies, in a fixed order.
    pub const ALL: [Currency; 2] = [Currency::Brl, Currency::Ars];

    /// The ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Ars => "ARS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "ARS" => Ok(Currency::Ars),
            _ => Err(UnsupportedCurrency(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown currency code.
#[derive(Debug, Clone, Error)]
#[error("unsupported currency: {0}")]
pub struct UnsupportedCurrency(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("BRL".parse::<Currency>().unwrap(), Currency::Brl);
        assert_eq!("ars".parse::<Currency>().unwrap(), Currency::Ars);
        assert_eq!("Brl".parse::<Currency>().unwrap(), Currency::Brl);
    }

    #[test]
    fn rejects_unknown_codes() {
        let err = "USD".parse::<Currency>().unwrap_err();
        assert_eq!(err.0, "USD");
    }

    #[test]
    fn serializes_as_upper_case_code() {
        assert_eq!(serde_json::to_string(&Currency::Ars).unwrap(), "\"ARS\"");
        assert_eq!(Currency::Brl.to_string(), "BRL");
    }
}
