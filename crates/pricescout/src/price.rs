//! Price-text normalization.
//!
//! Listing pages render prices in many shapes (`£1,299.00`, `US $12.5`,
//! `EUR 40`, `1234`). [`PriceNormalizer`] pulls the first price-looking
//! substring out of that text and turns it into a [`PriceAmount`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency symbols the normalizer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencySymbol {
    #[serde(rename = "$")]
    Dollar,
    #[serde(rename = "£")]
    Pound,
    #[serde(rename = "€")]
    Euro,
    #[serde(rename = "¥")]
    Yen,
}

impl CurrencySymbol {
    pub fn as_char(self) -> char {
        match self {
            Self::Dollar => '$',
            Self::Pound => '£',
            Self::Euro => '€',
            Self::Yen => '¥',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '$' => Some(Self::Dollar),
            '£' => Some(Self::Pound),
            '€' => Some(Self::Euro),
            '¥' => Some(Self::Yen),
            _ => None,
        }
    }
}

impl fmt::Display for CurrencySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A parsed, non-negative price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAmount {
    pub currency: CurrencySymbol,
    pub value: Decimal,
}

impl fmt::Display for PriceAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency, self.value)
    }
}

fn price_regex() -> &'static Regex {
    static PRICE_RE: OnceLock<Regex> = OnceLock::new();
    PRICE_RE.get_or_init(|| {
        Regex::new(r"(?P<symbol>[$£€¥])?\s*(?P<number>\d[\d,]*(?:\.\d{0,2})?)")
            .expect("price regex is valid")
    })
}

/// Parses raw price text into a [`PriceAmount`].
///
/// When the matched text carries no currency symbol, `fallback` is used.
/// The default fallback is `$` regardless of storefront region.
#[derive(Debug, Clone, Copy)]
pub struct PriceNormalizer {
    fallback: CurrencySymbol,
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self {
            fallback: CurrencySymbol::Dollar,
        }
    }
}

impl PriceNormalizer {
    /// Normalizer that labels symbol-less prices with `fallback`.
    pub fn with_fallback(fallback: CurrencySymbol) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> CurrencySymbol {
        self.fallback
    }

    /// Extract the first price in `raw`.
    ///
    /// Returns `None` when no numeric pattern is present, or when the number
    /// has more integer digits than a `Decimal` holds (about 28). `None` means
    /// the listing could not be priced; it is never a zero price.
    pub fn normalize(&self, raw: &str) -> Option<PriceAmount> {
        let caps = price_regex().captures(raw.trim())?;

        let currency = caps
            .name("symbol")
            .and_then(|m| m.as_str().chars().next())
            .and_then(CurrencySymbol::from_char)
            .unwrap_or(self.fallback);

        let digits: String = caps
            .name("number")?
            .as_str()
            .chars()
            .filter(|c| *c != ',')
            .collect();
        let value = match Decimal::from_str(digits.trim_end_matches('.')) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Price {digits} out of range: {e}");
                return None;
            }
        };

        Some(PriceAmount { currency, value })
    }
}

/// Normalize with the documented `$` fallback.
pub fn normalize(raw: &str) -> Option<PriceAmount> {
    PriceNormalizer::default().normalize(raw)
}
