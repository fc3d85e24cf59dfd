use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// ISO 4217-style currency code.
///
/// Declared amounts on a worksheet may use any code; the only code with
/// special meaning is the local settlement currency of the rate table.
///
/// # Examples
///
/// ```
/// use customs_liquidation::core::currency::CurrencyCode;
///
/// let eur = CurrencyCode::new("EUR");
/// let usd = CurrencyCode::new("USD");
/// assert_ne!(eur, usd);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An amount denominated in a declared currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Errors arising from currency rate maintenance.
#[derive(Debug, Error)]
pub enum FxError {
    #[error("rate to local currency must be positive, got {rate} for {code}")]
    InvalidRate { code: CurrencyCode, rate: Decimal },
    #[error("currency {0} is listed more than once")]
    DuplicateCurrency(CurrencyCode),
}

/// One row of the currency reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub code: CurrencyCode,
    /// Symbolic label shown on documents (e.g. "€", "$").
    #[serde(default)]
    pub label: String,
    /// Units of local currency per one unit of `code`.
    pub rate_to_local: Decimal,
}

impl CurrencyRate {
    pub fn new(code: CurrencyCode, label: impl Into<String>, rate_to_local: Decimal) -> Self {
        Self {
            code,
            label: label.into(),
            rate_to_local,
        }
    }
}

/// Rates from every known currency into the local settlement currency.
///
/// Only direct `X -> local` rates are held; the pipeline never converts
/// between two foreign currencies.
///
/// # Examples
///
/// ```
/// use customs_liquidation::core::currency::{CurrencyCode, CurrencyRate, CurrencyRateTable};
/// use rust_decimal_macros::dec;
///
/// let mut rates = CurrencyRateTable::new(CurrencyCode::new("XOF"));
/// rates
///     .insert(CurrencyRate::new(CurrencyCode::new("EUR"), "€", dec!(655.957)))
///     .unwrap();
///
/// assert_eq!(rates.rate(&CurrencyCode::new("EUR")), Some(dec!(655.957)));
/// assert_eq!(rates.rate(&CurrencyCode::new("XOF")), Some(dec!(1)));
/// assert_eq!(rates.rate(&CurrencyCode::new("JPY")), None);
/// ```
#[derive(Debug, Clone)]
pub struct CurrencyRateTable {
    /// The settlement currency every amount is converted into.
    pub local_currency: CurrencyCode,
    rates: HashMap<CurrencyCode, CurrencyRate>,
}

impl CurrencyRateTable {
    pub fn new(local_currency: CurrencyCode) -> Self {
        Self {
            local_currency,
            rates: HashMap::new(),
        }
    }

    /// Register a rate. Rates must be strictly positive and unique per code.
    pub fn insert(&mut self, rate: CurrencyRate) -> Result<(), FxError> {
        if rate.rate_to_local <= Decimal::ZERO {
            return Err(FxError::InvalidRate {
                code: rate.code,
                rate: rate.rate_to_local,
            });
        }
        if self.rates.contains_key(&rate.code) {
            return Err(FxError::DuplicateCurrency(rate.code));
        }
        self.rates.insert(rate.code.clone(), rate);
        Ok(())
    }

    /// The rate for `code`, or `None` when the code is unknown.
    ///
    /// The local currency always has rate 1, whether or not it is listed.
    pub fn rate(&self, code: &CurrencyCode) -> Option<Decimal> {
        if code == &self.local_currency {
            return Some(Decimal::ONE);
        }
        self.rates.get(code).map(|r| r.rate_to_local)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table() -> CurrencyRateTable {
        CurrencyRateTable::new(CurrencyCode::new("XOF"))
    }

    #[test]
    fn test_currency_code_equality() {
        let a = CurrencyCode::new("EUR");
        let b = CurrencyCode::new("EUR");
        assert_eq!(a, b);
    }

    #[test]
    fn test_rate_lookup() {
        let mut rates = table();
        rates
            .insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(600.5)))
            .unwrap();

        assert_eq!(rates.rate(&CurrencyCode::new("USD")), Some(dec!(600.5)));
        assert_eq!(rates.len(), 1);
    }

    #[test]
    fn test_local_currency_is_identity() {
        let rates = table();
        assert_eq!(rates.rate(&CurrencyCode::new("XOF")), Some(Decimal::ONE));
    }

    #[test]
    fn test_unknown_currency_has_no_rate() {
        let rates = table();
        assert_eq!(rates.rate(&CurrencyCode::new("GBP")), None);
    }

    #[test]
    fn test_invalid_rate() {
        let mut rates = table();
        let zero = rates.insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", Decimal::ZERO));
        assert!(matches!(zero, Err(FxError::InvalidRate { .. })));

        let negative = rates.insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(-1)));
        assert!(negative.is_err());
        assert!(rates.is_empty());
    }

    #[test]
    fn test_duplicate_currency() {
        let mut rates = table();
        rates
            .insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(600)))
            .unwrap();
        let again = rates.insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(610)));
        assert!(matches!(again, Err(FxError::DuplicateCurrency(_))));
        assert_eq!(rates.rate(&CurrencyCode::new("USD")), Some(dec!(600)));
    }
}
