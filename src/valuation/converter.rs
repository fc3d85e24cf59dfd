use crate::core::currency::{CurrencyCode, CurrencyRateTable, Money};
use crate::core::rounding::{checked_product, to_local_units, AmountOverflow};
use rust_decimal::Decimal;

/// Converts declared amounts into whole units of local currency.
///
/// An unknown currency is treated as already local (rate 1); conversion
/// never fails on a missing rate.
///
/// # Examples
///
/// ```
/// use customs_liquidation::core::currency::{CurrencyCode, CurrencyRate, CurrencyRateTable};
/// use customs_liquidation::valuation::converter::CurrencyConverter;
/// use rust_decimal_macros::dec;
///
/// let mut rates = CurrencyRateTable::new(CurrencyCode::new("XOF"));
/// rates.insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(650))).unwrap();
///
/// let converter = CurrencyConverter::new(&rates);
/// assert_eq!(converter.to_local(dec!(1000), &CurrencyCode::new("USD")).unwrap(), 650_000);
/// assert_eq!(converter.to_local(dec!(12.5), &CurrencyCode::new("ZZZ")).unwrap(), 13);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter<'a> {
    rates: &'a CurrencyRateTable,
}

impl<'a> CurrencyConverter<'a> {
    pub fn new(rates: &'a CurrencyRateTable) -> Self {
        Self { rates }
    }

    /// Rate applied to `currency`, defaulting to 1 when unknown.
    pub fn rate_for(&self, currency: &CurrencyCode) -> Decimal {
        self.rates.rate(currency).unwrap_or_else(|| {
            log::debug!("no rate for currency {}; treating amount as local", currency);
            Decimal::ONE
        })
    }

    /// `round(amount * rate)`, halves away from zero.
    pub fn to_local(&self, amount: Decimal, currency: &CurrencyCode) -> Result<i64, AmountOverflow> {
        let rate = self.rate_for(currency);
        to_local_units(checked_product(amount, rate)?)
    }

    pub fn convert(&self, money: &Money) -> Result<i64, AmountOverflow> {
        self.to_local(money.amount, &money.currency)
    }
}
