use crate::core::item::{Item, LocalValuation};
use crate::core::rounding::{checked_total, to_local_units, AmountOverflow};
use crate::valuation::converter::CurrencyConverter;
use rust_decimal::Decimal;

/// Derives an item's customs value (CAF) in local currency.
pub struct ValuationCalculator;

impl ValuationCalculator {
    /// `caf = fob_local + freight_local + insurance_local + commission`,
    /// rounded half away from zero.
    pub fn caf(
        fob_local: i64,
        freight_local: i64,
        insurance_local: i64,
        supplier_commission: Decimal,
    ) -> Result<i64, AmountOverflow> {
        let sum = [fob_local, freight_local, insurance_local]
            .into_iter()
            .map(Decimal::from)
            .try_fold(supplier_commission, checked_total)?;
        to_local_units(sum)
    }

    /// Convert each component independently and compute the CAF.
    pub fn value(item: &Item, converter: &CurrencyConverter<'_>) -> Result<LocalValuation, AmountOverflow> {
        let fob_local = converter.convert(&item.fob)?;
        let freight_local = converter.convert(&item.freight)?;
        let insurance_local = converter.convert(&item.insurance)?;
        let caf = Self::caf(
            fob_local,
            freight_local,
            insurance_local,
            item.supplier_commission,
        )?;
        Ok(LocalValuation {
            fob_local,
            freight_local,
            insurance_local,
            caf,
        })
    }

    /// Value `item` and store the result on it.
    pub fn apply(item: &mut Item, converter: &CurrencyConverter<'_>) -> Result<LocalValuation, AmountOverflow> {
        let valuation = Self::value(item, converter)?;
        item.valuation = valuation;
        Ok(valuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyCode, CurrencyRate, CurrencyRateTable, Money};
    use crate::core::worksheet::WorksheetId;
    use rust_decimal_macros::dec;

    fn rates() -> CurrencyRateTable {
        let mut table = CurrencyRateTable::new(CurrencyCode::new("XOF"));
        table
            .insert(CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(650)))
            .unwrap();
        table
            .insert(CurrencyRate::new(CurrencyCode::new("EUR"), "€", dec!(655.957)))
            .unwrap();
        table
    }

    #[test]
    fn test_caf_sum() {
        assert_eq!(ValuationCalculator::caf(650_000, 0, 0, Decimal::ZERO).unwrap(), 650_000);
        assert_eq!(ValuationCalculator::caf(100, 20, 3, dec!(0.5)).unwrap(), 124);
        assert_eq!(ValuationCalculator::caf(100, 20, 3, dec!(-0.6)).unwrap(), 122);
    }

    #[test]
    fn test_mixed_currency_components() {
        let table = rates();
        let converter = CurrencyConverter::new(&table);
        let mut item = Item::new(
            WorksheetId::new(),
            "8703.23.10",
            Money::new(dec!(1000), CurrencyCode::new("USD")),
        )
        .with_freight(Money::new(dec!(100), CurrencyCode::new("EUR")))
        .with_insurance(Money::new(dec!(5000), CurrencyCode::new("XOF")))
        .with_supplier_commission(dec!(1500));

        let valuation = ValuationCalculator::apply(&mut item, &converter).unwrap();
        assert_eq!(valuation.fob_local, 650_000);
        assert_eq!(valuation.freight_local, 65_596); // 65595.7
        assert_eq!(valuation.insurance_local, 5_000);
        assert_eq!(valuation.caf, 650_000 + 65_596 + 5_000 + 1_500);
        assert_eq!(item.valuation, valuation);
    }

    #[test]
    fn test_value_does_not_mutate() {
        let table = rates();
        let converter = CurrencyConverter::new(&table);
        let item = Item::new(
            WorksheetId::new(),
            "0901.11",
            Money::new(dec!(10), CurrencyCode::new("USD")),
        );
        let valuation = ValuationCalculator::value(&item, &converter).unwrap();
        assert_eq!(valuation.caf, 6_500);
        assert_eq!(item.valuation.caf, 0);
    }
}
