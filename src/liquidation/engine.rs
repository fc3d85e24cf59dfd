use crate::core::item::Item;
use crate::core::rounding::{checked_product, checked_total, checked_units_sum, to_local_units, AmountOverflow};
use crate::core::tax::{BaseType, TaxCode, TaxDefinition};
use crate::liquidation::line::{LiquidationLine, LiquidationResult, ReferenceWarning};
use crate::reference::snapshot::ReferenceData;
use crate::valuation::calculator::ValuationCalculator;
use crate::valuation::converter::CurrencyConverter;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

/// Computes the duty and tax breakdown of a single item.
///
/// Taxes are evaluated strictly in the snapshot's evaluation order because a
/// principal tax reads the amounts already computed for its complements.
///
/// # Algorithm
///
/// 1. Revalue the item so its CAF reflects current rates.
/// 2. For each tax: skip it when the item's tariff code has no entry for it,
///    zero it when excluded, otherwise take the base for its base type, add
///    the amounts of its complements, and apply the percentage.
/// 3. The total is the sum of the persisted lines.
pub struct LiquidationEngine<'a> {
    reference: &'a ReferenceData,
}

impl<'a> LiquidationEngine<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        Self { reference }
    }

    /// Liquidate `item`, storing its refreshed valuation on it.
    ///
    /// `excluded` holds tax codes waived for this item. An excluded tax
    /// contributes nothing to the taxes that depend on it.
    pub fn liquidate(
        &self,
        item: &mut Item,
        excluded: &BTreeSet<TaxCode>,
    ) -> Result<LiquidationResult, AmountOverflow> {
        let converter = CurrencyConverter::new(self.reference.currencies());
        let valuation = ValuationCalculator::apply(item, &converter)?;

        let mut computed: HashMap<&TaxCode, i64> = HashMap::new();
        let mut lines = Vec::with_capacity(self.reference.taxes().len());
        let mut warnings = Vec::new();

        for tax in self.reference.taxes() {
            let Some(rate_code) = self.reference.tariff_rate_code(&item.tariff_code, &tax.code)
            else {
                log::trace!("tax {} does not apply to tariff {}", tax.code, item.tariff_code);
                lines.push(LiquidationLine::not_applicable(tax.code.clone(), &tax.label));
                continue;
            };

            if excluded.contains(&tax.code) {
                let rate = self.reference.percentage(rate_code).unwrap_or(Decimal::ZERO);
                lines.push(LiquidationLine::excluded(tax.code.clone(), &tax.label, rate));
                continue;
            }

            let rate = match self.reference.percentage(rate_code) {
                Some(rate) => rate,
                None => {
                    log::warn!(
                        "tariff {} maps tax {} to unknown rate code {}; applying 0%",
                        item.tariff_code,
                        tax.code,
                        rate_code
                    );
                    warnings.push(ReferenceWarning::MissingRate {
                        tax: tax.code.clone(),
                        rate_code: rate_code.to_string(),
                    });
                    Decimal::ZERO
                }
            };

            let mut base = base_value(tax, item, valuation.caf);
            for complement in self.reference.complements_of(&tax.code) {
                let amount = computed.get(complement).copied().unwrap_or(0);
                base = checked_total(base, Decimal::from(amount))?;
            }

            let amount = to_local_units(checked_product(base, rate)? / Decimal::ONE_HUNDRED)?;
            computed.insert(&tax.code, amount);

            lines.push(LiquidationLine {
                code: tax.code.clone(),
                label: tax.label.clone(),
                rate,
                base_amount: base,
                computed_amount: amount,
                applicable: true,
                excluded: false,
            });
        }

        let total = checked_units_sum(
            lines.iter().filter(|l| l.is_persisted()).map(|l| l.computed_amount),
        )?;

        Ok(LiquidationResult {
            item_id: item.id,
            caf: valuation.caf,
            total,
            lines,
            warnings,
        })
    }
}

/// The item figure a tax is assessed on, before complements.
fn base_value(tax: &TaxDefinition, item: &Item, caf: i64) -> Decimal {
    match tax.base_type {
        BaseType::Value => Decimal::from(caf),
        BaseType::Weight => item.gross_weight,
        BaseType::ComplementaryQty => item.complementary_quantity,
        BaseType::MercurialQty => item.mercurial_quantity,
    }
}
