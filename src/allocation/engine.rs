use crate::core::currency::Money;
use crate::core::item::{Item, ItemId};
use crate::core::rounding::{checked_product, checked_total, round_scaled, AmountOverflow};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do with the rounding drift left after a proportional split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Round every share independently; the sum may drift from the aggregate.
    #[default]
    None,
    /// Round shares down, then hand the leftover units to the shares with
    /// the largest fractional remainders. The sum equals the aggregate
    /// rounded to the allocation scale.
    LargestRemainder,
}

/// Worksheet-level totals to spread across items. Absent figures are left
/// untouched on the items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalAggregates {
    pub freight: Option<Money>,
    pub insurance: Option<Money>,
    pub gross_weight: Option<Decimal>,
}

impl GlobalAggregates {
    pub fn is_empty(&self) -> bool {
        self.freight.is_none() && self.insurance.is_none() && self.gross_weight.is_none()
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("total FOB is zero; aggregates cannot be distributed proportionally")]
    NonDistributable,
    #[error(transparent)]
    Overflow(#[from] AmountOverflow),
}

/// Values written to one item by an allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub item_id: ItemId,
    pub fob: Decimal,
    pub freight: Option<Decimal>,
    pub insurance: Option<Decimal>,
    pub gross_weight: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total_fob: Decimal,
    pub allocations: Vec<ItemAllocation>,
}

impl AllocationSummary {
    /// Sum of the freight written to items.
    pub fn freight_total(&self) -> Decimal {
        self.allocations.iter().filter_map(|a| a.freight).sum()
    }

    pub fn insurance_total(&self) -> Decimal {
        self.allocations.iter().filter_map(|a| a.insurance).sum()
    }

    pub fn gross_weight_total(&self) -> Decimal {
        self.allocations.iter().filter_map(|a| a.gross_weight).sum()
    }
}

/// Spreads worksheet aggregates over items in proportion to their FOB.
///
/// Proportions use each item's declared FOB amount as-is, before currency
/// conversion.
///
/// # Examples
///
/// ```
/// use customs_liquidation::allocation::engine::{AllocationEngine, RemainderPolicy};
/// use rust_decimal_macros::dec;
///
/// let engine = AllocationEngine::new(2, RemainderPolicy::None);
/// let shares = engine.distribute(&[dec!(300), dec!(700)], dec!(100)).unwrap();
/// assert_eq!(shares, vec![dec!(30), dec!(70)]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AllocationEngine {
    scale: u32,
    policy: RemainderPolicy,
}

impl AllocationEngine {
    /// `scale` is the number of decimal places kept on allocated figures.
    pub fn new(scale: u32, policy: RemainderPolicy) -> Self {
        Self { scale, policy }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn policy(&self) -> RemainderPolicy {
        self.policy
    }

    /// Split `aggregate` across `weights`: `share_i = weight_i * (aggregate / Σ weights)`.
    pub fn distribute(&self, weights: &[Decimal], aggregate: Decimal) -> Result<Vec<Decimal>, AllocationError> {
        let total = weights
            .iter()
            .try_fold(Decimal::ZERO, |acc, w| checked_total(acc, *w))?;
        if total.is_zero() {
            return Err(AllocationError::NonDistributable);
        }
        let coefficient = aggregate
            .checked_div(total)
            .ok_or_else(|| AmountOverflow(format!("{aggregate} / {total}")))?;

        let raw = weights
            .iter()
            .map(|w| checked_product(*w, coefficient))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match self.policy {
            RemainderPolicy::None => raw.into_iter().map(|v| round_scaled(v, self.scale)).collect(),
            RemainderPolicy::LargestRemainder => self.largest_remainder(raw, aggregate),
        })
    }

    fn largest_remainder(&self, raw: Vec<Decimal>, aggregate: Decimal) -> Vec<Decimal> {
        let mut shares: Vec<Decimal> = raw
            .iter()
            .map(|v| v.round_dp_with_strategy(self.scale, RoundingStrategy::ToZero))
            .collect();
        if shares.is_empty() {
            return shares;
        }

        let target = round_scaled(aggregate, self.scale);
        let leftover = target - shares.iter().copied().sum::<Decimal>();
        if leftover.is_zero() {
            return shares;
        }

        let unit = Decimal::new(1, self.scale);
        let sign = if leftover.is_sign_negative() { -Decimal::ONE } else { Decimal::ONE };
        let steps = (leftover / unit).abs().to_usize().unwrap_or(0);

        // Largest remainder in the direction of the leftover first; earlier
        // items win ties.
        let mut order: Vec<usize> = (0..shares.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = (raw[a] - shares[a]) * sign;
            let rb = (raw[b] - shares[b]) * sign;
            rb.cmp(&ra).then(a.cmp(&b))
        });

        for step in 0..steps {
            let idx = order[step % order.len()];
            shares[idx] += unit * sign;
        }
        shares
    }

    /// Overwrite freight, insurance and gross weight on `items` from the
    /// aggregates. Either every item is updated or, on error, none is.
    pub fn allocate(
        &self,
        items: &mut [Item],
        aggregates: &GlobalAggregates,
    ) -> Result<AllocationSummary, AllocationError> {
        let fobs: Vec<Decimal> = items.iter().map(|i| i.fob.amount).collect();
        let total_fob = fobs
            .iter()
            .try_fold(Decimal::ZERO, |acc, w| checked_total(acc, *w))?;
        if total_fob.is_zero() {
            return Err(AllocationError::NonDistributable);
        }

        if let Some(first) = items.first() {
            if items.iter().any(|i| i.fob.currency != first.fob.currency) {
                log::warn!(
                    "allocating over FOB declared in several currencies; shares use declared amounts"
                );
            }
        }

        let freight = self.split(&fobs, aggregates.freight.as_ref().map(|m| m.amount))?;
        let insurance = self.split(&fobs, aggregates.insurance.as_ref().map(|m| m.amount))?;
        let weight = self.split(&fobs, aggregates.gross_weight)?;

        let mut allocations = Vec::with_capacity(items.len());
        for (idx, item) in items.iter_mut().enumerate() {
            let freight_share = freight.as_ref().map(|v| v[idx]);
            let insurance_share = insurance.as_ref().map(|v| v[idx]);
            let weight_share = weight.as_ref().map(|v| v[idx]);

            if let (Some(share), Some(total)) = (freight_share, aggregates.freight.as_ref()) {
                item.freight = Money::new(share, total.currency.clone());
            }
            if let (Some(share), Some(total)) = (insurance_share, aggregates.insurance.as_ref()) {
                item.insurance = Money::new(share, total.currency.clone());
            }
            if let Some(share) = weight_share {
                item.gross_weight = share;
            }

            allocations.push(ItemAllocation {
                item_id: item.id,
                fob: item.fob.amount,
                freight: freight_share,
                insurance: insurance_share,
                gross_weight: weight_share,
            });
        }

        Ok(AllocationSummary {
            total_fob,
            allocations,
        })
    }

    fn split(
        &self,
        fobs: &[Decimal],
        aggregate: Option<Decimal>,
    ) -> Result<Option<Vec<Decimal>>, AllocationError> {
        aggregate.map(|q| self.distribute(fobs, q)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::worksheet::WorksheetId;
    use rust_decimal_macros::dec;

    fn item(fob: Decimal) -> Item {
        Item::new(WorksheetId::new(), "0901.11", Money::new(fob, CurrencyCode::new("USD")))
    }

    #[test]
    fn test_proportional_freight() {
        let engine = AllocationEngine::new(2, RemainderPolicy::None);
        let mut items = vec![item(dec!(300)), item(dec!(700))];
        let aggregates = GlobalAggregates {
            freight: Some(Money::new(dec!(100), CurrencyCode::new("EUR"))),
            ..Default::default()
        };

        let summary = engine.allocate(&mut items, &aggregates).unwrap();
        assert_eq!(items[0].freight, Money::new(dec!(30), CurrencyCode::new("EUR")));
        assert_eq!(items[1].freight.amount, dec!(70));
        assert_eq!(summary.total_fob, dec!(1000));
        assert_eq!(summary.freight_total(), dec!(100));
        // Untouched figures keep their values.
        assert_eq!(items[0].insurance.amount, Decimal::ZERO);
        assert_eq!(summary.allocations[0].insurance, None);
    }

    #[test]
    fn test_all_aggregates() {
        let engine = AllocationEngine::new(2, RemainderPolicy::None);
        let mut items = vec![item(dec!(250)), item(dec!(750))];
        let aggregates = GlobalAggregates {
            freight: Some(Money::new(dec!(400), CurrencyCode::new("USD"))),
            insurance: Some(Money::new(dec!(20), CurrencyCode::new("USD"))),
            gross_weight: Some(dec!(1000)),
        };
        engine.allocate(&mut items, &aggregates).unwrap();
        assert_eq!(items[0].freight.amount, dec!(100));
        assert_eq!(items[1].insurance.amount, dec!(15));
        assert_eq!(items[0].gross_weight, dec!(250));
        assert_eq!(items[1].gross_weight, dec!(750));
    }

    #[test]
    fn test_zero_total_is_not_distributable() {
        let engine = AllocationEngine::new(2, RemainderPolicy::None);
        let mut items = vec![item(Decimal::ZERO), item(Decimal::ZERO)];
        let before = items.clone();
        let aggregates = GlobalAggregates {
            gross_weight: Some(dec!(10)),
            ..Default::default()
        };
        let result = engine.allocate(&mut items, &aggregates);
        assert!(matches!(result, Err(AllocationError::NonDistributable)));
        assert_eq!(items, before);
    }

    #[test]
    fn test_empty_worksheet_is_not_distributable() {
        let engine = AllocationEngine::new(2, RemainderPolicy::None);
        let result = engine.allocate(&mut [], &GlobalAggregates::default());
        assert!(matches!(result, Err(AllocationError::NonDistributable)));
    }

    #[test]
    fn test_rounding_drift_without_correction() {
        let engine = AllocationEngine::new(2, RemainderPolicy::None);
        let shares = engine
            .distribute(&[dec!(1), dec!(1), dec!(1)], dec!(100))
            .unwrap();
        assert_eq!(shares, vec![dec!(33.33), dec!(33.33), dec!(33.33)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(99.99));
    }

    #[test]
    fn test_largest_remainder_conserves_total() {
        let engine = AllocationEngine::new(2, RemainderPolicy::LargestRemainder);
        let shares = engine
            .distribute(&[dec!(1), dec!(1), dec!(1)], dec!(100))
            .unwrap();
        assert_eq!(shares, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(100));
    }

    #[test]
    fn test_largest_remainder_prefers_biggest_fraction() {
        let engine = AllocationEngine::new(0, RemainderPolicy::LargestRemainder);
        // Raw shares: 1.2, 2.7, 6.1 -> floors 1, 2, 6 (sum 9); one unit left.
        let shares = engine
            .distribute(&[dec!(12), dec!(27), dec!(61)], dec!(10))
            .unwrap();
        assert_eq!(shares, vec![dec!(1), dec!(3), dec!(6)]);
    }

    #[test]
    fn test_largest_remainder_negative_aggregate() {
        let engine = AllocationEngine::new(0, RemainderPolicy::LargestRemainder);
        let shares = engine
            .distribute(&[dec!(1), dec!(1), dec!(1)], dec!(-10))
            .unwrap();
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(-10));
        assert_eq!(shares[0], dec!(-4));
    }
}
