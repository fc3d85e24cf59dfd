use crate::core::currency::{CurrencyCode, Money};
use crate::core::worksheet::WorksheetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a worksheet item (article).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared data for one commercial line, as received from the
/// record-management layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Tariff classification (NTS) code.
    pub tariff_code: String,
    #[serde(default)]
    pub origin_country: String,
    #[serde(default)]
    pub provenance_code: String,
    pub fob: Money,
    pub freight: Option<Money>,
    pub insurance: Option<Money>,
    /// Supplier commission, already in local currency.
    #[serde(default)]
    pub supplier_commission: Decimal,
    #[serde(default)]
    pub gross_weight: Decimal,
    #[serde(default)]
    pub net_weight: Decimal,
    #[serde(default)]
    pub complementary_quantity: Decimal,
    #[serde(default)]
    pub mercurial_quantity: Decimal,
}

/// Local-currency figures derived from an item's declared amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalValuation {
    pub fob_local: i64,
    pub freight_local: i64,
    pub insurance_local: i64,
    /// Customs value: cost, insurance and freight.
    pub caf: i64,
}

/// A commercial line item inside a worksheet.
///
/// Freight and insurance default to zero in the FOB currency until declared
/// or allocated from worksheet totals.
///
/// # Examples
///
/// ```
/// use customs_liquidation::core::currency::{CurrencyCode, Money};
/// use customs_liquidation::core::item::Item;
/// use customs_liquidation::core::worksheet::WorksheetId;
/// use rust_decimal_macros::dec;
///
/// let eur = CurrencyCode::new("EUR");
/// let item = Item::new(WorksheetId::new(), "8703.23.10", Money::new(dec!(1000), eur.clone()))
///     .with_freight(Money::new(dec!(120), eur))
///     .with_gross_weight(dec!(1450));
///
/// assert_eq!(item.freight.amount, dec!(120));
/// assert_eq!(item.valuation.caf, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub worksheet_id: WorksheetId,
    pub tariff_code: String,
    pub origin_country: String,
    pub provenance_code: String,
    pub fob: Money,
    pub freight: Money,
    pub insurance: Money,
    pub supplier_commission: Decimal,
    pub gross_weight: Decimal,
    pub net_weight: Decimal,
    pub complementary_quantity: Decimal,
    pub mercurial_quantity: Decimal,
    /// Derived by conversion; zero until first valued.
    pub valuation: LocalValuation,
    /// Incremented on every committed change.
    pub version: u64,
}

impl Item {
    pub fn new(worksheet_id: WorksheetId, tariff_code: impl Into<String>, fob: Money) -> Self {
        let currency = fob.currency.clone();
        Self {
            id: ItemId::new(),
            worksheet_id,
            tariff_code: tariff_code.into(),
            origin_country: String::new(),
            provenance_code: String::new(),
            fob,
            freight: Money::zero(currency.clone()),
            insurance: Money::zero(currency),
            supplier_commission: Decimal::ZERO,
            gross_weight: Decimal::ZERO,
            net_weight: Decimal::ZERO,
            complementary_quantity: Decimal::ZERO,
            mercurial_quantity: Decimal::ZERO,
            valuation: LocalValuation::default(),
            version: 0,
        }
    }

    /// Build an item from its declared form.
    pub fn from_spec(worksheet_id: WorksheetId, spec: ItemSpec) -> Self {
        let currency: CurrencyCode = spec.fob.currency.clone();
        Self {
            id: ItemId::new(),
            worksheet_id,
            tariff_code: spec.tariff_code,
            origin_country: spec.origin_country,
            provenance_code: spec.provenance_code,
            freight: spec
                .freight
                .unwrap_or_else(|| Money::zero(currency.clone())),
            insurance: spec.insurance.unwrap_or_else(|| Money::zero(currency)),
            fob: spec.fob,
            supplier_commission: spec.supplier_commission,
            gross_weight: spec.gross_weight,
            net_weight: spec.net_weight,
            complementary_quantity: spec.complementary_quantity,
            mercurial_quantity: spec.mercurial_quantity,
            valuation: LocalValuation::default(),
            version: 0,
        }
    }

    pub fn with_freight(mut self, freight: Money) -> Self {
        self.freight = freight;
        self
    }

    pub fn with_insurance(mut self, insurance: Money) -> Self {
        self.insurance = insurance;
        self
    }

    pub fn with_supplier_commission(mut self, commission: Decimal) -> Self {
        self.supplier_commission = commission;
        self
    }

    pub fn with_gross_weight(mut self, weight: Decimal) -> Self {
        self.gross_weight = weight;
        self
    }

    pub fn with_net_weight(mut self, weight: Decimal) -> Self {
        self.net_weight = weight;
        self
    }

    pub fn with_quantities(mut self, complementary: Decimal, mercurial: Decimal) -> Self {
        self.complementary_quantity = complementary;
        self.mercurial_quantity = mercurial;
        self
    }

    pub fn with_origin(
        mut self,
        origin_country: impl Into<String>,
        provenance_code: impl Into<String>,
    ) -> Self {
        self.origin_country = origin_country.into();
        self.provenance_code = provenance_code.into();
        self
    }

    pub fn caf(&self) -> i64 {
        self.valuation.caf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_item_defaults_to_fob_currency() {
        let usd = CurrencyCode::new("USD");
        let item = Item::new(WorksheetId::new(), "0901.11", Money::new(dec!(500), usd.clone()));
        assert_eq!(item.freight, Money::zero(usd.clone()));
        assert_eq!(item.insurance.currency, usd);
        assert_eq!(item.version, 0);
    }

    #[test]
    fn test_from_spec_json() {
        let spec: ItemSpec = serde_json::from_str(
            r#"{
                "tariff_code": "8703.23.10",
                "origin_country": "FR",
                "fob": { "amount": "1000", "currency": "EUR" },
                "insurance": { "amount": "15.5", "currency": "USD" },
                "gross_weight": "1450"
            }"#,
        )
        .unwrap();

        let ws = WorksheetId::new();
        let item = Item::from_spec(ws, spec);
        assert_eq!(item.worksheet_id, ws);
        assert_eq!(item.fob.amount, dec!(1000));
        assert_eq!(item.freight, Money::zero(CurrencyCode::new("EUR")));
        assert_eq!(item.insurance.currency, CurrencyCode::new("USD"));
        assert_eq!(item.gross_weight, dec!(1450));
        assert_eq!(item.supplier_commission, Decimal::ZERO);
    }

    #[test]
    fn test_builders() {
        let eur = CurrencyCode::new("EUR");
        let item = Item::new(WorksheetId::new(), "6109.10", Money::new(dec!(10), eur))
            .with_quantities(dec!(12), dec!(3))
            .with_net_weight(dec!(2.4))
            .with_origin("CN", "HK");
        assert_eq!(item.complementary_quantity, dec!(12));
        assert_eq!(item.mercurial_quantity, dec!(3));
        assert_eq!(item.net_weight, dec!(2.4));
        assert_eq!(item.origin_country, "CN");
    }
}
