use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a duty or tax (e.g. "DD", "RS", "TVA").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxCode(String);

impl TaxCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaxCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaxCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which item figure a tax is assessed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseType {
    /// The customs value (CAF) in local currency.
    Value,
    /// Gross weight.
    Weight,
    /// Complementary unit quantity.
    ComplementaryQty,
    /// Quantity in the mercurial (reference price list) unit.
    MercurialQty,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BaseType::Value => "VALUE",
            BaseType::Weight => "WEIGHT",
            BaseType::ComplementaryQty => "COMPLEMENTARY_QTY",
            BaseType::MercurialQty => "MERCURIAL_QTY",
        };
        f.write_str(s)
    }
}

/// A duty or tax as defined in the reference data.
///
/// `ordering_level` is the evaluation rank: lower levels are liquidated
/// first, so a tax may fold in the amounts of taxes from lower levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDefinition {
    pub code: TaxCode,
    pub label: String,
    pub ordering_level: i32,
    pub base_type: BaseType,
}

impl TaxDefinition {
    pub fn new(
        code: impl Into<TaxCode>,
        label: impl Into<String>,
        ordering_level: i32,
        base_type: BaseType,
    ) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            ordering_level,
            base_type,
        }
    }
}

/// States that goods under `tariff_code` are subject to `tax_code` at the
/// percentage registered under `rate_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffEntry {
    pub tariff_code: String,
    pub tax_code: TaxCode,
    pub rate_code: String,
}

impl TariffEntry {
    pub fn new(
        tariff_code: impl Into<String>,
        tax_code: impl Into<TaxCode>,
        rate_code: impl Into<String>,
    ) -> Self {
        Self {
            tariff_code: tariff_code.into(),
            tax_code: tax_code.into(),
            rate_code: rate_code.into(),
        }
    }
}

/// One row of the rate table: `rate_code -> percentage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rate_code: String,
    pub percentage: Decimal,
}

impl RateEntry {
    pub fn new(rate_code: impl Into<String>, percentage: Decimal) -> Self {
        Self {
            rate_code: rate_code.into(),
            percentage,
        }
    }
}

/// The principal tax's base includes the computed amount of the complement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxDependency {
    pub principal: TaxCode,
    pub complement: TaxCode,
}

impl TaxDependency {
    pub fn new(principal: impl Into<TaxCode>, complement: impl Into<TaxCode>) -> Self {
        Self {
            principal: principal.into(),
            complement: complement.into(),
        }
    }
}
