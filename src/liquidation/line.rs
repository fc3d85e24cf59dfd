use crate::core::item::ItemId;
use crate::core::rounding::{checked_units_sum, AmountOverflow};
use crate::core::tax::TaxCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of evaluating one tax for one item.
///
/// Only lines that are applicable and not excluded are persisted; the others
/// are returned for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationLine {
    pub code: TaxCode,
    pub label: String,
    /// Percentage applied.
    pub rate: Decimal,
    pub base_amount: Decimal,
    /// Amount in whole local-currency units.
    pub computed_amount: i64,
    pub applicable: bool,
    pub excluded: bool,
}

impl LiquidationLine {
    /// A tax with no tariff entry for the item's classification.
    pub fn not_applicable(code: TaxCode, label: impl Into<String>) -> Self {
        Self {
            code,
            label: label.into(),
            rate: Decimal::ZERO,
            base_amount: Decimal::ZERO,
            computed_amount: 0,
            applicable: false,
            excluded: false,
        }
    }

    /// An applicable tax the caller asked to waive.
    pub fn excluded(code: TaxCode, label: impl Into<String>, rate: Decimal) -> Self {
        Self {
            code,
            label: label.into(),
            rate,
            base_amount: Decimal::ZERO,
            computed_amount: 0,
            applicable: true,
            excluded: true,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.applicable && !self.excluded
    }
}

/// Non-fatal reference-data problems met during a liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceWarning {
    /// A tariff entry names a rate code missing from the rate table; the tax
    /// was computed at 0%.
    MissingRate { tax: TaxCode, rate_code: String },
}

impl fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceWarning::MissingRate { tax, rate_code } => write!(
                f,
                "rate code {} for tax {} is missing from the rate table; applied 0%",
                rate_code, tax
            ),
        }
    }
}

/// Full tax breakdown for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationResult {
    pub item_id: ItemId,
    pub caf: i64,
    /// Sum of persisted line amounts.
    pub total: i64,
    /// Every tax in evaluation order, persisted or not.
    pub lines: Vec<LiquidationLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReferenceWarning>,
}

impl LiquidationResult {
    /// Lines that are stored for the item.
    pub fn persisted_lines(&self) -> Vec<LiquidationLine> {
        self.lines.iter().filter(|l| l.is_persisted()).cloned().collect()
    }

    pub fn line(&self, code: &TaxCode) -> Option<&LiquidationLine> {
        self.lines.iter().find(|l| &l.code == code)
    }

    pub fn amount_of(&self, code: &TaxCode) -> i64 {
        self.line(code).map(|l| l.computed_amount).unwrap_or(0)
    }
}

impl fmt::Display for LiquidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Liquidation {} ===", self.item_id)?;
        writeln!(f, "CAF:            {}", self.caf)?;
        for line in &self.lines {
            let status = if !line.applicable {
                "n/a"
            } else if line.excluded {
                "excluded"
            } else {
                ""
            };
            writeln!(
                f,
                "  {:<8} {:>8}% {:>16} {:>14} {}",
                line.code.as_str(), line.rate, line.base_amount, line.computed_amount, status
            )?;
        }
        writeln!(f, "Total:          {}", self.total)?;
        for warning in &self.warnings {
            writeln!(f, "  warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Liquidation of every item of a worksheet, with per-tax totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetLiquidation {
    pub items: Vec<LiquidationResult>,
    pub totals_by_tax: BTreeMap<TaxCode, i64>,
    pub caf_total: i64,
    pub total: i64,
}

impl WorksheetLiquidation {
    /// Sum the item results. Fails if any total leaves the `i64` range.
    pub fn from_items(items: Vec<LiquidationResult>) -> Result<Self, AmountOverflow> {
        let mut totals_by_tax: BTreeMap<TaxCode, i64> = BTreeMap::new();
        for line in items.iter().flat_map(|r| r.lines.iter()).filter(|l| l.is_persisted()) {
            let entry = totals_by_tax.entry(line.code.clone()).or_insert(0);
            *entry = checked_units_sum([*entry, line.computed_amount])?;
        }
        let caf_total = checked_units_sum(items.iter().map(|r| r.caf))?;
        let total = checked_units_sum(items.iter().map(|r| r.total))?;
        Ok(Self {
            items,
            totals_by_tax,
            caf_total,
            total,
        })
    }
}

impl fmt::Display for WorksheetLiquidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        writeln!(f, "=== Worksheet Recapitulation ===")?;
        writeln!(f, "CAF Total:      {}", self.caf_total)?;
        for (code, amount) in &self.totals_by_tax {
            writeln!(f, "  {:<8} {:>14}", code.as_str(), amount)?;
        }
        writeln!(f, "Total:          {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(code: &str, amount: i64) -> LiquidationLine {
        LiquidationLine {
            code: TaxCode::new(code),
            label: code.to_string(),
            rate: dec!(5),
            base_amount: dec!(1000),
            computed_amount: amount,
            applicable: true,
            excluded: false,
        }
    }

    fn result(lines: Vec<LiquidationLine>) -> LiquidationResult {
        let total = lines.iter().filter(|l| l.is_persisted()).map(|l| l.computed_amount).sum();
        LiquidationResult {
            item_id: ItemId::new(),
            caf: 1000,
            total,
            lines,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_persisted_filter() {
        let r = result(vec![
            line("DD", 50),
            LiquidationLine::not_applicable(TaxCode::new("RS"), "RS"),
            LiquidationLine::excluded(TaxCode::new("PCS"), "PCS", dec!(1)),
        ]);
        let persisted = r.persisted_lines();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].code, TaxCode::new("DD"));
        assert_eq!(r.amount_of(&TaxCode::new("PCS")), 0);
        assert_eq!(r.amount_of(&TaxCode::new("DD")), 50);
    }

    #[test]
    fn test_worksheet_totals() {
        let ws = WorksheetLiquidation::from_items(vec![
            result(vec![line("DD", 50), line("TVA", 189)]),
            result(vec![line("DD", 20), LiquidationLine::excluded(TaxCode::new("TVA"), "TVA", dec!(18))]),
        ])
        .unwrap();
        assert_eq!(ws.totals_by_tax[&TaxCode::new("DD")], 70);
        assert_eq!(ws.totals_by_tax[&TaxCode::new("TVA")], 189);
        assert_eq!(ws.total, 259);
        assert_eq!(ws.caf_total, 2000);
    }

    #[test]
    fn test_worksheet_totals_overflow() {
        let half = i64::MAX / 2 + 1;
        let totals = WorksheetLiquidation::from_items(vec![
            result(vec![line("DD", half)]),
            result(vec![line("DD", half)]),
        ]);
        assert!(totals.is_err());
    }

    #[test]
    fn test_result_json_shape() {
        let r = result(vec![line("DD", 50)]);
        let json: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(json["caf"], 1000);
        assert_eq!(json["total"], 50);
        assert_eq!(json["lines"][0]["code"], "DD");
        assert_eq!(json["lines"][0]["computed_amount"], 50);
        assert!(json.get("warnings").is_none());
    }
}
