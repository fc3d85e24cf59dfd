use crate::core::currency::{CurrencyCode, CurrencyRate, CurrencyRateTable, FxError};
use crate::core::tax::{RateEntry, TariffEntry, TaxCode, TaxDefinition, TaxDependency};
use crate::reference::dependency_graph::{DependencyError, DependencyGraph};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Reasons a set of reference tables cannot be used for liquidation.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error(transparent)]
    Currency(#[from] FxError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("rate {rate_code} has negative percentage {percentage}")]
    NegativePercentage { rate_code: String, percentage: Decimal },
    #[error("rate code {0} is listed more than once")]
    DuplicateRate(String),
    #[error("tariff {tariff_code} lists tax {tax_code} more than once")]
    DuplicateTariffEntry { tariff_code: String, tax_code: TaxCode },
    #[error("tariff {tariff_code} references undefined tax {tax_code}")]
    UnknownTariffTax { tariff_code: String, tax_code: TaxCode },
    #[error("invalid reference data JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw reference tables as exported by the reference-data collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceTables {
    #[serde(default)]
    pub currencies: Vec<CurrencyRate>,
    #[serde(default)]
    pub taxes: Vec<TaxDefinition>,
    #[serde(default)]
    pub tariff_entries: Vec<TariffEntry>,
    #[serde(default)]
    pub rates: Vec<RateEntry>,
    #[serde(default)]
    pub dependencies: Vec<TaxDependency>,
}

/// Immutable, validated snapshot of every table the pipeline reads.
///
/// Loaded once, shared behind an `Arc` for the duration of an operation and
/// then dropped, so a pass never observes a half-updated table.
///
/// # Examples
///
/// ```
/// use customs_liquidation::core::currency::CurrencyCode;
/// use customs_liquidation::core::tax::{BaseType, RateEntry, TariffEntry, TaxDefinition, TaxDependency};
/// use customs_liquidation::reference::snapshot::{ReferenceData, ReferenceTables};
/// use rust_decimal_macros::dec;
///
/// let tables = ReferenceTables {
///     taxes: vec![
///         TaxDefinition::new("TVA", "Taxe sur la valeur ajoutée", 2, BaseType::Value),
///         TaxDefinition::new("DD", "Droit de douane", 1, BaseType::Value),
///     ],
///     tariff_entries: vec![TariffEntry::new("8703.23.10", "DD", "DD20")],
///     rates: vec![RateEntry::new("DD20", dec!(20))],
///     dependencies: vec![TaxDependency::new("TVA", "DD")],
///     ..Default::default()
/// };
///
/// let reference = ReferenceData::load(CurrencyCode::new("XOF"), tables).unwrap();
/// let order: Vec<&str> = reference.taxes().iter().map(|t| t.code.as_str()).collect();
/// assert_eq!(order, vec!["DD", "TVA"]);
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceData {
    currencies: CurrencyRateTable,
    /// Tax definitions in evaluation order.
    taxes: Vec<TaxDefinition>,
    /// (tariff code, tax code) -> rate code
    tariff: HashMap<(String, TaxCode), String>,
    rates: HashMap<String, Decimal>,
    /// principal -> complements folded into its base
    complements: HashMap<TaxCode, Vec<TaxCode>>,
    dependency_count: usize,
}

impl ReferenceData {
    /// Validate the tables and build the snapshot.
    ///
    /// Rejects non-positive currency rates, negative percentages, duplicate
    /// keys, tariff entries for undefined taxes, and any dependency graph
    /// that is cyclic or inconsistent with the taxes' ordering levels.
    pub fn load(
        local_currency: CurrencyCode,
        tables: ReferenceTables,
    ) -> Result<Self, ReferenceDataError> {
        let mut currencies = CurrencyRateTable::new(local_currency);
        for rate in tables.currencies {
            currencies.insert(rate)?;
        }

        let mut rates = HashMap::new();
        for entry in tables.rates {
            if entry.percentage < Decimal::ZERO {
                return Err(ReferenceDataError::NegativePercentage {
                    rate_code: entry.rate_code,
                    percentage: entry.percentage,
                });
            }
            if rates.contains_key(&entry.rate_code) {
                return Err(ReferenceDataError::DuplicateRate(entry.rate_code));
            }
            rates.insert(entry.rate_code, entry.percentage);
        }

        let graph = DependencyGraph::build(&tables.taxes, &tables.dependencies)?;
        let order = graph.evaluation_order()?;

        let mut by_code: HashMap<TaxCode, TaxDefinition> = tables
            .taxes
            .into_iter()
            .map(|t| (t.code.clone(), t))
            .collect();
        let taxes: Vec<TaxDefinition> = order
            .iter()
            .filter_map(|code| by_code.remove(code))
            .collect();

        let mut tariff = HashMap::new();
        for entry in tables.tariff_entries {
            if !taxes.iter().any(|t| t.code == entry.tax_code) {
                return Err(ReferenceDataError::UnknownTariffTax {
                    tariff_code: entry.tariff_code,
                    tax_code: entry.tax_code,
                });
            }
            let key = (entry.tariff_code, entry.tax_code);
            if tariff.contains_key(&key) {
                let (tariff_code, tax_code) = key;
                return Err(ReferenceDataError::DuplicateTariffEntry {
                    tariff_code,
                    tax_code,
                });
            }
            tariff.insert(key, entry.rate_code);
        }

        let complements = order
            .iter()
            .map(|code| (code.clone(), graph.complements_of(code)))
            .filter(|(_, c)| !c.is_empty())
            .collect();

        log::debug!(
            "loaded reference data: {} taxes, {} dependencies, {} tariff entries, {} rates",
            taxes.len(),
            graph.dependency_count(),
            tariff.len(),
            rates.len()
        );

        Ok(Self {
            currencies,
            taxes,
            tariff,
            rates,
            complements,
            dependency_count: graph.dependency_count(),
        })
    }

    /// Parse reference tables from JSON and validate them.
    pub fn from_json(local_currency: CurrencyCode, json: &str) -> Result<Self, ReferenceDataError> {
        let tables: ReferenceTables = serde_json::from_str(json)?;
        Self::load(local_currency, tables)
    }

    pub fn currencies(&self) -> &CurrencyRateTable {
        &self.currencies
    }

    pub fn local_currency(&self) -> &CurrencyCode {
        &self.currencies.local_currency
    }

    /// Tax definitions in the order they must be liquidated.
    pub fn taxes(&self) -> &[TaxDefinition] {
        &self.taxes
    }

    /// Rate code applying `tax` to goods classified under `tariff_code`,
    /// or `None` when the tax does not apply to that classification.
    pub fn tariff_rate_code(&self, tariff_code: &str, tax: &TaxCode) -> Option<&str> {
        self.tariff
            .get(&(tariff_code.to_string(), tax.clone()))
            .map(String::as_str)
    }

    pub fn percentage(&self, rate_code: &str) -> Option<Decimal> {
        self.rates.get(rate_code).copied()
    }

    /// Taxes whose computed amounts are added to `principal`'s base.
    pub fn complements_of(&self, principal: &TaxCode) -> &[TaxCode] {
        self.complements
            .get(principal)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dependency_count(&self) -> usize {
        self.dependency_count
    }

    pub fn tariff_entry_count(&self) -> usize {
        self.tariff.len()
    }
}
