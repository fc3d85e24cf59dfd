use crate::allocation::engine::{AllocationError, AllocationSummary, GlobalAggregates};
use crate::config::PipelineConfig;
use crate::core::item::{ItemId, LocalValuation};
use crate::core::rounding::checked_units_sum;
use crate::core::tax::TaxCode;
use crate::core::worksheet::{Worksheet, WorksheetId};
use crate::error::{PipelineError, Result};
use crate::liquidation::engine::LiquidationEngine;
use crate::liquidation::line::{LiquidationLine, LiquidationResult, WorksheetLiquidation};
use crate::persistence::gateway::{Changeset, PersistenceGateway};
use crate::reference::snapshot::ReferenceData;
use crate::valuation::calculator::ValuationCalculator;
use crate::valuation::converter::CurrencyConverter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Local figures written to one item by a bulk conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemValuation {
    pub item_id: ItemId,
    #[serde(flatten)]
    pub valuation: LocalValuation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub worksheet_id: WorksheetId,
    pub items: Vec<ItemValuation>,
    pub caf_total: i64,
}

/// Entry point for the valuation and liquidation operations.
///
/// Each operation reads what it needs through the gateway, does all of its
/// work on owned copies against one reference snapshot, then writes
/// everything in a single [`Changeset`]. A failure before or during the
/// commit leaves stored data as it was.
///
/// # Examples
///
/// ```
/// use customs_liquidation::prelude::*;
/// use rust_decimal_macros::dec;
/// use std::collections::BTreeSet;
/// use std::sync::Arc;
///
/// let tables = ReferenceTables {
///     currencies: vec![CurrencyRate::new(CurrencyCode::new("USD"), "$", dec!(650))],
///     taxes: vec![TaxDefinition::new("DD", "Droit de douane", 1, BaseType::Value)],
///     tariff_entries: vec![TariffEntry::new("0901.11", "DD", "DD5")],
///     rates: vec![RateEntry::new("DD5", dec!(5))],
///     ..Default::default()
/// };
/// let reference = Arc::new(ReferenceData::load(CurrencyCode::new("XOF"), tables).unwrap());
///
/// let gateway = InMemoryGateway::new();
/// let worksheet = gateway.import(WorksheetDocument {
///     case_file: "DOS-2024-001".into(),
///     state: WorksheetState::Draft,
///     items: vec![ItemSpec {
///         tariff_code: "0901.11".into(),
///         origin_country: "BR".into(),
///         provenance_code: "BR".into(),
///         fob: Money::new(dec!(1000), CurrencyCode::new("USD")),
///         freight: None,
///         insurance: None,
///         supplier_commission: dec!(0),
///         gross_weight: dec!(60),
///         net_weight: dec!(58),
///         complementary_quantity: dec!(0),
///         mercurial_quantity: dec!(0),
///     }],
/// });
///
/// let pipeline = Pipeline::new(gateway, reference, PipelineConfig::default());
/// let result = pipeline.liquidate_worksheet(worksheet, &BTreeSet::new()).unwrap();
/// assert_eq!(result.total, 32_500);
/// ```
pub struct Pipeline<G: PersistenceGateway> {
    gateway: G,
    reference: Arc<ReferenceData>,
    config: PipelineConfig,
}

impl<G: PersistenceGateway> Pipeline<G> {
    pub fn new(gateway: G, reference: Arc<ReferenceData>, config: PipelineConfig) -> Self {
        Self {
            gateway,
            reference,
            config,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn reference(&self) -> Arc<ReferenceData> {
        Arc::clone(&self.reference)
    }

    /// Swap in a newer snapshot. Operations already holding the previous one
    /// finish against it.
    pub fn set_reference(&mut self, reference: Arc<ReferenceData>) {
        self.reference = reference;
    }

    fn draft_worksheet(&self, id: WorksheetId) -> Result<Worksheet> {
        let worksheet = self.gateway.worksheet(id)?;
        if worksheet.is_locked() {
            return Err(PipelineError::WorksheetLocked(id));
        }
        Ok(worksheet)
    }

    /// Convert FOB, freight and insurance of every item to local currency
    /// and recompute each CAF. Liquidation lines are not touched.
    pub fn convert_worksheet(&self, id: WorksheetId) -> Result<ConversionReport> {
        self.draft_worksheet(id)?;
        let reference = self.reference();
        let converter = CurrencyConverter::new(reference.currencies());

        let mut changes = Changeset::new();
        let mut valued = Vec::new();
        for mut item in self.gateway.worksheet_items(id)? {
            let valuation = ValuationCalculator::apply(&mut item, &converter)?;
            valued.push(ItemValuation {
                item_id: item.id,
                valuation,
            });
            changes.update_item(item);
        }
        let caf_total = checked_units_sum(valued.iter().map(|v| v.valuation.caf))?;

        let receipt = self.gateway.commit(changes)?;
        log::info!(
            "converted worksheet {}: {} items, caf total {}",
            id,
            receipt.items_updated,
            caf_total
        );
        Ok(ConversionReport {
            worksheet_id: id,
            items: valued,
            caf_total,
        })
    }

    /// Spread worksheet-level freight, insurance and weight over the items
    /// in proportion to their FOB. Does not re-liquidate.
    pub fn allocate(&self, id: WorksheetId, aggregates: &GlobalAggregates) -> Result<AllocationSummary> {
        self.draft_worksheet(id)?;
        let mut items = self.gateway.worksheet_items(id)?;

        let engine = self.config.allocation_engine();
        let summary = engine.allocate(&mut items, aggregates).map_err(|err| match err {
            AllocationError::NonDistributable => PipelineError::NonDistributable { worksheet: id },
            AllocationError::Overflow(overflow) => PipelineError::Overflow(overflow),
        })?;

        let mut changes = Changeset::new();
        for item in items {
            changes.update_item(item);
        }
        let receipt = self.gateway.commit(changes)?;
        log::info!(
            "allocated aggregates over worksheet {}: {} items (scale {}, policy {:?})",
            id,
            receipt.items_updated,
            engine.scale(),
            engine.policy()
        );
        Ok(summary)
    }

    /// Recompute the CAF and the full tax breakdown of one item, replacing
    /// its stored lines.
    pub fn liquidate_item(&self, item_id: ItemId, excluded: &BTreeSet<TaxCode>) -> Result<LiquidationResult> {
        let mut item = self.gateway.item(item_id)?;
        self.draft_worksheet(item.worksheet_id)?;

        let reference = self.reference();
        let result = LiquidationEngine::new(&reference).liquidate(&mut item, excluded)?;

        let mut changes = Changeset::new();
        changes.update_item(item);
        changes.replace_lines(item_id, result.persisted_lines());
        let receipt = self.gateway.commit(changes)?;
        log::info!(
            "liquidated item {}: caf {}, total {}, {} lines",
            item_id,
            result.caf,
            result.total,
            receipt.lines_written
        );
        Ok(result)
    }

    /// Liquidate every item of a worksheet in one commit and sum the
    /// amounts per tax.
    pub fn liquidate_worksheet(
        &self,
        id: WorksheetId,
        excluded: &BTreeSet<TaxCode>,
    ) -> Result<WorksheetLiquidation> {
        self.draft_worksheet(id)?;
        let reference = self.reference();
        let engine = LiquidationEngine::new(&reference);

        let mut changes = Changeset::new();
        let mut results = Vec::new();
        for mut item in self.gateway.worksheet_items(id)? {
            let result = engine.liquidate(&mut item, excluded)?;
            changes.replace_lines(item.id, result.persisted_lines());
            changes.update_item(item);
            results.push(result);
        }
        let liquidation = WorksheetLiquidation::from_items(results)?;

        let receipt = self.gateway.commit(changes)?;
        log::info!(
            "liquidated worksheet {}: {} items, {} lines, total {}",
            id,
            receipt.items_updated,
            receipt.lines_written,
            liquidation.total
        );
        Ok(liquidation)
    }

    /// Freeze a worksheet. Validating twice is a conflict.
    pub fn validate_worksheet(&self, id: WorksheetId) -> Result<Worksheet> {
        let worksheet = self.gateway.validate_worksheet(id)?;
        log::info!("validated worksheet {} ({})", id, worksheet.case_file);
        Ok(worksheet)
    }

    /// Remove a draft worksheet with its items and lines.
    pub fn delete_worksheet(&self, id: WorksheetId) -> Result<()> {
        self.gateway.delete_worksheet(id)?;
        log::info!("deleted worksheet {}", id);
        Ok(())
    }

    /// Lines stored by the last successful liquidation of an item.
    pub fn recorded_lines(&self, item_id: ItemId) -> Result<Vec<LiquidationLine>> {
        Ok(self.gateway.liquidation_lines(item_id)?)
    }
}
