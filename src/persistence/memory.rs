use crate::core::item::{Item, ItemId};
use crate::core::worksheet::{Worksheet, WorksheetDocument, WorksheetId};
use crate::liquidation::line::LiquidationLine;
use crate::persistence::gateway::{Changeset, CommitReceipt, GatewayError, PersistenceGateway};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryState {
    worksheets: HashMap<WorksheetId, Worksheet>,
    items: HashMap<ItemId, Item>,
    lines: HashMap<ItemId, Vec<LiquidationLine>>,
}

impl MemoryState {
    fn ensure_draft(&self, id: WorksheetId) -> Result<(), GatewayError> {
        let worksheet = self
            .worksheets
            .get(&id)
            .ok_or(GatewayError::WorksheetNotFound(id))?;
        if worksheet.is_locked() {
            return Err(GatewayError::WorksheetLocked(id));
        }
        Ok(())
    }

    fn stored_item(&self, id: ItemId) -> Result<&Item, GatewayError> {
        self.items.get(&id).ok_or(GatewayError::ItemNotFound(id))
    }
}

/// Thread-safe, cloneable in-memory backend.
///
/// A commit validates the whole changeset under the write lock before
/// applying any of it, so readers observe either the state before or the
/// state after. The lock is `parking_lot`'s and is never held across calls
/// back into user code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a worksheet and its items from their document form.
    pub fn import(&self, document: WorksheetDocument) -> WorksheetId {
        let mut worksheet = Worksheet::new(document.case_file);
        let items: Vec<Item> = document
            .items
            .into_iter()
            .map(|spec| Item::from_spec(worksheet.id, spec))
            .collect();
        worksheet.item_ids = items.iter().map(|i| i.id).collect();
        worksheet.state = document.state;
        if worksheet.is_locked() {
            worksheet.validated_at = Some(worksheet.created_at);
        }

        let id = worksheet.id;
        let mut state = self.state.write();
        state.worksheets.insert(id, worksheet);
        for item in items {
            state.items.insert(item.id, item);
        }
        id
    }

    pub fn worksheet_count(&self) -> usize {
        self.state.read().worksheets.len()
    }

    pub fn item_count(&self) -> usize {
        self.state.read().items.len()
    }
}

impl PersistenceGateway for InMemoryGateway {
    fn worksheet(&self, id: WorksheetId) -> Result<Worksheet, GatewayError> {
        self.state
            .read()
            .worksheets
            .get(&id)
            .cloned()
            .ok_or(GatewayError::WorksheetNotFound(id))
    }

    fn item(&self, id: ItemId) -> Result<Item, GatewayError> {
        self.state.read().stored_item(id).cloned()
    }

    fn worksheet_items(&self, id: WorksheetId) -> Result<Vec<Item>, GatewayError> {
        let state = self.state.read();
        let worksheet = state
            .worksheets
            .get(&id)
            .ok_or(GatewayError::WorksheetNotFound(id))?;
        worksheet
            .item_ids
            .iter()
            .map(|item_id| state.stored_item(*item_id).cloned())
            .collect()
    }

    fn liquidation_lines(&self, id: ItemId) -> Result<Vec<LiquidationLine>, GatewayError> {
        let state = self.state.read();
        state.stored_item(id)?;
        Ok(state.lines.get(&id).cloned().unwrap_or_default())
    }

    fn validate_worksheet(&self, id: WorksheetId) -> Result<Worksheet, GatewayError> {
        let mut state = self.state.write();
        let worksheet = state
            .worksheets
            .get_mut(&id)
            .ok_or(GatewayError::WorksheetNotFound(id))?;
        if !worksheet.validate() {
            return Err(GatewayError::WorksheetLocked(id));
        }
        Ok(worksheet.clone())
    }

    fn delete_worksheet(&self, id: WorksheetId) -> Result<(), GatewayError> {
        let mut state = self.state.write();
        state.ensure_draft(id)?;
        if let Some(worksheet) = state.worksheets.remove(&id) {
            for item_id in worksheet.item_ids {
                state.items.remove(&item_id);
                state.lines.remove(&item_id);
            }
        }
        Ok(())
    }

    fn commit(&self, changeset: Changeset) -> Result<CommitReceipt, GatewayError> {
        let mut state = self.state.write();

        for item in changeset.items() {
            let stored = state.stored_item(item.id)?;
            if stored.version != item.version {
                return Err(GatewayError::VersionConflict {
                    item: item.id,
                    expected: item.version,
                    found: stored.version,
                });
            }
            state.ensure_draft(stored.worksheet_id)?;
        }
        for (item_id, _) in changeset.line_sets() {
            let stored = state.stored_item(*item_id)?;
            state.ensure_draft(stored.worksheet_id)?;
        }

        let mut receipt = CommitReceipt::default();
        let (items, line_sets) = changeset.into_parts();
        for mut item in items {
            item.version += 1;
            state.items.insert(item.id, item);
            receipt.items_updated += 1;
        }
        for (item_id, lines) in line_sets {
            receipt.lines_written += lines.len();
            receipt.line_sets_replaced += 1;
            state.lines.insert(item_id, lines);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyCode, Money};
    use crate::core::item::ItemSpec;
    use crate::core::tax::TaxCode;
    use crate::core::worksheet::WorksheetState;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn spec(fob: Decimal) -> ItemSpec {
        ItemSpec {
            tariff_code: "0901.11".to_string(),
            origin_country: "CI".to_string(),
            provenance_code: "CI".to_string(),
            fob: Money::new(fob, CurrencyCode::new("USD")),
            freight: None,
            insurance: None,
            supplier_commission: Decimal::ZERO,
            gross_weight: dec!(10),
            net_weight: dec!(9),
            complementary_quantity: Decimal::ZERO,
            mercurial_quantity: Decimal::ZERO,
        }
    }

    fn document(state: WorksheetState) -> WorksheetDocument {
        WorksheetDocument {
            case_file: "DOS-1".to_string(),
            state,
            items: vec![spec(dec!(300)), spec(dec!(700))],
        }
    }

    fn line(code: &str) -> LiquidationLine {
        LiquidationLine {
            code: TaxCode::new(code),
            label: code.to_string(),
            rate: dec!(5),
            base_amount: dec!(100),
            computed_amount: 5,
            applicable: true,
            excluded: false,
        }
    }

    #[test]
    fn test_import_preserves_order() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Draft));
        let items = gateway.worksheet_items(id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].fob.amount, dec!(300));
        assert_eq!(items[1].fob.amount, dec!(700));
        assert_eq!(gateway.item_count(), 2);
    }

    #[test]
    fn test_commit_bumps_version_and_replaces_lines() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Draft));
        let item = gateway.worksheet_items(id).unwrap().remove(0);

        let mut changes = Changeset::new();
        changes.update_item(item.clone());
        changes.replace_lines(item.id, vec![line("DD"), line("TVA")]);
        let receipt = gateway.commit(changes).unwrap();
        assert_eq!(receipt.items_updated, 1);
        assert_eq!(receipt.lines_written, 2);
        assert_eq!(gateway.item(item.id).unwrap().version, 1);

        let mut fresh = gateway.item(item.id).unwrap();
        fresh.gross_weight = dec!(11);
        let mut changes = Changeset::new();
        changes.update_item(fresh);
        changes.replace_lines(item.id, vec![line("DD")]);
        gateway.commit(changes).unwrap();

        let lines = gateway.liquidation_lines(item.id).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(gateway.item(item.id).unwrap().version, 2);
    }

    #[test]
    fn test_stale_version_rejects_whole_commit() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Draft));
        let items = gateway.worksheet_items(id).unwrap();

        let mut first = Changeset::new();
        first.update_item(items[0].clone());
        gateway.commit(first).unwrap();

        // items[0] is now stale; items[1] must not be written either.
        let mut second = Changeset::new();
        let mut other = items[1].clone();
        other.gross_weight = dec!(99);
        second.update_item(other);
        second.update_item(items[0].clone());
        second.replace_lines(items[1].id, vec![line("DD")]);
        let err = gateway.commit(second).unwrap_err();

        assert!(matches!(err, GatewayError::VersionConflict { expected: 0, found: 1, .. }));
        assert_eq!(gateway.item(items[1].id).unwrap().gross_weight, dec!(10));
        assert!(gateway.liquidation_lines(items[1].id).unwrap().is_empty());
    }

    #[test]
    fn test_locked_worksheet_rejects_commit_and_delete() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Validated));
        let item = gateway.worksheet_items(id).unwrap().remove(0);

        let mut changes = Changeset::new();
        changes.update_item(item);
        assert_eq!(gateway.commit(changes), Err(GatewayError::WorksheetLocked(id)));
        assert_eq!(gateway.delete_worksheet(id), Err(GatewayError::WorksheetLocked(id)));
    }

    #[test]
    fn test_delete_draft_worksheet() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Draft));
        gateway.delete_worksheet(id).unwrap();
        assert_eq!(gateway.worksheet_count(), 0);
        assert_eq!(gateway.item_count(), 0);
        assert!(matches!(
            gateway.worksheet(id),
            Err(GatewayError::WorksheetNotFound(_))
        ));
    }

    #[test]
    fn test_validate_is_one_way() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Draft));

        let validated = gateway.validate_worksheet(id).unwrap();
        assert_eq!(validated.state, WorksheetState::Validated);
        assert!(validated.validated_at.is_some());
        assert_eq!(validated.item_ids.len(), 2);

        assert_eq!(gateway.validate_worksheet(id), Err(GatewayError::WorksheetLocked(id)));
        assert_eq!(gateway.worksheet(id).unwrap(), validated);

        let missing = WorksheetId::new();
        assert_eq!(
            gateway.validate_worksheet(missing),
            Err(GatewayError::WorksheetNotFound(missing))
        );
    }

    #[test]
    fn test_concurrent_validation_has_one_winner() {
        let gateway = InMemoryGateway::new();
        let id = gateway.import(document(WorksheetState::Draft));

        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let gateway = gateway.clone();
                    scope.spawn(move || gateway.validate_worksheet(id).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert!(gateway.worksheet(id).unwrap().is_locked());
    }

    #[test]
    fn test_unknown_item() {
        let gateway = InMemoryGateway::new();
        let missing = ItemId::new();
        assert_eq!(gateway.item(missing), Err(GatewayError::ItemNotFound(missing)));
        assert!(gateway.liquidation_lines(missing).is_err());
    }
}
