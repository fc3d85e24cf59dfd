use crate::core::item::{Item, ItemId};
use crate::core::worksheet::{Worksheet, WorksheetId};
use crate::liquidation::line::LiquidationLine;
use thiserror::Error;

/// Failures reported by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("worksheet {0} not found")]
    WorksheetNotFound(WorksheetId),
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error("worksheet {0} is validated")]
    WorksheetLocked(WorksheetId),
    #[error("item {item} changed since it was read (read version {expected}, stored version {found})")]
    VersionConflict {
        item: ItemId,
        expected: u64,
        found: u64,
    },
    #[error("storage failure: {0}")]
    Storage(String),
}

/// A unit of work built entirely in memory and applied in one commit.
///
/// Item updates carry the version they were read at. Line sets replace the
/// item's stored lines wholesale.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    items: Vec<Item>,
    line_sets: Vec<(ItemId, Vec<LiquidationLine>)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an item update. `item.version` must be the version it was read at.
    pub fn update_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Stage the complete new set of liquidation lines for an item.
    pub fn replace_lines(&mut self, item: ItemId, lines: Vec<LiquidationLine>) {
        self.line_sets.push((item, lines));
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn line_sets(&self) -> &[(ItemId, Vec<LiquidationLine>)] {
        &self.line_sets
    }

    /// Staged item updates and line sets, for a backend applying the commit.
    pub fn into_parts(self) -> (Vec<Item>, Vec<(ItemId, Vec<LiquidationLine>)>) {
        (self.items, self.line_sets)
    }
}

/// What a successful commit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitReceipt {
    pub items_updated: usize,
    pub line_sets_replaced: usize,
    pub lines_written: usize,
}

/// Storage contract used by the pipeline.
///
/// `commit` must be all-or-nothing: if any staged item is missing, belongs
/// to a validated worksheet, or has a stored version different from the one
/// it was read at, nothing is written.
pub trait PersistenceGateway {
    fn worksheet(&self, id: WorksheetId) -> Result<Worksheet, GatewayError>;

    fn item(&self, id: ItemId) -> Result<Item, GatewayError>;

    /// Items of a worksheet in declaration order.
    fn worksheet_items(&self, id: WorksheetId) -> Result<Vec<Item>, GatewayError>;

    /// Stored liquidation lines of an item (empty if never liquidated).
    fn liquidation_lines(&self, id: ItemId) -> Result<Vec<LiquidationLine>, GatewayError>;

    /// Move a draft worksheet to validated and return its new header.
    /// Fails with `WorksheetLocked` if it is already validated; the check
    /// and the transition happen atomically.
    fn validate_worksheet(&self, id: WorksheetId) -> Result<Worksheet, GatewayError>;

    /// Remove a draft worksheet with its items and their lines.
    fn delete_worksheet(&self, id: WorksheetId) -> Result<(), GatewayError>;

    fn commit(&self, changeset: Changeset) -> Result<CommitReceipt, GatewayError>;
}
