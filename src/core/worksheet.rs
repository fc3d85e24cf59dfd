use crate::core::item::{ItemId, ItemSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a worksheet (note de détail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorksheetId(Uuid);

impl WorksheetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorksheetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorksheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a worksheet. `Draft -> Validated` is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorksheetState {
    #[default]
    Draft,
    Validated,
}

impl fmt::Display for WorksheetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorksheetState::Draft => f.write_str("DRAFT"),
            WorksheetState::Validated => f.write_str("VALIDATED"),
        }
    }
}

/// An ordered group of items under one customs case file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worksheet {
    pub id: WorksheetId,
    /// Reference of the owning case file (dossier).
    pub case_file: String,
    pub state: WorksheetState,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    /// Items in declaration order.
    pub item_ids: Vec<ItemId>,
}

impl Worksheet {
    pub fn new(case_file: impl Into<String>) -> Self {
        Self {
            id: WorksheetId::new(),
            case_file: case_file.into(),
            state: WorksheetState::Draft,
            created_at: Utc::now(),
            validated_at: None,
            item_ids: Vec::new(),
        }
    }

    /// Whether items and liquidations are frozen.
    pub fn is_locked(&self) -> bool {
        self.state == WorksheetState::Validated
    }

    /// Freeze the worksheet. Returns `false` if it was already validated.
    pub fn validate(&mut self) -> bool {
        if self.is_locked() {
            return false;
        }
        self.state = WorksheetState::Validated;
        self.validated_at = Some(Utc::now());
        true
    }
}

/// File/transport form of a worksheet: the declared items without ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetDocument {
    pub case_file: String,
    #[serde(default)]
    pub state: WorksheetState,
    pub items: Vec<ItemSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_worksheet_is_draft() {
        let ws = Worksheet::new("DOS-2024-001");
        assert_eq!(ws.state, WorksheetState::Draft);
        assert!(!ws.is_locked());
        assert!(ws.validated_at.is_none());
    }

    #[test]
    fn test_validation_is_one_way() {
        let mut ws = Worksheet::new("DOS-2024-001");
        assert!(ws.validate());
        assert!(ws.is_locked());
        assert!(ws.validated_at.is_some());
        assert!(!ws.validate());
        assert_eq!(ws.state, WorksheetState::Validated);
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&WorksheetState::Validated).unwrap(),
            "\"VALIDATED\""
        );
        assert_eq!(WorksheetState::default(), WorksheetState::Draft);
    }
}
