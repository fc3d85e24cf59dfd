use crate::core::item::ItemId;
use crate::core::rounding::AmountOverflow;
use crate::core::worksheet::WorksheetId;
use crate::persistence::gateway::GatewayError;
use crate::reference::snapshot::ReferenceDataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable category of a pipeline failure, for callers that render their own
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    NonDistributable,
    ReferenceDataInconsistent,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::NonDistributable => "NON_DISTRIBUTABLE",
            ErrorKind::ReferenceDataInconsistent => "REFERENCE_DATA_INCONSISTENT",
            ErrorKind::PersistenceFailure => "PERSISTENCE_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error("worksheet {0} not found")]
    WorksheetNotFound(WorksheetId),
    #[error("worksheet {0} is validated and can no longer be modified")]
    WorksheetLocked(WorksheetId),
    #[error("item {item} was modified concurrently (read version {expected}, stored version {found})")]
    VersionConflict {
        item: ItemId,
        expected: u64,
        found: u64,
    },
    #[error("worksheet {worksheet} has a total FOB of zero")]
    NonDistributable { worksheet: WorksheetId },
    #[error("inconsistent reference data: {0}")]
    ReferenceData(#[from] ReferenceDataError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// An amount left the representable range. Reported as a persistence
    /// failure since nothing is written.
    #[error(transparent)]
    Overflow(#[from] AmountOverflow),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::ItemNotFound(_) | PipelineError::WorksheetNotFound(_) => ErrorKind::NotFound,
            PipelineError::WorksheetLocked(_) | PipelineError::VersionConflict { .. } => ErrorKind::Conflict,
            PipelineError::NonDistributable { .. } => ErrorKind::NonDistributable,
            PipelineError::ReferenceData(_) => ErrorKind::ReferenceDataInconsistent,
            PipelineError::Persistence(_) | PipelineError::Overflow(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl From<GatewayError> for PipelineError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::WorksheetNotFound(id) => PipelineError::WorksheetNotFound(id),
            GatewayError::ItemNotFound(id) => PipelineError::ItemNotFound(id),
            GatewayError::WorksheetLocked(id) => PipelineError::WorksheetLocked(id),
            GatewayError::VersionConflict { item, expected, found } => {
                log::warn!("optimistic version check failed for item {item}");
                PipelineError::VersionConflict { item, expected, found }
            }
            GatewayError::Storage(detail) => PipelineError::Persistence(detail),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_kinds() {
        let ws = WorksheetId::new();
        let item = ItemId::new();
        let cases = [
            (GatewayError::WorksheetNotFound(ws), ErrorKind::NotFound),
            (GatewayError::ItemNotFound(item), ErrorKind::NotFound),
            (GatewayError::WorksheetLocked(ws), ErrorKind::Conflict),
            (
                GatewayError::VersionConflict { item, expected: 1, found: 2 },
                ErrorKind::Conflict,
            ),
            (GatewayError::Storage("disk full".into()), ErrorKind::PersistenceFailure),
        ];
        for (err, kind) in cases {
            assert_eq!(PipelineError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::ReferenceDataInconsistent.to_string(), "REFERENCE_DATA_INCONSISTENT");
        let json = serde_json::to_string(&ErrorKind::NonDistributable).unwrap();
        assert_eq!(json, "\"NON_DISTRIBUTABLE\"");
    }
}
