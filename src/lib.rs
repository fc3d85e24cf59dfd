//! # customs-liquidation
//!
//! Customs valuation and duty/tax liquidation engine.
//!
//! Given a worksheet of commercial line items declared in arbitrary
//! currencies, this engine computes each item's local customs value (CAF)
//! and a dependency-ordered breakdown of every applicable duty and tax.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: currencies, items, worksheets, taxes, rounding
//! - **reference** — Validated reference-data snapshot and tax dependency graph
//! - **valuation** — Currency conversion and CAF computation
//! - **allocation** — Proportional split of worksheet freight, insurance and weight
//! - **liquidation** — Per-item tax evaluation and worksheet recapitulation
//! - **persistence** — Storage gateway with atomic, versioned commits
//! - **pipeline** — The operations exposed to the record-management layer
//! - **simulation** — Random sample worksheets for benchmarks and testing

pub mod allocation;
pub mod config;
pub mod core;
pub mod error;
pub mod liquidation;
pub mod persistence;
pub mod pipeline;
pub mod reference;
pub mod simulation;
pub mod valuation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::allocation::engine::{AllocationEngine, GlobalAggregates, RemainderPolicy};
    pub use crate::config::PipelineConfig;
    pub use crate::core::currency::{CurrencyCode, CurrencyRate, Money};
    pub use crate::core::item::{Item, ItemId, ItemSpec};
    pub use crate::core::tax::{BaseType, RateEntry, TariffEntry, TaxCode, TaxDefinition, TaxDependency};
    pub use crate::core::worksheet::{Worksheet, WorksheetDocument, WorksheetId, WorksheetState};
    pub use crate::error::{ErrorKind, PipelineError};
    pub use crate::liquidation::line::{LiquidationLine, LiquidationResult, WorksheetLiquidation};
    pub use crate::persistence::gateway::PersistenceGateway;
    pub use crate::persistence::memory::InMemoryGateway;
    pub use crate::pipeline::Pipeline;
    pub use crate::reference::snapshot::{ReferenceData, ReferenceTables};
}
