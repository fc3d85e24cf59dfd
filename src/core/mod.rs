//! Foundational types: currencies, items, worksheets, tax definitions.

pub mod currency;
pub mod item;
pub mod rounding;
pub mod tax;
pub mod worksheet;
