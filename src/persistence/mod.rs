//! Storage seam for worksheets, items and liquidation lines.

pub mod gateway;
pub mod memory;
