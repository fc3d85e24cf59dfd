//! Dependency-ordered duty and tax liquidation per item.

pub mod engine;
pub mod line;
