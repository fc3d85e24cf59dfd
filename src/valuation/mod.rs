//! Currency conversion and customs valuation (CAF).

pub mod calculator;
pub mod converter;
