//! Proportional allocation of worksheet-level freight, insurance and weight.

pub mod engine;
