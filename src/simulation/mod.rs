//! Sample data generation for benchmarks and manual testing.

pub mod worksheet_generator;
