//! Reference data: currency rates, tax definitions, tariff entries, rate
//! table and tax dependencies, loaded into a validated snapshot.

pub mod dependency_graph;
pub mod snapshot;
