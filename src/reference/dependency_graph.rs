use crate::core::tax::{TaxCode, TaxDefinition, TaxDependency};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

/// Problems in the tax dependency graph that would make liquidation order
/// unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("tax {0} is defined more than once")]
    DuplicateTax(TaxCode),
    #[error("dependency {principal} -> {complement} names an undefined tax")]
    UnknownTax {
        principal: TaxCode,
        complement: TaxCode,
    },
    #[error("tax dependencies form a cycle through {}", join_codes(.0))]
    Cycle(Vec<TaxCode>),
    #[error(
        "complement {complement} (level {complement_level}) is evaluated after \
         its principal {principal} (level {principal_level})"
    )]
    LevelInversion {
        principal: TaxCode,
        principal_level: i32,
        complement: TaxCode,
        complement_level: i32,
    },
}

fn join_codes(codes: &[TaxCode]) -> String {
    codes
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Directed graph of tax prerequisites.
///
/// Edges run from complement to principal: an edge `c -> p` means `c` must
/// be computed before `p` can fold its amount into its base.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<TaxCode, ()>,
    nodes: HashMap<TaxCode, NodeIndex>,
    levels: HashMap<TaxCode, i32>,
}

impl DependencyGraph {
    /// Build the graph from tax definitions and dependency edges.
    ///
    /// Every edge must reference defined taxes.
    pub fn build(
        taxes: &[TaxDefinition],
        dependencies: &[TaxDependency],
    ) -> Result<Self, DependencyError> {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        let mut levels = HashMap::new();

        for tax in taxes {
            if nodes.contains_key(&tax.code) {
                return Err(DependencyError::DuplicateTax(tax.code.clone()));
            }
            let idx = graph.add_node(tax.code.clone());
            nodes.insert(tax.code.clone(), idx);
            levels.insert(tax.code.clone(), tax.ordering_level);
        }

        for dep in dependencies {
            let (Some(&principal), Some(&complement)) =
                (nodes.get(&dep.principal), nodes.get(&dep.complement))
            else {
                return Err(DependencyError::UnknownTax {
                    principal: dep.principal.clone(),
                    complement: dep.complement.clone(),
                });
            };
            graph.update_edge(complement, principal, ());
        }

        Ok(Self {
            graph,
            nodes,
            levels,
        })
    }

    /// Reject cycles and edges whose complement sits on a higher level than
    /// its principal.
    ///
    /// Level numbers are never silently overridden: an inconsistent edge is
    /// reported rather than reordered around.
    pub fn check(&self) -> Result<(), DependencyError> {
        if toposort(&self.graph, None).is_err() {
            return Err(DependencyError::Cycle(self.cycle_members()));
        }

        for edge in self.graph.raw_edges() {
            let complement = &self.graph[edge.source()];
            let principal = &self.graph[edge.target()];
            let complement_level = self.levels[complement];
            let principal_level = self.levels[principal];
            if complement_level > principal_level {
                return Err(DependencyError::LevelInversion {
                    principal: principal.clone(),
                    principal_level,
                    complement: complement.clone(),
                    complement_level,
                });
            }
        }
        Ok(())
    }

    /// Taxes taking part in a cycle, smallest strongly connected component
    /// first. Self-dependencies count as cycles.
    fn cycle_members(&self) -> Vec<TaxCode> {
        let mut cyclic: Vec<Vec<TaxCode>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut codes: Vec<TaxCode> =
                    scc.into_iter().map(|idx| self.graph[idx].clone()).collect();
                codes.sort();
                codes
            })
            .collect();
        cyclic.sort();
        cyclic.into_iter().next().unwrap_or_default()
    }

    /// Evaluation order: ascending level, prerequisites before dependents
    /// within a level, then by code.
    ///
    /// Kahn's algorithm with a `(level, code)` priority queue. Because every
    /// edge goes from a lower-or-equal level to a higher-or-equal one, the
    /// queue always yields the lowest remaining level first.
    pub fn evaluation_order(&self) -> Result<Vec<TaxCode>, DependencyError> {
        self.check()?;

        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let deg = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count();
                (idx, deg)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(i32, TaxCode, NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(idx, _)| Reverse(self.key(*idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, code, idx))) = ready.pop() {
            order.push(code);
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse(self.key(next)));
                    }
                }
            }
        }
        Ok(order)
    }

    fn key(&self, idx: NodeIndex) -> (i32, TaxCode, NodeIndex) {
        let code = self.graph[idx].clone();
        (self.levels[&code], code, idx)
    }

    /// Complements folded into `principal`'s base, sorted by code.
    pub fn complements_of(&self, principal: &TaxCode) -> Vec<TaxCode> {
        let Some(&idx) = self.nodes.get(principal) else {
            return Vec::new();
        };
        let mut complements: Vec<TaxCode> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|c| self.graph[c].clone())
            .collect();
        complements.sort();
        complements
    }

    pub fn tax_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }
}
