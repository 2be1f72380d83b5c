//! Segregation metric `LS = Σ same / (degree · N)`, kept as an exact
//! integer sum so local updates never drift from a full recount.

use crate::mechanics::Topology;
use crate::systems::agent;
use crate::systems::grid::Grid;
use crate::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegregationMetric {
    same_sum: u64,
    degree: u32,
    agents: u32,
}

impl SegregationMetric {
    /// Full recount over every agent.
    pub fn measure(grid: &Grid, topo: &Topology) -> Self {
        Self {
            same_sum: same_sum_over(grid, topo, grid.ids()),
            degree: topo.degree(),
            agents: grid.agents().len() as u32,
        }
    }

    #[must_use]
    pub const fn same_sum(&self) -> u64 {
        self.same_sum
    }

    #[must_use]
    pub const fn degree(&self) -> u32 {
        self.degree
    }

    pub fn value(&self) -> f64 {
        let denom = self.degree as u64 * self.agents as u64;
        if denom == 0 { 0.0 } else { self.same_sum as f64 / denom as f64 }
    }

    /// Replace the contribution `before` of some agents with `after`.
    pub fn apply_delta(&mut self, before: u64, after: u64) {
        assert!(before <= self.same_sum, "metric delta larger than the running sum");
        self.same_sum = self.same_sum - before + after;
    }
}

/// Σ same-kind neighbor counts over `ids`.
pub fn same_sum_over(grid: &Grid, topo: &Topology, ids: impl IntoIterator<Item = AgentId>) -> u64 {
    ids.into_iter()
        .map(|id| agent::composition(grid, topo, id).same as u64)
        .sum()
}
