// src/systems/sdk.rs

//! # Relocation SDK
//!
//! Shared machinery for **relocation protocols** (the rules by which agents
//! move: jump into a vacancy, swap with an agent of the other kind, ...).
//! A protocol only decides *which* move to make; the `World` owns the grid,
//! the topology, the utility and the segregation metric, and applies moves.
//!
//! ## The two-phase tick
//! 1) **propose**: `(&mut Protocol, &World, &mut WyRand) -> Option<Relocation>`
//!    - Read-only with respect to the world. Returns the first strictly
//!      improving move the protocol finds, or `None` when no agent (pair)
//!      can improve, which the caller reads as a Nash equilibrium.
//!    - Protocol-local state (e.g. a persistently shuffled agent order) may
//!      change.
//!
//! 2) **commit**: `(&mut Protocol, &mut World, &Relocation)`
//!    - Applies the move. The default goes through `World::apply`, which
//!      updates occupancy and the metric.
//!
//! The split lets a viewer draw the proposed move before it lands.
//!
//! ## Incremental metric
//! A move only changes the neighborhoods of the movers and of the agents
//! around the cells they leave and enter. `World::apply` recounts exactly
//! that set before and after the move and folds the difference into the
//! running sum. `World::recount` is the from-scratch reference.
//!
//! ## Adding a protocol
//! - Add `src/systems/<name>.rs`, gate it behind `feature = "protocol-<name>"`.
//! - Implement `RelocationProtocol`; reuse `systems::agent` for utilities.
//! - If the move shape is new, add a `Relocation` variant and teach
//!   `World::apply` about it.
//! - Pin an exhaustive equilibrium check in `tests/`.

use std::collections::BTreeSet;

use bevy_prng::WyRand;

use crate::mechanics::{Topology, UtilityFunction};
use crate::systems::agent::{self, Composition};
use crate::systems::grid::Grid;
use crate::systems::metric::{self, SegregationMetric};
use crate::{AgentId, Position};

/// A proposed move, with the utilities the movers would reach.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Relocation {
    Jump {
        agent: AgentId,
        from: Position,
        to: Position,
        utility: f64,
    },
    Swap {
        first: AgentId,
        second: AgentId,
        first_at: Position,
        second_at: Position,
        first_utility: f64,
        second_utility: f64,
    },
}

impl Relocation {
    /// Agents that move.
    pub fn movers(&self) -> Vec<AgentId> {
        match *self {
            Relocation::Jump { agent, .. } => vec![agent],
            Relocation::Swap { first, second, .. } => vec![first, second],
        }
    }

    /// Cells left and entered.
    pub fn cells(&self) -> Vec<Position> {
        match *self {
            Relocation::Jump { from, to, .. } => vec![from, to],
            Relocation::Swap { first_at, second_at, .. } => vec![first_at, second_at],
        }
    }
}

/// A move-generation rule.
pub trait RelocationProtocol {
    fn name(&self) -> &'static str;

    /// Phase 0: find an improving relocation without touching the world.
    fn propose(&mut self, world: &World, rng: &mut WyRand) -> Option<Relocation>;

    /// Phase 1: apply a relocation this protocol proposed.
    fn commit(&mut self, world: &mut World, relocation: &Relocation) {
        world.apply(relocation);
    }
}

/// Grid, topology, utility and metric, kept in step.
#[derive(Clone, Debug)]
pub struct World {
    topology: Topology,
    grid: Grid,
    utility: UtilityFunction,
    metric: SegregationMetric,
}

impl World {
    pub fn new(topology: Topology, grid: Grid, utility: UtilityFunction) -> Self {
        assert_eq!(
            (topology.width(), topology.height()),
            (grid.width(), grid.height()),
            "topology and grid disagree on dimensions"
        );
        let metric = SegregationMetric::measure(&grid, &topology);
        Self {
            topology,
            grid,
            utility,
            metric,
        }
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn utility(&self) -> &UtilityFunction {
        &self.utility
    }

    pub fn utility_mut(&mut self) -> &mut UtilityFunction {
        &mut self.utility
    }

    #[must_use]
    pub fn metric(&self) -> &SegregationMetric {
        &self.metric
    }

    pub fn set_utility(&mut self, utility: UtilityFunction) {
        self.utility = utility;
    }

    /// Swap the neighborhood shape; the metric is recounted since every
    /// neighborhood may have changed.
    pub fn set_topology(&mut self, topology: Topology) {
        assert_eq!(
            (topology.width(), topology.height()),
            (self.grid.width(), self.grid.height()),
            "topology change may not resize the grid"
        );
        self.topology = topology;
        self.metric = SegregationMetric::measure(&self.grid, &self.topology);
    }

    pub fn composition_of(&self, id: AgentId) -> Composition {
        agent::composition(&self.grid, &self.topology, id)
    }

    pub fn utility_of(&self, id: AgentId) -> f64 {
        agent::utility(&self.grid, &self.topology, &self.utility, id)
    }

    /// Full recount of the metric, ignoring the running value.
    pub fn recount(&self) -> SegregationMetric {
        SegregationMetric::measure(&self.grid, &self.topology)
    }

    /// Agents whose neighborhood `relocation` can change: the movers and
    /// every occupant around the cells involved.
    pub fn affected(&self, relocation: &Relocation) -> BTreeSet<AgentId> {
        let mut set: BTreeSet<AgentId> = relocation.movers().into_iter().collect();
        for cell in relocation.cells() {
            set.extend(self.topology.neighbors(cell).filter_map(|n| self.grid.occupant(n)));
        }
        set
    }

    /// Apply `relocation` and update the metric from the affected set.
    pub fn apply(&mut self, relocation: &Relocation) {
        let affected = self.affected(relocation);
        let before = metric::same_sum_over(&self.grid, &self.topology, affected.iter().copied());
        match *relocation {
            Relocation::Jump { agent, from, to, .. } => {
                assert_eq!(self.grid.agent(agent).pos, from, "stale jump for {agent:?}");
                self.grid.jump(agent, to);
            }
            Relocation::Swap {
                first,
                second,
                first_at,
                second_at,
                ..
            } => {
                assert_eq!(self.grid.agent(first).pos, first_at, "stale swap for {first:?}");
                assert_eq!(self.grid.agent(second).pos, second_at, "stale swap for {second:?}");
                self.grid.swap(first, second);
            }
        }
        let after = metric::same_sum_over(&self.grid, &self.topology, affected.iter().copied());
        self.metric.apply_delta(before, after);
    }
}
