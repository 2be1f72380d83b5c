//! Jump protocol: one agent moves into an empty cell.
//!
//! Search per proposal:
//! 1. shuffle the empty cells once;
//! 2. up to `⌊0.1 · agents⌋` times, pick a random agent (with replacement)
//!    and scan the shuffled cells for the first strict improvement;
//! 3. failing that, reshuffle the agent order and scan every agent the same
//!    way. Nothing found means no agent can improve by any jump.

use bevy_prng::WyRand;
use tracing::trace;

use crate::mechanics::stoch;
use crate::systems::agent;
use crate::systems::sdk::{Relocation, RelocationProtocol, World};
use crate::{AgentId, Position};

/// Share of the population sampled at random before the exhaustive pass.
pub const RANDOM_SHARE: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct JumpProtocol {
    order: Vec<AgentId>,
}

impl JumpProtocol {
    pub fn new(world: &World) -> Self {
        Self {
            order: world.grid().ids().collect(),
        }
    }

    /// Random tries before falling back to the exhaustive scan.
    pub fn limit(&self) -> usize {
        (self.order.len() as f64 * RANDOM_SHARE).floor() as usize
    }

    /// Current scan order (reshuffled by every exhaustive pass).
    pub fn order(&self) -> &[AgentId] {
        &self.order
    }

    fn try_agent(world: &World, id: AgentId, targets: &[Position]) -> Option<Relocation> {
        let (grid, topo, u) = (world.grid(), world.topology(), world.utility());
        agent::find_improving_jump(grid, topo, u, id, targets).map(|(to, utility)| Relocation::Jump {
            agent: id,
            from: grid.agent(id).pos,
            to,
            utility,
        })
    }
}

impl RelocationProtocol for JumpProtocol {
    fn name(&self) -> &'static str {
        "jump"
    }

    fn propose(&mut self, world: &World, rng: &mut WyRand) -> Option<Relocation> {
        let limit = self.limit();
        let mut targets: Vec<Position> = world.grid().empty().iter().copied().collect();
        stoch::shuffle(rng, &mut targets);

        for _ in 0..limit {
            let Some(&id) = stoch::choose(rng, &self.order) else { break };
            if let Some(found) = Self::try_agent(world, id, &targets) {
                trace!(?id, "improving jump found by random probe");
                return Some(found);
            }
        }

        stoch::shuffle(rng, &mut self.order);
        self.order
            .iter()
            .find_map(|&id| Self::try_agent(world, id, &targets))
    }
}
