//! Swap protocol: a blue and a red agent trade cells, and both must gain.
//!
//! The scan is deterministic: blues in arena order, and for each blue the
//! reds in arena order. Agents already at utility 1.0 are skipped on either
//! side. The first mutually improving pair wins.

use bevy_prng::WyRand;

use crate::mechanics::is_greater;
use crate::systems::agent;
use crate::systems::sdk::{Relocation, RelocationProtocol, World};
use crate::{AgentId, AgentKind};

#[derive(Clone, Debug)]
pub struct SwapProtocol {
    blue: Vec<AgentId>,
    red: Vec<AgentId>,
}

impl SwapProtocol {
    pub fn new(world: &World) -> Self {
        let grid = world.grid();
        let (blue, red) = grid.ids().partition(|&id| grid.agent(id).kind == AgentKind::Blue);
        Self { blue, red }
    }

    pub fn blue(&self) -> &[AgentId] {
        &self.blue
    }

    pub fn red(&self) -> &[AgentId] {
        &self.red
    }
}

impl RelocationProtocol for SwapProtocol {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn propose(&mut self, world: &World, _rng: &mut WyRand) -> Option<Relocation> {
        let (grid, topo, u) = (world.grid(), world.topology(), world.utility());
        let current: Vec<f64> = grid.ids().map(|id| world.utility_of(id)).collect();

        for &b in &self.blue {
            let ub = current[b.index()];
            if agent::is_satisfied(ub) {
                continue;
            }
            for &r in &self.red {
                let ur = current[r.index()];
                if agent::is_satisfied(ur) {
                    continue;
                }
                let (nb, nr) = agent::utilities_after_swap(grid, topo, u, b, r);
                if is_greater(nb, ub) && is_greater(nr, ur) {
                    return Some(Relocation::Swap {
                        first: b,
                        second: r,
                        first_at: grid.agent(b).pos,
                        second_at: grid.agent(r).pos,
                        first_utility: nb,
                        second_utility: nr,
                    });
                }
            }
        }
        None
    }
}
