/*!
`schelling_balance` — a deterministic Schelling segregation engine on a torus.

What it does
- Places red and blue agents on a `width × height` torus and lets them
  relocate whenever a move strictly raises their utility, a function of
  the share of same-kind agents in their neighborhood.
- Two relocation protocols: **jump** (one agent into an empty cell) and
  **swap** (a red and a blue trade cells, both must gain).
- Each tick is split in two phases, `propose` then `commit`, so a caller
  can look at the pending move before it lands.
- Stops at a Nash equilibrium: no permitted relocation improves anyone.
- Keeps a segregation metric up to date incrementally after every move.

How to use (call surface only)
- Build a `SimConfig` and a `UtilityFunction` (or a serde `UtilitySpec`).
- `Simulation::configure(config, utility)?` seeds one `WyRand` from
  `config.seed` and places the agents.
- Drive it with `step()` or run `settle(&mut sim, max_steps)`.
- Read back `is_equilibrium()`, `segregation_metric()`,
  `agent_type_at(pos)` and `neighbors_of(pos)`.

What it does NOT do
- No rendering, no widgets, no frame timing, no save/load.
*/

use serde::{Deserialize, Serialize};

pub mod error;
pub mod mechanics;
pub mod session;
pub mod systems;

pub use error::ConfigError;
pub use mechanics::{Fraction, Topology, UtilityFunction};
pub use session::{Mode, Phase, Population, SimConfig, Simulation, TopologyConfig, UtilitySpec};
pub use systems::sdk::{Relocation, RelocationProtocol, World};

/// Cell coordinate on the torus, `0 <= x < width`, `0 <= y < height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// The two agent kinds. Fixed for an agent's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Red,
    Blue,
}

impl AgentKind {
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            AgentKind::Red => AgentKind::Blue,
            AgentKind::Blue => AgentKind::Red,
        }
    }
}

/// Index into the world's agent arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl AgentId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What `settle` did before it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settled {
    pub steps: usize,
    pub moves: usize,
    pub equilibrium: bool,
}

/// Drive `sim` until it reaches equilibrium or `max_steps` phases have run.
///
/// Every proposal returned by `step` is committed on the following step, so
/// `moves` counts relocations actually applied (a proposal still pending when
/// the budget runs out is not counted).
pub fn settle(sim: &mut Simulation, max_steps: usize) -> Settled {
    let mut steps = 0;
    let mut moves = 0;
    for _ in 0..max_steps {
        if sim.is_equilibrium() && sim.pending().is_none() {
            break;
        }
        let committing = sim.phase() == Phase::Commit && sim.pending().is_some();
        sim.step();
        steps += 1;
        if committing {
            moves += 1;
        }
    }
    Settled {
        steps,
        moves,
        equilibrium: sim.is_equilibrium(),
    }
}
