// src/session/mod.rs

//! The engine facade a viewer drives: configure once, then `step`.
//!
//! `Simulation` owns the world, the active relocation protocol, the single
//! seeded `WyRand`, the equilibrium flag and the pending proposal. Every
//! change that can open up a new improving move clears the flag; setters
//! that receive their current value are no-ops.

pub mod config;
pub use config::*;

use std::fmt;

use bevy_prng::WyRand;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::mechanics::{UtilityFunction, stoch};
use crate::systems::grid::Grid;
use crate::systems::sdk::{Relocation, RelocationProtocol, World};
use crate::{AgentId, AgentKind, Position};

/// Which half of the tick the next `step` runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Propose,
    Commit,
}

/// Head counts for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Population {
    pub red: usize,
    pub blue: usize,
    pub empty: usize,
}

pub struct Simulation {
    config: SimConfig,
    world: World,
    protocol: Box<dyn RelocationProtocol>,
    rng: WyRand,
    equilibrium: bool,
    phase: Phase,
    pending: Option<Relocation>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("protocol", &self.protocol.name())
            .field("equilibrium", &self.equilibrium)
            .field("phase", &self.phase)
            .field("pending", &self.pending)
            .field("metric", &self.world.metric().value())
            .finish()
    }
}

fn make_protocol(mode: Mode, world: &World) -> Result<Box<dyn RelocationProtocol>, ConfigError> {
    match mode {
        #[cfg(feature = "protocol-jump")]
        Mode::Jump => Ok(Box::new(crate::systems::jump::JumpProtocol::new(world))),
        #[cfg(feature = "protocol-swap")]
        Mode::Swap => Ok(Box::new(crate::systems::swap::SwapProtocol::new(world))),
        #[allow(unreachable_patterns)]
        other => {
            let _ = world;
            Err(ConfigError::ProtocolDisabled(other))
        }
    }
}

impl Simulation {
    /// Build a fresh world from `config`, seeding the generator from `config.seed`.
    pub fn configure(config: SimConfig, utility: UtilityFunction) -> Result<Self, ConfigError> {
        let rng = stoch::seeded(config.seed);
        Self::configure_with_rng(config, utility, rng)
    }

    pub fn from_spec(config: SimConfig, utility: &UtilitySpec) -> Result<Self, ConfigError> {
        Self::configure(config, utility.build()?)
    }

    /// Like `configure`, with a caller-provided generator.
    pub fn configure_with_rng(config: SimConfig, utility: UtilityFunction, mut rng: WyRand) -> Result<Self, ConfigError> {
        utility.validate()?;
        let world = build_world(&config, utility, &mut rng)?;
        let protocol = make_protocol(config.mode, &world)?;
        info!(
            width = config.width,
            height = config.height,
            mode = ?config.mode,
            agents = world.grid().agents().len(),
            seed = config.seed,
            "simulation configured"
        );
        Ok(Self {
            config,
            world,
            protocol,
            rng,
            equilibrium: false,
            phase: Phase::Propose,
            pending: None,
        })
    }

    /// Drive a hand-built world (scripted layouts, scenarios).
    pub fn with_world(world: World, mode: Mode, rng: WyRand) -> Result<Self, ConfigError> {
        world.utility().validate()?;
        if !mode.is_enabled() {
            return Err(ConfigError::ProtocolDisabled(mode));
        }
        let grid = world.grid();
        let cells = grid.cell_count();
        let agents = grid.agents().len();
        check_population(mode, agents, cells)?;
        let blue = grid.count(AgentKind::Blue);
        let topo = world.topology();
        let config = SimConfig {
            width: grid.width(),
            height: grid.height(),
            density: agents as f64 / cells as f64,
            blue_ratio: if agents == 0 { 0.0 } else { blue as f64 / agents as f64 },
            mode,
            topology: TopologyConfig {
                diagonal: topo.diagonal(),
                self_inclusive: topo.self_inclusive(),
            },
            seed: 0,
        };
        let protocol = make_protocol(mode, &world)?;
        Ok(Self {
            config,
            world,
            protocol,
            rng,
            equilibrium: false,
            phase: Phase::Propose,
            pending: None,
        })
    }

    /// Advance one phase. Returns the new proposal when this call proposed
    /// one, otherwise `None`.
    pub fn step(&mut self) -> Option<Relocation> {
        match self.phase {
            Phase::Propose => {
                self.phase = Phase::Commit;
                if self.equilibrium {
                    return None;
                }
                self.pending = self.protocol.propose(&self.world, &mut self.rng);
                match &self.pending {
                    Some(r) => debug!(protocol = self.protocol.name(), relocation = ?r, "relocation proposed"),
                    None => {
                        self.equilibrium = true;
                        info!(
                            protocol = self.protocol.name(),
                            metric = self.world.metric().value(),
                            "nash equilibrium reached"
                        );
                    }
                }
                self.pending
            }
            Phase::Commit => {
                self.phase = Phase::Propose;
                if let Some(r) = self.pending.take() {
                    self.protocol.commit(&mut self.world, &r);
                    debug!(metric = self.world.metric().value(), "relocation committed");
                }
                None
            }
        }
    }

    /* --- read side --- */

    pub fn is_equilibrium(&self) -> bool {
        self.equilibrium
    }

    pub fn segregation_metric(&self) -> f64 {
        self.world.metric().value()
    }

    pub fn agent_type_at(&self, pos: Position) -> Option<AgentKind> {
        self.world.grid().kind_at(pos)
    }

    pub fn neighbors_of(&self, pos: Position) -> Vec<Position> {
        assert!(self.world.topology().contains(pos), "position {pos:?} outside the grid");
        self.world.topology().neighbors(pos).collect()
    }

    pub fn current_utility(&self, id: AgentId) -> f64 {
        self.world.utility_of(id)
    }

    pub fn pending(&self) -> Option<&Relocation> {
        self.pending.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn protocol_name(&self) -> &'static str {
        self.protocol.name()
    }

    pub fn counts(&self) -> Population {
        let grid = self.world.grid();
        Population {
            red: grid.count(AgentKind::Red),
            blue: grid.count(AgentKind::Blue),
            empty: grid.empty().len(),
        }
    }

    /* --- live tuning --- */

    /// Rebuild the world from `next`, keeping the utility and the generator.
    /// On error nothing changes.
    pub fn reconfigure(&mut self, next: SimConfig) -> Result<(), ConfigError> {
        let utility = self.world.utility().clone();
        let world = build_world(&next, utility, &mut self.rng)?;
        self.protocol = make_protocol(next.mode, &world)?;
        self.world = world;
        self.config = next;
        self.invalidate();
        info!(
            width = self.config.width,
            height = self.config.height,
            agents = self.world.grid().agents().len(),
            "grid regenerated"
        );
        Ok(())
    }

    pub fn set_grid_size(&mut self, width: u32, height: u32) -> Result<(), ConfigError> {
        if (width, height) == (self.config.width, self.config.height) {
            return Ok(());
        }
        self.reconfigure(SimConfig {
            width,
            height,
            ..self.config.clone()
        })
    }

    pub fn set_density(&mut self, density: f64) -> Result<(), ConfigError> {
        if density == self.config.density {
            return Ok(());
        }
        self.reconfigure(self.config.clone().with_density(density))
    }

    pub fn set_blue_ratio(&mut self, blue_ratio: f64) -> Result<(), ConfigError> {
        if blue_ratio == self.config.blue_ratio {
            return Ok(());
        }
        self.reconfigure(self.config.clone().with_blue_ratio(blue_ratio))
    }

    /// Change the neighborhood shape in place; agents stay where they are.
    pub fn set_topology(&mut self, topology: TopologyConfig) {
        if topology == self.config.topology {
            return;
        }
        self.world.set_topology(topology.topology(self.config.width, self.config.height));
        self.config.topology = topology;
        self.invalidate();
    }

    pub fn set_utility(&mut self, utility: UtilityFunction) -> Result<(), ConfigError> {
        utility.validate()?;
        self.world.set_utility(utility);
        self.invalidate();
        Ok(())
    }

    /// Retune a single-peaked utility. Other variants ignore it.
    pub fn set_peak(&mut self, peak: f64) -> Result<(), ConfigError> {
        if !(peak > 0.0 && peak < 1.0) {
            return Err(ConfigError::InvalidUtility("peak must lie strictly inside (0, 1)"));
        }
        if self.world.utility_mut().set_peak(peak) {
            self.invalidate();
        }
        Ok(())
    }

    /// Retune a threshold utility. Other variants ignore it.
    pub fn set_tau(&mut self, tau: f64) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&tau) {
            return Err(ConfigError::InvalidUtility("tau must lie in [0, 1]"));
        }
        if self.world.utility_mut().set_tau(tau) {
            self.invalidate();
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.equilibrium = false;
        self.pending = None;
        self.phase = Phase::Propose;
    }
}

fn build_world(config: &SimConfig, utility: UtilityFunction, rng: &mut WyRand) -> Result<World, ConfigError> {
    let counts = config.validate()?;
    let grid = Grid::populate(config.width, config.height, counts.red, counts.blue, rng);
    Ok(World::new(config.topology(), grid, utility))
}
