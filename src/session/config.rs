//! Serializable configuration: grid shape, population, neighborhood, seed,
//! and a data form of the utility function.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mechanics::{Topology, UtilityFunction};

/// Relocation protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Agents jump into empty cells.
    #[default]
    Jump,
    /// Agents of different kinds trade cells; the grid is full.
    Swap,
}

impl Mode {
    /// Whether this build carries the protocol.
    pub const fn is_enabled(self) -> bool {
        match self {
            Mode::Jump => cfg!(feature = "protocol-jump"),
            Mode::Swap => cfg!(feature = "protocol-swap"),
        }
    }
}

/// Neighborhood shape: 8-torus vs 4-torus, with or without the own cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub diagonal: bool,
    pub self_inclusive: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            diagonal: true,
            self_inclusive: true,
        }
    }
}

impl TopologyConfig {
    pub fn topology(self, width: u32, height: u32) -> Topology {
        Topology::new(width, height, self.diagonal, self.self_inclusive)
    }
}

/// Red and blue head counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentCounts {
    pub red: usize,
    pub blue: usize,
}

impl AgentCounts {
    pub const fn total(self) -> usize {
        self.red + self.blue
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    /// Share of cells holding an agent.
    pub density: f64,
    /// Share of agents that are blue.
    pub blue_ratio: f64,
    pub mode: Mode,
    pub topology: TopologyConfig,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::jump(25, 25)
    }
}

impl SimConfig {
    pub fn jump(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            density: 0.8,
            blue_ratio: 0.5,
            mode: Mode::Jump,
            topology: TopologyConfig::default(),
            seed: 0,
        }
    }

    pub fn swap(width: u32, height: u32) -> Self {
        Self {
            density: 1.0,
            mode: Mode::Swap,
            ..Self::jump(width, height)
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_blue_ratio(mut self, blue_ratio: f64) -> Self {
        self.blue_ratio = blue_ratio;
        self
    }

    pub fn with_topology(mut self, diagonal: bool, self_inclusive: bool) -> Self {
        self.topology = TopologyConfig {
            diagonal,
            self_inclusive,
        };
        self
    }

    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Head counts implied by density and blue ratio (floors throughout).
    ///
    /// Jump floors both kinds independently; swap gives red the remainder
    /// so a full grid stays full.
    pub fn agent_counts(&self) -> AgentCounts {
        let agents = (self.cell_count() as f64 * self.density).floor() as usize;
        let blue = (agents as f64 * self.blue_ratio).floor() as usize;
        let red = match self.mode {
            Mode::Jump => (agents as f64 * (1.0 - self.blue_ratio)).floor() as usize,
            Mode::Swap => agents - blue,
        };
        AgentCounts { red, blue }
    }

    pub fn validate(&self) -> Result<AgentCounts, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(ConfigError::DensityOutOfRange(self.density));
        }
        if !(0.0..=1.0).contains(&self.blue_ratio) {
            return Err(ConfigError::RatioOutOfRange(self.blue_ratio));
        }
        if !self.mode.is_enabled() {
            return Err(ConfigError::ProtocolDisabled(self.mode));
        }
        let counts = self.agent_counts();
        check_population(self.mode, counts.total(), self.cell_count())?;
        Ok(counts)
    }

    pub fn topology(&self) -> Topology {
        self.topology.topology(self.width, self.height)
    }
}

/// Jump needs a vacancy; swap needs a full grid.
pub(crate) fn check_population(mode: Mode, agents: usize, cells: usize) -> Result<(), ConfigError> {
    match mode {
        Mode::Jump if agents >= cells => Err(ConfigError::TooManyAgents { agents, cells }),
        Mode::Swap if agents != cells => Err(ConfigError::IncompleteCover { agents, cells }),
        _ => Ok(()),
    }
}

/// Data form of `UtilityFunction`, for config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UtilitySpec {
    SinglePeaked { peak: f64 },
    Threshold { tau: f64 },
    ThresholdNoFullSegregation { tau: f64 },
    Trapezoidal { left: f64, right: f64 },
    Rectangular { left: f64, right: f64 },
    CentralRectangular { size: f64 },
    Custom { expr: String },
}

impl Default for UtilitySpec {
    fn default() -> Self {
        UtilitySpec::SinglePeaked { peak: 0.5 }
    }
}

impl UtilitySpec {
    pub fn build(&self) -> Result<UtilityFunction, ConfigError> {
        let u = match self {
            UtilitySpec::SinglePeaked { peak } => UtilityFunction::SinglePeaked { peak: *peak },
            UtilitySpec::Threshold { tau } => UtilityFunction::Threshold { tau: *tau },
            UtilitySpec::ThresholdNoFullSegregation { tau } => {
                UtilityFunction::ThresholdNoFullSegregation { tau: *tau }
            }
            UtilitySpec::Trapezoidal { left, right } => UtilityFunction::Trapezoidal {
                left: *left,
                right: *right,
            },
            UtilitySpec::Rectangular { left, right } => UtilityFunction::Rectangular {
                left: *left,
                right: *right,
            },
            UtilitySpec::CentralRectangular { size } => UtilityFunction::CentralRectangular { size: *size },
            UtilitySpec::Custom { expr } => UtilityFunction::expression(expr),
        };
        u.validate()?;
        Ok(u)
    }
}
