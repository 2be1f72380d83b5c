use thiserror::Error;

use crate::session::Mode;

/// Errors raised while configuring a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("grid dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    /// Agent density outside `[0, 1]`.
    #[error("agent density must lie in [0, 1], got {0}")]
    DensityOutOfRange(f64),

    /// Blue share outside `[0, 1]`.
    #[error("blue agent ratio must lie in [0, 1], got {0}")]
    RatioOutOfRange(f64),

    /// Jump needs at least one vacant cell.
    #[error("jump mode needs an empty cell: {agents} agents on {cells} cells")]
    TooManyAgents { agents: usize, cells: usize },

    /// Swap needs every cell occupied.
    #[error("swap mode needs every cell occupied: {agents} agents on {cells} cells")]
    IncompleteCover { agents: usize, cells: usize },

    /// A utility parameter is outside its domain.
    #[error("invalid utility parameter: {0}")]
    InvalidUtility(&'static str),

    /// The protocol for this mode was compiled out.
    #[error("relocation protocol {0:?} is not enabled in this build")]
    ProtocolDisabled(Mode),
}
