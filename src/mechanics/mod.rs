pub mod expr;
pub mod fraction;
pub mod stoch;
pub mod topology;
pub mod utility;

pub use expr::*;
pub use fraction::*;
pub use stoch::*;
pub use topology::*;
pub use utility::*;
