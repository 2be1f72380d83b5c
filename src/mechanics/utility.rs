//! Utility mechanics: similarity fraction -> real utility, plus the
//! tolerant comparison every improvement test goes through.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::ConfigError;
use crate::mechanics::expr::Formula;
use crate::mechanics::fraction::Fraction;

/// Tolerance below which a utility gain counts as a tie.
pub const EPSILON: f64 = 1e-9;

/// `a` beats `b` by more than `EPSILON`.
#[inline]
pub fn is_greater(a: f64, b: f64) -> bool {
    (a - b) > EPSILON
}

/// Injected evaluator for `Custom`; `None` means "could not evaluate".
pub type Evaluator = Arc<dyn Fn(f64) -> Option<f64> + Send + Sync>;

/// A caller-supplied utility that never fails past its boundary: a `None`
/// or NaN from the evaluator reads as 0.0.
#[derive(Clone)]
pub struct CustomUtility {
    source: Option<String>,
    eval: Evaluator,
}

impl CustomUtility {
    pub fn from_fn(f: impl Fn(f64) -> Option<f64> + Send + Sync + 'static) -> Self {
        Self {
            source: None,
            eval: Arc::new(f),
        }
    }

    /// Compile a formula over `frac`. A formula that does not compile still
    /// yields a utility; it scores every fraction as 0.0.
    pub fn from_expression(source: &str) -> Self {
        let eval: Evaluator = match Formula::parse(source) {
            Ok(formula) => Arc::new(move |frac| formula.eval(frac).ok()),
            Err(err) => {
                warn!(formula = source, %err, "custom utility does not compile; it will score 0.0");
                Arc::new(|_| None)
            }
        };
        Self {
            source: Some(source.to_owned()),
            eval,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[inline]
    pub fn call(&self, frac: f64) -> f64 {
        match (self.eval)(frac) {
            Some(v) if !v.is_nan() => v,
            _ => 0.0,
        }
    }
}

impl fmt::Debug for CustomUtility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomUtility")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// The utility variants. Parameters are fractions in `[0, 1]`.
#[derive(Clone, Debug)]
pub enum UtilityFunction {
    /// Tent with its peak (utility 1) at `peak`.
    SinglePeaked { peak: f64 },
    /// `min(f, tau)`.
    Threshold { tau: f64 },
    /// `min(f, tau)`, except a fully homogeneous neighborhood scores 0.
    ThresholdNoFullSegregation { tau: f64 },
    /// 0 at f=0, up to 1 at `left`, flat to `right`, down to 0 at f=1.
    Trapezoidal { left: f64, right: f64 },
    /// 1 on `[left, right]`, else 0.
    Rectangular { left: f64, right: f64 },
    /// `Rectangular` of width `size` centered on 0.5.
    CentralRectangular { size: f64 },
    Custom(CustomUtility),
}

impl Default for UtilityFunction {
    fn default() -> Self {
        UtilityFunction::SinglePeaked { peak: 0.5 }
    }
}

fn unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

impl UtilityFunction {
    pub fn custom(f: impl Fn(f64) -> Option<f64> + Send + Sync + 'static) -> Self {
        UtilityFunction::Custom(CustomUtility::from_fn(f))
    }

    pub fn expression(source: &str) -> Self {
        UtilityFunction::Custom(CustomUtility::from_expression(source))
    }

    /// Check parameter domains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use UtilityFunction::*;
        match *self {
            SinglePeaked { peak } if !(peak > 0.0 && peak < 1.0) => {
                Err(ConfigError::InvalidUtility("peak must lie strictly inside (0, 1)"))
            }
            Threshold { tau } | ThresholdNoFullSegregation { tau } if !unit(tau) => {
                Err(ConfigError::InvalidUtility("tau must lie in [0, 1]"))
            }
            Trapezoidal { left, right } | Rectangular { left, right }
                if !(unit(left) && unit(right) && left <= right) =>
            {
                Err(ConfigError::InvalidUtility("band needs 0 <= left <= right <= 1"))
            }
            CentralRectangular { size } if !unit(size) => {
                Err(ConfigError::InvalidUtility("band size must lie in [0, 1]"))
            }
            _ => Ok(()),
        }
    }

    /// Utility of a neighborhood with similarity `f`.
    pub fn evaluate(&self, f: Fraction) -> f64 {
        use UtilityFunction::*;
        let x = f.to_f64();
        match self {
            SinglePeaked { peak } => {
                if x <= *peak {
                    x / peak
                } else {
                    (1.0 - x) / (1.0 - peak)
                }
            }
            Threshold { tau } => x.min(*tau),
            ThresholdNoFullSegregation { tau } => {
                if f.is_one() {
                    0.0
                } else {
                    x.min(*tau)
                }
            }
            Trapezoidal { left, right } => {
                if x < *left {
                    x / left
                } else if x <= *right {
                    1.0
                } else {
                    (1.0 - x) / (1.0 - right)
                }
            }
            Rectangular { left, right } => band(f, *left, *right),
            CentralRectangular { size } => band(f, 0.5 - size / 2.0, 0.5 + size / 2.0),
            Custom(c) => c.call(x),
        }
    }

    pub fn peak(&self) -> Option<f64> {
        match self {
            UtilityFunction::SinglePeaked { peak } => Some(*peak),
            _ => None,
        }
    }

    pub fn tau(&self) -> Option<f64> {
        match self {
            UtilityFunction::Threshold { tau } | UtilityFunction::ThresholdNoFullSegregation { tau } => Some(*tau),
            _ => None,
        }
    }

    /// Retune the peak in place. Returns whether anything changed.
    pub fn set_peak(&mut self, value: f64) -> bool {
        match self {
            UtilityFunction::SinglePeaked { peak } if *peak != value => {
                *peak = value;
                true
            }
            _ => false,
        }
    }

    /// Retune tau in place. Returns whether anything changed.
    pub fn set_tau(&mut self, value: f64) -> bool {
        match self {
            UtilityFunction::Threshold { tau } | UtilityFunction::ThresholdNoFullSegregation { tau }
                if *tau != value =>
            {
                *tau = value;
                true
            }
            _ => false,
        }
    }
}

/// Closed band test on the exact fraction, so a bound like 0.6 (stored just
/// below 3/5) does not admit 3/5.
#[inline]
fn band(f: Fraction, left: f64, right: f64) -> f64 {
    if f >= left && f <= right { 1.0 } else { 0.0 }
}
