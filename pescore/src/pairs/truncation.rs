use crate::Error;

/// Possible ways of bringing a pair potential to zero at the cutoff. The
/// truncation function `f(r)` multiplies the pair energy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum Truncation {
    /// Step function, 1 if `r < cutoff` and 0 if `r >= cutoff`
    Hard {},
    /// Cubic switching function over the last `width` before the cutoff,
    /// `f(r) = 1 - 3u² + 2u³` with `u = (r - cutoff + width) / width`
    Switch3 {
        width: f64,
    },
    /// Shifted cosine switching function
    /// `f(r) = 1/2 * (1 + cos(π (r - cutoff + width) / width ))`
    ShiftedCosine {
        width: f64,
    },
    /// Smooth truncation going to zero with all its derivatives,
    /// `f(r) = exp(tau / (r - cutoff))`
    Hammer {
        tau: f64,
    },
}

impl Default for Truncation {
    fn default() -> Truncation {
        Truncation::Hard {}
    }
}

impl Truncation {
    /// Check the parameters of this truncation function against the `cutoff`
    pub fn validate(&self, cutoff: f64) -> Result<(), Error> {
        match *self {
            Truncation::Hard {} => {},
            Truncation::Switch3 { width } | Truncation::ShiftedCosine { width } => {
                if !(width > 0.0 && width <= cutoff) {
                    return Err(Error::InvalidParameter(format!(
                        "expected width between 0 and the cutoff ({}) for truncation function, got {}",
                        cutoff, width
                    )));
                }
            }
            Truncation::Hammer { tau } => {
                if !(tau > 0.0 && tau.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "expected positive tau for Hammer truncation function, got {}",
                        tau
                    )));
                }
            }
        }
        return Ok(());
    }

    /// Evaluate the truncation function and its derivative at the distance
    /// `r` for the given `cutoff`
    pub fn compute(&self, r: f64, cutoff: f64) -> (f64, f64) {
        if r >= cutoff {
            return (0.0, 0.0);
        }

        match *self {
            Truncation::Hard {} => (1.0, 0.0),
            Truncation::Switch3 { width } => {
                if r <= (cutoff - width) {
                    (1.0, 0.0)
                } else {
                    let u = (r - cutoff + width) / width;
                    (1.0 - u * u * (3.0 - 2.0 * u), 6.0 * u * (u - 1.0) / width)
                }
            }
            Truncation::ShiftedCosine { width } => {
                if r <= (cutoff - width) {
                    (1.0, 0.0)
                } else {
                    let s = std::f64::consts::PI * (r - cutoff + width) / width;
                    let value = 0.5 * (1.0 + f64::cos(s));
                    let derivative = -0.5 * std::f64::consts::PI * f64::sin(s) / width;
                    (value, derivative)
                }
            }
            Truncation::Hammer { tau } => {
                let x = r - cutoff;
                let value = f64::exp(tau / x);
                (value, -value * tau / (x * x))
            }
        }
    }
}
