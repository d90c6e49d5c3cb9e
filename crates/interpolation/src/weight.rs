//! Distance weight functions for the global kriging system
//!
//! A weight function plays the role of a semivariogram: it is evaluated for
//! every point pair and for every point-to-query distance. Its parameters are
//! fixed inputs; nothing here fits them to the data.

use serde::{Deserialize, Serialize};

use scatterfill_core::{Error, Result};

/// Weight as a function of separation distance `h`.
///
/// All models return 0 at `h = 0`, so the point-pair block has no
/// self-term on its diagonal (zero nugget at the origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum WeightFunction {
    /// γ(h) = c₀ + b·h
    Linear { nugget: f64, slope: f64 },
    /// γ(h) = c₀ + c·[1.5(h/a) − 0.5(h/a)³] for h ≤ a; c₀ + c beyond
    Spherical { nugget: f64, partial_sill: f64, range: f64 },
    /// γ(h) = c₀ + c·[1 − exp(−3h/a)]
    Exponential { nugget: f64, partial_sill: f64, range: f64 },
    /// γ(h) = c₀ + c·[1 − exp(−3h²/a²)]
    Gaussian { nugget: f64, partial_sill: f64, range: f64 },
    /// γ(h) = c₀ + b·h^e, 0 < e < 2
    Power { nugget: f64, scale: f64, exponent: f64 },
}

impl Default for WeightFunction {
    fn default() -> Self {
        WeightFunction::Linear {
            nugget: 0.0,
            slope: 1.0,
        }
    }
}

impl WeightFunction {
    /// Evaluate the function at distance `h`.
    #[inline]
    pub fn evaluate(&self, h: f64) -> f64 {
        if h <= 0.0 {
            return 0.0;
        }

        match *self {
            WeightFunction::Linear { nugget, slope } => nugget + slope * h,
            WeightFunction::Spherical {
                nugget,
                partial_sill,
                range,
            } => {
                if h >= range {
                    nugget + partial_sill
                } else {
                    let hr = h / range;
                    nugget + partial_sill * (1.5 * hr - 0.5 * hr * hr * hr)
                }
            }
            WeightFunction::Exponential {
                nugget,
                partial_sill,
                range,
            } => nugget + partial_sill * (1.0 - (-3.0 * h / range).exp()),
            WeightFunction::Gaussian {
                nugget,
                partial_sill,
                range,
            } => nugget + partial_sill * (1.0 - (-3.0 * h * h / (range * range)).exp()),
            WeightFunction::Power {
                nugget,
                scale,
                exponent,
            } => nugget + scale * h.powf(exponent),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = |name: &'static str, v: f64| {
            if v >= 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(Error::invalid_parameter(name, v, "must be non-negative"))
            }
        };
        let positive = |name: &'static str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(Error::invalid_parameter(name, v, "must be positive"))
            }
        };

        match *self {
            WeightFunction::Linear { nugget, slope } => {
                non_negative("weight.nugget", nugget)?;
                non_negative("weight.slope", slope)
            }
            WeightFunction::Spherical {
                nugget,
                partial_sill,
                range,
            }
            | WeightFunction::Exponential {
                nugget,
                partial_sill,
                range,
            }
            | WeightFunction::Gaussian {
                nugget,
                partial_sill,
                range,
            } => {
                non_negative("weight.nugget", nugget)?;
                positive("weight.partial_sill", partial_sill)?;
                positive("weight.range", range)
            }
            WeightFunction::Power {
                nugget,
                scale,
                exponent,
            } => {
                non_negative("weight.nugget", nugget)?;
                positive("weight.scale", scale)?;
                if exponent > 0.0 && exponent < 2.0 {
                    Ok(())
                } else {
                    Err(Error::invalid_parameter(
                        "weight.exponent",
                        exponent,
                        "must lie in (0, 2)",
                    ))
                }
            }
        }
    }
}
