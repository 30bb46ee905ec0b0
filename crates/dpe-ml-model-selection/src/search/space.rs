use std::collections::BTreeMap;
use std::fmt;

use dpe_ml_core::{MatrixError, MatrixResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A sampled hyperparameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ParamValue::Int(v) => Some(v),
            ParamValue::Float(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{:.5}", v),
        }
    }
}

/// Parameter name to value.
pub type Configuration = BTreeMap<String, ParamValue>;

/// Range a parameter is drawn from.
///
/// Each distribution maps onto a continuous internal interval: the step index
/// for stepped integers, the value for plain ranges and its logarithm for
/// log-uniform ranges. Samplers work in that interval and map back with
/// [`Distribution::from_internal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// `low, low + step, ..., high`.
    IntStep { low: i64, high: i64, step: i64 },
    /// Every integer in `[low, high]`.
    Int { low: i64, high: i64 },
    Uniform { low: f64, high: f64 },
    LogUniform { low: f64, high: f64 },
}

impl Distribution {
    fn n_steps(low: i64, high: i64, step: i64) -> i64 {
        (high - low) / step
    }

    pub fn validate(&self) -> MatrixResult<()> {
        let ok = match *self {
            Distribution::IntStep { low, high, step } => step > 0 && low <= high,
            Distribution::Int { low, high } => low <= high,
            Distribution::Uniform { low, high } => low.is_finite() && high.is_finite() && low <= high,
            Distribution::LogUniform { low, high } => low > 0.0 && high.is_finite() && low <= high,
        };
        if ok {
            Ok(())
        } else {
            Err(MatrixError::invalid_parameter("distribution", format!("{:?} is empty", self)))
        }
    }

    pub fn internal_bounds(&self) -> (f64, f64) {
        match *self {
            Distribution::IntStep { low, high, step } => (-0.5, Self::n_steps(low, high, step) as f64 + 0.5),
            Distribution::Int { low, high } => (low as f64 - 0.5, high as f64 + 0.5),
            Distribution::Uniform { low, high } => (low, high),
            Distribution::LogUniform { low, high } => (low.ln(), high.ln()),
        }
    }

    pub fn to_internal(&self, value: ParamValue) -> f64 {
        let v = value.as_f64();
        match *self {
            Distribution::IntStep { low, step, .. } => (v - low as f64) / step as f64,
            Distribution::Int { .. } | Distribution::Uniform { .. } => v,
            Distribution::LogUniform { .. } => v.ln(),
        }
    }

    /// Map an internal coordinate back to a value inside the range.
    pub fn from_internal(&self, u: f64) -> ParamValue {
        match *self {
            Distribution::IntStep { low, high, step } => {
                let idx = (u.round() as i64).clamp(0, Self::n_steps(low, high, step));
                ParamValue::Int(low + idx * step)
            }
            Distribution::Int { low, high } => ParamValue::Int((u.round() as i64).clamp(low, high)),
            Distribution::Uniform { low, high } => ParamValue::Float(u.clamp(low, high)),
            Distribution::LogUniform { low, high } => ParamValue::Float(u.exp().clamp(low, high)),
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParamValue {
        let (lo, hi) = self.internal_bounds();
        self.from_internal(lo + rng.gen::<f64>() * (hi - lo))
    }

    pub fn contains(&self, value: ParamValue) -> bool {
        match (*self, value) {
            (Distribution::IntStep { low, high, step }, ParamValue::Int(v)) => {
                v >= low && v <= high && (v - low) % step == 0
            }
            (Distribution::Int { low, high }, ParamValue::Int(v)) => v >= low && v <= high,
            (Distribution::Uniform { low, high }, ParamValue::Float(v))
            | (Distribution::LogUniform { low, high }, ParamValue::Float(v)) => v >= low && v <= high,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub distribution: Distribution,
}

/// Ordered set of named parameter ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    params: Vec<Parameter>,
}

impl SearchSpace {
    pub fn new() -> Self {
        SearchSpace { params: Vec::new() }
    }

    /// Ranges searched for the boosted regressor.
    pub fn boosting() -> Self {
        let params = [
            ("n_estimators", Distribution::IntStep { low: 100, high: 1000, step: 100 }),
            ("max_depth", Distribution::Int { low: 3, high: 12 }),
            ("learning_rate", Distribution::LogUniform { low: 0.01, high: 0.2 }),
            ("subsample", Distribution::Uniform { low: 0.6, high: 1.0 }),
            ("colsample_bytree", Distribution::Uniform { low: 0.6, high: 1.0 }),
            ("reg_lambda", Distribution::LogUniform { low: 1e-3, high: 10.0 }),
            ("reg_alpha", Distribution::LogUniform { low: 1e-3, high: 10.0 }),
        ];
        SearchSpace {
            params: params
                .into_iter()
                .map(|(name, distribution)| Parameter { name: name.to_string(), distribution })
                .collect(),
        }
    }

    pub fn add(&mut self, name: impl Into<String>, distribution: Distribution) -> MatrixResult<()> {
        let name = name.into();
        distribution.validate()?;
        if self.params.iter().any(|p| p.name == name) {
            return Err(MatrixError::invalid_parameter(&name, "declared twice"));
        }
        self.params.push(Parameter { name, distribution });
        Ok(())
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Draw every parameter independently and uniformly over its range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Configuration {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.distribution.sample(rng)))
            .collect()
    }

    pub fn contains(&self, config: &Configuration) -> bool {
        config.len() == self.params.len()
            && self
                .params
                .iter()
                .all(|p| config.get(&p.name).map_or(false, |&v| p.distribution.contains(v)))
    }
}
