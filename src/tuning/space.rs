//! Search spaces, trials and random search

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter value (sampled from domain)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Categorical(String),
}

impl ParameterValue {
    /// Float view; ints widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Categorical(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(*v as i64),
            ParameterValue::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form used when merging into a module configuration
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParameterValue::Float(v) => serde_json::json!(v),
            ParameterValue::Int(v) => serde_json::json!(v),
            ParameterValue::Categorical(s) => serde_json::json!(s),
        }
    }
}

/// Parameter domain (search space)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParameterDomain {
    /// Continuous range [low, high], optionally log-scaled
    Continuous { low: f64, high: f64, log_scale: bool },
    /// Discrete integer range [low, high]
    Discrete { low: i64, high: i64 },
    Categorical { choices: Vec<String> },
}

impl ParameterDomain {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParameterValue {
        match self {
            ParameterDomain::Continuous {
                low,
                high,
                log_scale,
            } => {
                let value = if *log_scale {
                    let (log_low, log_high) = (low.ln(), high.ln());
                    (log_low + rng.random::<f64>() * (log_high - log_low)).exp()
                } else {
                    low + rng.random::<f64>() * (high - low)
                };
                ParameterValue::Float(value.clamp(*low, *high))
            }
            ParameterDomain::Discrete { low, high } => {
                let range = (*high - *low + 1) as usize;
                let offset = (rng.random::<f64>() * range as f64).floor() as i64;
                ParameterValue::Int((*low + offset).min(*high))
            }
            ParameterDomain::Categorical { choices } => {
                let idx = (rng.random::<f64>() * choices.len() as f64).floor() as usize;
                ParameterValue::Categorical(choices[idx.min(choices.len() - 1)].clone())
            }
        }
    }

    pub fn is_valid(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (ParameterDomain::Continuous { low, high, .. }, ParameterValue::Float(v)) => {
                *v >= *low && *v <= *high
            }
            (ParameterDomain::Discrete { low, high }, ParameterValue::Int(v)) => {
                *v >= *low && *v <= *high
            }
            (ParameterDomain::Categorical { choices }, ParameterValue::Categorical(s)) => {
                choices.contains(s)
            }
            _ => false,
        }
    }

    fn check(&self, name: &str) -> Result<()> {
        let ok = match self {
            ParameterDomain::Continuous {
                low,
                high,
                log_scale,
            } => low <= high && (!log_scale || *low > 0.0),
            ParameterDomain::Discrete { low, high } => low <= high,
            ParameterDomain::Categorical { choices } => !choices.is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidParameter(format!(
                "empty or invalid domain for '{name}': {self:?}"
            )))
        }
    }
}

/// Hyperparameter search space.
///
/// Ordered by name so that a seeded sampler draws the same configuration
/// every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HyperparameterSpace {
    params: BTreeMap<String, ParameterDomain>,
}

impl HyperparameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, domain: ParameterDomain) {
        self.params.insert(name.to_string(), domain);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDomain> {
        self.params.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn sample_random<R: Rng>(&self, rng: &mut R) -> BTreeMap<String, ParameterValue> {
        self.params
            .iter()
            .map(|(name, domain)| (name.clone(), domain.sample(rng)))
            .collect()
    }

    pub fn validate(&self, config: &BTreeMap<String, ParameterValue>) -> Result<()> {
        for (name, domain) in &self.params {
            match config.get(name) {
                Some(value) if domain.is_valid(value) => {}
                Some(value) => {
                    return Err(Error::InvalidParameter(format!(
                        "{name}: {value:?} outside {domain:?}"
                    )))
                }
                None => {
                    return Err(Error::InvalidParameter(format!("{name}: missing from trial")))
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A single trial: sampled configuration plus the values reported for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub id: usize,
    pub config: BTreeMap<String, ParameterValue>,
    /// One entry per validation epoch
    pub intermediate: Vec<f64>,
    /// Final objective (lower is better); `None` until completed
    pub score: Option<f64>,
    pub status: TrialStatus,
}

impl Trial {
    pub fn new(id: usize, config: BTreeMap<String, ParameterValue>) -> Self {
        Self {
            id,
            config,
            intermediate: Vec::new(),
            score: None,
            status: TrialStatus::Pending,
        }
    }

    pub fn report_intermediate(&mut self, value: f64) {
        self.intermediate.push(value);
        self.status = TrialStatus::Running;
    }

    pub fn complete(&mut self, score: f64) {
        self.score = Some(score);
        self.status = TrialStatus::Completed;
    }

    pub fn fail(&mut self) {
        self.status = TrialStatus::Failed;
    }
}

/// Uniform random search over a space, seeded for reproducibility
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: HyperparameterSpace,
    rng: StdRng,
    trials: Vec<Trial>,
    next_id: usize,
}

impl RandomSearch {
    pub fn new(space: HyperparameterSpace, seed: u64) -> Self {
        Self {
            space,
            rng: StdRng::seed_from_u64(seed),
            trials: Vec::new(),
            next_id: 0,
        }
    }

    /// Draw the next configuration
    pub fn suggest(&mut self) -> Result<Trial> {
        if self.space.is_empty() {
            return Err(Error::Tuning("empty search space".to_string()));
        }
        for (name, domain) in &self.space.params {
            domain.check(name)?;
        }

        let trial = Trial::new(self.next_id, self.space.sample_random(&mut self.rng));
        self.next_id += 1;
        Ok(trial)
    }

    /// Store a finished (completed or failed) trial
    pub fn record(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Completed trial with the lowest score
    pub fn best_trial(&self) -> Option<&Trial> {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Completed)
            .filter_map(|t| t.score.map(|s| (t, s)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(t, _)| t)
    }
}
