//! Hyperparameter tuning: trial reporting and random search
//!
//! The training module reports one intermediate value per validation epoch and a
//! final value after testing. Reporters decide where those values go: nowhere
//! ([`NoopReporter`]), into a [`Trial`] driven by [`RandomSearch`]
//! ([`TrialReporter`]), or to a JSON-lines file an external tuner can tail
//! ([`JsonlReporter`]).
//!
//! # Example
//!
//! ```
//! use abandono::tuning::{HyperparameterSpace, ParameterDomain, RandomSearch};
//!
//! let mut space = HyperparameterSpace::new();
//! space.add("learning_rate", ParameterDomain::Continuous {
//!     low: 1e-4, high: 1e-1, log_scale: true,
//! });
//!
//! let mut search = RandomSearch::new(space, 42);
//! let trial = search.suggest().unwrap();
//! let lr = trial.config["learning_rate"].as_float().unwrap();
//! assert!((1e-4..=1e-1).contains(&lr));
//! ```

mod reporter;
mod space;

pub use reporter::{
    read_reports, JsonlReporter, NoopReporter, ReportKind, ReportLine, TrialReporter,
    TuningReporter,
};
pub use space::{
    HyperparameterSpace, ParameterDomain, ParameterValue, RandomSearch, Trial, TrialStatus,
};
