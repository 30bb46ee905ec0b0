//! Black-box hyperparameter search.
//!
//! A [`SearchEngine`] alternates between asking a [`Sampler`] for a
//! configuration drawn from a [`SearchSpace`] and scoring it with an
//! [`Objective`]. Every outcome lands in a [`TrialHistory`], which the sampler
//! reads back on the next proposal.

pub mod sampler;
pub mod space;
pub mod study;

pub use sampler::{RandomSampler, Sampler, TpeSampler};
pub use space::{Configuration, Distribution, ParamValue, Parameter, SearchSpace};
pub use study::{Objective, SearchEngine, SearchState, Trial, TrialHistory, TrialState};
