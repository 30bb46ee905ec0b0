use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::sampler::Sampler;
use super::space::{Configuration, SearchSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialState {
    Complete,
    /// The objective raised; the trial scores `+inf`.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub config: Configuration,
    pub score: f64,
    pub state: TrialState,
}

impl Trial {
    pub fn is_complete(&self) -> bool {
        self.state == TrialState::Complete
    }
}

/// Accumulated trials and the index of the running best.
///
/// Samplers only read it; the engine appends one trial per evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialHistory {
    trials: Vec<Trial>,
    best: Option<usize>,
}

impl TrialHistory {
    pub fn new() -> Self {
        TrialHistory::default()
    }

    /// Append an outcome. Errors and non-finite scores become failed trials.
    pub fn record<E: fmt::Display>(&mut self, config: Configuration, outcome: Result<f64, E>) -> &Trial {
        let number = self.trials.len();
        let (score, state) = match outcome {
            Ok(score) if score.is_finite() => (score, TrialState::Complete),
            Ok(score) => (f64::INFINITY, TrialState::Failed(format!("non-finite score {}", score))),
            Err(e) => (f64::INFINITY, TrialState::Failed(e.to_string())),
        };

        let improves = state == TrialState::Complete
            && self.best.map_or(true, |b| score < self.trials[b].score);
        if improves {
            self.best = Some(number);
        }
        self.trials.push(Trial { number, config, score, state });
        &self.trials[number]
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn completed(&self) -> impl Iterator<Item = &Trial> + '_ {
        self.trials.iter().filter(|t| t.is_complete())
    }

    pub fn n_failed(&self) -> usize {
        self.trials.len() - self.completed().count()
    }

    /// Lowest-scoring complete trial; `None` if every trial failed.
    pub fn best(&self) -> Option<&Trial> {
        self.best.map(|b| &self.trials[b])
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// Something that scores a configuration. Lower is better.
pub trait Objective {
    type Error: fmt::Display;

    fn evaluate(&mut self, config: &Configuration) -> Result<f64, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Proposing,
    Evaluating(Configuration),
    Converged,
}

/// Drives a sampler against an objective for a fixed trial budget.
pub struct SearchEngine<S: Sampler> {
    space: SearchSpace,
    sampler: S,
    n_trials: usize,
    state: SearchState,
}

impl<S: Sampler> SearchEngine<S> {
    pub fn new(space: SearchSpace, sampler: S, n_trials: usize) -> Self {
        SearchEngine {
            space,
            sampler,
            n_trials,
            state: SearchState::Proposing,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Advance the state machine by one transition.
    pub fn step<O: Objective>(&mut self, objective: &mut O, history: &mut TrialHistory) -> &SearchState {
        self.state = match std::mem::replace(&mut self.state, SearchState::Converged) {
            SearchState::Proposing if history.len() >= self.n_trials => SearchState::Converged,
            SearchState::Proposing => {
                let config = self.sampler.sample(&self.space, history);
                debug!(trial = history.len(), ?config, "proposed configuration");
                SearchState::Evaluating(config)
            }
            SearchState::Evaluating(config) => {
                let outcome = objective.evaluate(&config);
                let trial = history.record(config, outcome);
                match &trial.state {
                    TrialState::Complete => info!(trial = trial.number, score = trial.score, "trial complete"),
                    TrialState::Failed(reason) => warn!(trial = trial.number, %reason, "trial failed"),
                }
                if history.len() >= self.n_trials {
                    SearchState::Converged
                } else {
                    SearchState::Proposing
                }
            }
            SearchState::Converged => SearchState::Converged,
        };
        &self.state
    }

    /// Run the whole budget into `history` and return it.
    pub fn run<O: Objective>(&mut self, objective: &mut O, mut history: TrialHistory) -> TrialHistory {
        while self.state != SearchState::Converged {
            self.step(objective, &mut history);
        }
        match history.best() {
            Some(best) => info!(trial = best.number, score = best.score, "search converged"),
            None => warn!(trials = history.len(), "search converged without a complete trial"),
        }
        history
    }
}
