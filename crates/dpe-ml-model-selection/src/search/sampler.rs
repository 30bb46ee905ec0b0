use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::space::{Configuration, Distribution, SearchSpace};
use super::study::{Trial, TrialHistory};

/// Proposes the next configuration to evaluate.
pub trait Sampler: Send {
    fn sample(&mut self, space: &SearchSpace, history: &TrialHistory) -> Configuration;
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Uniform draws over the declared ranges, ignoring history.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        RandomSampler { rng: seeded(seed) }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, space: &SearchSpace, _history: &TrialHistory) -> Configuration {
        space.sample(&mut self.rng)
    }
}

/// Tree-structured Parzen Estimator.
///
/// After `n_startup_trials` complete trials, the history is split into the
/// best `gamma` share ("good") and the rest ("bad"). Each parameter gets a
/// Parzen mixture `l(x)` over good observations and `g(x)` over bad ones, in
/// the parameter's internal coordinate. `n_candidates` draws from `l` are
/// scored by `l(x) / g(x)` and the best one is proposed. Parameters are
/// treated independently.
#[derive(Debug, Clone)]
pub struct TpeSampler {
    rng: StdRng,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
}

impl TpeSampler {
    pub fn new(seed: Option<u64>) -> Self {
        TpeSampler {
            rng: seeded(seed),
            n_startup_trials: 4,
            gamma: 0.25,
            n_candidates: 24,
        }
    }

    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(f64::EPSILON, 1.0);
        self
    }

    pub fn with_n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    fn suggest(&mut self, dist: &Distribution, good: &[f64], bad: &[f64]) -> f64 {
        let (lo, hi) = dist.internal_bounds();
        let l = Parzen::fit(good, lo, hi);
        let g = Parzen::fit(bad, lo, hi);

        let mut best = l.sample(&mut self.rng);
        let mut best_ratio = l.log_pdf(best) - g.log_pdf(best);
        for _ in 1..self.n_candidates {
            let x = l.sample(&mut self.rng);
            let ratio = l.log_pdf(x) - g.log_pdf(x);
            if ratio > best_ratio {
                best = x;
                best_ratio = ratio;
            }
        }
        best
    }
}

impl Sampler for TpeSampler {
    fn sample(&mut self, space: &SearchSpace, history: &TrialHistory) -> Configuration {
        let mut completed: Vec<_> = history.completed().collect();
        if completed.len() < self.n_startup_trials.max(1) {
            return space.sample(&mut self.rng);
        }

        completed.sort_by(|a, b| a.score.total_cmp(&b.score));
        let n_good = ((completed.len() as f64 * self.gamma).ceil() as usize).clamp(1, completed.len());
        let (good, bad) = completed.split_at(n_good);

        let mut config = Configuration::new();
        for param in space.params() {
            let internal = |trials: &[&Trial]| -> Vec<f64> {
                trials
                    .iter()
                    .filter_map(|t| t.config.get(&param.name))
                    .map(|&v| param.distribution.to_internal(v))
                    .collect()
            };
            let (good_obs, bad_obs) = (internal(good), internal(bad));
            let u = self.suggest(&param.distribution, &good_obs, &bad_obs);
            config.insert(param.name.clone(), param.distribution.from_internal(u));
        }
        config
    }
}

/// Equal-weight mixture of one Gaussian per observation and a uniform prior
/// over `[lo, hi]`.
struct Parzen {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    lo: f64,
    hi: f64,
}

impl Parzen {
    fn fit(obs: &[f64], lo: f64, hi: f64) -> Self {
        let range = hi - lo;
        let mut mus = obs.to_vec();
        mus.sort_by(f64::total_cmp);

        let n = mus.len();
        let min_sigma = range / (n + 1).min(100) as f64;
        let sigmas = (0..n)
            .map(|i| {
                let left = if i == 0 { mus[i] - lo } else { mus[i] - mus[i - 1] };
                let right = if i + 1 == n { hi - mus[i] } else { mus[i + 1] - mus[i] };
                left.max(right).clamp(min_sigma, range.max(min_sigma))
            })
            .collect();
        Parzen { mus, sigmas, lo, hi }
    }

    fn n_components(&self) -> usize {
        self.mus.len() + 1
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let range = self.hi - self.lo;
        if range <= 0.0 {
            return 0.0;
        }
        let prior = 1.0 / range;
        let kernels: f64 = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .map(|(&mu, &s)| {
                let z = (x - mu) / s;
                (-0.5 * z * z).exp() / (s * (2.0 * PI).sqrt())
            })
            .sum();
        ((kernels + prior) / self.n_components() as f64).max(f64::MIN_POSITIVE).ln()
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.hi <= self.lo {
            return self.lo;
        }
        let k = rng.gen_range(0..self.n_components());
        if k == self.mus.len() {
            return self.lo + rng.gen::<f64>() * (self.hi - self.lo);
        }
        // Box-Muller
        let u1: f64 = rng.gen::<f64>().max(1e-300);
        let u2: f64 = rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        (self.mus[k] + self.sigmas[k] * z).clamp(self.lo, self.hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::space::ParamValue;

    fn history_around(center: f64, n: usize) -> TrialHistory {
        let mut history = TrialHistory::new();
        for i in 0..n {
            let lr = 0.01 + 0.19 * i as f64 / (n - 1) as f64;
            let mut config = Configuration::new();
            config.insert("learning_rate".into(), ParamValue::Float(lr));
            history.record::<String>(config, Ok((lr - center).abs()));
        }
        history
    }

    fn lr_space() -> SearchSpace {
        let mut space = SearchSpace::new();
        space
            .add("learning_rate", Distribution::Uniform { low: 0.01, high: 0.2 })
            .unwrap();
        space
    }

    #[test]
    fn test_random_sampler_is_seeded() {
        let space = SearchSpace::boosting();
        let history = TrialHistory::new();
        let a = RandomSampler::new(Some(9)).sample(&space, &history);
        let b = RandomSampler::new(Some(9)).sample(&space, &history);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tpe_startup_matches_random() {
        let space = SearchSpace::boosting();
        let history = TrialHistory::new();
        let mut tpe = TpeSampler::new(Some(5));
        let mut random = RandomSampler::new(Some(5));
        for _ in 0..3 {
            assert_eq!(tpe.sample(&space, &history), random.sample(&space, &history));
        }
    }

    #[test]
    fn test_tpe_proposals_stay_in_range() {
        let space = SearchSpace::boosting();
        let mut history = TrialHistory::new();
        let mut tpe = TpeSampler::new(Some(11));
        for i in 0..30 {
            let config = tpe.sample(&space, &history);
            assert!(space.contains(&config), "{:?}", config);
            history.record::<String>(config, Ok((i % 7) as f64));
        }
    }

    #[test]
    fn test_tpe_concentrates_near_good_trials() {
        let space = lr_space();
        let history = history_around(0.03, 20);
        let mut tpe = TpeSampler::new(Some(2));

        let proposals: Vec<f64> = (0..50)
            .map(|_| tpe.sample(&space, &history)["learning_rate"].as_f64())
            .collect();
        let mean = proposals.iter().sum::<f64>() / proposals.len() as f64;
        // uniform draws would average 0.105
        assert!(mean < 0.08, "mean proposal {}", mean);
    }

    #[test]
    fn test_parzen_prefers_observations() {
        let p = Parzen::fit(&[0.5], 0.0, 1.0);
        assert!(p.log_pdf(0.5) > p.log_pdf(0.0));
        let empty = Parzen::fit(&[], 0.0, 2.0);
        assert!((empty.log_pdf(1.3) - 0.5f64.ln()).abs() < 1e-12);
    }
}
