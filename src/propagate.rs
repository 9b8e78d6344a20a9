//! Shared propagation interface, convergence policy and the restart fixed-point kernel.

use crate::diffusion::DiffusionKernel;
use crate::graph::Graph;
use crate::ppr::PersonalizedPageRank;
use crate::rwr::RandomWalkWithRestart;
use crate::seeds::{PriorVector, StartVector};
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one propagation.
///
/// `iterations` is the number of update steps performed.
/// `diff_l1` is the final \(L_1\) residual (sum of absolute deltas).
/// `converged == false` is the non-convergence warning: the scores are the last
/// iterate and remain usable as an approximate ranking.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropagationRun {
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub diff_l1: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvergenceConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Wall-clock budget in milliseconds; exhausting it ends the run like the cap.
    pub time_budget_ms: Option<u64>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            time_budget_ms: None,
        }
    }
}

impl ConvergenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "max_iterations must be > 0".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::InvalidParameter(
                "tolerance must be finite and > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn deadline(&self, started: Instant) -> Option<Instant> {
        self.time_budget_ms
            .map(|ms| started + Duration::from_millis(ms))
    }
}

/// One propagation operator: `(graph, start, prior?) -> scores`.
pub trait Propagate {
    fn name(&self) -> &'static str;

    /// Reject out-of-range parameters before any work is done.
    fn validate(&self) -> Result<()>;

    fn propagate(
        &self,
        graph: &Graph,
        start: &StartVector,
        prior: Option<&PriorVector>,
    ) -> Result<PropagationRun>;
}

/// The closed set of propagation methods, chosen once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "method", rename_all = "snake_case"))]
pub enum Method {
    RandomWalkWithRestart(RandomWalkWithRestart),
    PersonalizedPageRank(PersonalizedPageRank),
    DiffusionKernel(DiffusionKernel),
}

impl Method {
    fn inner(&self) -> &dyn Propagate {
        match self {
            Method::RandomWalkWithRestart(m) => m,
            Method::PersonalizedPageRank(m) => m,
            Method::DiffusionKernel(m) => m,
        }
    }

    /// Short label used in file names and logs (`rwr`, `ppr`, `dk`).
    pub fn label(&self) -> &'static str {
        match self {
            Method::RandomWalkWithRestart(_) => "rwr",
            Method::PersonalizedPageRank(_) => "ppr",
            Method::DiffusionKernel(_) => "dk",
        }
    }
}

impl Propagate for Method {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn validate(&self) -> Result<()> {
        self.inner().validate()
    }

    fn propagate(
        &self,
        graph: &Graph,
        start: &StartVector,
        prior: Option<&PriorVector>,
    ) -> Result<PropagationRun> {
        self.inner().propagate(graph, start, prior)
    }
}

impl From<RandomWalkWithRestart> for Method {
    fn from(m: RandomWalkWithRestart) -> Self {
        Method::RandomWalkWithRestart(m)
    }
}

impl From<PersonalizedPageRank> for Method {
    fn from(m: PersonalizedPageRank) -> Self {
        Method::PersonalizedPageRank(m)
    }
}

impl From<DiffusionKernel> for Method {
    fn from(m: DiffusionKernel) -> Self {
        Method::DiffusionKernel(m)
    }
}

/// Run several methods on one shared graph. With the `parallel` feature the
/// methods run concurrently; results keep the order of `methods`.
pub fn propagate_all(
    graph: &Graph,
    methods: &[Method],
    start: &StartVector,
    prior: Option<&PriorVector>,
) -> Vec<Result<PropagationRun>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        methods
            .par_iter()
            .map(|m| m.propagate(graph, start, prior))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        methods
            .iter()
            .map(|m| m.propagate(graph, start, prior))
            .collect()
    }
}

pub(crate) fn check_len(graph: &Graph, actual: usize) -> Result<()> {
    let expected = graph.node_count();
    if actual != expected {
        return Err(Error::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Iterate `p <- (1 - alpha) T^T p + alpha q` from `p_0 = q`.
///
/// Callers validate `alpha`, `config` and `q.len()`.
pub(crate) fn restart_iteration(
    name: &'static str,
    graph: &Graph,
    restart: &[f64],
    alpha: f64,
    config: &ConvergenceConfig,
) -> PropagationRun {
    let n = graph.node_count();
    let started = Instant::now();
    let deadline = config.deadline(started);

    let mut scores = restart.to_vec();
    let mut spread = vec![0.0; n];

    let mut iters = 0usize;
    let mut last_diff = f64::INFINITY;
    let mut converged = false;
    for _ in 0..config.max_iterations {
        iters += 1;
        graph.spread(&scores, &mut spread);
        let mut diff = 0.0;
        for ((s, &walked), &q) in scores.iter_mut().zip(&spread).zip(restart) {
            let next = (1.0 - alpha) * walked + alpha * q;
            diff += (next - *s).abs();
            *s = next;
        }
        last_diff = diff;
        if diff < config.tolerance {
            converged = true;
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(method = name, iterations = iters, "time budget exhausted");
            break;
        }
    }

    if converged {
        debug!(
            method = name,
            iterations = iters,
            diff_l1 = last_diff,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "propagation converged"
        );
    } else {
        warn!(
            method = name,
            iterations = iters,
            diff_l1 = last_diff,
            tolerance = config.tolerance,
            "propagation did not converge; returning last iterate"
        );
    }
    PropagationRun {
        scores,
        iterations: iters,
        diff_l1: last_diff,
        converged,
    }
}
