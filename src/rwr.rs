//! Random walk with restart.
//!
//! \[
//!   p_{t+1} = (1 - r)\, T^\top p_t + r\, s, \qquad p_0 = s
//! \]
//!
//! where \(s\) is the uniform start vector over the seeds. `r = 1` returns `s`
//! after one step; `r = 0` is a pure walk and may oscillate on bipartite or
//! disconnected graphs, which surfaces as `converged == false`.

use crate::graph::Graph;
use crate::propagate::{check_len, restart_iteration, ConvergenceConfig, Propagate, PropagationRun};
use crate::seeds::{PriorVector, StartVector};
use crate::{check_range, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RandomWalkWithRestart {
    /// Restart probability in `[0, 1]`.
    pub restart: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub convergence: ConvergenceConfig,
}

impl RandomWalkWithRestart {
    pub fn new(restart: f64) -> Self {
        Self {
            restart,
            convergence: ConvergenceConfig::default(),
        }
    }

    pub fn with_convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.convergence = convergence;
        self
    }

    /// Checked entrypoint without the trait object.
    pub fn run(&self, graph: &Graph, start: &StartVector) -> Result<PropagationRun> {
        self.validate()?;
        check_len(graph, start.len())?;
        Ok(restart_iteration(
            self.name(),
            graph,
            start.as_slice(),
            self.restart,
            &self.convergence,
        ))
    }
}

impl Propagate for RandomWalkWithRestart {
    fn name(&self) -> &'static str {
        "random_walk_with_restart"
    }

    fn validate(&self) -> Result<()> {
        check_range("restart", self.restart, 0.0, 1.0)?;
        self.convergence.validate()
    }

    /// The prior is not used: the walk always restarts to the start vector.
    fn propagate(
        &self,
        graph: &Graph,
        start: &StartVector,
        _prior: Option<&PriorVector>,
    ) -> Result<PropagationRun> {
        self.run(graph, start)
    }
}
