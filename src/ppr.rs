//! Personalized PageRank with a restart prior.
//!
//! \[
//!   p_{t+1} = (1 - \beta)\, T^\top p_t + \beta\, q, \qquad p_0 = q
//! \]
//!
//! The only difference from [`crate::rwr`] is the restart target: `q` is the
//! [`PriorVector`] when one is given, otherwise the start vector itself.

use crate::graph::Graph;
use crate::propagate::{check_len, restart_iteration, ConvergenceConfig, Propagate, PropagationRun};
use crate::seeds::{PriorVector, StartVector};
use crate::{check_range, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersonalizedPageRank {
    /// Restart probability in `[0, 1]`.
    pub beta: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub convergence: ConvergenceConfig,
}

impl PersonalizedPageRank {
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            convergence: ConvergenceConfig::default(),
        }
    }

    pub fn with_convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.convergence = convergence;
        self
    }

    /// Run with an explicit restart distribution.
    pub fn run(&self, graph: &Graph, prior: &PriorVector) -> Result<PropagationRun> {
        self.validate()?;
        check_len(graph, prior.len())?;
        for &x in prior.as_slice() {
            if !x.is_finite() || x < 0.0 {
                return Err(Error::InvalidParameter(
                    "prior entries must be finite and non-negative".to_string(),
                ));
            }
        }
        Ok(restart_iteration(
            self.name(),
            graph,
            prior.as_slice(),
            self.beta,
            &self.convergence,
        ))
    }
}

impl Propagate for PersonalizedPageRank {
    fn name(&self) -> &'static str {
        "personalized_pagerank"
    }

    fn validate(&self) -> Result<()> {
        check_range("beta", self.beta, 0.0, 1.0)?;
        self.convergence.validate()
    }

    fn propagate(
        &self,
        graph: &Graph,
        start: &StartVector,
        prior: Option<&PriorVector>,
    ) -> Result<PropagationRun> {
        check_len(graph, start.len())?;
        match prior {
            Some(q) => self.run(graph, q),
            None => self.run(graph, &PriorVector::from(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rwr::RandomWalkWithRestart;
    use crate::seeds::{build_prior, build_start};

    fn graph() -> Graph {
        Graph::from_edges([
            ("a", "b", 1.0),
            ("b", "c", 2.0),
            ("c", "a", 0.5),
            ("c", "d", 1.0),
            ("d", "e", 3.0),
        ])
        .unwrap()
    }

    #[test]
    fn missing_prior_reduces_to_random_walk_with_restart() {
        let g = graph();
        let s = build_start(&g, &["a", "d"]).unwrap();
        let ppr = PersonalizedPageRank::new(0.4).propagate(&g, &s, None).unwrap();
        let rwr = RandomWalkWithRestart::new(0.4).run(&g, &s).unwrap();
        for (x, y) in ppr.scores.iter().zip(&rwr.scores) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn prior_biases_toward_heavier_seed() {
        let g = graph();
        let s = build_start(&g, &["a", "e"]).unwrap();
        let q = build_prior(&g, &[("a", 9.0), ("e", 1.0)], &s).unwrap();
        let biased = PersonalizedPageRank::new(0.5).run(&g, &q).unwrap();
        let a = g.index_of("a").unwrap();
        let e = g.index_of("e").unwrap();
        assert!(biased.scores[a] > biased.scores[e]);

        let uniform = PersonalizedPageRank::new(0.5).propagate(&g, &s, None).unwrap();
        assert!(biased.scores[a] > uniform.scores[a]);
    }

    #[test]
    fn scores_remain_a_distribution() {
        let g = graph();
        let s = build_start(&g, &["b"]).unwrap();
        let run = PersonalizedPageRank::new(0.15).propagate(&g, &s, None).unwrap();
        assert!(run.converged);
        let total: f64 = run.scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "sum={total}");
        assert!(run.scores.iter().all(|x| *x >= 0.0));
    }

    #[test]
    fn rejects_wrong_len_prior() {
        let g = graph();
        let other = Graph::from_edges([("a", "b", 1.0)]).unwrap();
        let s = build_start(&other, &["a"]).unwrap();
        let q = PriorVector::from(&s);
        let err = PersonalizedPageRank::new(0.5).run(&g, &q).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("dimension mismatch"));
    }

    #[test]
    fn rejects_out_of_range_beta() {
        let g = graph();
        let s = build_start(&g, &["a"]).unwrap();
        let err = PersonalizedPageRank::new(1.01).propagate(&g, &s, None).unwrap_err();
        assert!(matches!(err, Error::ParameterOutOfRange { name: "beta", .. }));
    }
}
