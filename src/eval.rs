//! Ranking quality: ROC curves and leave-one-out recovery.

use crate::graph::Graph;
use crate::propagate::{Method, Propagate};
use crate::rank::{rank, RankedList};
use crate::seeds::build_start;
use crate::{Error, Result};
use std::collections::HashSet;
use std::io::Write;
use tracing::debug;

/// ROC points `(fpr[i], tpr[i])`, starting at the origin and ending at `(1, 1)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub positives: usize,
    pub negatives: usize,
}

impl RocCurve {
    /// Area under the curve by the trapezoidal rule.
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }
}

/// ROC curve of `ranked` against `positives`, cutting after every rank.
///
/// Identifiers in `excluded` (typically the seeds that produced the ranking) are
/// skipped entirely. A list with no positive or no negative candidate is a
/// [`Error::DegenerateEvaluation`], since one of the rates is undefined.
pub fn roc_curve(
    ranked: &RankedList,
    positives: &HashSet<String>,
    excluded: &HashSet<String>,
) -> Result<RocCurve> {
    let labels: Vec<bool> = ranked
        .iter()
        .filter(|e| !excluded.contains(&e.id))
        .map(|e| positives.contains(&e.id))
        .collect();
    let p = labels.iter().filter(|&&l| l).count();
    let n = labels.len() - p;
    if p == 0 {
        return Err(Error::DegenerateEvaluation(
            "no positive identifiers among ranked candidates".to_string(),
        ));
    }
    if n == 0 {
        return Err(Error::DegenerateEvaluation(
            "no negative identifiers among ranked candidates".to_string(),
        ));
    }

    let mut fpr = Vec::with_capacity(labels.len() + 1);
    let mut tpr = Vec::with_capacity(labels.len() + 1);
    fpr.push(0.0);
    tpr.push(0.0);
    let (mut tp, mut fp) = (0usize, 0usize);
    for is_pos in labels {
        if is_pos {
            tp += 1;
        } else {
            fp += 1;
        }
        fpr.push(fp as f64 / n as f64);
        tpr.push(tp as f64 / p as f64);
    }
    Ok(RocCurve {
        fpr,
        tpr,
        positives: p,
        negatives: n,
    })
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoldoutOutcome {
    pub held_out: String,
    /// 1-based rank among candidates (all nodes except the remaining seeds).
    pub rank: usize,
    pub candidates: usize,
    pub score: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaveOneOutReport {
    /// Short label of the method that produced the outcomes (`rwr`, `ppr`, `dk`).
    pub method: String,
    pub outcomes: Vec<HoldoutOutcome>,
}

impl LeaveOneOutReport {
    pub fn mean_rank(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| o.rank as f64).sum::<f64>() / self.outcomes.len() as f64
    }

    pub fn mean_reciprocal_rank(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| 1.0 / o.rank as f64).sum::<f64>()
            / self.outcomes.len() as f64
    }

    /// How many withheld seeds came back within the top `k` candidates.
    pub fn recovered_within(&self, k: usize) -> usize {
        self.outcomes.iter().filter(|o| o.rank <= k).count()
    }

    /// Tab-separated `held_out rank candidates score` rows plus a summary footer.
    pub fn write_text<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "# method\t{}", self.method)?;
        writeln!(w, "# held_out\trank\tcandidates\tscore")?;
        for o in &self.outcomes {
            writeln!(w, "{}\t{}\t{}\t{}", o.held_out, o.rank, o.candidates, o.score)?;
        }
        writeln!(w, "# mean_rank\t{}", self.mean_rank())?;
        writeln!(w, "# mean_reciprocal_rank\t{}", self.mean_reciprocal_rank())?;
        for k in [1, 10, 50, 100] {
            writeln!(w, "# recovered_within_{k}\t{}", self.recovered_within(k))?;
        }
        w.flush()
    }
}

fn holdout(
    graph: &Graph,
    seeds: &[String],
    held: usize,
    method: &Method,
) -> Result<HoldoutOutcome> {
    let remaining: Vec<&str> = seeds
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != held)
        .map(|(_, s)| s.as_str())
        .collect();
    let start = build_start(graph, remaining.as_slice())?;
    let run = method.propagate(graph, &start, None)?;
    let ranked = rank(&run.scores, graph)?;

    let training: HashSet<&str> = remaining.into_iter().collect();
    let target = seeds[held].as_str();
    let mut candidates = 0usize;
    let mut found = None;
    for e in ranked.iter().filter(|e| !training.contains(e.id.as_str())) {
        candidates += 1;
        if found.is_none() && e.id == target {
            found = Some((candidates, e.score));
        }
    }
    let (rank, score) = found.ok_or_else(|| Error::NotFound(target.to_string()))?;
    Ok(HoldoutOutcome {
        held_out: target.to_string(),
        rank,
        candidates,
        score,
        converged: run.converged,
    })
}

/// Withhold each seed in turn, propagate from the rest, and record where the
/// withheld seed lands among non-seed candidates.
///
/// Seeds are de-duplicated first; fewer than two distinct seeds is a
/// [`Error::DegenerateEvaluation`]. Unknown seeds fail before any run.
/// PageRank runs use the remaining start vector as prior.
pub fn leave_one_out<S: AsRef<str>>(
    graph: &Graph,
    seeds: &[S],
    method: &Method,
) -> Result<LeaveOneOutReport> {
    method.validate()?;
    let full = build_start(graph, seeds)?;
    let distinct: Vec<String> = full
        .seeds()
        .iter()
        .map(|&i| graph.id(i).to_string())
        .collect();
    if distinct.len() < 2 {
        return Err(Error::DegenerateEvaluation(
            "leave-one-out needs at least two distinct seeds".to_string(),
        ));
    }
    debug!(method = method.label(), folds = distinct.len(), "leave-one-out");

    #[cfg(feature = "parallel")]
    let outcomes: Result<Vec<HoldoutOutcome>> = {
        use rayon::prelude::*;
        (0..distinct.len())
            .into_par_iter()
            .map(|i| holdout(graph, &distinct, i, method))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes: Result<Vec<HoldoutOutcome>> = (0..distinct.len())
        .map(|i| holdout(graph, &distinct, i, method))
        .collect();

    Ok(LeaveOneOutReport {
        method: method.label().to_string(),
        outcomes: outcomes?,
    })
}

/// [`leave_one_out`] for each of `methods` on the same graph and seeds.
///
/// Reports keep the order of `methods`; the first failing method aborts the
/// whole batch. With the `parallel` feature the methods run concurrently.
pub fn leave_one_out_all<S: AsRef<str> + Sync>(
    graph: &Graph,
    seeds: &[S],
    methods: &[Method],
) -> Result<Vec<LeaveOneOutReport>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        methods
            .par_iter()
            .map(|m| leave_one_out(graph, seeds, m))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        methods
            .iter()
            .map(|m| leave_one_out(graph, seeds, m))
            .collect()
    }
}
