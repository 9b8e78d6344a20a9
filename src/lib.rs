//! `netprop`: network propagation for ranking candidate nodes against a seed set.
//!
//! Three propagation operators are provided over one immutable weighted graph:
//! random walk with restart ([`rwr`]), personalized PageRank with an optional
//! non-uniform prior ([`ppr`]), and a heat diffusion kernel ([`diffusion`]).
//! Their score vectors are turned into deterministic rankings by [`rank`], which
//! [`eval`] consumes for ROC and leave-one-out analysis.
//!
//! Public invariants (must not drift):
//! - **Node order**: every vector is indexed by node index \(0..n-1\), assigned in
//!   first-appearance order of the edge source.
//! - **Determinism**: identical inputs + configs produce bit-identical scores, with
//!   or without the `parallel` feature.
//! - **No silent coercion**: unknown seeds, out-of-range parameters and malformed
//!   lines are errors; normalization of start/prior vectors is explicit.
//! - **Non-negativity**: every score is finite and `>= 0`.
//!
//! Swappable (allowed to change without breaking the contract):
//! - iteration strategy (serial vs parallel)
//! - series truncation details of the diffusion kernel (so long as tolerance semantics hold)
//! - internal data structures (so long as invariants hold)

#[cfg(feature = "serde")]
pub mod config;
pub mod diffusion;
pub mod eval;
pub mod graph;
pub mod ppr;
pub mod propagate;
pub mod rank;
pub mod rwr;
pub mod seeds;

#[cfg(feature = "serde")]
pub use config::RunConfig;
pub use diffusion::DiffusionKernel;
pub use eval::{
    leave_one_out, leave_one_out_all, roc_curve, HoldoutOutcome, LeaveOneOutReport, RocCurve,
};
pub use graph::{Graph, GraphCache, HeaderPolicy, LoadOptions, MemoryCache};
pub use ppr::PersonalizedPageRank;
pub use propagate::{propagate_all, ConvergenceConfig, Method, Propagate, PropagationRun};
pub use rank::{rank, RankedEntry, RankedList};
pub use rwr::RandomWalkWithRestart;
pub use seeds::{
    build_prior, build_start, read_prior_weights, read_seed_list, PriorVector, StartVector,
};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{source_name}:{line}: {reason}")]
    MalformedInput {
        source_name: String,
        line: usize,
        reason: String,
    },
    #[error("graph has no edges")]
    EmptyGraph,
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("unknown seed identifier(s): {}", identifiers.join(", "))]
    UnknownSeed { identifiers: Vec<String> },
    #[error("seed set is empty")]
    EmptySeedSet,
    #[error("{name} must be in [{min},{max}] (got {value})")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("dimension mismatch: expected {expected} entries, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("degenerate evaluation: {0}")]
    DegenerateEvaluation(String),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject `value` unless it is finite and inside `[min, max]`.
pub(crate) fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::ParameterOutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Map a `csv` failure on `source_name` to the crate error, keeping the line.
pub(crate) fn csv_error(source_name: &str, err: csv::Error) -> Error {
    let line = err.position().map_or(0, |pos| pos.line() as usize);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => Error::Io {
            path: PathBuf::from(source_name),
            source,
        },
        _ => Error::MalformedInput {
            source_name: source_name.to_string(),
            line,
            reason,
        },
    }
}
