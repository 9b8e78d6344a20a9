//! Run configuration read from TOML.
//!
//! Every section is optional; missing keys take the library defaults.
//!
//! ```toml
//! [load]
//! header = "auto"        # auto | present | absent
//! default_weight = 1.0
//! min_weight = 400.0
//!
//! [convergence]
//! max_iterations = 100
//! tolerance = 1e-6
//! time_budget_ms = 60000
//!
//! [diffusion]
//! truncation = 1e-12
//! max_terms = 64
//! max_substeps = 10000
//! ```

use crate::diffusion::DiffusionKernel;
use crate::graph::LoadOptions;
use crate::ppr::PersonalizedPageRank;
use crate::propagate::{ConvergenceConfig, Method, Propagate};
use crate::rwr::RandomWalkWithRestart;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionSettings {
    pub truncation: f64,
    pub max_terms: usize,
    pub max_substeps: usize,
}

impl Default for DiffusionSettings {
    fn default() -> Self {
        let k = DiffusionKernel::new(0.0);
        Self {
            truncation: k.truncation,
            max_terms: k.max_terms,
            max_substeps: k.max_substeps,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub load: LoadOptions,
    pub convergence: ConvergenceConfig,
    pub diffusion: DiffusionSettings,
}

impl RunConfig {
    pub fn from_toml_str(text: &str, source_name: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::MalformedInput {
            source_name: source_name.to_string(),
            line: e
                .span()
                .map_or(0, |span| text[..span.start].matches('\n').count() + 1),
            reason: e.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<()> {
        self.load.validate()?;
        self.convergence.validate()?;
        // Range of beta is checked per run; only the series settings here.
        self.diffusion_kernel(0.0).validate()
    }

    pub fn random_walk(&self, restart: f64) -> RandomWalkWithRestart {
        RandomWalkWithRestart::new(restart).with_convergence(self.convergence)
    }

    pub fn pagerank(&self, beta: f64) -> PersonalizedPageRank {
        PersonalizedPageRank::new(beta).with_convergence(self.convergence)
    }

    pub fn diffusion_kernel(&self, beta: f64) -> DiffusionKernel {
        DiffusionKernel {
            beta,
            truncation: self.diffusion.truncation,
            max_terms: self.diffusion.max_terms,
            max_substeps: self.diffusion.max_substeps,
        }
    }

    /// All three methods sharing one numeric parameter, in `rwr, ppr, dk` order.
    pub fn all_methods(&self, parameter: f64) -> [Method; 3] {
        [
            self.random_walk(parameter).into(),
            self.pagerank(parameter).into(),
            self.diffusion_kernel(parameter).into(),
        ]
    }

    /// Build a [`Method`] from its short label (`rwr`, `ppr`, `dk`).
    pub fn method(&self, label: &str, parameter: f64) -> Result<Method> {
        match label {
            "rwr" => Ok(self.random_walk(parameter).into()),
            "ppr" => Ok(self.pagerank(parameter).into()),
            "dk" => Ok(self.diffusion_kernel(parameter).into()),
            other => Err(Error::InvalidParameter(format!(
                "unknown method {other:?} (expected rwr, ppr or dk)"
            ))),
        }
    }
}
