//! Immutable weighted undirected graph in CSR form.
//!
//! Node indices are assigned in first-appearance order of the edge source, so the
//! same file always yields the same index space.
//!
//! Invariants:
//! - at most one stored weight per unordered pair (duplicates collapse to the max weight)
//! - neighbor lists are sorted by neighbor index
//! - a node whose weighted degree is zero keeps its own mass under [`Graph::spread`]
//!   (implicit self-loop), so one transition step conserves total mass

use crate::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// How the first data line of an edge list is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HeaderPolicy {
    /// Header iff the line has three fields and the third is not a number
    /// (STRING's `protein1 protein2 combined_score`).
    #[default]
    Auto,
    /// The first data line is always a header.
    Present,
    /// Every data line is an edge.
    Absent,
}

impl HeaderPolicy {
    fn is_header(self, fields: &[&str]) -> bool {
        match self {
            HeaderPolicy::Present => true,
            HeaderPolicy::Absent => false,
            HeaderPolicy::Auto => fields.len() == 3 && fields[2].parse::<f64>().is_err(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoadOptions {
    pub header: HeaderPolicy,
    /// Weight for lines with only two fields.
    pub default_weight: f64,
    /// Edges lighter than this are dropped before their endpoints are registered.
    pub min_weight: Option<f64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            header: HeaderPolicy::Auto,
            default_weight: 1.0,
            min_weight: None,
        }
    }
}

impl LoadOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.default_weight.is_finite() || self.default_weight < 0.0 {
            return Err(Error::InvalidParameter(
                "default_weight must be finite and >= 0".to_string(),
            ));
        }
        if let Some(m) = self.min_weight {
            if !m.is_finite() {
                return Err(Error::InvalidParameter(
                    "min_weight must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Key -> graph store consulted by [`Graph::load_cached`].
///
/// Keys are source paths only; a cache should be used with one set of
/// [`LoadOptions`].
pub trait GraphCache {
    fn get(&self, key: &Path) -> Option<Arc<Graph>>;
    fn put(&mut self, key: &Path, graph: Arc<Graph>);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<PathBuf, Arc<Graph>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl GraphCache for MemoryCache {
    fn get(&self, key: &Path) -> Option<Arc<Graph>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &Path, graph: Arc<Graph>) {
        self.entries.insert(key.to_path_buf(), graph);
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    offsets: Vec<usize>,
    targets: Vec<usize>,
    weights: Vec<f64>,
    degrees: Vec<f64>,
    inv_degrees: Vec<f64>,
    edge_count: usize,
}

/// Split on any run of whitespace and/or commas.
fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_weight(field: &str) -> std::result::Result<f64, String> {
    let w: f64 = field
        .parse()
        .map_err(|_| format!("weight {field:?} is not a number"))?;
    if !w.is_finite() || w < 0.0 {
        return Err(format!("weight {field:?} must be finite and >= 0"));
    }
    Ok(w)
}

impl Graph {
    /// Read an edge list from disk. See [`Graph::parse`] for the line format.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let graph = Self::parse(BufReader::new(file), &path.display().to_string(), options)?;
        debug!(
            path = %path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded graph"
        );
        Ok(graph)
    }

    /// Like [`Graph::load`], but consults `cache` first and fills it on a miss.
    pub fn load_cached(
        path: impl AsRef<Path>,
        options: &LoadOptions,
        cache: Option<&mut dyn GraphCache>,
    ) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let Some(cache) = cache else {
            return Ok(Arc::new(Self::load(path, options)?));
        };
        if let Some(hit) = cache.get(path) {
            debug!(path = %path.display(), "graph cache hit");
            return Ok(hit);
        }
        let graph = Arc::new(Self::load(path, options)?);
        cache.put(path, Arc::clone(&graph));
        Ok(graph)
    }

    /// Parse `nodeA <sep> nodeB [<sep> weight]` lines.
    ///
    /// `<sep>` is any run of whitespace and/or commas. Blank lines and lines starting
    /// with `#` are skipped; the first data line may be a header per
    /// [`LoadOptions::header`]. Any other unparsable line aborts the load.
    pub fn parse<R: BufRead>(reader: R, source_name: &str, options: &LoadOptions) -> Result<Self> {
        options.validate()?;
        let malformed = |line: usize, reason: String| Error::MalformedInput {
            source_name: source_name.to_string(),
            line,
            reason,
        };

        let mut edges: Vec<(String, String, f64)> = Vec::new();
        let mut first_data_line = true;
        for (i, line) in reader.lines().enumerate() {
            let lineno = i + 1;
            let line = line.map_err(|source| Error::Io {
                path: PathBuf::from(source_name),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields = split_fields(trimmed);
            if std::mem::take(&mut first_data_line) && options.header.is_header(&fields) {
                debug!(source = source_name, line = lineno, "skipping header line");
                continue;
            }
            let weight = match fields.len() {
                2 => options.default_weight,
                3 => parse_weight(fields[2]).map_err(|r| malformed(lineno, r))?,
                n => {
                    return Err(malformed(
                        lineno,
                        format!("expected 2 or 3 fields, found {n}"),
                    ))
                }
            };
            edges.push((fields[0].to_string(), fields[1].to_string(), weight));
        }
        Self::build(edges, options.min_weight)
    }

    /// Build from in-memory `(a, b, weight)` triples.
    pub fn from_edges<I, S>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: AsRef<str>,
    {
        Self::build(edges, None)
    }

    fn build<I, S>(edges: I, min_weight: Option<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut adj: Vec<Vec<(usize, f64)>> = Vec::new();

        let mut intern = |id: &str, adj: &mut Vec<Vec<(usize, f64)>>| -> usize {
            if let Some(&i) = index.get(id) {
                return i;
            }
            let i = ids.len();
            ids.push(id.to_string());
            index.insert(id.to_string(), i);
            adj.push(Vec::new());
            i
        };

        for (a, b, w) in edges {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidParameter(
                    "edge weights must be finite and non-negative".to_string(),
                ));
            }
            if min_weight.is_some_and(|m| w < m) {
                continue;
            }
            let u = intern(a.as_ref(), &mut adj);
            let v = intern(b.as_ref(), &mut adj);
            adj[u].push((v, w));
            if u != v {
                adj[v].push((u, w));
            }
        }
        if ids.is_empty() {
            return Err(Error::EmptyGraph);
        }

        let n = ids.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::new();
        let mut weights = Vec::new();
        let mut degrees = Vec::with_capacity(n);
        let mut edge_count = 0usize;
        offsets.push(0);
        for (u, list) in adj.iter_mut().enumerate() {
            list.sort_by_key(|&(v, _)| v);
            list.dedup_by(|cur, kept| {
                if cur.0 == kept.0 {
                    kept.1 = kept.1.max(cur.1);
                    true
                } else {
                    false
                }
            });
            edge_count += list.iter().filter(|&&(v, _)| v >= u).count();
            degrees.push(list.iter().map(|&(_, w)| w).sum::<f64>());
            targets.extend(list.iter().map(|&(v, _)| v));
            weights.extend(list.iter().map(|&(_, w)| w));
            offsets.push(targets.len());
        }
        let inv_degrees = degrees
            .iter()
            .map(|&d| if d > 0.0 { 1.0 / d } else { 0.0 })
            .collect();

        let dangling = degrees.iter().filter(|&&d| d == 0.0).count();
        if dangling > 0 {
            debug!(dangling, "nodes with zero weighted degree keep their mass");
        }

        Ok(Self {
            ids,
            index,
            offsets,
            targets,
            weights,
            degrees,
            inv_degrees,
            edge_count,
        })
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of distinct unordered pairs (self-loops included).
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn index_of(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifier of node `index`.
    ///
    /// Panics if `index >= node_count()`.
    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// `(neighbors, weights)` of a node, sorted by neighbor index.
    pub fn neighbors(&self, index: usize) -> (&[usize], &[f64]) {
        let range = self.offsets[index]..self.offsets[index + 1];
        (&self.targets[range.clone()], &self.weights[range])
    }

    /// Weighted degree `d(u) = sum_v w(u, v)`.
    pub fn degree(&self, index: usize) -> f64 {
        self.degrees[index]
    }

    pub fn max_degree(&self) -> f64 {
        self.degrees.iter().copied().fold(0.0, f64::max)
    }

    /// Transition probability `P(u -> v) = w(u,v) / d(u)`; the zero-degree
    /// policy makes `P(u -> u) = 1` for dangling nodes.
    #[cfg(test)]
    pub(crate) fn transition(&self, u: usize, v: usize) -> f64 {
        if self.degrees[u] == 0.0 {
            return if u == v { 1.0 } else { 0.0 };
        }
        let (nbrs, wts) = self.neighbors(u);
        match nbrs.binary_search(&v) {
            Ok(k) => wts[k] * self.inv_degrees[u],
            Err(_) => 0.0,
        }
    }

    fn spread_at(&self, p: &[f64], v: usize) -> f64 {
        if self.degrees[v] == 0.0 {
            // Dangling: every neighbor edge has zero weight, so only the self-loop counts.
            return p[v];
        }
        let (nbrs, wts) = self.neighbors(v);
        nbrs.iter()
            .zip(wts)
            .map(|(&u, &w)| p[u] * w * self.inv_degrees[u])
            .sum()
    }

    fn laplacian_at(&self, p: &[f64], v: usize) -> f64 {
        let (nbrs, wts) = self.neighbors(v);
        let adj: f64 = nbrs.iter().zip(wts).map(|(&u, &w)| w * p[u]).sum();
        self.degrees[v] * p[v] - adj
    }

    /// `out = T^T p`: one step of the random walk applied to the distribution `p`.
    ///
    /// Pull-based (each output slot is owned by one node), so the parallel and
    /// serial paths produce identical sums.
    pub fn spread(&self, p: &[f64], out: &mut [f64]) {
        debug_assert_eq!(p.len(), self.node_count());
        debug_assert_eq!(out.len(), self.node_count());
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            out.par_iter_mut()
                .enumerate()
                .for_each(|(v, slot)| *slot = self.spread_at(p, v));
        }
        #[cfg(not(feature = "parallel"))]
        for (v, slot) in out.iter_mut().enumerate() {
            *slot = self.spread_at(p, v);
        }
    }

    /// `out = L p` with `L = D - A`.
    pub fn laplacian_apply(&self, p: &[f64], out: &mut [f64]) {
        debug_assert_eq!(p.len(), self.node_count());
        debug_assert_eq!(out.len(), self.node_count());
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            out.par_iter_mut()
                .enumerate()
                .for_each(|(v, slot)| *slot = self.laplacian_at(p, v));
        }
        #[cfg(not(feature = "parallel"))]
        for (v, slot) in out.iter_mut().enumerate() {
            *slot = self.laplacian_at(p, v);
        }
    }

    /// Connected component labels, contiguous in `0..k` in first-seen order (BFS).
    pub fn components(&self) -> Vec<usize> {
        let n = self.node_count();
        let mut labels = vec![usize::MAX; n];
        let mut queue = std::collections::VecDeque::new();

        let mut comp = 0usize;
        for start in 0..n {
            if labels[start] != usize::MAX {
                continue;
            }
            labels[start] = comp;
            queue.push_back(start);
            while let Some(u) = queue.pop_front() {
                for &v in self.neighbors(u).0 {
                    if labels[v] == usize::MAX {
                        labels[v] = comp;
                        queue.push_back(v);
                    }
                }
            }
            comp += 1;
        }
        labels
    }

    pub fn component_count(&self) -> usize {
        self.components().into_iter().max().map_or(0, |m| m + 1)
    }

    /// Log a warning when the graph is disconnected; pure walks (`r = 0`) have no
    /// unique stationary distribution there.
    pub fn warn_if_disconnected(&self) -> usize {
        let k = self.component_count();
        if k > 1 {
            warn!(components = k, "graph is disconnected");
        }
        k
    }
}
