//! Start and prior vectors over a graph's index space.

use crate::graph::Graph;
use crate::{csv_error, Error, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Uniform `1/|S|` mass on each seed index, 0 elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct StartVector {
    values: Vec<f64>,
    seeds: Vec<usize>,
}

impl StartVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Seed indices in first-occurrence order, de-duplicated.
    pub fn seeds(&self) -> &[usize] {
        &self.seeds
    }
}

/// Non-negative restart bias summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorVector {
    values: Vec<f64>,
}

impl PriorVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The default prior: the start vector, reused as-is.
impl From<&StartVector> for PriorVector {
    fn from(start: &StartVector) -> Self {
        Self {
            values: start.values.clone(),
        }
    }
}

/// Build the start vector for `ids`.
///
/// Every identifier must be a node of `graph`; all missing ones are reported
/// together. Repeated identifiers count once.
pub fn build_start<S: AsRef<str>>(graph: &Graph, ids: &[S]) -> Result<StartVector> {
    let mut unknown = Vec::new();
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for id in ids {
        let id = id.as_ref();
        match graph.index_of(id) {
            Ok(i) => {
                if seen.insert(i) {
                    seeds.push(i);
                }
            }
            Err(_) => unknown.push(id.to_string()),
        }
    }
    if !unknown.is_empty() {
        return Err(Error::UnknownSeed {
            identifiers: unknown,
        });
    }
    if seeds.is_empty() {
        return Err(Error::EmptySeedSet);
    }
    let mut values = vec![0.0; graph.node_count()];
    let mass = 1.0 / seeds.len() as f64;
    for &i in &seeds {
        values[i] = mass;
    }
    Ok(StartVector { values, seeds })
}

/// Build a prior from `(identifier, weight)` pairs, normalized to sum 1.
///
/// Weights of repeated identifiers accumulate. An empty `weighted` slice yields
/// the start vector unchanged.
pub fn build_prior<S: AsRef<str>>(
    graph: &Graph,
    weighted: &[(S, f64)],
    fallback: &StartVector,
) -> Result<PriorVector> {
    if weighted.is_empty() {
        return Ok(PriorVector::from(fallback));
    }
    let mut values = vec![0.0; graph.node_count()];
    let mut unknown = Vec::new();
    for (id, w) in weighted {
        let id = id.as_ref();
        if !w.is_finite() || *w < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "prior weight for {id} must be finite and non-negative (got {w})"
            )));
        }
        match graph.index_of(id) {
            Ok(i) => values[i] += w,
            Err(_) => unknown.push(id.to_string()),
        }
    }
    if !unknown.is_empty() {
        return Err(Error::UnknownSeed {
            identifiers: unknown,
        });
    }
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 {
        return Err(Error::InvalidParameter(
            "prior weights must sum to > 0".to_string(),
        ));
    }
    for x in &mut values {
        *x /= sum;
    }
    Ok(PriorVector { values })
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Yield `(line number, fields)` for every non-blank, non-comment line.
fn data_lines<'a, R: BufRead + 'a>(
    reader: R,
    source_name: &'a str,
) -> impl Iterator<Item = Result<(usize, Vec<String>)>> + 'a {
    reader.lines().enumerate().filter_map(move |(i, line)| {
        let line = match line {
            Ok(l) => l,
            Err(source) => {
                return Some(Err(Error::Io {
                    path: PathBuf::from(source_name),
                    source,
                }))
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        let fields = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Some(Ok((i + 1, fields)))
    })
}

/// One identifier per line.
pub fn parse_seed_list<R: BufRead>(reader: R, source_name: &str) -> Result<Vec<String>> {
    data_lines(reader, source_name)
        .map(|item| {
            let (line, mut fields) = item?;
            if fields.len() != 1 {
                return Err(Error::MalformedInput {
                    source_name: source_name.to_string(),
                    line,
                    reason: format!("expected one identifier, found {} fields", fields.len()),
                });
            }
            Ok(fields.swap_remove(0))
        })
        .collect()
}

/// Field delimiter of a prior file, taken from its first data line: tab, then
/// comma, otherwise runs of spaces.
fn sniff_delimiter(text: &str) -> u8 {
    let first = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap_or("");
    if first.contains('\t') {
        b'\t'
    } else if first.contains(',') {
        b','
    } else {
        b' '
    }
}

/// `identifier <sep> weight` per line, with one separator used throughout the
/// file (tab, comma or spaces).
pub fn parse_prior_weights<R: BufRead>(
    mut reader: R,
    source_name: &str,
) -> Result<Vec<(String, f64)>> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| Error::Io {
            path: PathBuf::from(source_name),
            source,
        })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .delimiter(sniff_delimiter(&text))
        .from_reader(text.as_bytes());

    let mut weights = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| csv_error(source_name, e))?;
        let malformed = |reason: String| Error::MalformedInput {
            source_name: source_name.to_string(),
            line: record.position().map_or(0, |pos| pos.line() as usize),
            reason,
        };
        // Space-delimited files yield empty fields between repeated spaces.
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        let [id, weight] = fields.as_slice() else {
            if fields.is_empty() {
                continue;
            }
            return Err(malformed(format!(
                "expected identifier and weight, found {} fields",
                fields.len()
            )));
        };
        let w: f64 = weight
            .parse()
            .map_err(|_| malformed(format!("weight {weight:?} is not a number")))?;
        weights.push((id.to_string(), w));
    }
    Ok(weights)
}

pub fn read_seed_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    parse_seed_list(open(path)?, &path.display().to_string())
}

pub fn read_prior_weights(path: impl AsRef<Path>) -> Result<Vec<(String, f64)>> {
    let path = path.as_ref();
    parse_prior_weights(open(path)?, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Graph {
        Graph::from_edges([("A", "B", 1.0), ("B", "C", 1.0), ("C", "D", 1.0)]).unwrap()
    }

    #[test]
    fn start_vector_is_uniform_over_distinct_seeds() {
        let g = graph();
        let s = build_start(&g, &["C", "A", "C"]).unwrap();
        assert_eq!(s.as_slice(), &[0.5, 0.0, 0.5, 0.0]);
        assert_eq!(s.seeds(), &[2, 0]);
    }

    #[test]
    fn unknown_seeds_are_all_reported() {
        let g = graph();
        let err = build_start(&g, &["A", "PROT_DOES_NOT_EXIST", "X"]).unwrap_err();
        match err {
            Error::UnknownSeed { identifiers } => {
                assert_eq!(identifiers, vec!["PROT_DOES_NOT_EXIST", "X"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_seed_list_is_rejected() {
        let g = graph();
        let none: [&str; 0] = [];
        assert!(matches!(build_start(&g, &none), Err(Error::EmptySeedSet)));
    }

    #[test]
    fn prior_is_normalized_and_accumulates() {
        let g = graph();
        let s = build_start(&g, &["A"]).unwrap();
        let p = build_prior(&g, &[("A", 1.0), ("D", 2.0), ("A", 1.0)], &s).unwrap();
        assert_eq!(p.as_slice(), &[0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn empty_prior_reuses_start_vector() {
        let g = graph();
        let s = build_start(&g, &["B", "D"]).unwrap();
        let empty: [(&str, f64); 0] = [];
        let p = build_prior(&g, &empty, &s).unwrap();
        assert_eq!(p.as_slice(), s.as_slice());
    }

    #[test]
    fn prior_rejects_unknown_and_bad_weights() {
        let g = graph();
        let s = build_start(&g, &["A"]).unwrap();
        assert!(matches!(
            build_prior(&g, &[("Q", 1.0)], &s),
            Err(Error::UnknownSeed { .. })
        ));
        assert!(matches!(
            build_prior(&g, &[("A", -1.0)], &s),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            build_prior(&g, &[("A", 0.0)], &s),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn seed_list_parsing() {
        let ids = parse_seed_list("# genes\nA\n\n  B \n".as_bytes(), "seeds").unwrap();
        assert_eq!(ids, vec!["A", "B"]);
        let err = parse_seed_list("A\nB C\n".as_bytes(), "seeds").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn prior_weight_parsing() {
        let w = parse_prior_weights("# bias\nA\t0.25\n\nB\t3\n".as_bytes(), "priors").unwrap();
        assert_eq!(w, vec![("A".to_string(), 0.25), ("B".to_string(), 3.0)]);
        let w = parse_prior_weights("A,1\nB, 2\n".as_bytes(), "priors").unwrap();
        assert_eq!(w, vec![("A".to_string(), 1.0), ("B".to_string(), 2.0)]);
        let w = parse_prior_weights("A   1\nB 2\n".as_bytes(), "priors").unwrap();
        assert_eq!(w, vec![("A".to_string(), 1.0), ("B".to_string(), 2.0)]);
        let err = parse_prior_weights("A\t1\nB\n".as_bytes(), "priors").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 2, .. }), "{err}");
        let err = parse_prior_weights("A x\n".as_bytes(), "priors").unwrap_err();
        assert!(format!("{err}").contains("not a number"));
    }
}
