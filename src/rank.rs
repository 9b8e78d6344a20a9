//! Ranked output: score vector -> `(identifier, score)` rows.
//!
//! Order is descending by score with ties broken by ascending node index, so
//! long runs of equal (often zero) scores still rank the same way every time.
//! The CSV export writes floats in their shortest round-trip form; reading it
//! back yields the identical list.

use crate::graph::Graph;
use crate::propagate::check_len;
use crate::{csv_error, Error, Result};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedEntry {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedList {
    entries: Vec<RankedEntry>,
}

/// Sort node indices by descending score, ties by ascending index.
pub fn rank(scores: &[f64], graph: &Graph) -> Result<RankedList> {
    check_len(graph, scores.len())?;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by_key(|&i| (Reverse(OrderedFloat(scores[i])), i));
    let entries = order
        .into_iter()
        .map(|i| RankedEntry {
            id: graph.id(i).to_string(),
            score: scores[i],
        })
        .collect();
    Ok(RankedList { entries })
}

impl RankedList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedEntry> {
        self.entries.iter()
    }

    /// The first `k` entries (fewer if the list is shorter).
    pub fn top(&self, k: usize) -> &[RankedEntry] {
        &self.entries[..k.min(self.entries.len())]
    }

    /// 0-based rank of `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn score_of(&self, id: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.score)
    }

    /// Write `identifier,score` rows without a header. Identifiers containing
    /// the delimiter are quoted.
    pub fn write_csv<W: Write>(&self, w: W) -> std::io::Result<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
        for e in &self.entries {
            wtr.write_record([e.id.as_str(), e.score.to_string().as_str()])?;
        }
        wtr.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        self.write_csv(BufWriter::new(file)).map_err(io_err)
    }

    /// Parse `identifier,score` rows. Order is taken from the file as-is.
    pub fn read_csv<R: BufRead>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| csv_error(source_name, e))?;
            let malformed = |reason: String| Error::MalformedInput {
                source_name: source_name.to_string(),
                line: record.position().map_or(0, |pos| pos.line() as usize),
                reason,
            };
            let (Some(id), Some(score), None) = (record.get(0), record.get(1), record.get(2))
            else {
                return Err(malformed(format!(
                    "expected `identifier,score`, found {} fields",
                    record.len()
                )));
            };
            let score: f64 = score
                .parse()
                .map_err(|_| malformed(format!("score {score:?} is not a number")))?;
            entries.push(RankedEntry {
                id: id.to_string(),
                score,
            });
        }
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_csv(BufReader::new(file), &path.display().to_string())
    }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a RankedEntry;
    type IntoIter = std::slice::Iter<'a, RankedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Graph {
        Graph::from_edges([("n0", "n1", 1.0), ("n2", "n3", 1.0), ("n1", "n4", 1.0)]).unwrap()
    }

    fn ids(list: &RankedList) -> Vec<&str> {
        list.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn unique_maximum_ranks_first() {
        let g = graph();
        let list = rank(&[0.1, 0.05, 0.6, 0.2, 0.05], &g).unwrap();
        assert_eq!(list.entries()[0].id, "n2");
        assert_eq!(ids(&list), vec!["n2", "n3", "n0", "n1", "n4"]);
    }

    #[test]
    fn ties_fall_back_to_node_index() {
        let g = graph();
        let list = rank(&[0.0; 5], &g).unwrap();
        assert_eq!(ids(&list), vec!["n0", "n1", "n2", "n3", "n4"]);
    }

    #[test]
    fn wrong_length_is_dimension_mismatch() {
        let g = graph();
        let err = rank(&[1.0, 2.0], &g).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn csv_round_trip_is_lossless() {
        let g = graph();
        let scores = [1.0 / 3.0, 2.0e-17, 0.1 + 0.2, 0.0, 7.0];
        let list = rank(&scores, &g).unwrap();
        let mut buf = Vec::new();
        list.write_csv(&mut buf).unwrap();
        let back = RankedList::read_csv(buf.as_slice(), "mem").unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn identifiers_with_commas_survive_round_trip() {
        let g = Graph::from_edges([("HLA-A,B", "TP53", 1.0), ("TP53", "\"MDM2\"", 2.0)]).unwrap();
        let list = rank(&[0.2, 0.5, 0.3], &g).unwrap();
        let mut buf = Vec::new();
        list.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("\"HLA-A,B\",0.2"), "{text}");
        let back = RankedList::read_csv(buf.as_slice(), "mem").unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn top_and_position() {
        let g = graph();
        let list = rank(&[0.5, 0.4, 0.3, 0.2, 0.1], &g).unwrap();
        assert_eq!(list.top(2).len(), 2);
        assert_eq!(list.top(99).len(), 5);
        assert_eq!(list.position("n3"), Some(3));
        assert_eq!(list.score_of("n4"), Some(0.1));
        assert_eq!(list.position("missing"), None);
    }

    #[test]
    fn read_csv_rejects_bad_rows() {
        let err = RankedList::read_csv("a,1\nb\n".as_bytes(), "r").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 2, .. }));
        let err = RankedList::read_csv("a,x\n".as_bytes(), "r").unwrap_err();
        assert!(format!("{err}").contains("not a number"));
    }
}
