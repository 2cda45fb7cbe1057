//! Rank and statistics computation over one tag's averages.
//!
//! Students with a numeric average are sorted descending and ranked with
//! ex-aequo awareness: tied students share the lowest position and the tie
//! consumes positions (1, 1, 3, ...). Students without an average are never
//! ranked numerically; they carry the `Pending` rank and render as
//! "(pending)".

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::average::uniform_mean;
use crate::core::{Score, StudentId};

/// One student's outcome for one tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagAverage {
    pub student: StudentId,
    pub average: Option<f64>,
    pub total_weight: Option<f64>,
}

impl TagAverage {
    pub fn new(student: StudentId, average: Option<f64>, total_weight: Option<f64>) -> Self {
        Self {
            student,
            average,
            total_weight,
        }
    }
}

/// Rank of a student within one tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Ranked { position: usize, ex_aequo: bool },
    Pending,
}

impl Rank {
    pub fn position(self) -> Option<usize> {
        match self {
            Rank::Ranked { position, .. } => Some(position),
            Rank::Pending => None,
        }
    }

    pub fn is_pending(self) -> bool {
        self == Rank::Pending
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Ranked {
                position,
                ex_aequo: true,
            } => write!(f, "{position} ex"),
            Rank::Ranked { position, .. } => write!(f, "{position}"),
            Rank::Pending => f.write_str("(pending)"),
        }
    }
}

/// Mean, lowest and highest of the numeric averages of one tag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagStatistics {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Rank every student of one tag.
///
/// Sorting is stable and descending on the numeric average; equality is
/// exact, so two students tie only when their averages are bit-identical.
/// Students without an average are assigned `Pending` and do not shift the
/// positions of ranked students.
pub fn compute_ranks(averages: &[TagAverage]) -> BTreeMap<StudentId, Rank> {
    let mut ranked: Vec<(f64, &StudentId)> = averages
        .iter()
        .filter_map(|entry| entry.average.map(|value| (value, &entry.student)))
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut ranks = BTreeMap::new();
    let mut consecutive_ties = 0usize;
    for (index, (value, student)) in ranked.iter().enumerate() {
        let next = ranked.get(index + 1).map(|(v, _)| *v);
        let rank = if consecutive_ties > 0 {
            let position = index + 1 - consecutive_ties;
            if next == Some(*value) {
                consecutive_ties += 1;
            } else {
                consecutive_ties = 0;
            }
            Rank::Ranked {
                position,
                ex_aequo: true,
            }
        } else if next == Some(*value) {
            consecutive_ties = 1;
            Rank::Ranked {
                position: index + 1,
                ex_aequo: true,
            }
        } else {
            Rank::Ranked {
                position: index + 1,
                ex_aequo: false,
            }
        };
        ranks.insert((*student).clone(), rank);
    }

    for entry in averages {
        if entry.average.is_none() {
            ranks.insert(entry.student.clone(), Rank::Pending);
        }
    }
    ranks
}

/// Mean/min/max over the numeric averages of one tag.
///
/// `None` when no student has a numeric average; entries without one are
/// simply left out, they never drag the statistics toward zero.
pub fn compute_statistics(averages: &[TagAverage]) -> Option<TagStatistics> {
    let valid: Vec<f64> = averages.iter().filter_map(|entry| entry.average).collect();
    if valid.is_empty() {
        return None;
    }

    let scores: Vec<Score> = valid.iter().copied().map(Score::Value).collect();
    let mean = uniform_mean(&scores, true).average?;
    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(TagStatistics { mean, min, max })
}
