//! Fixed-shape outcome count arrays and per-session history.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use super::outcome::OutcomeKind;

/// Outcome counts indexed by (action, outcome), stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountArray {
    nactions: usize,
    noutcomes: usize,
    counts: Vec<u32>,
}

impl CountArray {
    pub fn zeros(nactions: usize, noutcomes: usize) -> Self {
        Self {
            nactions,
            noutcomes,
            counts: vec![0; nactions * noutcomes],
        }
    }

    /// Build from one row of outcome counts per action.
    pub fn from_rows(rows: &[Vec<u32>]) -> DomainResult<Self> {
        let noutcomes = rows.first().map_or(0, Vec::len);
        let mut array = Self::zeros(rows.len(), noutcomes);
        for (a, row) in rows.iter().enumerate() {
            if row.len() != noutcomes {
                return Err(DomainError::ShapeMismatch {
                    expected_actions: rows.len(),
                    expected_outcomes: noutcomes,
                    actual_actions: rows.len(),
                    actual_outcomes: row.len(),
                });
            }
            array.counts[a * noutcomes..(a + 1) * noutcomes].copy_from_slice(row);
        }
        Ok(array)
    }

    pub const fn nactions(&self) -> usize {
        self.nactions
    }

    pub const fn noutcomes(&self) -> usize {
        self.noutcomes
    }

    pub fn get(&self, action: usize, outcome: usize) -> u32 {
        self.counts[action * self.noutcomes + outcome]
    }

    /// Counts for one action.
    pub fn row(&self, action: usize) -> &[u32] {
        &self.counts[action * self.noutcomes..(action + 1) * self.noutcomes]
    }

    /// Total observations for one action.
    pub fn total(&self, action: usize) -> u32 {
        self.row(action).iter().sum()
    }

    pub fn increment(&mut self, action: usize, outcome: usize) {
        self.counts[action * self.noutcomes + outcome] += 1;
    }

    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Fail unless this array has the given shape.
    pub fn check_shape(&self, nactions: usize, noutcomes: usize) -> DomainResult<()> {
        if self.nactions == nactions && self.noutcomes == noutcomes {
            Ok(())
        } else {
            Err(DomainError::ShapeMismatch {
                expected_actions: nactions,
                expected_outcomes: noutcomes,
                actual_actions: self.nactions,
                actual_outcomes: self.noutcomes,
            })
        }
    }
}

/// Mutable per-session outcome counts. Never shared across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    counts: CountArray,
}

impl History {
    pub fn new(nactions: usize) -> Self {
        Self {
            counts: CountArray::zeros(nactions, OutcomeKind::COUNT),
        }
    }

    pub fn record(&mut self, action: usize, outcome: OutcomeKind) {
        self.counts.increment(action, outcome.index());
    }

    pub const fn counts(&self) -> &CountArray {
        &self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_zero()
    }

    pub fn reset(&mut self) {
        self.counts = CountArray::zeros(self.counts.nactions(), self.counts.noutcomes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_totals() {
        let counts = CountArray::from_rows(&[vec![1, 2, 0], vec![0, 0, 4]]).unwrap();
        assert_eq!(counts.nactions(), 2);
        assert_eq!(counts.noutcomes(), 3);
        assert_eq!(counts.row(1), &[0, 0, 4]);
        assert_eq!(counts.total(0), 3);
        assert!(counts.check_shape(2, 3).is_ok());
        assert!(counts.check_shape(3, 3).is_err());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(CountArray::from_rows(&[vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn test_history_record_and_reset() {
        let mut history = History::new(2);
        assert!(history.is_empty());
        history.record(1, OutcomeKind::Unsolved);
        history.record(1, OutcomeKind::Unsolved);
        assert_eq!(history.counts().get(1, OutcomeKind::Unsolved.index()), 2);
        assert!(!history.is_empty());
        history.reset();
        assert!(history.is_empty());
        assert_eq!(history.counts().nactions(), 2);
    }
}
