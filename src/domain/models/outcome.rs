//! Outcomes of solver actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque witness data attached to a solved outcome (for example the
/// literal tokens of a satisfying assignment).
pub type Certificate = Vec<String>;

/// Categorical result of running an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Timeout, crash, or unknown answer
    Unsolved,
    /// Solved with a positive answer (satisfiable, optimum found)
    Positive,
    /// Solved with a negative answer (unsatisfiable)
    Negative,
}

impl OutcomeKind {
    /// Every outcome category, in canonical index order.
    pub const ALL: [Self; 3] = [Self::Unsolved, Self::Positive, Self::Negative];

    /// Number of outcome categories.
    pub const COUNT: usize = Self::ALL.len();

    /// Canonical index of this category.
    pub const fn index(self) -> usize {
        match self {
            Self::Unsolved => 0,
            Self::Positive => 1,
            Self::Negative => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn is_solved(self) -> bool {
        !matches!(self, Self::Unsolved)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unsolved => "unsolved",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one action, optionally carrying a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
}

impl Outcome {
    pub const fn unsolved() -> Self {
        Self {
            kind: OutcomeKind::Unsolved,
            certificate: None,
        }
    }

    pub const fn positive(certificate: Option<Certificate>) -> Self {
        Self {
            kind: OutcomeKind::Positive,
            certificate,
        }
    }

    pub const fn negative() -> Self {
        Self {
            kind: OutcomeKind::Negative,
            certificate: None,
        }
    }

    /// 1.0 for any solved outcome, 0.0 otherwise.
    pub const fn utility(&self) -> f64 {
        if self.kind.is_solved() {
            1.0
        } else {
            0.0
        }
    }

    pub const fn is_solved(&self) -> bool {
        self.kind.is_solved()
    }
}

impl From<OutcomeKind> for Outcome {
    fn from(kind: OutcomeKind) -> Self {
        Self {
            kind,
            certificate: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_indices_are_canonical() {
        for (i, kind) in OutcomeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(OutcomeKind::from_index(i), Some(*kind));
        }
        assert_eq!(OutcomeKind::from_index(3), None);
    }

    #[test]
    fn test_utility_ignores_certificate() {
        assert!(Outcome::unsolved().utility().abs() < f64::EPSILON);
        assert!((Outcome::negative().utility() - 1.0).abs() < f64::EPSILON);
        let with_cert = Outcome::positive(Some(vec!["1".into(), "-2".into()]));
        assert!((with_cert.utility() - Outcome::positive(None).utility()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&Outcome::negative()).unwrap();
        assert_eq!(json, r#"{"kind":"negative"}"#);
    }
}
