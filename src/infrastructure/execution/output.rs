//! Parsers for competition-style solver output.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::models::{Outcome, RunTermination};
use crate::domain::ports::OutputFormat;

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^s +(SATISFIABLE|UNSATISFIABLE|OPTIMUM FOUND|UNKNOWN|UNSUPPORTED)\s*$")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

static VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^v +(.*?)\s*$").unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Exit codes that mean "my output is meaningful": 0 plus the SAT
/// competition's 10 (satisfiable) and 20 (unsatisfiable).
pub const STANDARD_EXIT_CODES: [i32; 3] = [0, 10, 20];

/// Collect the tokens of every `v` line, in order.
fn certificate(output: &str) -> Vec<String> {
    VALUE_LINE
        .captures_iter(output)
        .flat_map(|c| {
            c.get(1)
                .map(|m| m.as_str().split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .collect()
}

/// Interpret combined solver output.
pub fn parse_output(format: OutputFormat, output: &str) -> Outcome {
    let Some(status) = STATUS_LINE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Outcome::unsolved();
    };

    match (format, status) {
        (_, "UNSATISFIABLE") => Outcome::negative(),
        (OutputFormat::SatCompetition, "SATISFIABLE") => {
            let values = certificate(output);
            Outcome::positive((!values.is_empty()).then_some(values))
        }
        (OutputFormat::PbCompetition, "SATISFIABLE" | "OPTIMUM FOUND") => {
            let values = certificate(output);
            if values.is_empty() {
                // A claimed solution without a witness is not trusted.
                Outcome::unsolved()
            } else {
                Outcome::positive(Some(values))
            }
        }
        _ => Outcome::unsolved(),
    }
}

/// Outcome of a finished process: parsed output for a standard exit,
/// unsolved for anything else.
pub fn outcome_for(format: OutputFormat, termination: &RunTermination, output: &str) -> Outcome {
    match termination {
        RunTermination::Exited { code } if STANDARD_EXIT_CODES.contains(code) => {
            parse_output(format, output)
        }
        _ => Outcome::unsolved(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::OutcomeKind;

    #[test]
    fn test_sat_competition_satisfiable() {
        let output = "c comment\ns SATISFIABLE\nv 1 -2 3\nv -4 0\n";
        let outcome = parse_output(OutputFormat::SatCompetition, output);
        assert_eq!(outcome.kind, OutcomeKind::Positive);
        assert_eq!(
            outcome.certificate.unwrap(),
            vec!["1", "-2", "3", "-4", "0"]
        );
    }

    #[test]
    fn test_sat_competition_unsatisfiable() {
        let outcome = parse_output(OutputFormat::SatCompetition, "s UNSATISFIABLE\n");
        assert_eq!(outcome.kind, OutcomeKind::Negative);
    }

    #[test]
    fn test_unknown_and_garbage_are_unsolved() {
        assert!(!parse_output(OutputFormat::SatCompetition, "s UNKNOWN\n").is_solved());
        assert!(!parse_output(OutputFormat::SatCompetition, "Segmentation fault").is_solved());
        assert!(!parse_output(OutputFormat::SatCompetition, "").is_solved());
    }

    #[test]
    fn test_pb_requires_certificate() {
        assert!(!parse_output(OutputFormat::PbCompetition, "s SATISFIABLE\n").is_solved());
        let outcome = parse_output(OutputFormat::PbCompetition, "o 12\ns OPTIMUM FOUND\nv x1 -x2\n");
        assert_eq!(outcome.kind, OutcomeKind::Positive);
        assert_eq!(outcome.certificate.unwrap(), vec!["x1", "-x2"]);
    }

    #[test]
    fn test_nonstandard_exit_is_unsolved() {
        let output = "s SATISFIABLE\nv 1 0\n";
        let crashed = RunTermination::Exited { code: 139 };
        assert!(!outcome_for(OutputFormat::SatCompetition, &crashed, output).is_solved());
        let signaled = RunTermination::Signaled { signal: 9 };
        assert!(!outcome_for(OutputFormat::SatCompetition, &signaled, output).is_solved());
        let clean = RunTermination::Exited { code: 10 };
        assert!(outcome_for(OutputFormat::SatCompetition, &clean, output).is_solved());
    }
}
