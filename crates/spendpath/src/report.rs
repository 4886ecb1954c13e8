//! Aggregated analysis results and report rendering.

use crate::error::Error;
use crate::expr::Expr;
use crate::stack::Stack;
use std::fmt;

/// Outcome of a single execution path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// The path completed; spending it requires every listed condition.
    /// An empty list means the path is unconditionally spendable.
    Satisfiable { conditions: Vec<Expr> },
    /// The path completed but its conditions are contradictory or concretely
    /// false.
    Unsatisfiable,
    /// Execution failed; the stack snapshot is taken at the point of failure.
    Failed { error: Error, stack: Stack },
}

/// One analyzed execution path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReport {
    /// Pre-order position of the path in the fork tree.
    pub path: u32,
    pub outcome: PathOutcome,
}

/// Result of analyzing a script: one report per reachable path, in
/// deterministic depth-first pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub paths: Vec<PathReport>,
}

impl Analysis {
    /// Condition lists of the satisfiable paths, in path order.
    pub fn satisfiable_paths(&self) -> impl Iterator<Item = &[Expr]> + '_ {
        self.paths.iter().filter_map(|report| match &report.outcome {
            PathOutcome::Satisfiable { conditions } => Some(conditions.as_slice()),
            _ => None,
        })
    }

    /// The spending conditions as a printable disjunction.
    pub fn spending_conditions(&self) -> SpendingConditions<'_> {
        SpendingConditions(self)
    }

    /// Writes per-path diagnostics followed by the disjunction into `sink`.
    pub fn write_report(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        for report in &self.paths {
            match &report.outcome {
                PathOutcome::Failed { error, stack } => {
                    writeln!(sink, "path {} failed: {error} (stack: {stack})", report.path)?;
                }
                PathOutcome::Unsatisfiable => {
                    writeln!(sink, "path {} is unsatisfiable", report.path)?;
                }
                PathOutcome::Satisfiable { .. } => {}
            }
        }
        writeln!(sink, "{}", self.spending_conditions())
    }
}

/// Disjunctive normal form of an analysis: one conjunct list per satisfiable
/// path, conjuncts joined with ` && `, paths joined with ` ||\n`.
pub struct SpendingConditions<'a>(&'a Analysis);

impl fmt::Display for SpendingConditions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut any = false;
        for conditions in self.0.satisfiable_paths() {
            if any {
                f.write_str(" ||\n")?;
            }
            any = true;
            if conditions.is_empty() {
                f.write_str("true")?;
            } else {
                for (i, condition) in conditions.iter().enumerate() {
                    if i != 0 {
                        f.write_str(" && ")?;
                    }
                    write!(f, "{condition}")?;
                }
            }
        }
        if !any {
            f.write_str("unspendable")?;
        }
        Ok(())
    }
}
