//! Symbolic analyzer for Bitcoin-style transaction-authorization scripts.
//!
//! Given a script, the analyzer enumerates every reachable control-flow path
//! and computes, per path, the predicates over unknown witness inputs that a
//! spender must satisfy for the script to accept. Concrete values execute as
//! byte strings; everything else becomes a symbolic expression tree. The
//! result is a disjunction with one conjunct list per path.

mod analyzer;
mod condition_stack;
mod constants;
mod error;
mod expr;
mod num;
mod opcode;
mod report;
mod script;
mod simplify;
mod stack;


pub use self::condition_stack::ConditionStack;
pub use self::error::Error;
pub use self::expr::Expr;
pub use self::num::{cast_to_bool, encode_bool, not_bytes, ScriptNum, FALSE, TRUE};
pub use self::opcode::Opcode;
pub use self::report::{Analysis, PathOutcome, PathReport, SpendingConditions};
pub use self::script::{decode_bytes, decode_script, Item, ScriptAsm, ScriptDecodeError};
pub use self::simplify::simplify_conditions;
pub use self::stack::Stack;

use self::analyzer::{Registry, ScriptAnalyzer};

/// Script execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptVersion {
    /// Bare scripts and BIP16 P2SH redeem scripts.
    Legacy,
    /// Witness v0 (P2WSH); see BIP 141.
    SegwitV0,
    /// Witness v1 tapscript; see BIP 342.
    SegwitV1,
}

/// Which rule set the analysis assumes the network enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSet {
    /// Consensus plus standardness rules.
    All,
    /// Consensus rules only.
    ConsensusOnly,
}

/// Analyzes a script: enumerates every reachable execution path and reduces
/// each path's spending conditions.
///
/// Scripts containing a disabled opcode are invalid as a whole and produce a
/// single failed path without being executed.
pub fn analyze_script(script: &[Item], version: ScriptVersion, rules: RuleSet) -> Analysis {
    // Pre-scan: a disabled opcode poisons the script wherever it sits.
    for item in script {
        if let Item::Op(op) = item {
            if op.is_disabled() {
                tracing::debug!(%op, "script contains a disabled opcode");
                return Analysis {
                    paths: vec![PathReport {
                        path: 0,
                        outcome: PathOutcome::Failed {
                            error: Error::DisabledOpcode(*op),
                            stack: Stack::new(),
                        },
                    }],
                };
            }
        }
    }

    let mut registry = Registry::default();
    let root = ScriptAnalyzer::new(script, version, rules, &mut registry);
    root.analyze(&mut registry);

    let paths = registry
        .into_branches()
        .into_iter()
        .map(|branch| {
            let outcome = match branch.outcome {
                Ok(mut conditions) => {
                    if simplify_conditions(&mut conditions) {
                        PathOutcome::Satisfiable { conditions }
                    } else {
                        PathOutcome::Unsatisfiable
                    }
                }
                Err((error, stack)) => PathOutcome::Failed { error, stack },
            };
            PathReport {
                path: branch.path,
                outcome,
            }
        })
        .collect();

    Analysis { paths }
}
