//! Normalization and simplification of collected spending conditions.
//!
//! Runs once per branch: canonical ordering, deduplication, contradiction
//! detection and partial evaluation, iterated until the conjunct list stops
//! changing. Sorting first makes dedup a linear scan, dedup collapses the
//! aliases the contradiction check would otherwise miss, and every rewrite
//! re-enters the loop so newly concrete values simplify further.

use crate::expr::Expr;
use crate::num::{self, cast_to_bool, encode_bool, not_bytes};
use crate::opcode::Opcode;

/// Simplifies one branch's conjunct list in place.
///
/// Returns `false` if the branch is unsatisfiable (a contradiction, or a
/// predicate that evaluates to concrete false).
pub fn simplify_conditions(conditions: &mut Vec<Expr>) -> bool {
    for condition in conditions.iter_mut() {
        canonicalize(condition);
    }

    loop {
        conditions.sort();
        conditions.dedup();

        if has_contradiction(conditions) {
            tracing::debug!("branch dropped: contradictory conditions");
            return false;
        }

        let mut changed = false;
        let mut kept = Vec::with_capacity(conditions.len());
        for mut condition in conditions.drain(..) {
            if rewrite(&mut condition) {
                canonicalize(&mut condition);
                changed = true;
            }
            match &condition {
                // A concretely true predicate is vacuous; a false one kills
                // the branch.
                Expr::Bytes(bytes) if cast_to_bool(bytes) => changed = true,
                Expr::Bytes(_) => {
                    tracing::debug!("branch dropped: condition is concretely false");
                    return false;
                }
                _ => kept.push(condition),
            }
        }
        *conditions = kept;

        if !changed {
            return true;
        }
    }
}

/// Opcodes whose argument order is significant and must not be normalized.
fn order_sensitive(op: Opcode) -> bool {
    use Opcode::*;
    matches!(
        op,
        OP_CHECKMULTISIG
            | OP_CHECKSIG
            | OP_GREATERTHAN
            | OP_GREATERTHANOREQUAL
            | OP_LESSTHAN
            | OP_LESSTHANOREQUAL
            | OP_SUB
            | OP_WITHIN
    )
}

/// Sorts the arguments of commutative applications, recursively.
fn canonicalize(expr: &mut Expr) {
    if let Expr::App { op, args, .. } = expr {
        for arg in args.iter_mut() {
            canonicalize(arg);
        }
        if !order_sensitive(*op) {
            args.sort();
        }
    }
}

/// Applies the partial-evaluation rules bottom-up. Returns whether anything
/// changed.
fn rewrite(expr: &mut Expr) -> bool {
    let mut changed = false;
    if let Expr::App { args, .. } = expr {
        for arg in args.iter_mut() {
            changed |= rewrite(arg);
        }
    }
    if let Some(replacement) = rewrite_node(expr) {
        *expr = replacement;
        changed = true;
    }
    changed
}

fn rewrite_node(expr: &Expr) -> Option<Expr> {
    use Opcode::*;

    let Expr::App { op, args, .. } = expr else {
        return None;
    };
    match (*op, args.as_slice()) {
        (OP_EQUAL, [Expr::Bytes(a), Expr::Bytes(b)]) => Some(Expr::Bytes(encode_bool(a == b))),
        (OP_NOT | InternalNot, [Expr::Bytes(bytes)]) => Some(Expr::Bytes(not_bytes(bytes))),
        // An unchecked signature result used as a boolean: falseness means
        // the signature slot must hold the canonical empty value.
        (
            OP_NOT,
            [Expr::App {
                op: OP_CHECKSIG,
                args: sig_args,
                ..
            }],
        ) if sig_args.len() == 2 => Some(Expr::app(
            OP_EQUAL,
            vec![sig_args[0].clone(), Expr::Bytes(num::FALSE.to_vec())],
        )),
        _ => None,
    }
}

fn has_contradiction(conditions: &[Expr]) -> bool {
    conditions.iter().any(|p| {
        conditions
            .iter()
            .any(|q| p.is_negation_of(q) || q.is_negation_of(p))
    })
}
