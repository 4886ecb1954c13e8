//! Symbolic stack-element expressions.

use crate::error::Error;
use crate::opcode::Opcode;
use std::cmp::Ordering;
use std::fmt;

/// A stack element as seen by the symbolic executor.
///
/// Either a concrete byte string, a free witness variable, or an opcode
/// applied to an ordered list of sub-expressions. An applied opcode may carry
/// an error annotation: the predicate must hold, else the spend fails with
/// that error.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A concrete byte string.
    Bytes(Vec<u8>),
    /// Witness variable `n`, drawn when the script reads past the bottom of
    /// the stack. `Var(0)` is the first element the spender supplies.
    Var(u32),
    /// Opcode `op` applied to `args` (bottom-to-top stack order).
    App {
        op: Opcode,
        args: Vec<Expr>,
        err: Option<Error>,
    },
}

impl Expr {
    pub fn app(op: Opcode, args: Vec<Expr>) -> Self {
        Self::App { op, args, err: None }
    }

    pub fn app_tagged(op: Opcode, args: Vec<Expr>, err: Error) -> Self {
        Self::App {
            op,
            args,
            err: Some(err),
        }
    }

    /// Wraps the expression in the analyzer-internal logical negation.
    pub fn negate(self) -> Self {
        Self::app(Opcode::InternalNot, vec![self])
    }

    /// The concrete byte string, if this expression is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The error annotation, if any.
    pub fn err(&self) -> Option<Error> {
        match self {
            Self::App { err, .. } => *err,
            _ => None,
        }
    }

    /// Whether `self` is `OP_NOT` or the internal negation applied to `other`.
    pub fn is_negation_of(&self, other: &Expr) -> bool {
        match self {
            Self::App { op, args, .. }
                if matches!(op, Opcode::OP_NOT | Opcode::InternalNot) && args.len() == 1 =>
            {
                args[0] == *other
            }
            _ => false,
        }
    }
}

// Structural equality: same variant and recursively equal subterms. The
// error annotation does not participate.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Expr {}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical total order: applications sort before variables, variables
/// before byte strings; applications compare by opcode, then arity, then
/// arguments pairwise.
impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Expr::App { op: a, args: x, .. },
                Expr::App { op: b, args: y, .. },
            ) => a
                .code()
                .cmp(&b.code())
                .then(x.len().cmp(&y.len()))
                .then_with(|| x.iter().cmp(y.iter())),
            (Expr::Var(a), Expr::Var(b)) => a.cmp(b),
            (Expr::Bytes(a), Expr::Bytes(b)) => a.cmp(b),
            (Expr::App { .. }, _) => Ordering::Less,
            (_, Expr::App { .. }) => Ordering::Greater,
            (Expr::Var(_), Expr::Bytes(_)) => Ordering::Less,
            (Expr::Bytes(_), Expr::Var(_)) => Ordering::Greater,
        }
    }
}

pub(crate) fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bytes(bytes) => {
                f.write_str("<")?;
                write_hex(f, bytes)?;
                f.write_str(">")
            }
            Expr::Var(n) => write!(f, "<input{n}>"),
            Expr::App {
                op: Opcode::InternalNot,
                args,
                ..
            } if args.len() == 1 => write!(f, "!({})", args[0]),
            Expr::App {
                op: Opcode::OP_EQUAL,
                args,
                ..
            } if args.len() == 2 => write!(f, "({} == {})", args[0], args[1]),
            Expr::App { op, args, .. } => {
                let name = op.name();
                f.write_str(name.strip_prefix("OP_").unwrap_or(name))?;
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Opcode::*;

    #[test]
    fn test_display() {
        assert_eq!(Expr::Bytes(vec![]).to_string(), "<>");
        assert_eq!(Expr::Bytes(vec![0xde, 0xad]).to_string(), "<dead>");
        assert_eq!(Expr::Var(3).to_string(), "<input3>");
        assert_eq!(
            Expr::app(OP_CHECKSIG, vec![Expr::Var(0), Expr::Var(1)]).to_string(),
            "CHECKSIG(<input0>, <input1>)"
        );
        assert_eq!(
            Expr::app(OP_EQUAL, vec![Expr::Var(0), Expr::Bytes(vec![0x01])]).to_string(),
            "(<input0> == <01>)"
        );
        assert_eq!(Expr::Var(0).negate().to_string(), "!(<input0>)");
        assert_eq!(
            Expr::app(OP_HASH160, vec![Expr::Var(2)]).to_string(),
            "HASH160(<input2>)"
        );
    }

    #[test]
    fn test_ordering() {
        let app = Expr::app(OP_DUP, vec![]);
        let var = Expr::Var(0);
        let bytes = Expr::Bytes(vec![0xff]);
        assert!(app < var);
        assert!(var < bytes);
        assert!(app < bytes);

        // Applications by opcode, then arity, then arguments.
        assert!(Expr::app(OP_EQUAL, vec![]) < Expr::app(OP_CHECKSIG, vec![]));
        assert!(Expr::app(OP_DUP, vec![Expr::Var(0)]) < Expr::app(OP_DUP, vec![Expr::Var(0), Expr::Var(1)]));
        assert!(
            Expr::app(OP_DUP, vec![Expr::Var(0)]) < Expr::app(OP_DUP, vec![Expr::Var(1)])
        );

        // The internal negation sorts before every real opcode.
        assert!(Expr::Var(7).negate() < Expr::app(OP_0, vec![]));

        assert!(Expr::Var(1) < Expr::Var(2));
        assert!(Expr::Bytes(vec![0x01]) < Expr::Bytes(vec![0x02]));
        assert!(Expr::Bytes(vec![0x01]) < Expr::Bytes(vec![0x01, 0x00]));
    }

    #[test]
    fn test_equality_ignores_error_annotation() {
        let plain = Expr::app(OP_EQUAL, vec![Expr::Var(0), Expr::Bytes(vec![])]);
        let tagged = Expr::app_tagged(
            OP_EQUAL,
            vec![Expr::Var(0), Expr::Bytes(vec![])],
            Error::SigNullDummy,
        );
        assert_eq!(plain, tagged);
        assert_eq!(plain.cmp(&tagged), Ordering::Equal);
        assert_eq!(tagged.err(), Some(Error::SigNullDummy));
        assert_eq!(plain.err(), None);
    }

    #[test]
    fn test_negation_recognition() {
        let var = Expr::Var(0);
        assert!(var.clone().negate().is_negation_of(&var));
        assert!(Expr::app(OP_NOT, vec![var.clone()]).is_negation_of(&var));
        assert!(!Expr::app(OP_ABS, vec![var.clone()]).is_negation_of(&var));
        assert!(!var.clone().negate().is_negation_of(&Expr::Var(1)));
    }
}
