use crate::opcode::Opcode;

/// Analysis error type.
///
/// An error terminates the execution path that raised it; the remaining paths
/// of the same script are still analyzed. A subset of these kinds also serves
/// as predicate annotations: a spending condition tagged with an error kind
/// means "this predicate must hold, else the spend fails with this error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    ///////////////////////////
    // Structural errors.
    ///////////////////////////
    #[error("bad opcode")]
    BadOpcode,
    #[error("{0} is disabled")]
    DisabledOpcode(Opcode),
    #[error("unbalanced conditional")]
    UnbalancedConditional,

    ///////////////////////////
    // Stack errors.
    ///////////////////////////
    #[error("invalid stack operation")]
    InvalidStackOperation,
    #[error("invalid altstack operation")]
    InvalidAltstackOperation,
    // Stack and altstack combined depth is over the limit.
    #[error("stack size limit exceeded")]
    StackSize,
    // More than a single element remains after evaluation.
    #[error("clean stack")]
    CleanStack,

    ///////////////////////////
    // Failed verify operations.
    ///////////////////////////
    #[error("verify failed")]
    Verify,
    #[error("equalverify failed")]
    EqualVerify,
    #[error("numequalverify failed")]
    NumEqualVerify,
    #[error("checksigverify failed")]
    CheckSigVerify,
    #[error("checkmultisigverify failed")]
    CheckMultiSigVerify,

    ///////////////////////////
    // Semantic errors.
    ///////////////////////////
    #[error("OP_RETURN was executed")]
    OpReturn,
    #[error("script evaluated to false")]
    EvalFalse,

    ///////////////////////////
    // Numeric errors.
    ///////////////////////////
    #[error("script number overflow")]
    NumOverflow,

    ///////////////////////////
    // Signature shape.
    ///////////////////////////
    #[error("multisig dummy element is not null")]
    SigNullDummy,
    #[error("OP_IF/OP_NOTIF argument must be minimal")]
    MinimalIf,
    #[error("OP_IF/OP_NOTIF argument must be minimal in tapscript")]
    TapscriptMinimalIf,
    #[error("OP_CHECKMULTISIG is not available in tapscript")]
    TapscriptCheckMultiSig,

    ///////////////////////////
    // Quantitative limits.
    ///////////////////////////
    #[error("pubkey count out of range")]
    PubkeyCount,
    #[error("sig count out of range")]
    SigCount,
}
