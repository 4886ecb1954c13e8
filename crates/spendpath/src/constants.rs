/// Maximum combined depth of the stack and the altstack.
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of public keys consumed by a single OP_CHECKMULTISIG.
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;
