//! Script item model, decoding and disassembly.

use crate::expr::write_hex;
use crate::opcode::Opcode;
use bitcoin::script::Instruction;
use bitcoin::Script;
use std::fmt;

/// One element of a script: an inline push or an opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Push(Vec<u8>),
    Op(Opcode),
}

/// Script decoding error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptDecodeError {
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    #[error("failed to read instruction: {0:?}")]
    ReadInstruction(bitcoin::script::Error),
}

/// Decodes a serialized script into the analyzer's item sequence.
///
/// `OP_PUSHBYTES_*` and `OP_PUSHDATA{1,2,4}` instructions become
/// [`Item::Push`] carrying their payload; every other byte must be a named
/// opcode of the reference table.
pub fn decode_script(script: &Script) -> Result<Vec<Item>, ScriptDecodeError> {
    script
        .instructions()
        .map(|instruction| {
            match instruction.map_err(ScriptDecodeError::ReadInstruction)? {
                Instruction::PushBytes(data) => Ok(Item::Push(data.as_bytes().to_vec())),
                Instruction::Op(op) => Opcode::from_u8(op.to_u8())
                    .map(Item::Op)
                    .ok_or(ScriptDecodeError::UnknownOpcode(op.to_u8())),
            }
        })
        .collect()
}

/// Decodes a raw byte string, see [`decode_script`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<Item>, ScriptDecodeError> {
    decode_script(Script::from_bytes(bytes))
}

/// Human-readable rendering of an item sequence.
pub struct ScriptAsm<'a>(pub &'a [Item]);

impl fmt::Display for ScriptAsm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            match item {
                Item::Push(data) => {
                    f.write_str("<")?;
                    write_hex(f, data)?;
                    f.write_str(">")?;
                }
                Item::Op(op) => write!(f, "{op}")?,
            }
        }
        Ok(())
    }
}
