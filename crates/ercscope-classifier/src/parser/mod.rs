use ercscope_core::{error::Result, BytecodeBlob, Error};

/// First byte reserved by EIP-3541 for non-legacy code (EOF, EIP-7702).
const NON_LEGACY_PREFIX: u8 = 0xef;
const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Decoded instruction from bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub data: Vec<u8>,
}

impl Instruction {
    /// Number of immediate bytes a `PUSHn` opcode declares.
    pub fn push_size(&self) -> Option<usize> {
        push_size(self.opcode)
    }

    /// True when the immediate was cut short by the end of the code.
    pub fn is_truncated(&self) -> bool {
        self.push_size().map_or(false, |n| self.data.len() < n)
    }
}

pub fn push_size(opcode: u8) -> Option<usize> {
    if (0x60..=0x7f).contains(&opcode) {
        Some((opcode - 0x60 + 1) as usize)
    } else {
        None
    }
}

/// Decodes raw bytecode into a list of instructions.
pub fn parse_instructions(code: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut i = 0;
    while i < code.len() {
        let opcode = code[i];
        let mut data = Vec::new();
        if let Some(n) = push_size(opcode) {
            let end = core::cmp::min(i + 1 + n, code.len());
            data.extend_from_slice(&code[i + 1..end]);
            i += 1 + n;
        } else {
            i += 1;
        }
        instructions.push(Instruction { opcode, data });
    }
    instructions
}

/// Converts a hex blob into legacy EVM bytecode ready for analysis.
pub fn decode_bytecode(blob: &BytecodeBlob) -> Result<Vec<u8>> {
    let bytes = hex::decode(blob.trimmed())
        .map_err(|e| Error::DecodeError(format!("invalid hex bytecode: {}", e)))?;

    match bytes.first() {
        None => Err(Error::DecodeError("bytecode is empty".to_string())),
        Some(&NON_LEGACY_PREFIX) if bytes.len() == 23 && bytes.starts_with(&DELEGATION_PREFIX) => {
            Err(Error::DecodeError(format!(
                "EIP-7702 delegation designator to 0x{}",
                hex::encode(&bytes[3..])
            )))
        }
        Some(&NON_LEGACY_PREFIX) => Err(Error::DecodeError(
            "EOF container is not legacy EVM bytecode".to_string(),
        )),
        Some(_) => Ok(bytes),
    }
}
