use std::collections::BTreeSet;

use crate::parser::Instruction;

const EQ: u8 = 0x14;
const LT: u8 = 0x10;
const GT: u8 = 0x11;
const PUSH1: u8 = 0x60;
const PUSH3: u8 = 0x62;
const PUSH4: u8 = 0x63;
const PUSH32: u8 = 0x7f;

fn is_dup(opcode: u8) -> bool {
    (0x80..=0x8f).contains(&opcode)
}

fn left_pad_selector(data: &[u8]) -> [u8; 4] {
    let mut selector = [0u8; 4];
    selector[4 - data.len()..].copy_from_slice(data);
    selector
}

/// Extracts dispatcher selectors from decoded instructions, in code order.
///
/// Recognises `PUSH1..PUSH4 selector [DUPn] EQ` comparisons, and the
/// `PUSH3/PUSH4 pivot [DUPn] GT|LT` splits emitted by binary-search dispatchers.
/// Selectors pushed with fewer than four bytes (leading zero bytes dropped by
/// the optimizer) are left-padded.
pub fn extract_dispatch_selectors(insts: &[Instruction]) -> Vec<[u8; 4]> {
    let mut selectors = Vec::new();
    for (i, ins) in insts.iter().enumerate() {
        if !(PUSH1..=PUSH4).contains(&ins.opcode) || ins.is_truncated() {
            continue;
        }
        let mut j = i + 1;
        if insts.get(j).map_or(false, |next| is_dup(next.opcode)) {
            j += 1;
        }
        let Some(cmp) = insts.get(j) else { continue };
        match cmp.opcode {
            EQ => selectors.push(left_pad_selector(&ins.data)),
            GT | LT if ins.opcode >= PUSH3 => selectors.push(left_pad_selector(&ins.data)),
            _ => {}
        }
    }
    selectors
}

/// Distinct selectors the dispatcher compares calldata against.
pub fn dispatcher_selectors(insts: &[Instruction]) -> BTreeSet<[u8; 4]> {
    extract_dispatch_selectors(insts).into_iter().collect()
}

/// All full-width `PUSH32` constants; event topics are pushed this way before `LOGn`.
pub fn push32_constants(insts: &[Instruction]) -> BTreeSet<[u8; 32]> {
    insts
        .iter()
        .filter(|ins| ins.opcode == PUSH32 && !ins.is_truncated())
        .map(|ins| {
            let mut word = [0u8; 32];
            word.copy_from_slice(&ins.data);
            word
        })
        .collect()
}
