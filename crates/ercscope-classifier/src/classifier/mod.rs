use std::collections::BTreeSet;

use ercscope_core::{
    error::Result, traits::BytecodeClassifier, BytecodeBlob, InterfaceSignature, SignatureMatch,
};
use tracing::trace;

use crate::{
    dispatcher::{dispatcher_selectors, push32_constants},
    parser::{decode_bytecode, parse_instructions},
};

/// Matching policy for [`SelectorClassifier`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Also require every event topic of a signature to be pushed by the code.
    pub require_events: bool,
}

/// Analyzable view of a contract's runtime bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContract {
    pub code_size: usize,
    pub selectors: BTreeSet<[u8; 4]>,
    pub topics: BTreeSet<[u8; 32]>,
}

impl DecodedContract {
    /// Evaluates one signature. A signature with nothing to check never matches.
    pub fn implements(&self, signature: &InterfaceSignature, config: ClassifierConfig) -> bool {
        if signature.functions.is_empty() && (!config.require_events || signature.events.is_empty()) {
            return false;
        }
        let functions_ok = signature.selectors().all(|s| self.selectors.contains(s));
        let events_ok = !config.require_events || signature.topics().all(|t| self.topics.contains(t));
        functions_ok && events_ok
    }
}

/// Decodes a hex blob and recovers its dispatcher selectors and pushed topics.
pub fn decode_contract(blob: &BytecodeBlob) -> Result<DecodedContract> {
    let code = decode_bytecode(blob)?;
    let insts = parse_instructions(&code);
    Ok(DecodedContract {
        code_size: code.len(),
        selectors: dispatcher_selectors(&insts),
        topics: push32_constants(&insts),
    })
}

/// Classifier that checks interface signatures by selector presence in the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct SelectorClassifier {
    config: ClassifierConfig,
}

impl SelectorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ClassifierConfig {
        self.config
    }
}

impl BytecodeClassifier for SelectorClassifier {
    fn classify(
        &self,
        bytecode: &BytecodeBlob,
        signatures: &[InterfaceSignature],
    ) -> Result<Vec<SignatureMatch>> {
        let contract = decode_contract(bytecode)?;
        trace!(
            code_size = contract.code_size,
            selectors = contract.selectors.len(),
            topics = contract.topics.len(),
            "bytecode decoded"
        );
        Ok(signatures
            .iter()
            .map(|sig| SignatureMatch {
                name: sig.name.clone(),
                matched: contract.implements(sig, self.config),
            })
            .collect())
    }
}
