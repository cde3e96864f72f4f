//! Ercscope Classifier
//!
//! Decodes EVM runtime bytecode, recovers the selectors its dispatcher compares
//! calldata against, and checks them against named interface signatures.

pub mod parser;
pub mod dispatcher;
pub mod registry;
pub mod classifier;

pub use classifier::{decode_contract, ClassifierConfig, DecodedContract, SelectorClassifier};
pub use registry::{Registry, DEFAULT_SIGNATURES};
