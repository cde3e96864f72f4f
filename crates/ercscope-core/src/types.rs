/*!
 * Ercscope Types
 * 
 * Modelo de dados compartilhado: registros candidatos, bytecode,
 * assinaturas de interface e resultados de classificação
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{event_topic, function_selector, is_empty_code};

/// Registro candidato lido da fonte de endereços
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Posição da linha no arquivo de entrada (base zero)
    pub index: usize,
    pub address: String,
}

impl CandidateRecord {
    pub fn new(index: usize, address: impl Into<String>) -> Self {
        Self { index, address: address.into() }
    }
}

/// Bytecode implantado em um endereço, em hexadecimal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BytecodeBlob(String);

impl BytecodeBlob {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Representação hexadecimal como recebida do node
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Representação sem o prefixo `0x`
    pub fn trimmed(&self) -> &str {
        let s = self.0.trim();
        s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
    }
}

impl fmt::Display for BytecodeBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resultado da busca de código de um endereço
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Código implantado
    Code(BytecodeBlob),
    /// Nenhum código no endereço (conta externa ou contrato destruído)
    Empty,
}

impl FetchOutcome {
    /// Interpreta a resposta hexadecimal de `eth_getCode`
    pub fn from_hex(hex: impl Into<String>) -> Self {
        let hex = hex.into();
        if is_empty_code(&hex) {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Code(BytecodeBlob::new(hex))
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty)
    }
}

/// Função exigida por uma assinatura de interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionEntry {
    /// Assinatura textual, quando conhecida (ex.: `transfer(address,uint256)`)
    pub signature: Option<String>,
    pub selector: [u8; 4],
}

/// Evento associado a uma assinatura de interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventEntry {
    pub signature: Option<String>,
    pub topic: [u8; 32],
}

/// Assinatura de interface nomeada (ex.: ERC20)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSignature {
    pub name: String,
    pub functions: Vec<FunctionEntry>,
    pub events: Vec<EventEntry>,
}

impl InterfaceSignature {
    /// Constrói a assinatura a partir das assinaturas textuais de funções e eventos
    pub fn from_signatures(name: impl Into<String>, functions: &[&str], events: &[&str]) -> Self {
        Self {
            name: name.into(),
            functions: functions
                .iter()
                .map(|sig| FunctionEntry {
                    signature: Some((*sig).to_string()),
                    selector: function_selector(sig),
                })
                .collect(),
            events: events
                .iter()
                .map(|sig| EventEntry {
                    signature: Some((*sig).to_string()),
                    topic: event_topic(sig),
                })
                .collect(),
        }
    }

    pub fn selectors(&self) -> impl Iterator<Item = &[u8; 4]> {
        self.functions.iter().map(|f| &f.selector)
    }

    pub fn topics(&self) -> impl Iterator<Item = &[u8; 32]> {
        self.events.iter().map(|e| &e.topic)
    }
}

/// Resultado de uma verificação de assinatura
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMatch {
    pub name: String,
    pub matched: bool,
}

/// Resultado da classificação de um contrato
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub index: usize,
    pub address: String,
    /// Uma entrada por assinatura solicitada, na ordem do registro
    pub matches: Vec<SignatureMatch>,
}

impl ClassificationResult {
    /// Retorna o resultado de uma assinatura pelo nome
    pub fn get(&self, name: &str) -> Option<bool> {
        self.matches.iter().find(|m| m.name == name).map(|m| m.matched)
    }

    /// Nomes das assinaturas satisfeitas
    pub fn matched_names(&self) -> Vec<&str> {
        self.matches
            .iter()
            .filter(|m| m.matched)
            .map(|m| m.name.as_str())
            .collect()
    }
}

/// Estado de processamento de um endereço no lote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    Fetched,
    SkippedEmpty,
    Classified,
    FetchFailed,
    DecodeFailed,
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingState::Pending => write!(f, "pending"),
            ProcessingState::Fetched => write!(f, "fetched"),
            ProcessingState::SkippedEmpty => write!(f, "skipped_empty"),
            ProcessingState::Classified => write!(f, "classified"),
            ProcessingState::FetchFailed => write!(f, "fetch_failed"),
            ProcessingState::DecodeFailed => write!(f, "decode_failed"),
        }
    }
}
