//! Fonte de bytecode embutida no próprio CSV (classificação offline).

use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use ercscope_core::{
    error::Result, traits::BytecodeFetcher, utils::normalize_address, Error, FetchOutcome,
};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::source::{column_index, open, ADDRESS_COLUMN};

/// Coluna de bytecode usada por padrão
pub const BYTECODE_COLUMN: &str = "bytecode";

/// Atende `fetch` a partir de uma coluna de bytecode, sem acesso à rede
#[derive(Debug, Clone, Default)]
pub struct InlineBytecodeSource {
    codes: HashMap<String, FetchOutcome>,
}

impl InlineBytecodeSource {
    pub fn from_reader<R: Read>(reader: R, bytecode_column: &str) -> Result<Self> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|e| Error::InputFormatError(format!("cabeçalho ilegível: {}", e)))?
            .clone();
        let address_idx = column_index(&headers, ADDRESS_COLUMN)?;
        let code_idx = column_index(&headers, bytecode_column)?;

        let mut codes = HashMap::new();
        for (row, result) in csv.records().enumerate() {
            let record = result
                .map_err(|e| Error::InputFormatError(format!("linha {}: {}", row + 1, e)))?;
            let address = record.get(address_idx).unwrap_or_default();
            if address.is_empty() {
                continue;
            }
            let code = record.get(code_idx).unwrap_or_default();
            codes.insert(normalize_address(address), FetchOutcome::from_hex(code));
        }
        Ok(Self { codes })
    }

    pub fn from_csv(path: impl AsRef<Path>, bytecode_column: &str) -> Result<Self> {
        Self::from_reader(open(path.as_ref())?, bytecode_column)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl BytecodeFetcher for InlineBytecodeSource {
    async fn fetch(&self, address: &str) -> Result<FetchOutcome> {
        self.codes
            .get(&normalize_address(address))
            .cloned()
            .ok_or_else(|| Error::ValidationError(format!("sem bytecode para {:?}", address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ercscope_core::BytecodeBlob;

    #[tokio::test]
    async fn serves_codes_by_normalized_address() {
        let input = "address,bytecode\n0xAA,0x6080\n0xbb,0x\n";
        let source = InlineBytecodeSource::from_reader(input.as_bytes(), BYTECODE_COLUMN).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(
            source.fetch("0xaa").await.unwrap(),
            FetchOutcome::Code(BytecodeBlob::new("0x6080"))
        );
        assert_eq!(source.fetch("0xBB").await.unwrap(), FetchOutcome::Empty);
        assert!(source.fetch("0xcc").await.is_err());
    }

    #[test]
    fn missing_bytecode_column() {
        let err = InlineBytecodeSource::from_reader("address\n0x01\n".as_bytes(), "code").unwrap_err();
        assert!(matches!(err, Error::InputFormatError(_)));
    }
}
