//! Fonte de endereços: leitura de CSV com coluna `address`.

use csv::{ReaderBuilder, StringRecord, Trim};
use ercscope_core::{error::Result, CandidateRecord, Error};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Coluna obrigatória do arquivo de entrada
pub const ADDRESS_COLUMN: &str = "address";

/// Localiza uma coluna pelo nome, ignorando espaços e caixa
pub(crate) fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            Error::InputFormatError(format!(
                "coluna obrigatória '{}' ausente (cabeçalho: {:?})",
                name,
                headers.iter().collect::<Vec<_>>()
            ))
        })
}

pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))
}

/// Lê registros candidatos preservando a ordem do arquivo.
///
/// Com `limit`, apenas as primeiras N linhas são lidas.
pub fn read_candidates<R: Read>(reader: R, limit: Option<usize>) -> Result<Vec<CandidateRecord>> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| Error::InputFormatError(format!("cabeçalho ilegível: {}", e)))?
        .clone();
    let idx = column_index(&headers, ADDRESS_COLUMN)?;

    let mut records = Vec::new();
    for (row, result) in csv.records().take(limit.unwrap_or(usize::MAX)).enumerate() {
        let record = result
            .map_err(|e| Error::InputFormatError(format!("linha {}: {}", row + 1, e)))?;
        let address = record.get(idx).unwrap_or_default();
        records.push(CandidateRecord::new(row, address));
    }

    debug!(count = records.len(), ?limit, "registros candidatos carregados");
    Ok(records)
}

/// Carrega os registros candidatos de um arquivo CSV
pub fn load_candidates(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<CandidateRecord>> {
    let path = path.as_ref();
    read_candidates(open(path)?, limit)
}
