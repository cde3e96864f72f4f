//! Comparação dos conjuntos de endereços de dois arquivos de resultado.

use ercscope_core::{error::Result, utils::normalize_address, CandidateRecord};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::source::load_candidates;

/// Endereços presentes em apenas um dos arquivos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressDiff {
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
}

impl AddressDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty() && self.only_in_second.is_empty()
    }
}

/// Conjunto normalizado de endereços, sem células vazias nem duplicatas
pub fn address_set(records: &[CandidateRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| !r.address.trim().is_empty())
        .map(|r| normalize_address(&r.address))
        .collect()
}

pub fn diff_addresses(first: &[CandidateRecord], second: &[CandidateRecord]) -> AddressDiff {
    let a = address_set(first);
    let b = address_set(second);
    AddressDiff {
        only_in_first: a.difference(&b).cloned().collect(),
        only_in_second: b.difference(&a).cloned().collect(),
    }
}

pub fn diff_files(first: impl AsRef<Path>, second: impl AsRef<Path>) -> Result<AddressDiff> {
    let a = load_candidates(first, None)?;
    let b = load_candidates(second, None)?;
    Ok(diff_addresses(&a, &b))
}
