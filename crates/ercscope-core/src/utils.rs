/*!
 * Ercscope Utils
 * 
 * Utilitários comuns usados em toda a workspace Ercscope
 */

use ethereum_types::Address;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};

/// Remove o prefixo `0x` de uma string hexadecimal
pub fn strip_0x(hex: &str) -> &str {
    hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex)
}

/// Converte uma string hexadecimal para Address
pub fn hex_to_address(hex: &str) -> Option<Address> {
    let hex_str = strip_0x(hex.trim());
    if hex_str.len() != 40 {
        return None;
    }
    Address::from_str(hex_str).ok()
}

/// Formata um Address para exibição
pub fn format_address(address: &Address) -> String {
    format!("0x{:x}", address)
}

/// Forma canônica de um endereço para comparação (minúsculas, com `0x`)
pub fn normalize_address(address: &str) -> String {
    format!("0x{}", strip_0x(address.trim()).to_ascii_lowercase())
}

/// Verifica se a resposta de `eth_getCode` indica ausência de código
pub fn is_empty_code(hex: &str) -> bool {
    strip_0x(hex.trim()).bytes().all(|b| b == b'0')
}

/// Calcula o hash Keccak-256 de dados
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut result = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut result);
    result
}

/// Seletor de função: os 4 primeiros bytes do Keccak-256 da assinatura
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Tópico de evento: o Keccak-256 da assinatura
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}
