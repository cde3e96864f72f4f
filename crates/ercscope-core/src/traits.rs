/*!
 * Ercscope Traits
 * 
 * Fronteiras entre o orquestrador e os colaboradores externos
 */

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{BytecodeBlob, FetchOutcome, InterfaceSignature, SignatureMatch};

/// Trait para fontes de bytecode implantado
#[async_trait]
pub trait BytecodeFetcher: Send + Sync {
    /// Obtém o código de um endereço, distinguindo "sem código" de falha de rede
    async fn fetch(&self, address: &str) -> Result<FetchOutcome>;
}

#[async_trait]
impl<T: BytecodeFetcher + ?Sized> BytecodeFetcher for Arc<T> {
    async fn fetch(&self, address: &str) -> Result<FetchOutcome> {
        (**self).fetch(address).await
    }
}

#[async_trait]
impl<T: BytecodeFetcher + ?Sized> BytecodeFetcher for Box<T> {
    async fn fetch(&self, address: &str) -> Result<FetchOutcome> {
        (**self).fetch(address).await
    }
}

/// Trait para classificadores de bytecode
pub trait BytecodeClassifier: Send + Sync {
    /// Avalia o bytecode contra cada assinatura, de forma independente.
    /// Retorna uma entrada por assinatura, na ordem recebida.
    fn classify(
        &self,
        bytecode: &BytecodeBlob,
        signatures: &[InterfaceSignature],
    ) -> Result<Vec<SignatureMatch>>;
}

impl<T: BytecodeClassifier + ?Sized> BytecodeClassifier for Arc<T> {
    fn classify(
        &self,
        bytecode: &BytecodeBlob,
        signatures: &[InterfaceSignature],
    ) -> Result<Vec<SignatureMatch>> {
        (**self).classify(bytecode, signatures)
    }
}
