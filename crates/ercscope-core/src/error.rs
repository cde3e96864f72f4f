use thiserror::Error;

/// Erros comuns da biblioteca Ercscope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Erro de comunicação com o node Ethereum
    #[error("Erro de RPC: {0}")]
    RpcError(String),

    /// Bytecode que não pode ser decodificado para análise
    #[error("Erro de decodificação: {0}")]
    DecodeError(String),

    /// Arquivo de entrada mal formado (ex.: coluna obrigatória ausente)
    #[error("Erro de formato de entrada: {0}")]
    InputFormatError(String),

    /// Erro de validação
    #[error("Erro de validação: {0}")]
    ValidationError(String),

    /// Erro de timeout
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Erro de leitura ou escrita
    #[error("Erro de E/S: {0}")]
    IoError(String),

    /// Erro genérico
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Indica falhas de transporte ou RPC, recuperáveis por endereço
    pub fn is_network(&self) -> bool {
        matches!(self, Error::RpcError(_) | Error::TimeoutError(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

/// Tipo de resultado usado em toda a biblioteca
pub type Result<T> = std::result::Result<T, Error>;
