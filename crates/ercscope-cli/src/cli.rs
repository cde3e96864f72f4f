//! Argumentos de linha de comando.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ercscope_core::{error::Result, Error};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Classificação em lote de contratos EVM por assinaturas de interface")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classifica os endereços de um CSV
    Classify(ClassifyArgs),
    /// Lista endereços presentes em apenas um de dois CSVs de resultado
    Diff(DiffArgs),
    /// Imprime o registro de assinaturas como JSON
    Selectors(SelectorsArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// CSV com a coluna `address`
    pub input: PathBuf,

    /// Processa no máximo N registros
    #[arg(long)]
    pub limit: Option<usize>,

    /// Endpoint JSON-RPC (http(s) ou ws(s))
    #[arg(long, env = "ERCSCOPE_RPC_URL", default_value = "https://cloudflare-eth.com/")]
    pub rpc_url: String,

    /// Endereços processados simultaneamente
    #[arg(long, env = "ERCSCOPE_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Timeout de cada chamada RPC, em segundos
    #[arg(long, env = "ERCSCOPE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retentativas após falha de rede
    #[arg(long, default_value_t = 0)]
    pub max_retries: u32,

    /// Espera entre retentativas, em milissegundos
    #[arg(long, default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Intervalo mínimo entre requisições ao node, em milissegundos
    #[arg(long)]
    pub request_interval_ms: Option<u64>,

    /// Assinaturas verificadas, separadas por vírgula, ou `all`
    #[arg(long, value_delimiter = ',', default_values = ["ERC20", "ERC721", "ERC1155"])]
    pub signatures: Vec<String>,

    /// Registro JSON adicional no formato `erc_config.json`
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Exige também os tópicos de evento de cada assinatura
    #[arg(long)]
    pub require_events: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Grava `address,matched_erc` dos contratos classificados
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Lê o bytecode desta coluna do CSV em vez de consultar o node
    #[arg(long)]
    pub bytecode_column: Option<String>,

    /// Encerra com código 1 se nenhum contrato for classificado
    #[arg(long)]
    pub strict: bool,
}

impl ClassifyArgs {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_interval(&self) -> Option<Duration> {
        self.request_interval_ms.map(Duration::from_millis)
    }

    /// Limite de uma busca completa, incluindo retentativas e a fila do
    /// espaçamento entre requisições
    pub fn fetch_timeout(&self) -> Result<Duration> {
        let overflow = || {
            Error::ValidationError(
                "timeout de busca excede o limite representável; reduza --timeout-secs ou --max-retries"
                    .to_string(),
            )
        };

        // Cada tentativa pode esperar a vez de todos os endereços em andamento
        let queue = match self.request_interval() {
            Some(interval) => u32::try_from(self.concurrency)
                .ok()
                .and_then(|n| interval.checked_mul(n))
                .ok_or_else(overflow)?,
            None => Duration::ZERO,
        };
        let attempts = self.max_retries.checked_add(1).ok_or_else(overflow)?;
        let retry_waits = self.retry_delay().checked_mul(self.max_retries).ok_or_else(overflow)?;

        self.rpc_timeout()
            .checked_add(queue)
            .and_then(|per_attempt| per_attempt.checked_mul(attempts))
            .and_then(|total| total.checked_add(retry_waits))
            .ok_or_else(overflow)
    }

    pub fn wants_all_signatures(&self) -> bool {
        self.signatures.len() == 1 && self.signatures[0].eq_ignore_ascii_case("all")
    }
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub first: PathBuf,
    pub second: PathBuf,
}

#[derive(Args, Debug)]
pub struct SelectorsArgs {
    /// Registro JSON adicional a combinar com o embutido
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Arquivo de saída (padrão: stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(args: &[&str]) -> ClassifyArgs {
        let argv = ["ercscope", "classify"].iter().chain(args.iter()).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Classify(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn classify_defaults() {
        let args = classify(&["contracts.csv"]);
        assert_eq!(args.input, PathBuf::from("contracts.csv"));
        assert_eq!(args.signatures, vec!["ERC20", "ERC721", "ERC1155"]);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.limit, None);
        assert_eq!(args.max_retries, 0);
        assert!(!args.strict);
        assert!(!args.wants_all_signatures());
    }

    #[test]
    fn signature_list_and_options() {
        let args = classify(&[
            "in.csv",
            "--signatures",
            "ERC20,ERC165",
            "--limit",
            "50",
            "--concurrency",
            "4",
            "--format",
            "json",
            "--bytecode-column",
            "bytecode",
            "--strict",
        ]);
        assert_eq!(args.signatures, vec!["ERC20", "ERC165"]);
        assert_eq!(args.limit, Some(50));
        assert_eq!(args.concurrency, 4);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.bytecode_column.as_deref(), Some("bytecode"));
        assert!(args.strict);
    }

    #[test]
    fn all_keyword() {
        assert!(classify(&["in.csv", "--signatures", "all"]).wants_all_signatures());
    }

    #[test]
    fn fetch_timeout_covers_retries() {
        let args = classify(&[
            "in.csv",
            "--timeout-secs",
            "2",
            "--max-retries",
            "2",
            "--retry-delay-ms",
            "100",
        ]);
        assert_eq!(args.fetch_timeout().unwrap(), Duration::from_millis(6_200));
    }

    #[test]
    fn fetch_timeout_covers_request_queue() {
        let args = classify(&[
            "in.csv",
            "--timeout-secs",
            "1",
            "--concurrency",
            "6",
            "--request-interval-ms",
            "300",
        ]);
        assert_eq!(args.fetch_timeout().unwrap(), Duration::from_millis(2_800));
    }

    #[test]
    fn oversized_timeout_is_a_validation_error() {
        let max = u64::MAX.to_string();
        let args = classify(&["in.csv", "--timeout-secs", max.as_str(), "--max-retries", "3"]);
        assert!(matches!(args.fetch_timeout(), Err(Error::ValidationError(_))));

        let retries = u32::MAX.to_string();
        let args = classify(&["in.csv", "--max-retries", retries.as_str()]);
        assert!(matches!(args.fetch_timeout(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn diff_requires_two_files() {
        assert!(Cli::try_parse_from(["ercscope", "diff", "a.csv"]).is_err());
        assert!(Cli::try_parse_from(["ercscope", "diff", "a.csv", "b.csv"]).is_ok());
    }
}
