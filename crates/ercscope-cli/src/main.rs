/*!
 * Ercscope CLI
 *
 * Classifica em lote os endereços de um CSV como ERC20, ERC721, ERC1155
 * (ou outras interfaces do registro) a partir do bytecode implantado.
 */

mod cli;

use anyhow::Context;
use clap::Parser;
use ercscope_batch::{
    diff_files, load_candidates, BatchConfig, BatchRunner, BatchSummary, CancelFlag,
    ConsoleReporter, CsvResultWriter, InlineBytecodeSource, JsonLinesReporter, MultiReporter,
};
use ercscope_classifier::{ClassifierConfig, Registry, SelectorClassifier};
use ercscope_core::{traits::BytecodeFetcher, InterfaceSignature};
use ercscope_rpc::{ErcscopeRpcClient, RpcConfig};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, ClassifyArgs, Command, DiffArgs, OutputFormat, SelectorsArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "execução interrompida");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Classify(args) => classify(args).await,
        Command::Diff(args) => diff(args),
        Command::Selectors(args) => selectors(args),
    }
}

fn load_registry(extra: Option<&Path>) -> anyhow::Result<Registry> {
    let mut registry = Registry::builtin();
    if let Some(path) = extra {
        let loaded = Registry::from_json_file(path)
            .with_context(|| format!("falha ao carregar registro {}", path.display()))?;
        registry.merge(loaded);
    }
    Ok(registry)
}

fn select_signatures(registry: &Registry, args: &ClassifyArgs) -> anyhow::Result<Vec<InterfaceSignature>> {
    if args.wants_all_signatures() {
        return Ok(registry.signatures().to_vec());
    }
    Ok(registry.select(args.signatures.as_slice())?)
}

async fn build_fetcher(args: &ClassifyArgs) -> anyhow::Result<Box<dyn BytecodeFetcher>> {
    if let Some(column) = &args.bytecode_column {
        let source = InlineBytecodeSource::from_csv(&args.input, column)
            .with_context(|| format!("falha ao ler a coluna {column:?}"))?;
        info!(entries = source.len(), "bytecode lido do CSV, sem acesso ao node");
        return Ok(Box::new(source));
    }

    let config = RpcConfig {
        endpoint: args.rpc_url.clone(),
        timeout: args.rpc_timeout(),
        max_retries: args.max_retries,
        retry_delay: args.retry_delay(),
        min_request_interval: args.request_interval(),
        ..RpcConfig::default()
    };
    let client = ErcscopeRpcClient::new(config)
        .await
        .with_context(|| format!("falha ao conectar em {}", args.rpc_url))?;
    Ok(Box::new(client))
}

fn batch_config(args: &ClassifyArgs) -> anyhow::Result<BatchConfig> {
    Ok(BatchConfig::builder()
        .concurrency(args.concurrency)
        .fetch_timeout(args.fetch_timeout()?)
        .build()?)
}

/// Em modo estrito, um lote sem nenhum contrato classificado é uma falha
fn strict_failure(args: &ClassifyArgs, summary: &BatchSummary) -> bool {
    args.strict && summary.classified == 0
}

async fn classify(args: ClassifyArgs) -> anyhow::Result<ExitCode> {
    // A entrada é validada antes de qualquer chamada de rede
    let records = load_candidates(&args.input, args.limit)
        .with_context(|| format!("falha ao ler {}", args.input.display()))?;
    let registry = load_registry(args.registry.as_deref())?;
    let signatures = select_signatures(&registry, &args)?;
    let config = batch_config(&args)?;

    let fetcher = build_fetcher(&args).await?;
    let classifier = SelectorClassifier::new(ClassifierConfig {
        require_events: args.require_events,
    });

    let mut reporter = match args.format {
        OutputFormat::Text => MultiReporter::new().with(ConsoleReporter::stdout()),
        OutputFormat::Json => MultiReporter::new().with(JsonLinesReporter::stdout()),
    };
    if let Some(path) = &args.output {
        let writer = CsvResultWriter::create(path)
            .with_context(|| format!("falha ao criar {}", path.display()))?;
        reporter.push(Box::new(writer));
    }

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupção recebida, encerrando após os endereços em andamento");
            on_interrupt.cancel();
        }
    });

    let runner = BatchRunner::new(fetcher, classifier, signatures, config);
    let summary = runner.run(&records, &reporter, &cancel).await;

    if strict_failure(&args, &summary) {
        warn!(total = summary.total, "nenhum contrato classificado");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn diff(args: DiffArgs) -> anyhow::Result<ExitCode> {
    let diff = diff_files(&args.first, &args.second).context("falha ao comparar arquivos")?;
    println!("Only in {}:", args.first.display());
    for address in &diff.only_in_first {
        println!("  {}", address);
    }
    println!("Only in {}:", args.second.display());
    for address in &diff.only_in_second {
        println!("  {}", address);
    }
    info!(
        only_in_first = diff.only_in_first.len(),
        only_in_second = diff.only_in_second.len(),
        "comparação concluída"
    );
    Ok(ExitCode::SUCCESS)
}

fn selectors(args: SelectorsArgs) -> anyhow::Result<ExitCode> {
    let registry = load_registry(args.registry.as_deref())?;
    let text = serde_json::to_string_pretty(&registry.to_config_json())?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, text + "\n")
                .with_context(|| format!("falha ao gravar {}", path.display()))?;
            info!(path = %path.display(), signatures = registry.names().len(), "registro gravado");
        }
        None => println!("{}", text),
    }
    Ok(ExitCode::SUCCESS)
}
