//! Orquestrador do lote: busca, classificação e relatório por endereço.

use ercscope_core::{
    error::Result,
    traits::{BytecodeClassifier, BytecodeFetcher},
    CandidateRecord, ClassificationResult, Error, FetchOutcome, InterfaceSignature,
    ProcessingState,
};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::report::{BatchSummary, ReportSink};

/// Configuração do lote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Endereços processados simultaneamente (1 = sequencial)
    pub concurrency: usize,
    /// Limite de tempo de cada busca de bytecode
    pub fetch_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl BatchConfig {
    /// Cria um builder para a configuração
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }
}

/// Builder para configuração do lote
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    concurrency: Option<usize>,
    fetch_timeout: Option<Duration>,
}

impl BatchConfigBuilder {
    /// Define o número de endereços processados simultaneamente
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Define o timeout de cada busca
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Constrói a configuração
    pub fn build(self) -> Result<BatchConfig> {
        let defaults = BatchConfig::default();
        let concurrency = self.concurrency.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(Error::ValidationError("concurrency deve ser maior que zero".to_string()));
        }
        let fetch_timeout = self.fetch_timeout.unwrap_or(defaults.fetch_timeout);
        if fetch_timeout.is_zero() {
            return Err(Error::ValidationError("fetch_timeout deve ser maior que zero".to_string()));
        }
        Ok(BatchConfig { concurrency, fetch_timeout })
    }
}

/// Estado terminal de um endereço
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOutcome {
    SkippedEmpty,
    Classified(ClassificationResult),
    FetchFailed(Error),
    DecodeFailed(Error),
}

impl AddressOutcome {
    pub fn state(&self) -> ProcessingState {
        match self {
            AddressOutcome::SkippedEmpty => ProcessingState::SkippedEmpty,
            AddressOutcome::Classified(_) => ProcessingState::Classified,
            AddressOutcome::FetchFailed(_) => ProcessingState::FetchFailed,
            AddressOutcome::DecodeFailed(_) => ProcessingState::DecodeFailed,
        }
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            AddressOutcome::Classified(result) => Some(result),
            _ => None,
        }
    }
}

/// Sinal de cancelamento cooperativo, verificado antes de cada endereço
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executa o pipeline fonte → busca → classificação → relatório
pub struct BatchRunner<F, C> {
    fetcher: F,
    classifier: C,
    signatures: Vec<InterfaceSignature>,
    config: BatchConfig,
}

impl<F: BytecodeFetcher, C: BytecodeClassifier> BatchRunner<F, C> {
    pub fn new(fetcher: F, classifier: C, signatures: Vec<InterfaceSignature>, config: BatchConfig) -> Self {
        Self { fetcher, classifier, signatures, config }
    }

    pub fn signatures(&self) -> &[InterfaceSignature] {
        &self.signatures
    }

    fn transition(record: &CandidateRecord, state: ProcessingState) {
        debug!(index = record.index, address = %record.address, %state, "transição de estado");
    }

    /// Processa um único endereço até um estado terminal
    pub async fn process(&self, record: &CandidateRecord, reporter: &dyn ReportSink) -> AddressOutcome {
        Self::transition(record, ProcessingState::Pending);
        reporter.on_start(record);

        let fetched = match tokio::time::timeout(
            self.config.fetch_timeout,
            self.fetcher.fetch(&record.address),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::TimeoutError(format!(
                "busca de bytecode excedeu {:?}",
                self.config.fetch_timeout
            ))),
        };

        let outcome = match fetched {
            Err(err) => {
                warn!(address = %record.address, error = %err, "falha ao obter bytecode");
                AddressOutcome::FetchFailed(err)
            }
            Ok(FetchOutcome::Empty) => {
                debug!(address = %record.address, "endereço sem código");
                AddressOutcome::SkippedEmpty
            }
            Ok(FetchOutcome::Code(blob)) => {
                Self::transition(record, ProcessingState::Fetched);
                match self.classifier.classify(&blob, &self.signatures) {
                    Ok(matches) => AddressOutcome::Classified(ClassificationResult {
                        index: record.index,
                        address: record.address.clone(),
                        matches,
                    }),
                    Err(err) => {
                        warn!(address = %record.address, error = %err, "falha ao decodificar bytecode");
                        AddressOutcome::DecodeFailed(err)
                    }
                }
            }
        };

        Self::transition(record, outcome.state());
        outcome
    }

    /// Processa os registros e entrega os resultados ao `reporter` na ordem da entrada
    pub async fn run(
        &self,
        records: &[CandidateRecord],
        reporter: &dyn ReportSink,
        cancel: &CancelFlag,
    ) -> BatchSummary {
        let mut summary = BatchSummary::new(records.len());
        info!(
            total = records.len(),
            concurrency = self.config.concurrency,
            signatures = self.signatures.len(),
            "iniciando lote"
        );

        let mut outcomes = stream::iter(records)
            .map(|record| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.process(record, reporter).await)
            })
            .buffered(self.config.concurrency.max(1));

        let mut position = 0;
        while let Some(item) = outcomes.next().await {
            let record = &records[position];
            position += 1;
            match item {
                Some(outcome) => {
                    reporter.on_outcome(record, &outcome);
                    summary.record(&outcome);
                }
                None => {
                    summary.cancelled = true;
                    summary.not_started += 1;
                }
            }
        }

        summary.finish();
        info!(
            classified = summary.classified,
            skipped_empty = summary.skipped_empty,
            fetch_failed = summary.fetch_failed,
            decode_failed = summary.decode_failed,
            cancelled = summary.cancelled,
            "lote concluído"
        );
        reporter.on_summary(&summary);
        summary
    }
}
