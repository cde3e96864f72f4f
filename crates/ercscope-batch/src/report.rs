//! Relatórios do lote: narração no console, linhas JSON e CSV de resultados.

use chrono::{DateTime, Utc};
use csv::Writer;
use ercscope_core::{error::Result, CandidateRecord, Error, SignatureMatch};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::warn;

use crate::orchestrator::AddressOutcome;

/// Destino dos eventos do lote
pub trait ReportSink: Send + Sync {
    /// Início do processamento de um endereço
    fn on_start(&self, record: &CandidateRecord);

    /// Estado terminal de um endereço, entregue na ordem da entrada
    fn on_outcome(&self, record: &CandidateRecord, outcome: &AddressOutcome);

    /// Fim do lote
    fn on_summary(&self, _summary: &BatchSummary) {}
}

/// Contadores do lote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub classified: usize,
    pub skipped_empty: usize,
    pub fetch_failed: usize,
    pub decode_failed: usize,
    /// Registros não iniciados por cancelamento
    pub not_started: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            classified: 0,
            skipped_empty: 0,
            fetch_failed: 0,
            decode_failed: 0,
            not_started: 0,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: &AddressOutcome) {
        match outcome {
            AddressOutcome::Classified(_) => self.classified += 1,
            AddressOutcome::SkippedEmpty => self.skipped_empty += 1,
            AddressOutcome::FetchFailed(_) => self.fetch_failed += 1,
            AddressOutcome::DecodeFailed(_) => self.decode_failed += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.classified + self.skipped_empty + self.fetch_failed + self.decode_failed
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// Narração linha a linha de cada endereço processado
pub struct ConsoleReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_fmt(text).and_then(|_| out.write_all(b"\n")) {
            warn!(error = %e, "falha ao escrever relatório");
        }
    }
}

impl<W: Write + Send> ReportSink for ConsoleReporter<W> {
    fn on_start(&self, record: &CandidateRecord) {
        self.line(format_args!("Processing contract at {}", record.address));
    }

    fn on_outcome(&self, record: &CandidateRecord, outcome: &AddressOutcome) {
        match outcome {
            AddressOutcome::Classified(result) => {
                for m in &result.matches {
                    self.line(format_args!("Address {}: is{}: {}", record.address, m.name, m.matched));
                }
            }
            AddressOutcome::SkippedEmpty => {
                self.line(format_args!("Skipping {} because bytecode is empty.", record.address));
            }
            AddressOutcome::FetchFailed(err) => {
                self.line(format_args!("Error fetching bytecode for {}: {}", record.address, err));
            }
            AddressOutcome::DecodeFailed(err) => {
                self.line(format_args!("Error decoding bytecode for {}: {}", record.address, err));
            }
        }
    }

    fn on_summary(&self, summary: &BatchSummary) {
        self.line(format_args!(
            "Processed {} of {} addresses: {} classified, {} skipped (empty), {} fetch failures, {} decode failures{}",
            summary.processed(),
            summary.total,
            summary.classified,
            summary.skipped_empty,
            summary.fetch_failed,
            summary.decode_failed,
            if summary.cancelled { " (cancelled)" } else { "" },
        ));
        if let Err(e) = self.out.lock().flush() {
            warn!(error = %e, "falha ao escrever relatório");
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Classified {
        index: usize,
        address: &'a str,
        /// Na ordem das assinaturas solicitadas
        matches: &'a [SignatureMatch],
    },
    SkippedEmpty {
        index: usize,
        address: &'a str,
    },
    FetchFailed {
        index: usize,
        address: &'a str,
        error: String,
    },
    DecodeFailed {
        index: usize,
        address: &'a str,
        error: String,
    },
    Summary(&'a BatchSummary),
}

/// Uma linha JSON por endereço e uma linha de resumo
pub struct JsonLinesReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, event: &JsonEvent<'_>) {
        let mut out = self.out.lock();
        let written = serde_json::to_writer(&mut *out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"));
        if let Err(e) = written {
            warn!(error = %e, "falha ao escrever relatório JSON");
        }
    }
}

impl<W: Write + Send> ReportSink for JsonLinesReporter<W> {
    fn on_start(&self, _record: &CandidateRecord) {}

    fn on_outcome(&self, record: &CandidateRecord, outcome: &AddressOutcome) {
        let index = record.index;
        let address = record.address.as_str();
        let event = match outcome {
            AddressOutcome::Classified(result) => JsonEvent::Classified {
                index,
                address,
                matches: &result.matches,
            },
            AddressOutcome::SkippedEmpty => JsonEvent::SkippedEmpty { index, address },
            AddressOutcome::FetchFailed(err) => JsonEvent::FetchFailed {
                index,
                address,
                error: err.to_string(),
            },
            AddressOutcome::DecodeFailed(err) => JsonEvent::DecodeFailed {
                index,
                address,
                error: err.to_string(),
            },
        };
        self.emit(&event);
    }

    fn on_summary(&self, summary: &BatchSummary) {
        self.emit(&JsonEvent::Summary(summary));
        if let Err(e) = self.out.lock().flush() {
            warn!(error = %e, "falha ao escrever relatório JSON");
        }
    }
}

/// Grava `address,matched_erc` para cada contrato classificado
pub struct CsvResultWriter<W: Write + Send> {
    writer: Mutex<Writer<W>>,
}

impl CsvResultWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))?;
        Self::new(file)
    }
}

impl<W: Write + Send> CsvResultWriter<W> {
    pub fn new(out: W) -> Result<Self> {
        let mut writer = Writer::from_writer(out);
        writer
            .write_record(["address", "matched_erc"])
            .map_err(|e| Error::IoError(e.to_string()))?;
        Ok(Self { writer: Mutex::new(writer) })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .into_inner()
            .map_err(|e| Error::IoError(e.to_string()))
    }
}

impl<W: Write + Send> ReportSink for CsvResultWriter<W> {
    fn on_start(&self, _record: &CandidateRecord) {}

    fn on_outcome(&self, _record: &CandidateRecord, outcome: &AddressOutcome) {
        if let AddressOutcome::Classified(result) = outcome {
            let matched = result.matched_names().join(";");
            let mut writer = self.writer.lock();
            if let Err(e) = writer.write_record([result.address.as_str(), matched.as_str()]) {
                warn!(error = %e, "falha ao gravar CSV de resultados");
            }
        }
    }

    fn on_summary(&self, _summary: &BatchSummary) {
        if let Err(e) = self.writer.lock().flush() {
            warn!(error = %e, "falha ao gravar CSV de resultados");
        }
    }
}

/// Repassa cada evento para vários destinos
#[derive(Default)]
pub struct MultiReporter {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn ReportSink>) {
        self.sinks.push(sink);
    }
}

impl ReportSink for MultiReporter {
    fn on_start(&self, record: &CandidateRecord) {
        self.sinks.iter().for_each(|s| s.on_start(record));
    }

    fn on_outcome(&self, record: &CandidateRecord, outcome: &AddressOutcome) {
        self.sinks.iter().for_each(|s| s.on_outcome(record, outcome));
    }

    fn on_summary(&self, summary: &BatchSummary) {
        self.sinks.iter().for_each(|s| s.on_summary(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ercscope_core::ClassificationResult;

    fn classified(address: &str) -> AddressOutcome {
        AddressOutcome::Classified(ClassificationResult {
            index: 0,
            address: address.to_string(),
            matches: vec![
                SignatureMatch { name: "ERC20".into(), matched: true },
                SignatureMatch { name: "ERC721".into(), matched: false },
            ],
        })
    }

    #[test]
    fn console_lines_narrate_each_address() {
        let reporter = ConsoleReporter::new(Vec::new());
        let record = CandidateRecord::new(0, "0xaa");
        reporter.on_start(&record);
        reporter.on_outcome(&record, &classified("0xaa"));
        reporter.on_outcome(&CandidateRecord::new(1, "0xbb"), &AddressOutcome::SkippedEmpty);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Processing contract at 0xaa",
                "Address 0xaa: isERC20: true",
                "Address 0xaa: isERC721: false",
                "Skipping 0xbb because bytecode is empty.",
            ]
        );
    }

    #[test]
    fn json_lines_are_tagged() {
        let reporter = JsonLinesReporter::new(Vec::new());
        let record = CandidateRecord::new(3, "0xaa");
        reporter.on_outcome(&record, &classified("0xaa"));
        reporter.on_outcome(&record, &AddressOutcome::FetchFailed(Error::RpcError("down".into())));

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let events: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(events[0]["event"], "classified");
        assert_eq!(events[0]["index"], 3);
        assert_eq!(
            events[0]["matches"],
            serde_json::json!([
                {"name": "ERC20", "matched": true},
                {"name": "ERC721", "matched": false},
            ])
        );
        assert_eq!(events[1]["event"], "fetch_failed");
        assert!(events[1]["error"].as_str().unwrap().contains("down"));
    }

    #[test]
    fn json_matches_keep_requested_order() {
        let reporter = JsonLinesReporter::new(Vec::new());
        let outcome = AddressOutcome::Classified(ClassificationResult {
            index: 0,
            address: "0xaa".into(),
            matches: vec![
                SignatureMatch { name: "ERC721".into(), matched: false },
                SignatureMatch { name: "ERC1155".into(), matched: false },
                SignatureMatch { name: "ERC20".into(), matched: true },
            ],
        });
        reporter.on_outcome(&CandidateRecord::new(0, "0xaa"), &outcome);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let event: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        let names: Vec<_> = event["matches"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["ERC721", "ERC1155", "ERC20"]);
    }

    #[test]
    fn csv_results_only_contain_classified() {
        let writer = CsvResultWriter::new(Vec::new()).unwrap();
        let record = CandidateRecord::new(0, "0xaa");
        writer.on_outcome(&record, &classified("0xaa"));
        writer.on_outcome(&record, &AddressOutcome::SkippedEmpty);
        writer.on_summary(&BatchSummary::new(1));

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "address,matched_erc\n0xaa,ERC20\n");
    }

    #[test]
    fn summary_counts() {
        let mut summary = BatchSummary::new(4);
        summary.record(&classified("0xaa"));
        summary.record(&AddressOutcome::SkippedEmpty);
        summary.record(&AddressOutcome::DecodeFailed(Error::DecodeError("bad".into())));
        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.classified, 1);
        assert_eq!(summary.decode_failed, 1);
    }
}
