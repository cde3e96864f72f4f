use async_trait::async_trait;
use ercscope_batch::{
    load_candidates, AddressOutcome, BatchConfig, BatchRunner, BatchSummary, CancelFlag,
    ReportSink,
};
use ercscope_classifier::{Registry, SelectorClassifier, DEFAULT_SIGNATURES};
use ercscope_core::{
    error::Result,
    traits::{BytecodeClassifier, BytecodeFetcher},
    utils::function_selector,
    BytecodeBlob, CandidateRecord, Error, FetchOutcome, InterfaceSignature, ProcessingState,
    SignatureMatch,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum Reply {
    Code(&'static str),
    Empty,
    Fail,
    Slow(Duration, &'static str),
}

#[derive(Clone, Default)]
struct MockFetcher {
    replies: HashMap<String, Reply>,
    calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    fn with(mut self, address: &str, reply: Reply) -> Self {
        self.replies.insert(address.to_string(), reply);
        self
    }
}

#[async_trait]
impl BytecodeFetcher for MockFetcher {
    async fn fetch(&self, address: &str) -> Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(address) {
            Some(Reply::Code(code)) => Ok(FetchOutcome::Code(BytecodeBlob::new(*code))),
            Some(Reply::Empty) => Ok(FetchOutcome::Empty),
            Some(Reply::Slow(delay, code)) => {
                tokio::time::sleep(*delay).await;
                Ok(FetchOutcome::Code(BytecodeBlob::new(*code)))
            }
            Some(Reply::Fail) | None => Err(Error::RpcError("connection refused".into())),
        }
    }
}

/// Matches every signature, except for the `0xbad` blob which fails to decode.
struct MockClassifier;

impl BytecodeClassifier for MockClassifier {
    fn classify(&self, bytecode: &BytecodeBlob, signatures: &[InterfaceSignature]) -> Result<Vec<SignatureMatch>> {
        if bytecode.as_hex() == "0xbad" {
            return Err(Error::DecodeError("invalid hex".into()));
        }
        Ok(signatures
            .iter()
            .map(|s| SignatureMatch { name: s.name.clone(), matched: true })
            .collect())
    }
}

#[derive(Default)]
struct RecordingSink {
    started: Mutex<Vec<String>>,
    outcomes: Mutex<Vec<(String, AddressOutcome)>>,
    summaries: Mutex<Vec<BatchSummary>>,
    cancel_after_first: Option<CancelFlag>,
}

impl RecordingSink {
    fn states(&self) -> Vec<(String, ProcessingState)> {
        self.outcomes
            .lock()
            .iter()
            .map(|(a, o)| (a.clone(), o.state()))
            .collect()
    }

    fn results(&self) -> usize {
        self.outcomes.lock().iter().filter(|(_, o)| o.result().is_some()).count()
    }
}

impl ReportSink for RecordingSink {
    fn on_start(&self, record: &CandidateRecord) {
        self.started.lock().push(record.address.clone());
    }

    fn on_outcome(&self, record: &CandidateRecord, outcome: &AddressOutcome) {
        self.outcomes.lock().push((record.address.clone(), outcome.clone()));
        if let Some(flag) = &self.cancel_after_first {
            flag.cancel();
        }
    }

    fn on_summary(&self, summary: &BatchSummary) {
        self.summaries.lock().push(summary.clone());
    }
}

fn records(addresses: &[&str]) -> Vec<CandidateRecord> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, a)| CandidateRecord::new(i, *a))
        .collect()
}

fn signatures() -> Vec<InterfaceSignature> {
    Registry::builtin().select(DEFAULT_SIGNATURES).unwrap()
}

fn csv_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const AAAA: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

#[tokio::test]
async fn empty_code_yields_single_skip_notice() {
    let fetcher = MockFetcher::default().with(AAAA, Reply::Empty);
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), BatchConfig::default());
    let sink = RecordingSink::default();

    let summary = runner.run(&records(&[AAAA]), &sink, &CancelFlag::new()).await;

    assert_eq!(sink.states(), vec![(AAAA.to_string(), ProcessingState::SkippedEmpty)]);
    assert_eq!(sink.results(), 0);
    assert_eq!(summary.skipped_empty, 1);
    assert_eq!(summary.classified, 0);
}

#[tokio::test]
async fn network_error_does_not_stop_the_batch() {
    let fetcher = MockFetcher::default()
        .with("0x01", Reply::Fail)
        .with("0x02", Reply::Code("0x6080"));
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), BatchConfig::default());
    let sink = RecordingSink::default();

    let summary = runner.run(&records(&["0x01", "0x02"]), &sink, &CancelFlag::new()).await;

    assert_eq!(
        sink.states(),
        vec![
            ("0x01".to_string(), ProcessingState::FetchFailed),
            ("0x02".to_string(), ProcessingState::Classified),
        ]
    );
    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(summary.classified, 1);
    assert_eq!(sink.summaries.lock().len(), 1);
}

#[tokio::test]
async fn decode_error_is_recorded_per_address() {
    let fetcher = MockFetcher::default()
        .with("0x01", Reply::Code("0xbad"))
        .with("0x02", Reply::Code("0x6080"));
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), BatchConfig::default());
    let sink = RecordingSink::default();

    runner.run(&records(&["0x01", "0x02"]), &sink, &CancelFlag::new()).await;

    let outcomes = sink.outcomes.lock();
    assert!(matches!(outcomes[0].1, AddressOutcome::DecodeFailed(Error::DecodeError(_))));
    assert_eq!(outcomes[1].1.state(), ProcessingState::Classified);
}

#[tokio::test]
async fn classified_result_has_one_entry_per_signature() {
    let fetcher = MockFetcher::default().with("0x01", Reply::Code("0x6080"));
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), BatchConfig::default());
    let sink = RecordingSink::default();

    runner.run(&records(&["0x01"]), &sink, &CancelFlag::new()).await;

    let outcomes = sink.outcomes.lock();
    let result = outcomes[0].1.result().unwrap();
    assert_eq!(result.matches.len(), DEFAULT_SIGNATURES.len());
    assert_eq!(result.address, "0x01");
}

#[tokio::test]
async fn erc20_contract_from_csv_end_to_end() {
    let mut code = vec![0x60, 0x00, 0x35, 0x60, 0xe0, 0x1c];
    for sig in [
        "allowance(address,address)",
        "approve(address,uint256)",
        "balanceOf(address)",
        "totalSupply()",
        "transfer(address,uint256)",
        "transferFrom(address,address,uint256)",
    ] {
        code.push(0x80);
        code.push(0x63);
        code.extend_from_slice(&function_selector(sig));
        code.extend_from_slice(&[0x14, 0x61, 0x01, 0x00, 0x57]);
    }
    code.push(0x00);
    let bytecode: &'static str = Box::leak(format!("0x{}", hex::encode(code)).into_boxed_str());

    let input = csv_file(&format!("address\n{}\n", AAAA));
    let records = load_candidates(input.path(), None).unwrap();

    let fetcher = MockFetcher::default().with(AAAA, Reply::Code(bytecode));
    let runner = BatchRunner::new(fetcher, SelectorClassifier::default(), signatures(), BatchConfig::default());
    let sink = RecordingSink::default();
    runner.run(&records, &sink, &CancelFlag::new()).await;

    let outcomes = sink.outcomes.lock();
    let result = outcomes[0].1.result().unwrap();
    assert_eq!(result.get("ERC20"), Some(true));
    assert_eq!(result.get("ERC721"), Some(false));
    assert_eq!(result.get("ERC1155"), Some(false));
}

#[tokio::test]
async fn missing_address_header_fails_before_any_fetch() {
    let fetcher = MockFetcher::default();
    let calls = fetcher.calls.clone();
    let input = csv_file("contract,name\n0x01,foo\n");

    let err = load_candidates(input.path(), None).unwrap_err();

    assert!(matches!(err, Error::InputFormatError(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn limit_bounds_the_batch() {
    let input = csv_file("address\n0x01\n0x02\n0x03\n0x04\n");
    let records = load_candidates(input.path(), Some(2)).unwrap();

    let fetcher = MockFetcher::default()
        .with("0x01", Reply::Empty)
        .with("0x02", Reply::Empty);
    let calls = fetcher.calls.clone();
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), BatchConfig::default());
    let summary = runner.run(&records, &RecordingSink::default(), &CancelFlag::new()).await;

    assert_eq!(summary.total, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_run_keeps_input_order() {
    let fetcher = MockFetcher::default()
        .with("0x01", Reply::Slow(Duration::from_millis(80), "0x6080"))
        .with("0x02", Reply::Slow(Duration::from_millis(40), "0xbad"))
        .with("0x03", Reply::Empty)
        .with("0x04", Reply::Fail);
    let input = records(&["0x01", "0x02", "0x03", "0x04"]);

    let sequential = RecordingSink::default();
    BatchRunner::new(fetcher.clone(), MockClassifier, signatures(), BatchConfig::default())
        .run(&input, &sequential, &CancelFlag::new())
        .await;

    let concurrent = RecordingSink::default();
    let config = BatchConfig::builder().concurrency(4).build().unwrap();
    BatchRunner::new(fetcher, MockClassifier, signatures(), config)
        .run(&input, &concurrent, &CancelFlag::new())
        .await;

    assert_eq!(sequential.states(), concurrent.states());
    assert_eq!(concurrent.started.lock().len(), 4);
}

#[tokio::test]
async fn slow_fetch_times_out_as_fetch_failure() {
    let fetcher = MockFetcher::default().with("0x01", Reply::Slow(Duration::from_millis(500), "0x6080"));
    let config = BatchConfig::builder()
        .fetch_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), config);
    let sink = RecordingSink::default();

    runner.run(&records(&["0x01"]), &sink, &CancelFlag::new()).await;

    let outcomes = sink.outcomes.lock();
    match &outcomes[0].1 {
        AddressOutcome::FetchFailed(err) => assert!(err.is_network()),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_before_next_address() {
    let cancel = CancelFlag::new();
    let fetcher = MockFetcher::default()
        .with("0x01", Reply::Empty)
        .with("0x02", Reply::Empty)
        .with("0x03", Reply::Empty);
    let calls = fetcher.calls.clone();
    let runner = BatchRunner::new(fetcher, MockClassifier, signatures(), BatchConfig::default());
    let sink = RecordingSink { cancel_after_first: Some(cancel.clone()), ..Default::default() };

    let summary = runner.run(&records(&["0x01", "0x02", "0x03"]), &sink, &cancel).await;

    assert!(summary.cancelled);
    assert_eq!(summary.skipped_empty, 1);
    assert_eq!(summary.not_started, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.started.lock().len(), 1);
}

#[test]
fn builder_rejects_zero_concurrency() {
    assert!(BatchConfig::builder().concurrency(0).build().is_err());
    assert!(BatchConfig::builder().fetch_timeout(Duration::ZERO).build().is_err());
    assert_eq!(BatchConfig::builder().build().unwrap(), BatchConfig::default());
}
