/*!
 * Ercscope Batch
 *
 * Orquestração em lote: fonte de endereços, busca de bytecode,
 * classificação e relatórios
 */

pub mod source;
pub mod inline;
pub mod orchestrator;
pub mod report;
pub mod diff;

pub use diff::{diff_files, AddressDiff};
pub use inline::{InlineBytecodeSource, BYTECODE_COLUMN};
pub use orchestrator::{AddressOutcome, BatchConfig, BatchConfigBuilder, BatchRunner, CancelFlag};
pub use report::{
    BatchSummary, ConsoleReporter, CsvResultWriter, JsonLinesReporter, MultiReporter, ReportSink,
};
pub use source::{load_candidates, read_candidates, ADDRESS_COLUMN};
