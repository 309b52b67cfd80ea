pub mod aggregator;
pub mod archive_extractor;
pub mod flattener;
pub mod grading;
pub mod notebook_stats;
pub mod report_writer;
pub mod tree_scanner;

pub use archive_extractor::{ArchiveExtractor, ExtractOutcome, ProcessedArchives};
pub use flattener::{FlattenReport, Flattener};
pub use grading::GradingService;
pub use report_writer::ReportWriter;
pub use tree_scanner::{ScanSession, TreeScanner};
