// Parsing and streaming aggregation of combined-format access logs.

pub mod client;
pub mod ingest;
pub mod parser;
pub mod report;
pub mod stats;

pub use client::{BrowserFamily, ClientProfile, OsFamily};
pub use ingest::{analyze_file, analyze_reader, IngestError, IngestOptions, IngestSummary};
pub use parser::{combined::CombinedParser, HttpMethod, LogParser, LogRecord, MalformedLineError};
pub use report::Report;
pub use stats::Statistics;
