use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{parser::LogParser, stats::Statistics};

pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("{} is a directory", .0.display())]
    IsDirectory(PathBuf),
    #[error("line {line_number} is {length} characters long, limit is {max}")]
    LineTooLong {
        line_number: usize,
        length: usize,
        max: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub max_line_length: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Line counters for one input, independent of whether lines parsed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub total_lines: usize,
    pub parsed: usize,
    pub malformed: usize,
    pub longest_line: usize,
    pub shortest_line: usize,
}

impl IngestSummary {
    fn observe_length(&mut self, length: usize) {
        self.longest_line = self.longest_line.max(length);
        self.shortest_line = if self.total_lines == 1 {
            length
        } else {
            self.shortest_line.min(length)
        };
    }
}

// Like `BufRead::lines`, but invalid UTF-8 is replaced instead of ending the input.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Parse every line of `reader` and fold the good ones into `stats`.
///
/// Malformed lines are logged and skipped, and bytes that are not UTF-8 are
/// replaced before parsing. An over-long line stops this input with
/// [`IngestError::LineTooLong`]; records folded before it are kept.
pub fn analyze_reader<R: BufRead, P: LogParser>(
    mut reader: R,
    parser: &P,
    stats: &mut Statistics,
    options: &IngestOptions,
) -> Result<IngestSummary, IngestError> {
    let mut summary = IngestSummary::default();
    let mut buf = Vec::new();
    let mut line_number = 0;

    while let Some(line) = next_line(&mut reader, &mut buf)? {
        line_number += 1;
        let length = line.chars().count();
        if length > options.max_line_length {
            return Err(IngestError::LineTooLong {
                line_number,
                length,
                max: options.max_line_length,
            });
        }
        summary.total_lines += 1;
        summary.observe_length(length);

        match parser.parse(&line) {
            Ok(record) => {
                stats.fold(&record);
                summary.parsed += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping line {}: {}", line_number, e);
                summary.malformed += 1;
            }
        }
    }

    Ok(summary)
}

pub fn analyze_file<P: LogParser>(
    path: &Path,
    parser: &P,
    stats: &mut Statistics,
    options: &IngestOptions,
) -> Result<IngestSummary, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Err(IngestError::IsDirectory(path.to_path_buf()));
    }
    tracing::debug!("Analysing {}", path.display());
    let file = File::open(path)?;
    analyze_reader(BufReader::new(file), parser, stats, options)
}
