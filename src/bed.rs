//! Streaming BED parser for peak and site files.

use crate::config::ValidationMode;
use crate::interval::Interval;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading, merging or writing intervals.
#[derive(Error, Debug)]
pub enum BedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid BED format: {0}")]
    InvalidFormat(String),

    #[error("Invalid interval {chrom}:{start}-{end}: {reason}")]
    InvalidInterval {
        chrom: String,
        start: i64,
        end: i64,
        reason: String,
    },

    #[error("Invalid peak file name '{}': {message}", path.display())]
    InvalidFileName { path: PathBuf, message: String },

    #[error("Worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, BedError>;

/// A parsed BED line: the interval plus any columns beyond the name.
#[derive(Debug, Clone, PartialEq)]
pub struct BedRecord {
    pub interval: Interval,
    pub name: Option<String>,
    pub extra_fields: Vec<String>,
}

impl BedRecord {
    #[inline]
    pub fn chrom(&self) -> &str {
        &self.interval.chrom
    }

    #[inline]
    pub fn start(&self) -> i64 {
        self.interval.start
    }

    #[inline]
    pub fn end(&self) -> i64 {
        self.interval.end
    }

    /// The final column of the line (name if there are no extras).
    pub fn last_field(&self) -> Option<&str> {
        self.extra_fields
            .last()
            .map(String::as_str)
            .or(self.name.as_deref())
    }

    /// One interval per entry of the comma-joined name column
    /// (`CTCF(motif),SP1` gives a CTCF and an SP1 interval). A record
    /// without labels yields a single unlabelled interval.
    pub fn into_labeled_intervals(self) -> Vec<Interval> {
        let labels = self
            .name
            .as_deref()
            .map(parse_label_list)
            .unwrap_or_default();
        if labels.is_empty() {
            return vec![self.interval];
        }
        labels
            .into_iter()
            .map(|label| self.interval.clone().with_label(label))
            .collect()
    }
}

/// True if the path names a gzip (or bgzip) file.
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz") || path_str.ends_with(".gzip")
}

/// Open a file for reading, transparently decompressing gzip input.
pub fn open_input(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        let decoder = MultiGzDecoder::new(file);
        if decoder.header().is_none() {
            return Err(BedError::InvalidFormat(format!(
                "Invalid gzip header: {}",
                path.display()
            )));
        }
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

/// A streaming BED file reader.
pub struct BedReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
    validation: ValidationMode,
}

impl BedReader<Box<dyn Read + Send>> {
    /// Open a BED file (plain or gzip) from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(open_input(path.as_ref())?))
    }
}

impl<R: Read> BedReader<R> {
    /// Create a new BED reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(64 * 1024, reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
            validation: ValidationMode::Permissive,
        }
    }

    /// Check each record's coordinates as it is read.
    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Read the next BED record.
    pub fn read_record(&mut self) -> Result<Option<BedRecord>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if should_skip_line(line) {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> Result<BedRecord> {
        // Tab-separated in practice, but space-separated peak files occur.
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() < 3 {
            return Err(BedError::Parse {
                line: self.line_number,
                message: format!("Expected at least 3 fields, got {}", fields.len()),
            });
        }

        let start = self.parse_position(fields[1], "start")?;
        let end = self.parse_position(fields[2], "end")?;
        let mut interval = Interval::new(fields[0], start, end);
        if fields.len() > 4 {
            interval.score = fields[4].parse().ok();
        }

        self.validation
            .check(&interval)
            .map_err(|e| BedError::Parse {
                line: self.line_number,
                message: e.to_string(),
            })?;

        Ok(BedRecord {
            interval,
            name: fields.get(3).map(|s| s.to_string()),
            extra_fields: fields.iter().skip(4).map(|s| s.to_string()).collect(),
        })
    }

    fn parse_position(&self, s: &str, field_name: &str) -> Result<i64> {
        s.trim().parse().map_err(|_| BedError::Parse {
            line: self.line_number,
            message: format!("Invalid {} position: '{}'", field_name, s),
        })
    }

    /// Get an iterator over all records.
    pub fn records(self) -> BedRecordIter<R> {
        BedRecordIter { reader: self }
    }
}

/// Iterator over BED records.
pub struct BedRecordIter<R: Read> {
    reader: BedReader<R>,
}

impl<R: Read> Iterator for BedRecordIter<R> {
    type Item = Result<BedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Check if a line should be skipped (empty, comment, or header).
#[inline]
pub fn should_skip_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

/// Split a comma-joined label list, dropping any parenthesised suffix
/// (`CTCF(motif)` becomes `CTCF`) and empty entries.
pub fn parse_label_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(|entry| entry.split('(').next().unwrap_or("").trim())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drain a reader into labelled intervals, one per name-column label.
pub fn read_labeled_intervals<R: Read>(reader: BedReader<R>) -> Result<Vec<Interval>> {
    let mut intervals = Vec::new();
    for record in reader.records() {
        intervals.extend(record?.into_labeled_intervals());
    }
    Ok(intervals)
}

/// Read all intervals from a BED file, labelled from the name column.
pub fn read_intervals<P: AsRef<Path>>(path: P, validation: ValidationMode) -> Result<Vec<Interval>> {
    read_labeled_intervals(BedReader::from_path(path)?.with_validation(validation))
}

/// Read all BED records from a file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<BedRecord>> {
    BedReader::from_path(path)?.records().collect()
}

/// Parse intervals from a string (useful for testing).
pub fn parse_intervals(content: &str) -> Result<Vec<Interval>> {
    read_labeled_intervals(BedReader::new(content.as_bytes()))
}
