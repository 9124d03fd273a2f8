//! Efficient output formatting for merged spans.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation in the hot path.

use crate::bed::{BedError, Result};
use crate::interval::MergedSpan;
use std::io::{BufWriter, Write};

/// Buffer size for SpanWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Writer for `contig<TAB>start<TAB>end<TAB>labels` records.
pub struct SpanWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
    report_score: bool,
}

impl<W: Write> SpanWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
            report_score: false,
        }
    }

    /// Append the span's max member score (`.` when absent) as a fifth column.
    pub fn with_score(mut self, report_score: bool) -> Self {
        self.report_score = report_score;
        self
    }

    /// Write chrom, start and end without a trailing newline.
    #[inline]
    pub fn write_bed3(&mut self, chrom: &str, start: i64, end: i64) -> Result<()> {
        self.writer.write_all(chrom.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(self.itoa_buf.format(start).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(self.itoa_buf.format(end).as_bytes())?;
        Ok(())
    }

    /// Write a merged span as one line.
    pub fn write_span(&mut self, span: &MergedSpan) -> Result<()> {
        self.write_bed3(&span.chrom, span.start, span.end)?;
        self.write_tab()?;
        self.write_labels(&span.labels)?;
        if self.report_score {
            self.write_tab()?;
            match span.max_score() {
                Some(score) => self.write_float(score)?,
                None => self.writer.write_all(b".")?,
            }
        }
        self.write_newline()
    }

    /// Write a merged span prefixed by an identifier column.
    pub fn write_tagged_span(&mut self, tag: &str, span: &MergedSpan) -> Result<()> {
        self.writer.write_all(tag.as_bytes())?;
        self.write_tab()?;
        self.write_span(span)
    }

    /// Write labels joined by commas.
    #[inline]
    pub fn write_labels(&mut self, labels: &[String]) -> Result<()> {
        for (i, label) in labels.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b",")?;
            }
            self.writer.write_all(label.as_bytes())?;
        }
        Ok(())
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.write_newline()
    }

    #[inline]
    pub fn write_tab(&mut self) -> Result<()> {
        self.writer.write_all(b"\t").map_err(BedError::Io)
    }

    #[inline]
    pub fn write_newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n").map_err(BedError::Io)
    }

    /// Write a float using ryu.
    #[inline]
    pub fn write_float(&mut self, f: f64) -> Result<()> {
        self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
