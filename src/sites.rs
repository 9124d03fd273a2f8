//! Readers for merged TF-site tracks.
//!
//! A site track is a BED file whose last column is a comma-joined label
//! list, as written by the flatten command or shipped by ENCODE
//! (`CTCF(motif),SP1,...`). Tracks are large, so lines are split with
//! memchr without allocating per field.

use crate::bed::{open_input, parse_label_list, BedError, Result};
use crate::interval::Interval;
use memchr::{memchr, memrchr};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A parsed site line borrowing from the line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteFields<'a> {
    pub chrom: &'a str,
    pub start: i64,
    pub end: i64,
    pub labels: &'a str,
}

/// Split a site line into chrom, start, end and its final (label) column.
///
/// Returns None if the line has fewer than four columns or a coordinate is
/// not an integer.
#[inline]
pub fn parse_site_line(line: &[u8]) -> Option<SiteFields<'_>> {
    let line = strip_eol(line);

    let tab1 = memchr(b'\t', line)?;
    let rest1 = &line[tab1 + 1..];
    let tab2 = memchr(b'\t', rest1)?;
    let rest2 = &rest1[tab2 + 1..];
    let tab3 = memchr(b'\t', rest2)?;
    let last_tab = memrchr(b'\t', line)?;

    Some(SiteFields {
        chrom: std::str::from_utf8(&line[..tab1]).ok()?,
        start: parse_i64(&rest1[..tab2])?,
        end: parse_i64(&rest2[..tab3])?,
        labels: std::str::from_utf8(&line[last_tab + 1..]).ok()?,
    })
}

#[inline]
fn strip_eol(mut line: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = line.split_last() {
        if last == b'\n' || last == b'\r' {
            line = rest;
        } else {
            break;
        }
    }
    line
}

#[inline]
fn parse_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

/// Visit every site in a track with its parsed label list.
fn for_each_site<F>(path: &Path, mut f: F) -> Result<usize>
where
    F: FnMut(&str, i64, i64, Vec<String>),
{
    let mut reader = BufReader::with_capacity(256 * 1024, open_input(path)?);
    let mut buf = Vec::with_capacity(1024);
    let mut line_number = 0;
    let mut sites = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let line = strip_eol(&buf);
        if line.is_empty() || line[0] == b'#' || line.starts_with(b"track") || line.starts_with(b"browser") {
            continue;
        }

        let fields = parse_site_line(line).ok_or_else(|| BedError::Parse {
            line: line_number,
            message: "Expected chrom, start, end and a label column".to_string(),
        })?;
        f(fields.chrom, fields.start, fields.end, parse_label_list(fields.labels));
        sites += 1;
    }

    Ok(sites)
}

/// Load a site track as one labelled interval per (site, label) pair.
///
/// Merging these intervals regroups co-bound factors under shared spans.
pub fn load_labeled_sites<P: AsRef<Path>>(path: P) -> Result<Vec<Interval>> {
    let mut intervals = Vec::new();
    let n = for_each_site(path.as_ref(), |chrom, start, end, labels| {
        for label in labels {
            intervals.push(Interval::labeled(chrom, start, end, label));
        }
    })?;
    log::info!("Loaded {} sites ({} labelled intervals)", n, intervals.len());
    Ok(intervals)
}

/// Load a site track keyed by factor: every site a factor binds.
pub fn load_tf_sites<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, Vec<Interval>>> {
    let mut by_tf: BTreeMap<String, Vec<Interval>> = BTreeMap::new();
    for_each_site(path.as_ref(), |chrom, start, end, labels| {
        for label in labels {
            let interval = Interval::labeled(chrom, start, end, label.as_str());
            by_tf.entry(label).or_default().push(interval);
        }
    })?;
    Ok(by_tf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_site_line() {
        let fields = parse_site_line(b"chr1\t100\t200\tCTCF(motif),SP1\n").unwrap();
        assert_eq!(fields.chrom, "chr1");
        assert_eq!(fields.start, 100);
        assert_eq!(fields.end, 200);
        assert_eq!(fields.labels, "CTCF(motif),SP1");

        let fields = parse_site_line(b"chr1\t100\t200\tx\t900\tA,B\r\n").unwrap();
        assert_eq!(fields.labels, "A,B");

        assert!(parse_site_line(b"chr1\t100\t200").is_none());
        assert!(parse_site_line(b"chr1\tabc\t200\tA").is_none());
    }

    fn site_track() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "# merged sites\nchr1\t100\t200\tCTCF(motif),SP1\nchr1\t400\t450\tSP1\nchr2\t10\t20\tRAD21\n"
        )
        .unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_tf_sites() {
        let file = site_track();
        let sites = load_tf_sites(file.path()).unwrap();

        assert_eq!(sites.keys().collect::<Vec<_>>(), vec!["CTCF", "RAD21", "SP1"]);
        assert_eq!(sites["SP1"].len(), 2);
        assert_eq!(sites["SP1"][1].start, 400);
        assert_eq!(sites["CTCF"][0].label.as_deref(), Some("CTCF"));
    }

    #[test]
    fn test_load_labeled_sites() {
        let file = site_track();
        let intervals = load_labeled_sites(file.path()).unwrap();
        assert_eq!(intervals.len(), 4);
        assert_eq!(intervals[0], Interval::labeled("chr1", 100, 200, "CTCF"));
        assert_eq!(intervals[1], Interval::labeled("chr1", 100, 200, "SP1"));
    }

    #[test]
    fn test_malformed_site_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "chr1\t1\t2\tA\nchr1\t5\t6\n").unwrap();
        file.flush().unwrap();

        match load_labeled_sites(file.path()) {
            Err(BedError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
