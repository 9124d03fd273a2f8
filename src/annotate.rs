//! Gene annotation and expression tables for joining factors to genes.

use crate::bed::{open_input, BedError, Result};
use rustc_hash::FxHashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// HGNC table columns.
const HGNC_SYMBOL_COL: usize = 1;
const HGNC_ALIASES_COL: usize = 6;
const HGNC_ENSEMBL_COL: usize = 36;

/// Gene symbol to Ensembl gene ids.
#[derive(Debug, Clone, Default)]
pub struct GeneNameMap {
    names: FxHashMap<String, Vec<String>>,
}

impl GeneNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, gene_id: impl Into<String>) {
        self.names.entry(symbol.into()).or_default().push(gene_id.into());
    }

    /// Gene ids for a symbol, in insertion order.
    pub fn get(&self, symbol: &str) -> Option<&[String]> {
        self.names.get(symbol).map(Vec::as_slice)
    }

    /// Append every entry of `other` to this map.
    pub fn extend(&mut self, other: GeneNameMap) {
        for (symbol, ids) in other.names {
            self.names.entry(symbol).or_default().extend(ids);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parse GENCODE GFF3 `gene` features into upper-cased names.
    pub fn from_gencode<R: BufRead>(reader: R) -> Result<Self> {
        let mut map = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            if line.split('\t').nth(2) != Some("gene") {
                continue;
            }
            let attributes = line.rsplit('\t').next().unwrap_or("");
            let gene_id = gff_attribute(attributes, "ID").map(strip_version);
            let gene_name = gff_attribute(attributes, "gene_name");
            match (gene_id, gene_name) {
                (Some(id), Some(name)) => map.insert(name.to_uppercase(), id),
                _ => {
                    return Err(BedError::Parse {
                        line: i + 1,
                        message: "gene feature without ID or gene_name".to_string(),
                    })
                }
            }
        }
        Ok(map)
    }

    /// Parse an HGNC complete-set table. Symbols and aliases map to the
    /// Ensembl gene id; rows without one are skipped.
    pub fn from_hgnc<R: BufRead>(reader: R) -> Result<Self> {
        let mut map = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if i == 0 || line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let ensembl_id = fields.get(HGNC_ENSEMBL_COL).map_or("", |s| s.trim());
            if ensembl_id.is_empty() {
                continue;
            }
            if !ensembl_id.starts_with("EN") {
                return Err(BedError::Parse {
                    line: i + 1,
                    message: format!("Unexpected Ensembl gene id '{}'", ensembl_id),
                });
            }

            let symbol = fields.get(HGNC_SYMBOL_COL).copied().unwrap_or("");
            let aliases = fields.get(HGNC_ALIASES_COL).copied().unwrap_or("");
            for name in std::iter::once(symbol).chain(aliases.split(',')) {
                let name = name.trim().trim_matches('"');
                if !name.is_empty() {
                    map.insert(name, ensembl_id);
                }
            }
        }
        Ok(map)
    }

    pub fn from_gencode_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_gencode(BufReader::new(open_input(path.as_ref())?))
    }

    pub fn from_hgnc_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_hgnc(BufReader::new(open_input(path.as_ref())?))
    }
}

/// Value of `key=` in a GFF3 attribute column.
fn gff_attribute<'a>(attributes: &'a str, key: &str) -> Option<&'a str> {
    attributes.split(';').find_map(|kv| {
        let (k, v) = kv.trim().split_once('=')?;
        (k == key).then_some(v)
    })
}

/// Drop an Ensembl version suffix (`ENSG000001.5` -> `ENSG000001`).
pub fn strip_version(gene_id: &str) -> &str {
    gene_id.split('.').next().unwrap_or(gene_id)
}

/// Expression values per gene, kept as the raw tab-joined row.
#[derive(Debug, Clone, Default)]
pub struct ExpressionTable {
    pub samples: Vec<String>,
    rows: FxHashMap<String, String>,
}

impl ExpressionTable {
    /// Parse a whitespace-separated table; the first row names the samples
    /// (after a leading gene column header).
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::default();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            if i == 0 {
                fields.next();
                table.samples = fields.map(str::to_string).collect();
                continue;
            }
            let Some(gene) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();
            if values.len() != table.samples.len() {
                return Err(BedError::Parse {
                    line: i + 1,
                    message: format!(
                        "Expected {} expression values, got {}",
                        table.samples.len(),
                        values.len()
                    ),
                });
            }
            table
                .rows
                .insert(strip_version(gene).to_string(), values.join("\t"));
        }
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(open_input(path.as_ref())?))
    }

    /// Tab-joined expression values for a gene id (version-insensitive).
    pub fn get(&self, gene_id: &str) -> Option<&str> {
        self.rows.get(strip_version(gene_id)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
