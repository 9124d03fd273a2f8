//! Join bound factors to the expression of the genes that encode them.

use crate::annotate::{ExpressionTable, GeneNameMap};
use crate::bed::Result;
use crate::output::SpanWriter;
use crate::sites::load_tf_sites;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Row type tag for gene expression lines.
pub const GENE_EXPRESSION_TAG: &str = "GENE_EXP";

/// TF expression command configuration.
#[derive(Debug, Clone, Default)]
pub struct TfExpressionCommand {
    /// GENCODE GFF3 annotation (gene names are upper-cased).
    pub gencode: Option<PathBuf>,
    /// HGNC complete-set table.
    pub hgnc: Option<PathBuf>,
}

impl TfExpressionCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gencode(mut self, path: Option<PathBuf>) -> Self {
        self.gencode = path;
        self
    }

    pub fn with_hgnc(mut self, path: Option<PathBuf>) -> Self {
        self.hgnc = path;
        self
    }

    /// Build the combined symbol map from whichever annotations are set.
    pub fn load_gene_names(&self) -> Result<GeneNameMap> {
        let mut names = GeneNameMap::new();
        if let Some(ref path) = self.gencode {
            names.extend(GeneNameMap::from_gencode_path(path)?);
            log::info!("Finished loading GENCODE gene names");
        }
        if let Some(ref path) = self.hgnc {
            names.extend(GeneNameMap::from_hgnc_path(path)?);
            log::info!("Finished loading HGNC gene names");
        }
        Ok(names)
    }

    /// Load annotations, expression and sites, then write the report.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, W: Write>(
        &self,
        sites_path: P,
        expression_path: Q,
        output: W,
    ) -> Result<ExpressionStats> {
        let names = self.load_gene_names()?;
        let expression = ExpressionTable::from_path(expression_path)?;
        log::info!("Loaded expression for {} genes", expression.len());

        let tf_sites = load_tf_sites(sites_path)?;
        log::info!("Loaded sites for {} factors", tf_sites.len());

        write_report(tf_sites.keys().map(String::as_str), &names, &expression, output)
    }
}

/// Write one `GENE_EXP` row per (factor, expressed gene) pair.
///
/// Factors without a gene mapping and genes without expression are logged
/// and skipped.
pub fn write_report<'a, I, W>(
    tf_symbols: I,
    names: &GeneNameMap,
    expression: &ExpressionTable,
    output: W,
) -> Result<ExpressionStats>
where
    I: IntoIterator<Item = &'a str>,
    W: Write,
{
    let mut stats = ExpressionStats::default();
    let mut writer = SpanWriter::new(output);

    let header = format!("type\tname\tgene_ens_id\t{}", expression.samples.join("\t"));
    writer.write_line(&header)?;

    for tf in tf_symbols {
        stats.factors += 1;
        let Some(gene_ids) = names.get(tf) else {
            log::warn!("No gene mapped to factor {}", tf);
            stats.unmapped += 1;
            continue;
        };
        for gene_id in gene_ids {
            match expression.get(gene_id) {
                Some(values) => {
                    writer.write_line(&format!(
                        "{}\t{}\t{}\t{}",
                        GENE_EXPRESSION_TAG, tf, gene_id, values
                    ))?;
                    stats.rows += 1;
                }
                None => {
                    log::warn!("No expression for {} (factor {})", gene_id, tf);
                    stats.unexpressed += 1;
                }
            }
        }
    }

    writer.flush()?;
    Ok(stats)
}

/// Statistics from an expression join.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpressionStats {
    pub factors: usize,
    pub rows: usize,
    pub unmapped: usize,
    pub unexpressed: usize,
}

impl fmt::Display for ExpressionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Factors: {}, Rows: {}, Unmapped: {}, Unexpressed genes: {}",
            self.factors, self.rows, self.unmapped, self.unexpressed
        )
    }
}
