//! peakmerge: merge labelled ChIP-seq peaks into binding sites
//!
//! Usage: peakmerge <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use peakmerge::bed::BedError;
use peakmerge::catalog::SelectionPolicy;
use peakmerge::commands::{
    CatalogCommand, EnhancerCommand, FlattenCommand, MergeByTfCommand, MergeCommand,
    TfExpressionCommand,
};
use peakmerge::config::{MergeConfig, ValidationMode};

#[derive(Parser)]
#[command(name = "peakmerge")]
#[command(version)]
#[command(about = "Merge overlapping, factor-labelled ChIP-seq peaks into binding sites", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge overlapping intervals, keeping the labels of merged members
    Merge {
        /// Input BED file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Stop extending a merged span once it is wider than this
        #[arg(short = 'w', long)]
        max_span_width: Option<u64>,

        /// Reject negative coordinates and start > end
        #[arg(long)]
        strict: bool,

        /// Report the highest member score as a fifth column
        #[arg(long)]
        score: bool,

        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Flatten peak files from many factors into labelled binding sites
    Flatten {
        /// Peak files named <label>_<name>_..., where name ends in -human or -mouse
        #[arg(required = true)]
        peak_files: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop extending a merged site once it is wider than this
        #[arg(short = 'w', long)]
        max_span_width: Option<u64>,

        /// Reject negative coordinates and start > end
        #[arg(long)]
        strict: bool,
    },

    /// Merge each factor's peak files into <tf>.mergedpeaks.bed
    MergeByTf {
        /// Peak files named <label>_<name>_...
        #[arg(required = true)]
        peak_files: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Also write mergedpeaks.bed across all factors
        #[arg(long)]
        all: bool,

        /// Stop extending a merged span once it is wider than this
        #[arg(short = 'w', long)]
        max_span_width: Option<u64>,

        /// Reject negative coordinates and start > end
        #[arg(long)]
        strict: bool,
    },

    /// Call multi-factor enhancers inside TADs
    Enhancers {
        /// Merged binding sites; the last column lists the bound factors
        #[arg(short, long)]
        sites: PathBuf,

        /// TAD BED file (name column is the TAD id)
        #[arg(long)]
        tads: PathBuf,

        /// Stop extending a candidate enhancer once it is wider than this
        #[arg(short = 'w', long)]
        max_span_width: Option<u64>,

        /// Minimum number of distinct factors per enhancer
        #[arg(long, default_value = "1")]
        min_tfs: usize,

        /// Worker threads scanning TADs (default: number of CPUs)
        #[arg(long)]
        workers: Option<usize>,

        /// Reject negative coordinates and start > end
        #[arg(long)]
        strict: bool,
    },

    /// Report expression of the genes encoding each bound factor
    TfExpression {
        /// Merged binding sites; the last column lists the bound factors
        #[arg(short, long)]
        sites: PathBuf,

        /// Gene expression table (first column is the Ensembl gene id)
        #[arg(short, long)]
        expression: PathBuf,

        /// GENCODE GFF3 annotation
        #[arg(long)]
        gencode: Option<PathBuf>,

        /// HGNC complete-set table
        #[arg(long)]
        hgnc: Option<PathBuf>,
    },

    /// Select peak files from a catalog export and name them for download
    Catalog {
        /// Catalog TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Keep individual replicate calls, not only pooled ones
        #[arg(long)]
        all_replicates: bool,

        /// Keep other calls even when uniformly processed ones exist
        #[arg(long)]
        no_prefer_uniform: bool,
    },
}

fn init_verbose(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    // RUST_LOG directives override the -v level.
    env_logger::Builder::new()
        .filter_level(filter_level)
        .parse_default_env()
        .format(|buf, record| {
            let timestamp = buf.timestamp_seconds();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                timestamp,
                style.value(record.level()),
                record.args()
            )
        })
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_verbose(cli.verbosity);

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Merge {
            input,
            max_span_width,
            strict,
            score,
            stats,
        } => run_merge(input, max_span_width, strict, score, stats),

        Commands::Flatten {
            peak_files,
            output,
            max_span_width,
            strict,
        } => run_flatten(peak_files, output, max_span_width, strict),

        Commands::MergeByTf {
            peak_files,
            output_dir,
            all,
            max_span_width,
            strict,
        } => run_merge_by_tf(peak_files, output_dir, all, max_span_width, strict),

        Commands::Enhancers {
            sites,
            tads,
            max_span_width,
            min_tfs,
            workers,
            strict,
        } => run_enhancers(sites, tads, max_span_width, min_tfs, workers, strict),

        Commands::TfExpression {
            sites,
            expression,
            gencode,
            hgnc,
        } => run_tf_expression(sites, expression, gencode, hgnc),

        Commands::Catalog {
            input,
            all_replicates,
            no_prefer_uniform,
        } => run_catalog(input, all_replicates, no_prefer_uniform),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_merge(
    input: Option<PathBuf>,
    max_span_width: Option<u64>,
    strict: bool,
    score: bool,
    stats: bool,
) -> Result<(), BedError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let cmd = MergeCommand::new()
        .with_max_span_width(max_span_width)
        .with_validation(ValidationMode::from_strict_flag(strict))
        .with_score(score);

    let result = match input {
        Some(path) if path.to_string_lossy() != "-" => cmd.run(&path, &mut handle)?,
        _ => {
            let stdin = io::stdin();
            cmd.run_reader(stdin.lock(), &mut handle)?
        }
    };

    log::info!("Merge: {}", result);
    if stats {
        eprintln!("Merge stats: {}", result);
    }
    Ok(())
}

fn run_flatten(
    peak_files: Vec<PathBuf>,
    output: Option<PathBuf>,
    max_span_width: Option<u64>,
    strict: bool,
) -> Result<(), BedError> {
    let merge = MergeCommand::new()
        .with_max_span_width(max_span_width)
        .with_validation(ValidationMode::from_strict_flag(strict));
    let cmd = FlattenCommand::new(merge);

    let result = match output {
        Some(path) => cmd.run(&peak_files, File::create(path)?)?,
        None => {
            let stdout = io::stdout();
            cmd.run(&peak_files, stdout.lock())?
        }
    };

    log::info!("Flatten: {}", result);
    Ok(())
}

fn run_merge_by_tf(
    peak_files: Vec<PathBuf>,
    output_dir: PathBuf,
    all: bool,
    max_span_width: Option<u64>,
    strict: bool,
) -> Result<(), BedError> {
    let merge = MergeCommand::new()
        .with_max_span_width(max_span_width)
        .with_validation(ValidationMode::from_strict_flag(strict));
    let cmd = MergeByTfCommand::new(output_dir)
        .with_merge(merge)
        .with_merge_all(all);

    let written = cmd.run(&peak_files)?;
    for path in &written {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_enhancers(
    sites: PathBuf,
    tads: PathBuf,
    max_span_width: Option<u64>,
    min_tfs: usize,
    workers: Option<usize>,
    strict: bool,
) -> Result<(), BedError> {
    let config = MergeConfig::new()
        .with_max_span_width(max_span_width)
        .with_validation(ValidationMode::from_strict_flag(strict));

    let mut cmd = EnhancerCommand::new()
        .with_config(config)
        .with_min_tfs(min_tfs);
    if let Some(n) = workers {
        cmd = cmd.with_workers(n);
    }

    let stdout = io::stdout();
    let result = cmd.run(&sites, &tads, stdout.lock())?;
    log::info!("Enhancers: {}", result);
    Ok(())
}

fn run_tf_expression(
    sites: PathBuf,
    expression: PathBuf,
    gencode: Option<PathBuf>,
    hgnc: Option<PathBuf>,
) -> Result<(), BedError> {
    if gencode.is_none() && hgnc.is_none() {
        return Err(BedError::InvalidFormat(
            "at least one of --gencode or --hgnc is required".to_string(),
        ));
    }

    let cmd = TfExpressionCommand::new()
        .with_gencode(gencode)
        .with_hgnc(hgnc);

    let stdout = io::stdout();
    let result = cmd.run(&sites, &expression, stdout.lock())?;
    log::info!("TF expression: {}", result);
    Ok(())
}

fn run_catalog(
    input: PathBuf,
    all_replicates: bool,
    no_prefer_uniform: bool,
) -> Result<(), BedError> {
    let cmd = CatalogCommand::new().with_policy(SelectionPolicy {
        only_merged: !all_replicates,
        prefer_uniformly_processed: !no_prefer_uniform,
    });

    let stdout = io::stdout();
    let result = cmd.run(&input, stdout.lock())?;
    log::info!("Catalog: {}", result);
    Ok(())
}
