//! Enhancer calling within topologically-associated domains (TADs).
//!
//! For every TAD, the TF sites that start inside it are merged (with the
//! configured width cap) into candidate enhancers; a candidate is reported
//! when at least `min_tfs` distinct factors bind it.
//!
//! TADs are distributed to a fixed pool of worker threads through a bounded
//! crossbeam channel. Workers drain the queue to exhaustion and send their
//! calls back on a result channel; results are reassembled in TAD input
//! order so output does not depend on scheduling.

use crate::bed::{BedError, BedReader, Result};
use crate::commands::merge::merge_overlapping;
use crate::config::MergeConfig;
use crate::index::SiteIndex;
use crate::interval::{Interval, MergedSpan};
use crate::output::SpanWriter;
use crate::sites::load_labeled_sites;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::thread;

const QUEUE_CAPACITY: usize = 1024;

/// A topologically-associated domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tad {
    pub id: String,
    pub chrom: String,
    pub start: i64,
    pub end: i64,
}

/// A candidate enhancer: merged TF sites inside one TAD.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancerCall {
    pub tad_id: String,
    pub span: MergedSpan,
}

/// A queued TAD with its input position.
pub type TadJob = (usize, Tad);

/// A worker's calls for one TAD.
pub type TadResult = (usize, Vec<EnhancerCall>);

/// Drain `jobs` until the queue is closed and empty, sending one result
/// per TAD. Stops early if the result receiver has gone away.
pub fn scan_worker<F>(jobs: Receiver<TadJob>, results: Sender<TadResult>, call: F)
where
    F: Fn(&Tad) -> Vec<EnhancerCall>,
{
    for (idx, tad) in jobs.iter() {
        if results.send((idx, call(&tad))).is_err() {
            break;
        }
    }
}

/// Load TADs from a BED file. The name column is the TAD id; unnamed TADs
/// are identified as `chrom:start-end`.
pub fn load_tads<P: AsRef<Path>>(path: P, config: &MergeConfig) -> Result<Vec<Tad>> {
    BedReader::from_path(path)?
        .with_validation(config.validation)
        .records()
        .map(|record| {
            let record = record?;
            let interval = record.interval;
            let id = record.name.unwrap_or_else(|| {
                format!("{}:{}-{}", interval.chrom, interval.start, interval.end)
            });
            Ok(Tad {
                id,
                chrom: interval.chrom,
                start: interval.start,
                end: interval.end,
            })
        })
        .collect()
}

/// Enhancer command configuration.
#[derive(Debug, Clone)]
pub struct EnhancerCommand {
    pub config: MergeConfig,
    /// Minimum number of distinct factors for a call.
    pub min_tfs: usize,
    /// Number of worker threads draining the TAD queue.
    pub workers: usize,
}

impl Default for EnhancerCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancerCommand {
    pub fn new() -> Self {
        Self {
            config: MergeConfig::default(),
            min_tfs: 1,
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_min_tfs(mut self, min_tfs: usize) -> Self {
        self.min_tfs = min_tfs;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Call enhancers inside a single TAD.
    pub fn call_tad(&self, tad: &Tad, sites: &SiteIndex) -> Vec<EnhancerCall> {
        let inside: Vec<Interval> = sites.starting_within(&tad.chrom, tad.start, tad.end).to_vec();

        merge_overlapping(inside, self.config.max_span_width)
            .into_iter()
            .filter(|span| span.labels.len() >= self.min_tfs)
            .map(|span| EnhancerCall {
                tad_id: tad.id.clone(),
                span,
            })
            .collect()
    }

    /// Scan all TADs with the worker pool; calls come back in TAD order.
    pub fn scan(&self, tads: Vec<Tad>, sites: &SiteIndex) -> Result<Vec<EnhancerCall>> {
        self.scan_with(tads, |tad| self.call_tad(tad, sites))
    }

    /// Run `call` for every TAD on `workers` threads fed through a bounded
    /// queue. A worker that panics is reported as [`BedError::Worker`] once
    /// all workers have been joined.
    pub fn scan_with<F>(&self, tads: Vec<Tad>, call: F) -> Result<Vec<EnhancerCall>>
    where
        F: Fn(&Tad) -> Vec<EnhancerCall> + Sync,
    {
        let n_tads = tads.len();
        let (job_tx, job_rx) = bounded::<TadJob>(QUEUE_CAPACITY);
        let (result_tx, result_rx) = unbounded::<TadResult>();

        log::debug!("Scanning {} TADs with {} workers", n_tads, self.workers);

        let mut slots: Vec<Option<Vec<EnhancerCall>>> = vec![None; n_tads];
        let call = &call;
        thread::scope(|scope| -> Result<()> {
            let handles: Vec<_> = (0..self.workers)
                .map(|_| {
                    let jobs = job_rx.clone();
                    let results = result_tx.clone();
                    scope.spawn(move || scan_worker(jobs, results, call))
                })
                .collect();
            drop(job_rx);
            drop(result_tx);

            let mut fed = Ok(());
            for job in tads.into_iter().enumerate() {
                if job_tx.send(job).is_err() {
                    fed = Err(BedError::Worker("all TAD workers exited".to_string()));
                    break;
                }
            }
            drop(job_tx);

            for (idx, calls) in result_rx.iter() {
                slots[idx] = Some(calls);
            }

            let panicked = handles.into_iter().map(|h| h.join()).filter(|r| r.is_err()).count();
            if panicked > 0 {
                return Err(BedError::Worker(format!(
                    "{} of {} TAD workers panicked",
                    panicked, self.workers
                )));
            }
            fed
        })?;

        Ok(slots.into_iter().flatten().flatten().collect())
    }

    /// Load sites and TADs, scan, and write one line per call.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, W: Write>(
        &self,
        sites_path: P,
        tads_path: Q,
        output: W,
    ) -> Result<EnhancerStats> {
        let sites = load_labeled_sites(sites_path)?;
        for site in &sites {
            self.config.validation.check(site)?;
        }
        let index = SiteIndex::from_intervals(sites);
        let tads = load_tads(tads_path, &self.config)?;
        log::info!("Loaded {} TADs and {} site labels", tads.len(), index.len());

        let mut stats = EnhancerStats {
            tads: tads.len(),
            sites: index.len(),
            calls: 0,
        };

        let calls = self.scan(tads, &index)?;
        let mut writer = SpanWriter::new(output);
        for call in &calls {
            writer.write_tagged_span(&call.tad_id, &call.span)?;
        }
        writer.flush()?;

        stats.calls = calls.len();
        Ok(stats)
    }
}

/// Statistics from an enhancer scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnhancerStats {
    pub tads: usize,
    pub sites: usize,
    pub calls: usize,
}

impl fmt::Display for EnhancerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TADs: {}, Site labels: {}, Enhancers: {}",
            self.tads, self.sites, self.calls
        )
    }
}
