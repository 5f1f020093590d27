use log::{error, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Mutex;

use crate::error::{DatasetError, Result};
use crate::types::{
    FailurePolicy, FileFailure, MatchedPair, OutputDirs, ProcessingStats, SplitAssignment,
    TransferMode,
};
use crate::utils::transfer_file;

/// Options for bulk pair transfers
#[derive(Debug, Default, Clone)]
pub struct MaterializeOptions {
    pub mode: TransferMode,
    pub policy: FailurePolicy,
    /// Worker count; `None` uses rayon's global pool
    pub jobs: Option<usize>,
}

/// One pair and the folders its image and label go to
#[derive(Debug, Clone, Copy)]
pub struct TransferJob<'a> {
    pub pair: &'a MatchedPair,
    pub images_dir: &'a Path,
    pub labels_dir: &'a Path,
}

enum PairOutcome {
    Transferred,
    Skipped(PathBuf),
    Failed(FileFailure),
}

/// Transfer every pair of the assignment into its split folders under `dirs`
pub fn materialize(
    assignment: &SplitAssignment,
    dirs: &OutputDirs,
    options: &MaterializeOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<ProcessingStats> {
    let jobs: Vec<TransferJob> = assignment
        .iter()
        .map(|(split, pair)| {
            let (images_dir, labels_dir) = dirs.for_split(split);
            TransferJob {
                pair,
                images_dir,
                labels_dir,
            }
        })
        .collect();

    transfer_pairs(&jobs, options, progress)
}

/// Copy or move a batch of pairs in parallel, keeping original file names.
///
/// Each finished item calls `progress(completed, total)`, with `completed`
/// strictly increasing across calls. A pair whose image or
/// label destination already exists is skipped as a whole. Failures are
/// collected into the returned stats; with [`FailurePolicy::FailFast`] the first
/// conflict or failure stops new work and the call returns
/// [`DatasetError::Aborted`].
pub fn transfer_pairs(
    jobs: &[TransferJob],
    options: &MaterializeOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<ProcessingStats> {
    let total = jobs.len();
    let completed = Mutex::new(0usize);
    let abort = AtomicBool::new(false);

    let run = || -> Vec<Option<PairOutcome>> {
        jobs.par_iter()
            .map(|job| {
                if abort.load(Relaxed) {
                    return None;
                }
                let outcome = transfer_pair(job, options.mode);
                match &outcome {
                    PairOutcome::Transferred => {}
                    PairOutcome::Skipped(existing) => {
                        warn!(
                            "Skipping {}: destination {} already exists",
                            job.pair.base_name(),
                            existing.display()
                        );
                    }
                    PairOutcome::Failed(failure) => {
                        error!(
                            "Failed to transfer {}: {}",
                            failure.path.display(),
                            failure.reason
                        );
                    }
                }
                if options.policy == FailurePolicy::FailFast
                    && !matches!(outcome, PairOutcome::Transferred)
                {
                    abort.store(true, Relaxed);
                }
                // Report under the lock so callers never see the count go backwards
                if let Ok(mut done) = completed.lock() {
                    *done += 1;
                    progress(*done, total);
                }
                Some(outcome)
            })
            .collect()
    };

    let outcomes = match options.jobs {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run),
        None => run(),
    };

    let mut stats = ProcessingStats::new(total);
    for outcome in outcomes {
        match outcome {
            Some(PairOutcome::Transferred) => stats.transferred += 1,
            Some(PairOutcome::Skipped(existing)) => stats.skipped_existing.push(existing),
            Some(PairOutcome::Failed(failure)) => stats.failed.push(failure),
            None => stats.not_attempted += 1,
        }
    }

    if options.policy == FailurePolicy::FailFast && stats.has_warnings() {
        stats.print_summary();
        return Err(DatasetError::Aborted {
            failures: stats.skipped_existing.len() + stats.failed.len(),
        });
    }

    Ok(stats)
}

fn transfer_pair(job: &TransferJob, mode: TransferMode) -> PairOutcome {
    let pair = job.pair;
    let (Some(image_name), Some(label_name)) = (pair.image().file_name(), pair.label().file_name())
    else {
        return PairOutcome::Failed(FileFailure::new(pair.image(), "path has no file name"));
    };
    let image_dest = job.images_dir.join(image_name);
    let label_dest = job.labels_dir.join(label_name);

    // Never overwrite: check both destinations before touching either file
    for dest in [&image_dest, &label_dest] {
        if dest.exists() {
            return PairOutcome::Skipped(dest.clone());
        }
    }

    if let Err(e) = transfer_file(pair.image(), &image_dest, mode) {
        return PairOutcome::Failed(FileFailure::new(pair.image(), e));
    }
    if let Err(e) = transfer_file(pair.label(), &label_dest, mode) {
        undo_transfer(pair.image(), &image_dest, mode);
        return PairOutcome::Failed(FileFailure::new(pair.label(), e));
    }
    PairOutcome::Transferred
}

// Take back an image whose label could not follow it
fn undo_transfer(src: &Path, dest: &Path, mode: TransferMode) {
    let undone = match mode {
        TransferMode::Copy => fs::remove_file(dest),
        TransferMode::Move => transfer_file(dest, src, TransferMode::Move),
    };
    if let Err(e) = undone {
        error!(
            "Failed to roll back {} after its label failed: {}",
            dest.display(),
            e
        );
    }
}
