use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::conversion::{materialize, MaterializeOptions};
use crate::dataset::partition;
use crate::error::{DatasetError, Result};
use crate::io::{create_dataset_yaml, read_class_names, setup_output_directories};
use crate::matcher::PairMatcher;
use crate::types::{ProcessingStats, RunOutcome, SplitCounts, SplitRatios, TransferMode};

/// Everything needed to turn a mixed folder into a split YOLO dataset
#[derive(Debug, Clone)]
pub struct SplitJob {
    pub source: PathBuf,
    /// Separate label folder; labels are looked up next to the images when `None`
    pub label_dir: Option<PathBuf>,
    pub output: PathBuf,
    pub class_file: PathBuf,
    pub ratios: SplitRatios,
    pub seed: Option<u64>,
    pub materialize: MaterializeOptions,
}

// Counts reported at the end of a split run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub output: PathBuf,
    pub matched_pairs: usize,
    pub orphan_images: usize,
    pub orphan_labels: usize,
    pub duplicate_images: usize,
    pub split: SplitCounts,
    pub stats: ProcessingStats,
    pub descriptor: PathBuf,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn print_summary(&self) {
        info!("=== Dataset Summary ===");
        info!("Matched pairs: {}", self.matched_pairs);
        info!(
            "Train: {}, Val: {}, Test: {}",
            self.split.train, self.split.val, self.split.test
        );
        if self.orphan_images > 0 || self.orphan_labels > 0 || self.duplicate_images > 0 {
            warn!(
                "Unused files: {} image(s) without label, {} label(s) without image, {} duplicate image(s)",
                self.orphan_images, self.orphan_labels, self.duplicate_images
            );
        }
        self.stats.print_summary();
        info!("Output directory: {}", self.output.display());
        info!("Dataset descriptor: {}", self.descriptor.display());
    }
}

/// Main dataset processing pipeline.
///
/// All inputs are validated and the source is scanned before anything is
/// written, so a bad class file or an empty source leaves no output behind.
pub fn process_dataset(
    job: &SplitJob,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<RunSummary> {
    let class_names = read_class_names(&job.class_file)?;

    let mut matcher = PairMatcher::new();
    if let Some(label_dir) = &job.label_dir {
        matcher = matcher.label_dir(label_dir);
    }
    info!("Scanning {}...", job.source.display());
    let scan = matcher.scan(&job.source)?;
    if scan.pairs.is_empty() {
        warn!(
            "No image/label pairs found in {}, nothing written.",
            job.source.display()
        );
        return Err(DatasetError::EmptyDataset);
    }

    let matched_pairs = scan.pairs.len();
    let assignment = partition(scan.pairs, &job.ratios, job.seed)?;
    let split = assignment.counts();

    info!("Creating dataset layout in {}...", job.output.display());
    let output_dirs = setup_output_directories(&job.output)?;

    let verb = match job.materialize.mode {
        TransferMode::Copy => "Copying",
        TransferMode::Move => "Moving",
    };
    info!("{} {} pairs...", verb, matched_pairs);
    let stats = materialize(&assignment, &output_dirs, &job.materialize, progress)?;

    info!("Creating dataset.yaml file...");
    let descriptor = create_dataset_yaml(&job.output, &class_names)?;

    let outcome = RunOutcome::from_warnings(stats.has_warnings());
    Ok(RunSummary {
        source: job.source.clone(),
        output: job.output.clone(),
        matched_pairs,
        orphan_images: scan.unmatched.images.len(),
        orphan_labels: scan.unmatched.labels.len(),
        duplicate_images: scan.duplicates.len(),
        split,
        stats,
        descriptor,
        outcome,
    })
}

/// Write only the descriptor for an already laid-out dataset
pub fn describe_dataset(root: &Path, class_file: &Path) -> Result<PathBuf> {
    let class_names = read_class_names(class_file)?;
    create_dataset_yaml(root, &class_names)
}
