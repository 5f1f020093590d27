use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conversion::{transfer_pairs, MaterializeOptions, TransferJob};
use crate::error::{DatasetError, Result};
use crate::matcher::PairMatcher;
use crate::types::ProcessingStats;
use crate::utils::{create_output_directory, ensure_source_dir};

// Counts for one or more organized folders
#[derive(Debug, Default, Clone, Serialize)]
pub struct OrganizeReport {
    pub matched: usize,
    pub orphan_images: usize,
    pub orphan_labels: usize,
    pub stats: ProcessingStats,
}

impl OrganizeReport {
    pub fn merge(&mut self, other: OrganizeReport) {
        self.matched += other.matched;
        self.orphan_images += other.orphan_images;
        self.orphan_labels += other.orphan_labels;
        self.stats.merge(other.stats);
    }

    pub fn print_summary(&self) {
        info!("=== Organize Summary ===");
        info!("Matched pairs: {}", self.matched);
        info!("Images without label: {}", self.orphan_images);
        info!("Labels without image: {}", self.orphan_labels);
        self.stats.print_summary();
    }
}

/// Sort the matched pairs of a mixed folder into `<output>/images` and `<output>/labels`.
///
/// Unmatched files stay where they are. A folder without pairs is not an error.
pub fn organize_dataset(
    source: &Path,
    output: &Path,
    matcher: &PairMatcher,
    options: &MaterializeOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<OrganizeReport> {
    let scan = matcher.scan(source)?;

    let images_dir = create_output_directory(&output.join("images"))?;
    let labels_dir = create_output_directory(&output.join("labels"))?;

    let jobs: Vec<TransferJob> = scan
        .pairs
        .iter()
        .map(|pair| TransferJob {
            pair,
            images_dir: &images_dir,
            labels_dir: &labels_dir,
        })
        .collect();
    let stats = transfer_pairs(&jobs, options, progress)?;

    Ok(OrganizeReport {
        matched: scan.pairs.len(),
        orphan_images: scan.unmatched.images.len(),
        orphan_labels: scan.unmatched.labels.len(),
        stats,
    })
}

/// Organize several folders, each into `<output_base>/<folder name>`.
///
/// Every source is checked before the first one is processed.
pub fn organize_many(
    sources: &[PathBuf],
    output_base: &Path,
    matcher: &PairMatcher,
    options: &MaterializeOptions,
    progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<OrganizeReport> {
    let mut targets = Vec::with_capacity(sources.len());
    for source in sources {
        ensure_source_dir(source)?;
        targets.push(output_base.join(folder_name(source)?));
    }

    let mut total = OrganizeReport::default();
    for (i, (source, target)) in sources.iter().zip(&targets).enumerate() {
        info!(
            "Organizing folder {}/{}: {}",
            i + 1,
            sources.len(),
            source.display()
        );
        total.merge(organize_dataset(source, target, matcher, options, progress)?);
    }
    Ok(total)
}

fn folder_name(source: &Path) -> Result<PathBuf> {
    let absolute = fs::canonicalize(source).map_err(|e| DatasetError::io(source, e))?;
    absolute
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| DatasetError::NotADirectory {
            path: source.to_path_buf(),
        })
}
