use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};
use crate::matcher::PairMatcher;
use crate::types::{FileFailure, TransferMode, LABEL_EXTENSION};
use crate::utils::{
    create_output_directory, ensure_source_dir, is_image_file, list_dir_files, transfer_file,
};

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Fraction of images to keep, in [0, 1]
    pub ratio: f64,
    pub seed: Option<u64>,
    /// Also copy `<name>.txt` next to each sampled image when present
    pub with_labels: bool,
}

/// Copy a uniform random subset of the images in `source` into `output`.
///
/// `floor(n * ratio)` images are chosen. Images already present in `output`
/// are skipped with a warning. Returns the chosen source images in name order.
pub fn sample_images(source: &Path, output: &Path, options: &SampleOptions) -> Result<Vec<PathBuf>> {
    if !options.ratio.is_finite() || !(0.0..=1.0).contains(&options.ratio) {
        return Err(DatasetError::InvalidRatio(format!(
            "sample ratio must be between 0.0 and 1.0, got {}",
            options.ratio
        )));
    }
    ensure_source_dir(source)?;

    let mut images: Vec<PathBuf> = list_dir_files(source)?
        .into_iter()
        .filter(|path| is_image_file(path))
        .collect();
    let sample_size = (images.len() as f64 * options.ratio).floor() as usize;

    images.shuffle(&mut seeded_rng(options.seed));
    images.truncate(sample_size);
    images.sort();

    create_output_directory(output)?;
    let mut copied = 0;
    for image in &images {
        let mut files = vec![image.clone()];
        if options.with_labels {
            let label = image.with_extension(LABEL_EXTENSION);
            if label.is_file() {
                files.push(label);
            }
        }
        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let dest = output.join(name);
            if dest.exists() {
                warn!("Skipping {}: destination already exists", dest.display());
                continue;
            }
            transfer_file(&file, &dest, TransferMode::Copy)
                .map_err(|e| DatasetError::io(&file, e))?;
            copied += 1;
        }
    }

    info!(
        "Sampled {} image(s), copied {} file(s) to {}",
        images.len(),
        copied,
        output.display()
    );
    Ok(images)
}

// Result of a prune run
#[derive(Debug, Default, Clone, Serialize)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    pub dry_run: bool,
}

/// Delete every image in `dir` that has no label according to `matcher`.
///
/// With `dry_run` the images are only listed. A failed deletion is recorded
/// and the remaining images are still processed.
pub fn prune_unlabeled(dir: &Path, matcher: &PairMatcher, dry_run: bool) -> Result<PruneReport> {
    let scan = matcher.scan(dir)?;
    let mut report = PruneReport {
        dry_run,
        ..Default::default()
    };

    for image in scan.unmatched.images {
        if dry_run {
            info!("Would delete {}", image.display());
            report.removed.push(image);
            continue;
        }
        match fs::remove_file(&image) {
            Ok(()) => {
                info!("Deleted {}", image.display());
                report.removed.push(image);
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", image.display(), e);
                report.failed.push(FileFailure::new(&image, e));
            }
        }
    }

    info!(
        "Completed removing unlabeled images: {} {}.",
        report.removed.len(),
        if dry_run { "to delete" } else { "deleted" }
    );
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct RenameOptions {
    /// Destination folder; files are renamed in place when `None`
    pub output: Option<PathBuf>,
    pub start: u64,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            output: None,
            start: 1,
            shuffle: false,
            seed: None,
        }
    }
}

/// Rename the files of `dir` to consecutive numbers.
///
/// Files sharing a base name get the same number, so `a.jpg`/`a.txt` become
/// `1.jpg`/`1.txt`. Groups are numbered in name order, or in a random order
/// with `shuffle`. All destinations are checked before anything is renamed.
/// Returns the `(old, new)` path of every renamed file.
pub fn rename_sequential(dir: &Path, options: &RenameOptions) -> Result<Vec<(PathBuf, PathBuf)>> {
    ensure_source_dir(dir)?;
    let output = match &options.output {
        Some(output) => create_output_directory(output)?,
        None => dir.to_path_buf(),
    };

    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in list_dir_files(dir)? {
        match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) => groups.entry(stem.to_string()).or_default().push(path),
            None => warn!("Skipping {:?}: file name is not valid UTF-8", path),
        }
    }

    let mut order: Vec<Vec<PathBuf>> = groups.into_values().collect();
    if options.shuffle {
        order.shuffle(&mut seeded_rng(options.seed));
    }

    let mut plan = Vec::new();
    for (number, files) in (options.start..).zip(order) {
        for from in files {
            let name = match from.extension().and_then(|ext| ext.to_str()) {
                Some(ext) => format!("{}.{}", number, ext),
                None => number.to_string(),
            };
            plan.push((from, output.join(name)));
        }
    }

    let sources: HashSet<&PathBuf> = plan.iter().map(|(from, _)| from).collect();
    let in_place = same_dir(dir, &output)?;
    for (_, to) in &plan {
        // Targets that are themselves being renamed are freed during the first phase
        if to.exists() && !(in_place && sources.contains(to)) {
            return Err(DatasetError::DestinationExists { path: to.clone() });
        }
    }

    if in_place {
        // Two phases so that e.g. 2.jpg -> 1.jpg and 1.jpg -> 2.jpg cannot collide
        let temps: Vec<PathBuf> = (0..plan.len())
            .map(|i| dir.join(format!(".rename-{}.tmp", i)))
            .collect();
        if let Some(taken) = temps.iter().find(|temp| temp.exists()) {
            return Err(DatasetError::DestinationExists {
                path: taken.clone(),
            });
        }

        let mut staged: Vec<(&PathBuf, &PathBuf)> = Vec::with_capacity(plan.len());
        for ((from, _), temp) in plan.iter().zip(&temps) {
            if let Err(e) = fs::rename(from, temp) {
                restore_staged(&staged);
                return Err(DatasetError::io(from, e));
            }
            staged.push((from, temp));
        }
        for ((_, to), temp) in plan.iter().zip(&temps) {
            fs::rename(temp, to).map_err(|e| DatasetError::io(temp, e))?;
        }
    } else {
        for (from, to) in &plan {
            transfer_file(from, to, TransferMode::Move).map_err(|e| DatasetError::io(from, e))?;
        }
    }

    for (from, to) in &plan {
        debug!("{} -> {}", from.display(), to.display());
    }
    info!("Renamed {} file(s) into {}", plan.len(), output.display());
    Ok(plan)
}

// Put staged files back under their original names
fn restore_staged(staged: &[(&PathBuf, &PathBuf)]) {
    for (from, temp) in staged.iter().rev() {
        if let Err(e) = fs::rename(temp, from) {
            error!(
                "Failed to restore {} from {}: {}",
                from.display(),
                temp.display(),
                e
            );
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> Result<bool> {
    let a = fs::canonicalize(a).map_err(|e| DatasetError::io(a, e))?;
    let b = fs::canonicalize(b).map_err(|e| DatasetError::io(b, e))?;
    Ok(a == b)
}
