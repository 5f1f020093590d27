use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{DatasetError, Result};

// Supported image formats
pub const IMG_FORMATS: &[&str] = &["bmp", "jpeg", "jpg", "png", "tif", "tiff"];

// Extension of YOLO label files
pub const LABEL_EXTENSION: &str = "txt";

// File name of the descriptor written under the dataset root
pub const DESCRIPTOR_FILE_NAME: &str = "dataset.yaml";

// Allowed deviation of the ratio sum from 1.0
pub const RATIO_TOLERANCE: f64 = 1e-3;

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileRole {
    Image,
    Label,
}

/// A classified file found by a directory scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub base_name: String,
    pub role: FileRole,
    pub path: PathBuf,
    /// Lowercase extension without the leading dot
    pub extension: String,
}

impl FileEntry {
    /// Classify `path` by its extension (case-insensitive).
    ///
    /// Returns `None` for files that are neither a recognized image nor carry
    /// `label_extension`, and for names that are not valid UTF-8.
    pub fn classify(path: &Path, label_extension: &str) -> Option<Self> {
        let base_name = path.file_stem()?.to_str()?.to_string();
        let extension = path.extension()?.to_str()?.to_lowercase();

        let role = if get_image_extensions_set().contains(&extension) {
            FileRole::Image
        } else if extension == label_extension {
            FileRole::Label
        } else {
            return None;
        };

        Some(Self {
            base_name,
            role,
            path: path.to_path_buf(),
            extension,
        })
    }
}

/// An image and a label sharing a base name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatchedPair {
    base_name: String,
    image: PathBuf,
    label: PathBuf,
}

impl MatchedPair {
    pub fn new(base_name: impl Into<String>, image: PathBuf, label: PathBuf) -> Self {
        Self {
            base_name: base_name.into(),
            image,
            label,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    pub fn label(&self) -> &Path {
        &self.label
    }
}

// Files without a counterpart, reported for diagnostics only
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedSet {
    pub images: Vec<PathBuf>,
    pub labels: Vec<PathBuf>,
}

impl UnmatchedSet {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.labels.is_empty()
    }
}

/// Result of a single pair-matcher scan, ordered by base name
#[derive(Debug, Default, Clone)]
pub struct ScanResult {
    pub pairs: Vec<MatchedPair>,
    pub unmatched: UnmatchedSet,
    /// Images shadowed by another image with the same base name
    pub duplicates: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    /// Sub-directory name used under `images/` and `labels/`
    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Validated train/val/test fractions.
///
/// Each fraction lies in `[0, 1]` and the three sum to 1 within [`RATIO_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitRatios {
    train: f64,
    val: f64,
    test: f64,
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Result<Self> {
        for (name, value) in [("train", train), ("val", val), ("test", test)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DatasetError::InvalidRatio(format!(
                    "{} ratio must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        let sum = train + val + test;
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(DatasetError::InvalidRatio(format!(
                "ratios must sum to 1.0, got {:.4} ({} + {} + {})",
                sum, train, val, test
            )));
        }

        Ok(Self { train, val, test })
    }

    pub fn train(&self) -> f64 {
        self.train
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn test(&self) -> f64 {
        self.test
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            val: 0.15,
            test: 0.15,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

impl SplitCounts {
    pub fn total(&self) -> usize {
        self.train + self.val + self.test
    }
}

// Struct to hold the split datasets for training, validation, and testing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitAssignment {
    pub train: Vec<MatchedPair>,
    pub val: Vec<MatchedPair>,
    pub test: Vec<MatchedPair>,
}

impl SplitAssignment {
    pub fn get(&self, split: Split) -> &[MatchedPair] {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> SplitCounts {
        SplitCounts {
            train: self.train.len(),
            val: self.val.len(),
            test: self.test.len(),
        }
    }

    /// Iterate over every pair together with the split it was assigned to
    pub fn iter(&self) -> impl Iterator<Item = (Split, &MatchedPair)> + '_ {
        Split::ALL
            .into_iter()
            .flat_map(move |split| self.get(split).iter().map(move |pair| (split, pair)))
    }
}

// Struct to hold the paths to the output directories for train/val/test splits
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub train_images_dir: PathBuf,
    pub val_images_dir: PathBuf,
    pub test_images_dir: PathBuf,
    pub train_labels_dir: PathBuf,
    pub val_labels_dir: PathBuf,
    pub test_labels_dir: PathBuf,
}

impl OutputDirs {
    /// Compute the fixed `images/{split}` and `labels/{split}` layout under `root`
    pub fn new(root: &Path) -> Self {
        let images = root.join("images");
        let labels = root.join("labels");
        Self {
            root: root.to_path_buf(),
            train_images_dir: images.join("train"),
            val_images_dir: images.join("val"),
            test_images_dir: images.join("test"),
            train_labels_dir: labels.join("train"),
            val_labels_dir: labels.join("val"),
            test_labels_dir: labels.join("test"),
        }
    }

    /// (images dir, labels dir) for one split
    pub fn for_split(&self, split: Split) -> (&Path, &Path) {
        match split {
            Split::Train => (&self.train_images_dir, &self.train_labels_dir),
            Split::Val => (&self.val_images_dir, &self.val_labels_dir),
            Split::Test => (&self.test_images_dir, &self.test_labels_dir),
        }
    }

    pub fn all(&self) -> [&Path; 6] {
        [
            &self.train_images_dir,
            &self.val_images_dir,
            &self.test_images_dir,
            &self.train_labels_dir,
            &self.val_labels_dir,
            &self.test_labels_dir,
        ]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

/// What a bulk transfer does when a destination exists or a file operation fails
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log, record and continue with the remaining items
    #[default]
    SkipAndWarn,
    /// Stop scheduling new items after the first conflict or failure
    FailFast,
}

// A file operation that failed during a bulk run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

// Struct to hold processing statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub total_pairs: usize,
    pub transferred: usize,
    /// Destinations that already existed; the pair was left untouched
    pub skipped_existing: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    /// Pairs never attempted because fail-fast stopped the run
    pub not_attempted: usize,
}

impl ProcessingStats {
    pub fn new(total_pairs: usize) -> Self {
        Self {
            total_pairs,
            ..Self::default()
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.skipped_existing.is_empty() || !self.failed.is_empty() || self.not_attempted > 0
    }

    pub fn merge(&mut self, other: ProcessingStats) {
        self.total_pairs += other.total_pairs;
        self.transferred += other.transferred;
        self.skipped_existing.extend(other.skipped_existing);
        self.failed.extend(other.failed);
        self.not_attempted += other.not_attempted;
    }

    pub fn print_summary(&self) {
        log::info!("=== Transfer Summary ===");
        log::info!("Total pairs: {}", self.total_pairs);
        log::info!("Transferred: {}", self.transferred);
        log::info!(
            "Skipped (destination exists): {}",
            self.skipped_existing.len()
        );
        log::info!("Failed: {}", self.failed.len());

        if self.not_attempted > 0 {
            log::warn!("Not attempted (fail-fast): {}", self.not_attempted);
        }
        for failure in &self.failed {
            log::warn!("  {}: {}", failure.path.display(), failure.reason);
        }
    }
}

/// Final status of a bulk run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Clean,
    CompletedWithWarnings,
}

impl RunOutcome {
    pub fn from_warnings(has_warnings: bool) -> Self {
        if has_warnings {
            RunOutcome::CompletedWithWarnings
        } else {
            RunOutcome::Clean
        }
    }
}
