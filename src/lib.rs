//! YOLO dataset organizer
//!
//! This library matches image and label files from mixed folders, splits the matched pairs
//! into train/val/test subsets and lays them out as a YOLO dataset with a `dataset.yaml`
//! descriptor for training.

pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod io;
pub mod matcher;
pub mod organize;
pub mod sampling;
pub mod types;
pub mod utils;
pub mod yolo_dataset;

// Re-export commonly used types and functions
pub use config::{Cli, Command, JobConfig};
pub use conversion::{materialize, transfer_pairs, MaterializeOptions, TransferJob};
pub use dataset::{partition, split_counts};
pub use error::{DatasetError, Result};
pub use io::{create_dataset_yaml, read_class_names, setup_output_directories, DatasetDescriptor};
pub use matcher::{scan_pairs, PairMatcher};
pub use organize::{organize_dataset, organize_many, OrganizeReport};
pub use sampling::{prune_unlabeled, rename_sequential, sample_images};
pub use types::{
    FailurePolicy, FileEntry, FileRole, MatchedPair, OutputDirs, ProcessingStats, RunOutcome,
    ScanResult, Split, SplitAssignment, SplitCounts, SplitRatios, TransferMode, UnmatchedSet,
};
pub use yolo_dataset::{process_dataset, RunSummary, SplitJob};
