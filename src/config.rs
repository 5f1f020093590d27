use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::conversion::MaterializeOptions;
use crate::error::{DatasetError, Result};
use crate::sampling::{RenameOptions, SampleOptions};
use crate::types::{FailurePolicy, SplitRatios, TransferMode};
use crate::yolo_dataset::SplitJob;

/// Organize, split and describe image/label folders as YOLO datasets.
#[derive(Parser, Debug)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Match images with labels, split them into train/val/test and write dataset.yaml
    Split(SplitArgs),
    /// Sort matched pairs of mixed folders into images/ and labels/ without splitting
    Organize(OrganizeArgs),
    /// Write dataset.yaml for an existing dataset from a class list file
    Yaml(YamlArgs),
    /// Copy a random fraction of the images in a folder
    Sample(SampleArgs),
    /// Delete images that have no label file
    Prune(PruneArgs),
    /// Rename files to consecutive numbers, keeping image/label pairs together
    Rename(RenameArgs),
}

/// Flags shared by commands that copy or move pairs
#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    /// Move files instead of copying them
    #[arg(long = "move")]
    pub move_files: bool,

    /// Abort on the first existing destination or failed file operation
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Number of worker threads used for file transfers
    #[arg(short = 'j', long = "jobs", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,
}

impl TransferArgs {
    pub fn to_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            mode: if self.move_files {
                TransferMode::Move
            } else {
                TransferMode::Copy
            },
            policy: if self.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::SkipAndWarn
            },
            jobs: self.jobs.map(usize::from),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// YAML job file providing defaults for the options below
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Folder containing images and labels side by side
    #[arg(short = 's', long = "source")]
    pub source: Option<PathBuf>,

    /// Separate folder holding the label files
    #[arg(long = "labels")]
    pub labels: Option<PathBuf>,

    /// Root of the dataset to create
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Text file with one class name per line
    #[arg(long = "classes")]
    pub classes: Option<PathBuf>,

    /// Proportion of pairs used for training
    #[arg(long = "train-ratio", value_parser = validate_ratio)]
    pub train_ratio: Option<f64>,

    /// Proportion of pairs used for validation
    #[arg(long = "val-ratio", value_parser = validate_ratio)]
    pub val_ratio: Option<f64>,

    /// Proportion of pairs used for testing
    #[arg(long = "test-ratio", value_parser = validate_ratio)]
    pub test_ratio: Option<f64>,

    /// Seed for random shuffling; system entropy when omitted
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Write a JSON summary of the run to this file
    #[arg(long = "report")]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

impl SplitArgs {
    /// Merge the command line over the optional job file into a validated job
    pub fn into_job(self) -> Result<SplitJob> {
        let file = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };
        let defaults = SplitRatios::default();

        let ratios = SplitRatios::new(
            self.train_ratio
                .or(file.split_ratio.train)
                .unwrap_or(defaults.train()),
            self.val_ratio.or(file.split_ratio.val).unwrap_or(defaults.val()),
            self.test_ratio
                .or(file.split_ratio.test)
                .unwrap_or(defaults.test()),
        )?;

        Ok(SplitJob {
            source: self
                .source
                .or(file.dataset.source_dir)
                .ok_or(DatasetError::MissingArgument("source"))?,
            label_dir: self.labels.or(file.dataset.label_dir),
            output: self
                .output
                .or(file.dataset.output_dir)
                .ok_or(DatasetError::MissingArgument("output"))?,
            class_file: self
                .classes
                .or(file.dataset.class_file)
                .ok_or(DatasetError::MissingArgument("classes"))?,
            ratios,
            seed: self.seed.or(file.seed),
            materialize: self.transfer.to_options(),
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct OrganizeArgs {
    /// Mixed folder(s) to organize; several folders go to <output>/<folder name>
    #[arg(short = 's', long = "source", required = true, num_args = 1..)]
    pub sources: Vec<PathBuf>,

    /// Output folder
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    #[command(flatten)]
    pub transfer: TransferArgs,
}

#[derive(Args, Debug, Clone)]
pub struct YamlArgs {
    /// Text file with one class name per line
    #[arg(long = "classes")]
    pub classes: PathBuf,

    /// Dataset root; dataset.yaml is written here
    #[arg(short = 'd', long = "dataset")]
    pub dataset: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    /// Folder of images to sample from
    #[arg(short = 's', long = "source")]
    pub source: PathBuf,

    /// Folder receiving the sampled images
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Fraction of images to copy
    #[arg(long = "ratio", default_value_t = 0.1, value_parser = validate_ratio)]
    pub ratio: f64,

    /// Seed for random sampling
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Also copy the .txt label of each sampled image
    #[arg(long = "with-labels")]
    pub with_labels: bool,
}

impl SampleArgs {
    pub fn to_options(&self) -> SampleOptions {
        SampleOptions {
            ratio: self.ratio,
            seed: self.seed,
            with_labels: self.with_labels,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PruneArgs {
    /// Folder containing the images
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,

    /// Separate folder holding the label files
    #[arg(long = "labels")]
    pub labels: Option<PathBuf>,

    /// Extension of the label files, e.g. txt or json
    #[arg(long = "label-ext", default_value = "txt")]
    pub label_ext: String,

    /// Only list the images that would be deleted
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenameArgs {
    /// Folder whose files are renamed
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,

    /// Move renamed files to this folder instead of renaming in place
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// First number to assign
    #[arg(long = "start", default_value_t = 1)]
    pub start: u64,

    /// Number files in random order
    #[arg(long = "shuffle")]
    pub shuffle: bool,

    /// Seed for --shuffle
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl RenameArgs {
    pub fn to_options(&self) -> RenameOptions {
        RenameOptions {
            output: self.output.clone(),
            start: self.start,
            shuffle: self.shuffle,
            seed: self.seed,
        }
    }
}

/// Split job settings read from a YAML file.
///
/// ```yaml
/// dataset:
///   source_dir: raw
///   output_dir: datasets/2024_10_13
///   class_file: classes.txt
/// split_ratio:
///   train: 0.7
///   val: 0.15
///   test: 0.15
/// ```
///
/// Unknown sections are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default)]
    pub split_ratio: RatioSection,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatasetSection {
    pub source_dir: Option<PathBuf>,
    pub label_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub class_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RatioSection {
    pub train: Option<f64>,
    pub val: Option<f64>,
    pub test: Option<f64>,
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DatasetError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        Self::from_yaml(&content).map_err(|e| DatasetError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

// Validate that the ratio is between 0.0 and 1.0
fn validate_ratio(s: &str) -> std::result::Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("RATIO must be between 0.0 and 1.0".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ratio() {
        assert!(validate_ratio("0.5").is_ok());
        assert!(validate_ratio("1.0").is_ok());
        assert!(validate_ratio("0.0").is_ok());
        assert!(validate_ratio("-0.1").is_err());
        assert!(validate_ratio("1.1").is_err());
        assert!(validate_ratio("abc").is_err());
        assert!(validate_ratio("NaN").is_err());
    }

    #[test]
    fn test_split_command_line() {
        let cli = Cli::try_parse_from([
            "yolo-dataset-tool",
            "split",
            "--source",
            "raw",
            "--output",
            "out",
            "--classes",
            "classes.txt",
            "--train-ratio",
            "0.8",
            "--val-ratio",
            "0.1",
            "--test-ratio",
            "0.1",
            "--seed",
            "7",
            "--move",
            "-j",
            "4",
        ])
        .unwrap();

        let Command::Split(args) = cli.command else {
            panic!("expected split command");
        };
        let job = args.into_job().unwrap();
        assert_eq!(job.source, PathBuf::from("raw"));
        assert_eq!(job.seed, Some(7));
        assert_eq!(job.ratios.train(), 0.8);
        assert_eq!(job.materialize.mode, TransferMode::Move);
        assert_eq!(job.materialize.policy, FailurePolicy::SkipAndWarn);
        assert_eq!(job.materialize.jobs, Some(4));
    }

    #[test]
    fn test_split_rejects_ratios_not_summing_to_one() {
        let cli = Cli::try_parse_from([
            "yolo-dataset-tool",
            "split",
            "-s",
            "raw",
            "-o",
            "out",
            "--classes",
            "c.txt",
            "--train-ratio",
            "0.7",
            "--val-ratio",
            "0.2",
            "--test-ratio",
            "0.2",
        ])
        .unwrap();
        let Command::Split(args) = cli.command else {
            panic!("expected split command");
        };
        assert!(matches!(
            args.into_job(),
            Err(DatasetError::InvalidRatio(_))
        ));
    }

    #[test]
    fn test_split_requires_source() {
        let cli = Cli::try_parse_from(["yolo-dataset-tool", "split", "-o", "out"]).unwrap();
        let Command::Split(args) = cli.command else {
            panic!("expected split command");
        };
        assert!(matches!(
            args.into_job(),
            Err(DatasetError::MissingArgument("source"))
        ));
    }

    #[test]
    fn test_job_config_file_with_command_line_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = temp_dir.path().join("job.yaml");
        fs::write(
            &config,
            "dataset:\n  source_dir: raw\n  output_dir: out\n  class_file: classes.txt\n\
             split_ratio:\n  train: 0.8\n  val: 0.1\n  test: 0.1\n\
             training:\n  epochs: 100\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "yolo-dataset-tool",
            "split",
            "--config",
            config.to_str().unwrap(),
            "--output",
            "elsewhere",
        ])
        .unwrap();
        let Command::Split(args) = cli.command else {
            panic!("expected split command");
        };
        let job = args.into_job().unwrap();

        assert_eq!(job.source, PathBuf::from("raw"));
        assert_eq!(job.output, PathBuf::from("elsewhere"));
        assert_eq!(job.class_file, PathBuf::from("classes.txt"));
        assert_eq!(job.ratios.val(), 0.1);
        assert_eq!(job.seed, None);
    }

    #[test]
    fn test_job_config_rejects_malformed_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = temp_dir.path().join("job.yaml");
        fs::write(&config, "split_ratio: [1, 2").unwrap();
        assert!(matches!(
            JobConfig::load(&config),
            Err(DatasetError::Config { .. })
        ));
    }

    #[test]
    fn test_organize_accepts_several_sources() {
        let cli = Cli::try_parse_from([
            "yolo-dataset-tool",
            "organize",
            "-s",
            "a",
            "b",
            "-o",
            "out",
        ])
        .unwrap();
        let Command::Organize(args) = cli.command else {
            panic!("expected organize command");
        };
        assert_eq!(args.sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(args.transfer.to_options().mode, TransferMode::Copy);
    }
}
