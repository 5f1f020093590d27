use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};
use crate::types::{OutputDirs, Split, DESCRIPTOR_FILE_NAME};
use crate::utils::create_output_directory;

/// Set up the directory structure for YOLO dataset output.
///
/// Existing directories are reused; nothing inside them is removed.
pub fn setup_output_directories(root: &Path) -> Result<OutputDirs> {
    let dirs = OutputDirs::new(root);
    for dir in dirs.all() {
        create_output_directory(dir)?;
    }
    Ok(dirs)
}

/// Read one class name per line, trimming whitespace and skipping blank lines
pub fn read_class_names(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(DatasetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(DatasetError::EmptyClassList {
            path: path.to_path_buf(),
        });
    }
    Ok(names)
}

/// The `dataset.yaml` document consumed by YOLO training tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    pub path: String,
    pub train: String,
    pub val: String,
    pub test: String,
    pub names: BTreeMap<usize, String>,
}

impl DatasetDescriptor {
    /// Build a descriptor for an existing dataset root; class ids follow list order
    pub fn new(root: &Path, class_names: &[String]) -> Result<Self> {
        let absolute_path = fs::canonicalize(root).map_err(|e| DatasetError::io(root, e))?;
        let names: BTreeMap<usize, String> = class_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .enumerate()
            .map(|(id, name)| (id, name.to_string()))
            .collect();

        Ok(Self {
            path: absolute_path.to_string_lossy().into_owned(),
            train: split_images_path(Split::Train),
            val: split_images_path(Split::Val),
            test: split_images_path(Split::Test),
            names,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn split_images_path(split: Split) -> String {
    format!("images/{}", split.dir_name())
}

/// Create (or overwrite) `<root>/dataset.yaml` and return its path
pub fn create_dataset_yaml(root: &Path, class_names: &[String]) -> Result<PathBuf> {
    let dataset_yaml_path = root.join(DESCRIPTOR_FILE_NAME);
    create_output_directory(root)?;

    let descriptor = DatasetDescriptor::new(root, class_names)?;
    if descriptor.names.is_empty() {
        return Err(DatasetError::EmptyClassList {
            path: dataset_yaml_path,
        });
    }
    let yaml_content = descriptor.to_yaml()?;

    let mut dataset_yaml = BufWriter::new(
        File::create(&dataset_yaml_path).map_err(|e| DatasetError::io(&dataset_yaml_path, e))?,
    );
    dataset_yaml
        .write_all(yaml_content.as_bytes())
        .and_then(|_| dataset_yaml.flush())
        .map_err(|e| DatasetError::io(&dataset_yaml_path, e))?;

    info!(
        "Wrote {} with {} classes.",
        dataset_yaml_path.display(),
        descriptor.names.len()
    );
    for (id, name) in &descriptor.names {
        info!("    {}: {}", id, name);
    }
    Ok(dataset_yaml_path)
}

/// Write any serializable run summary as pretty JSON
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let mut writer =
        BufWriter::new(File::create(path).map_err(|e| DatasetError::io(path, e))?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|e| DatasetError::io(path, e))
}
