use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};
use crate::types::{get_image_extensions_set, TransferMode};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .progress_chars("#>-"),
    );
    pb
}

/// Create a directory (and parents) if missing; existing directories are left as they are
pub fn create_output_directory(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        debug!("Directory {:?} already exists, reusing it.", path);
    } else {
        fs::create_dir_all(path).map_err(|e| DatasetError::io(path, e))?;
    }
    Ok(path.to_path_buf())
}

/// Fail with `NotFound`/`NotADirectory` unless `path` is an existing directory
pub fn ensure_source_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DatasetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(DatasetError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// List the direct, non-directory children of `dir` sorted by file name
pub fn list_dir_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))? {
        let entry = entry.map_err(|e| DatasetError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        files.push(path);
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Lowercase extension without the leading dot
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_image_file(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|ext| get_image_extensions_set().contains(&ext))
}

/// Normalize a user-supplied extension (`".TXT"` -> `"txt"`)
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Copy or move a single file.
///
/// Moves try a rename first and fall back to copy + remove, which also covers
/// moves across filesystems. A failed removal deletes the fresh copy again.
pub fn transfer_file(src: &Path, dest: &Path, mode: TransferMode) -> std::io::Result<()> {
    match mode {
        TransferMode::Copy => fs::copy(src, dest).map(|_| ()),
        TransferMode::Move => {
            if fs::rename(src, dest).is_ok() {
                return Ok(());
            }
            fs::copy(src, dest)?;
            if let Err(e) = fs::remove_file(src) {
                let _ = fs::remove_file(dest);
                return Err(e);
            }
            Ok(())
        }
    }
}
