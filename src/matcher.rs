use log::{debug, info, warn};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{FileEntry, FileRole, MatchedPair, ScanResult, UnmatchedSet, LABEL_EXTENSION};
use crate::utils::{ensure_source_dir, list_dir_files, normalize_extension};

/// Scans a folder and pairs images with labels by base name.
///
/// By default labels are `.txt` files living next to the images. Use
/// [`PairMatcher::label_dir`] when labels are kept in their own folder and
/// [`PairMatcher::label_extension`] for other annotation formats.
#[derive(Debug, Clone)]
pub struct PairMatcher {
    label_dir: Option<PathBuf>,
    label_extension: String,
}

impl Default for PairMatcher {
    fn default() -> Self {
        Self {
            label_dir: None,
            label_extension: LABEL_EXTENSION.to_string(),
        }
    }
}

impl PairMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.label_dir = Some(dir.into());
        self
    }

    pub fn label_extension(mut self, ext: &str) -> Self {
        self.label_extension = normalize_extension(ext);
        self
    }

    /// Scan the direct children of `source_dir` (non-recursive, read-only).
    ///
    /// Pairs and orphan lists come out sorted by base name. When several images
    /// share a base name, the first one in file-name order wins and the others
    /// are reported in [`ScanResult::duplicates`].
    pub fn scan(&self, source_dir: &Path) -> Result<ScanResult> {
        ensure_source_dir(source_dir)?;
        if let Some(label_dir) = &self.label_dir {
            ensure_source_dir(label_dir)?;
        }

        let mut images: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut labels: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut duplicates = Vec::new();

        for path in list_dir_files(source_dir)? {
            let Some(entry) = FileEntry::classify(&path, &self.label_extension) else {
                debug!("Ignoring unrecognized file {:?}", path);
                continue;
            };
            match entry.role {
                FileRole::Image => insert_first(&mut images, entry, &mut duplicates),
                // Labels next to the images only count when no label folder was given
                FileRole::Label if self.label_dir.is_none() => {
                    insert_first(&mut labels, entry, &mut duplicates)
                }
                FileRole::Label => {}
            }
        }

        if let Some(label_dir) = &self.label_dir {
            for path in list_dir_files(label_dir)? {
                match FileEntry::classify(&path, &self.label_extension) {
                    Some(entry) if entry.role == FileRole::Label => {
                        insert_first(&mut labels, entry, &mut duplicates)
                    }
                    _ => debug!("Ignoring non-label file {:?}", path),
                }
            }
        }

        info!(
            "Found {} image files and {} label files in {}",
            images.len(),
            labels.len(),
            source_dir.display()
        );

        let mut pairs = Vec::new();
        let mut unmatched = UnmatchedSet::default();
        for (name, image) in &images {
            match labels.get(name) {
                Some(label) => pairs.push(MatchedPair::new(name, image.clone(), label.clone())),
                None => unmatched.images.push(image.clone()),
            }
        }
        unmatched.labels = labels
            .iter()
            .filter(|(name, _)| !images.contains_key(*name))
            .map(|(_, label)| label.clone())
            .collect();

        info!("Matched {} image/label pairs.", pairs.len());
        if !unmatched.images.is_empty() {
            warn!("{} image(s) have no label file.", unmatched.images.len());
            for image in &unmatched.images {
                debug!("  orphan image: {}", image.display());
            }
        }
        if !unmatched.labels.is_empty() {
            warn!("{} label(s) have no image file.", unmatched.labels.len());
            for label in &unmatched.labels {
                debug!("  orphan label: {}", label.display());
            }
        }

        Ok(ScanResult {
            pairs,
            unmatched,
            duplicates,
        })
    }
}

/// Scan `source_dir` for images and `.txt` labels side by side
pub fn scan_pairs(source_dir: &Path) -> Result<ScanResult> {
    PairMatcher::new().scan(source_dir)
}

fn insert_first(map: &mut BTreeMap<String, PathBuf>, entry: FileEntry, duplicates: &mut Vec<PathBuf>) {
    match map.entry(entry.base_name) {
        Entry::Vacant(slot) => {
            slot.insert(entry.path);
        }
        Entry::Occupied(kept) => {
            warn!(
                "Ignoring {:?}: base name already taken by {:?}",
                entry.path,
                kept.get()
            );
            duplicates.push(entry.path);
        }
    }
}
