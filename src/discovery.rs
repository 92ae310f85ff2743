//! File discovery for walking directory trees and filtering files.
//!
//! Handles exclude globs, binary file extensions and large file filtering.

use crate::utils::has_binary_extension;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Iterator over the files under a set of paths that pass the filters.
pub struct FileDiscovery {
    /// Stack of walkdir iterators (one per path).
    walkers: Vec<walkdir::IntoIter>,

    /// Files matching any of these are skipped
    exclude: GlobSet,

    /// Maximum file size (None = no limit).
    max_file_size: Option<u64>,
}

impl FileDiscovery {
    pub fn new(paths: &[PathBuf], exclude_patterns: &[String], max_file_size: Option<u64>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("Invalid exclude glob pattern: {}", pattern))?;
            builder.add(glob);
        }
        let exclude = builder.build().context("Failed to build exclude GlobSet")?;

        // Walked in the given order
        let walkers = paths
            .iter()
            .rev()
            .filter_map(|path| {
                if path.exists() {
                    Some(WalkDir::new(path).follow_links(true).sort_by_file_name().into_iter())
                } else {
                    tracing::warn!(path = %path.display(), "Path does not exist, skipping");
                    None
                }
            })
            .collect();

        Ok(Self {
            walkers,
            exclude,
            max_file_size,
        })
    }

    fn exceeds_size_limit(&self, path: &Path) -> bool {
        match (self.max_file_size, path.metadata()) {
            (Some(max_size), Ok(metadata)) => metadata.len() > max_size,
            _ => false,
        }
    }
}

impl Iterator for FileDiscovery {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(walker) = self.walkers.last_mut() {
            match walker.next() {
                Some(Ok(entry)) => {
                    let path = entry.path();
                    if !entry.file_type().is_file()
                        || self.exclude.is_match(path)
                        || has_binary_extension(path)
                    {
                        continue;
                    }
                    if self.exceeds_size_limit(path) {
                        tracing::debug!(path = %path.display(), "Skipping file exceeding size limit");
                        continue;
                    }
                    return Some(path.to_path_buf());
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Error walking directory");
                }
                None => {
                    self.walkers.pop();
                }
            }
        }
        None
    }
}
