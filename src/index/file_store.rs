//! Field values read from files on disk.

use super::{FieldLoader, SegmentReader};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Represents a memory-mapped file
pub struct MappedFile {
    pub path: PathBuf,
    mmap: Option<Mmap>,
}

impl MappedFile {
    /// Map `path` read-only. Empty files are not mapped.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: read-only map; callers copy the text out before it is dropped
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Get the content as bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    /// Get the content as a string slice; non-UTF-8 content is `InvalidData`
    pub fn as_str(&self) -> io::Result<&str> {
        std::str::from_utf8(self.as_bytes()).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {}", self.path.display(), e),
            )
        })
    }

    /// Get the file size
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the file is empty
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Loads a field's text from the files named by a stored path field.
///
/// Lets an index keep only paths while the recheck reads current contents.
#[derive(Debug, Clone)]
pub struct FileContentLoader {
    path_field: String,
}

impl FileContentLoader {
    pub fn new(path_field: impl Into<String>) -> Self {
        Self {
            path_field: path_field.into(),
        }
    }
}

impl FieldLoader for FileContentLoader {
    fn load(&self, _field: &str, reader: &dyn SegmentReader, doc_id: u32) -> io::Result<Vec<String>> {
        let paths = reader.stored(&self.path_field, doc_id).unwrap_or_default();
        let mut values = Vec::with_capacity(paths.len());
        for path in paths {
            let file = MappedFile::open(path)?;
            values.push(file.as_str()?.to_string());
        }
        Ok(values)
    }
}
