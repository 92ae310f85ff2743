//! Utility functions shared by indexing and the command line

use std::path::Path;

/// Binary file extensions to skip during indexing.
/// These are common binary formats that don't contain searchable text.
pub const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "o", "a", "lib", // Executables and libraries
    "png", "jpg", "jpeg", "gif", "ico", "bmp", "webp", // Images
    "zip", "tar", "gz", "7z", "rar", "xz", "bz2", // Archives
    "woff", "woff2", "ttf", "eot", "otf", // Fonts
    "pdf", "doc", "docx", "xls", "xlsx", // Documents
    "mp3", "mp4", "wav", "avi", "mkv", "mov", // Media
    "pyc", "pyo", "class", // Compiled bytecode
];

/// Check if a file should be skipped based on its extension.
pub fn has_binary_extension(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Check if content appears to be binary (contains null bytes or high ratio of non-printable chars).
///
/// Only the first 8KB are inspected.
pub fn is_binary_content(content: &str) -> bool {
    let check_len = content.len().min(8192);
    let sample = &content.as_bytes()[..check_len];

    let mut non_text_count = 0;
    for &byte in sample {
        if byte == 0 {
            return true;
        }
        if byte < 32 && !matches!(byte, b'\t' | b'\n' | b'\r') {
            non_text_count += 1;
        }
    }

    non_text_count > check_len / 10
}

/// Format bytes for human readability (e.g., 1048576 -> "1.00 MB")
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}
