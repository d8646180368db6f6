//! Upload pre-flight checks.
//!
//! # Responsibilities
//! - Enforce maximum upload size
//! - Enforce MIME type and extension allow-lists
//! - Reject dangerous filenames (traversal, forbidden chars, device names, executables)
//!
//! # Design Decisions
//! - Checks run before any network call and never panic
//! - First failing check determines the reported reason

use serde::{Deserialize, Serialize};

use crate::config::UploadConfig;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "pif", "vbs", "js", "jar", "app",
];

/// Metadata describing a file about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Outcome of an upload check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileValidation {
    fn ok() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(reason.into()),
        }
    }
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check a file against the configured upload policy.
pub fn validate_file_upload(file: &FileMetadata, config: &UploadConfig) -> FileValidation {
    if file.size > config.max_size_bytes {
        return FileValidation::reject(format!(
            "File size exceeds the {} byte limit",
            config.max_size_bytes
        ));
    }

    let mime = file.mime_type.trim().to_ascii_lowercase();
    if !config
        .allowed_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&mime))
    {
        return FileValidation::reject("File type is not allowed");
    }

    let name = file.name.trim();
    if name.is_empty() {
        return FileValidation::reject("File name is empty");
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return FileValidation::reject("File name contains a path traversal sequence");
    }
    if name.chars().any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_control()) {
        return FileValidation::reject("File name contains forbidden characters");
    }
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return FileValidation::reject("File name is a reserved device name");
    }

    let ext = extension_of(name);
    if let Some(ext) = &ext {
        if EXECUTABLE_EXTENSIONS.contains(&ext.as_str()) {
            return FileValidation::reject("Executable files are not allowed");
        }
    }
    match ext {
        Some(ext) if config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)) => {
            FileValidation::ok()
        }
        _ => FileValidation::reject("File extension is not allowed"),
    }
}
