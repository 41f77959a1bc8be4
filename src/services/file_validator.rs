use std::path::Path;

use serde::Serialize;

use crate::config::ProcessingConfig;

const MAX_FILENAME_LEN: usize = 255;
const FALLBACK_FILENAME: &str = "document.txt";
const PREVIEW_BYTES: usize = 20;

const EXECUTABLE_SIGNATURES: &[&[u8]] = &[
    b"\x4D\x5A",         // PE
    b"\x7F\x45\x4C\x46", // ELF
    b"\xCA\xFE\xBA\xBE", // Java class
    b"\xFE\xED\xFA\xCE", // Mach-O
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FileValidationError {
    #[error("Filename is required")]
    MissingFilename,

    #[error(
        "File size ({:.1}MB) exceeds maximum allowed size ({:.1}MB)",
        as_mb(.size),
        as_mb(.max)
    )]
    TooLarge { size: usize, max: usize },

    #[error("File is empty")]
    Empty,

    #[error("File must have an extension")]
    MissingExtension,

    #[error("File extension '{extension}' not allowed. Allowed extensions: {allowed}")]
    ExtensionNotAllowed { extension: String, allowed: String },

    #[error("Content type is required")]
    MissingContentType,

    #[error("Content type '{content_type}' not allowed. Allowed types: {allowed}")]
    ContentTypeNotAllowed {
        content_type: String,
        allowed: String,
    },

    #[error("File appears to be an executable, which is not allowed")]
    Executable,

    #[error("File does not appear to be a valid {0}")]
    InvalidSignature(&'static str),
}

fn as_mb(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Checks the upload envelope (name, declared size, extension, MIME type)
/// before the body is processed.
pub fn validate_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    size: Option<usize>,
    config: &ProcessingConfig,
) -> Result<(), FileValidationError> {
    let result = check_upload(filename, content_type, size, config);
    match &result {
        Ok(()) => tracing::info!("File validation passed for: {}", filename.unwrap_or_default()),
        Err(e) => tracing::warn!("File validation failed: {e}"),
    }
    result
}

fn check_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    size: Option<usize>,
    config: &ProcessingConfig,
) -> Result<(), FileValidationError> {
    let filename = filename
        .filter(|name| !name.is_empty())
        .ok_or(FileValidationError::MissingFilename)?;

    if let Some(size) = size {
        validate_size(size, config.max_file_size)?;
    }

    validate_extension(filename, &config.allowed_file_extensions)?;
    validate_content_type(content_type, &config.allowed_file_types)
}

/// Checks the received bytes: size, emptiness and file signature.
pub fn validate_content(
    bytes: &[u8],
    filename: &str,
    config: &ProcessingConfig,
) -> Result<(), FileValidationError> {
    let result = validate_size(bytes.len(), config.max_file_size)
        .and_then(|()| {
            if bytes.is_empty() {
                Err(FileValidationError::Empty)
            } else {
                Ok(())
            }
        })
        .and_then(|()| validate_magic_bytes(bytes, filename));

    match &result {
        Ok(()) => tracing::info!("File content validation passed for: {filename}"),
        Err(e) => {
            let info = FileInfo::inspect(bytes, filename);
            tracing::warn!(?info, "File content validation failed: {e}");
        }
    }
    result
}

pub fn validate_size(size: usize, max: usize) -> Result<(), FileValidationError> {
    if size > max {
        return Err(FileValidationError::TooLarge { size, max });
    }
    Ok(())
}

pub fn validate_extension(filename: &str, allowed: &[String]) -> Result<(), FileValidationError> {
    let extension = file_extension(filename).ok_or(FileValidationError::MissingExtension)?;

    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(FileValidationError::ExtensionNotAllowed {
            extension,
            allowed: allowed.join(", "),
        });
    }
    Ok(())
}

pub fn validate_content_type(
    content_type: Option<&str>,
    allowed: &[String],
) -> Result<(), FileValidationError> {
    let content_type = content_type
        .filter(|ct| !ct.is_empty())
        .ok_or(FileValidationError::MissingContentType)?;

    if !allowed.iter().any(|a| a == content_type) {
        return Err(FileValidationError::ContentTypeNotAllowed {
            content_type: content_type.to_string(),
            allowed: allowed.join(", "),
        });
    }
    Ok(())
}

pub fn validate_magic_bytes(bytes: &[u8], filename: &str) -> Result<(), FileValidationError> {
    if EXECUTABLE_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return Err(FileValidationError::Executable);
    }

    match file_extension(filename).as_deref() {
        Some(".pdf") if !bytes.starts_with(b"%PDF-") => {
            Err(FileValidationError::InvalidSignature("PDF"))
        }
        Some(".epub") if !bytes.starts_with(b"PK") => {
            Err(FileValidationError::InvalidSignature("EPUB"))
        }
        Some(".docx") if !bytes.starts_with(b"PK") => {
            Err(FileValidationError::InvalidSignature("DOCX"))
        }
        _ => Ok(()),
    }
}

/// Lowercased extension including the leading dot, e.g. `.pdf`.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

pub fn sanitize_filename(filename: &str) -> String {
    let mut sanitized: String = filename
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !matches!(*c as u32, 0x00..=0x1f | 0x7f..=0x9f))
        .collect();

    if sanitized.chars().count() > MAX_FILENAME_LEN {
        let (stem, ext) = match sanitized.rfind('.') {
            Some(idx) if idx > 0 => sanitized.split_at(idx),
            _ => (sanitized.as_str(), ""),
        };
        let keep = MAX_FILENAME_LEN.saturating_sub(ext.chars().count());
        sanitized = stem.chars().take(keep).chain(ext.chars()).collect();
    }

    if sanitized.trim().is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    sanitized
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub size_bytes: usize,
    pub size_mb: f64,
    pub extension: String,
    pub is_empty: bool,
    pub first_bytes: String,
}

impl FileInfo {
    pub fn inspect(bytes: &[u8], filename: &str) -> Self {
        let size_mb = (as_mb(&bytes.len()) * 100.0).round() / 100.0;
        let first_bytes = bytes[..bytes.len().min(PREVIEW_BYTES)]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        Self {
            filename: filename.to_string(),
            size_bytes: bytes.len(),
            size_mb,
            extension: file_extension(filename).unwrap_or_default(),
            is_empty: bytes.is_empty(),
            first_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProcessingConfig {
        ProcessingConfig {
            max_file_size: 50 * 1024 * 1024,
            allowed_file_types: vec![
                "application/pdf".into(),
                "text/plain".into(),
                "application/epub+zip".into(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document".into(),
            ],
            allowed_file_extensions: vec![
                ".pdf".into(),
                ".txt".into(),
                ".epub".into(),
                ".docx".into(),
            ],
            chunk_size: 1000,
            chunk_overlap: 100,
            min_chunk_size: 100,
        }
    }

    #[test]
    fn test_validate_upload_success() {
        let result = validate_upload(
            Some("test_document.txt"),
            Some("text/plain"),
            Some(1024),
            &config(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_upload_requires_filename() {
        let err = validate_upload(None, Some("text/plain"), None, &config()).unwrap_err();
        assert_eq!(err.to_string(), "Filename is required");

        let err = validate_upload(Some(""), Some("text/plain"), None, &config()).unwrap_err();
        assert_eq!(err, FileValidationError::MissingFilename);
    }

    #[test]
    fn test_validate_upload_size_limit() {
        let cfg = config();
        assert!(
            validate_upload(Some("a.txt"), Some("text/plain"), Some(cfg.max_file_size), &cfg)
                .is_ok()
        );

        let err = validate_upload(
            Some("a.txt"),
            Some("text/plain"),
            Some(cfg.max_file_size + 1),
            &cfg,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum allowed size"));
        assert!(err.to_string().contains("(50.0MB)"));
    }

    #[test]
    fn test_validate_extension() {
        let allowed = config().allowed_file_extensions;
        for ext in [".pdf", ".txt", ".epub", ".docx", ".PDF"] {
            assert!(validate_extension(&format!("test{ext}"), &allowed).is_ok(), "{ext}");
        }
        for ext in [".exe", ".jpg"] {
            let err = validate_extension(&format!("test{ext}"), &allowed).unwrap_err();
            assert!(err.to_string().contains("not allowed"), "{ext}");
        }
        assert_eq!(
            validate_extension("test", &allowed).unwrap_err(),
            FileValidationError::MissingExtension
        );
    }

    #[test]
    fn test_validate_content_type() {
        let allowed = config().allowed_file_types;
        assert!(validate_content_type(Some("application/pdf"), &allowed).is_ok());
        assert!(validate_content_type(Some("application/epub+zip"), &allowed).is_ok());
        assert!(validate_content_type(Some("image/jpeg"), &allowed).is_err());
        assert!(validate_content_type(Some("application/executable"), &allowed).is_err());
        assert_eq!(
            validate_content_type(None, &allowed).unwrap_err(),
            FileValidationError::MissingContentType
        );
    }

    #[test]
    fn test_validate_content_rejects_empty_and_oversized() {
        let mut cfg = config();
        assert_eq!(
            validate_content(b"", "a.txt", &cfg).unwrap_err(),
            FileValidationError::Empty
        );

        cfg.max_file_size = 4;
        let err = validate_content(b"hello", "a.txt", &cfg).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum allowed size"));

        assert!(validate_content(b"hello world", "a.txt", &config()).is_ok());
    }

    #[test]
    fn test_validate_magic_bytes() {
        assert!(validate_magic_bytes(b"%PDF-1.4", "test.pdf").is_ok());
        assert!(validate_magic_bytes(b"PK", "test.epub").is_ok());
        assert!(validate_magic_bytes(b"PK", "test.docx").is_ok());
        assert!(validate_magic_bytes(b"hello world", "test.pdf").is_err());
        assert!(validate_magic_bytes(b"not zip", "test.epub").is_err());
    }

    #[test]
    fn test_validate_magic_bytes_rejects_executables() {
        for sig in EXECUTABLE_SIGNATURES {
            let err = validate_magic_bytes(sig, "malicious.exe").unwrap_err();
            assert!(err.to_string().contains("executable"));
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("normal_file.txt"), "normal_file.txt");
        assert_eq!(sanitize_filename("file with spaces.pdf"), "file with spaces.pdf");
        assert_eq!(sanitize_filename("file<>:\"/\\|?*.txt"), "file.txt");
        assert_eq!(sanitize_filename("file\x00\x1f\x7f.txt"), "file.txt");
        assert_eq!(sanitize_filename(""), "document.txt");
        assert_eq!(sanitize_filename("   "), "document.txt");

        let long = format!("{}.txt", "a".repeat(300));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized, format!("{}.txt", "a".repeat(251)));
        assert_eq!(sanitized.chars().count(), 255);
    }

    #[test]
    fn test_file_info() {
        let content = "Some sample text content that is long enough".as_bytes();
        let info = FileInfo::inspect(content, "notes.TXT");
        assert_eq!(info.size_bytes, content.len());
        assert_eq!(info.extension, ".txt");
        assert!(!info.is_empty);
        assert_eq!(info.first_bytes.len(), PREVIEW_BYTES * 2);

        let info = FileInfo::inspect(b"", "empty.txt");
        assert!(info.is_empty);
        assert_eq!(info.size_mb, 0.0);
        assert_eq!(info.first_bytes, "");

        let info = FileInfo::inspect(b"short", "short.txt");
        assert_eq!(info.first_bytes, "73686f7274");
    }
}
