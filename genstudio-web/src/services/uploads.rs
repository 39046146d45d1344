//! Local upload handling: filename sanitising, type whitelists, temp files

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mpeg", "mpg", "webm", "wmv"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Upload kinds accepted by the media analysis endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Parse the `{kind}` path segment
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "pdf" => Some(MediaKind::Pdf),
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Pdf => "PDF",
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Pdf => PDF_EXTENSIONS,
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
            MediaKind::Audio => AUDIO_EXTENSIONS,
        }
    }

    /// MIME type to declare on upload; `None` lets ingestion sniff the content
    pub fn declared_mime_type(self, path: &Path) -> Option<String> {
        match self {
            MediaKind::Pdf => Some("application/pdf".to_string()),
            MediaKind::Audio => Some(
                mime_from_extension(path)
                    .unwrap_or("audio/mpeg")
                    .to_string(),
            ),
            MediaKind::Image | MediaKind::Video => None,
        }
    }
}

/// Lower-cased extension after the last dot
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

pub fn has_allowed_extension(filename: &str, allowed: &[&str]) -> bool {
    extension_of(filename)
        .map(|ext| allowed.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Path separators become spaces, whitespace runs become `_`, anything outside
/// `[A-Za-z0-9._-]` is dropped, and leading/trailing dots and underscores are
/// trimmed. An empty result becomes `upload`.
pub fn secure_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `%Y%m%d-%H%M%S` in local time
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Unique stored name: timestamp, short random tag, sanitised original name
pub fn stored_name(original: &str) -> String {
    format!("{}-{}-{}", timestamp(), short_tag(), secure_filename(original))
}

/// Eight hex characters that keep same-second file names apart
pub fn short_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "webm" => "video/webm",
        "wmv" => "video/x-ms-wmv",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Best MIME type for a file: magic bytes first, then extension
pub fn guess_mime_type(path: &Path, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_from_extension(path)
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Content type for serving a stored artifact (extension only)
pub fn content_type_for(path: &Path) -> &'static str {
    mime_from_extension(path).unwrap_or("application/octet-stream")
}

/// File extension (with dot) for an image MIME type
pub fn image_extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".jpg",
    }
}

/// A saved upload that is removed from disk when dropped
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    original_name: String,
}

impl TempUpload {
    /// Write `bytes` into `dir` under a unique sanitised name
    pub async fn save(dir: &Path, original_name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(stored_name(original_name));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Saved upload");
        Ok(Self {
            path,
            original_name: original_name.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Original name without its extension, sanitised
    pub fn original_stem(&self) -> String {
        let safe = secure_filename(&self.original_name);
        match safe.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => safe,
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary upload"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Report.pdf"), "My_Report.pdf");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("résumé (1).xlsx"), "rsum_1.xlsx");
        assert_eq!(secure_filename("..."), "upload");
        assert_eq!(secure_filename(""), "upload");
    }

    #[test]
    fn test_extension_whitelist() {
        assert!(has_allowed_extension("photo.JPG", IMAGE_EXTENSIONS));
        assert!(!has_allowed_extension("photo.bmp", IMAGE_EXTENSIONS));
        assert!(!has_allowed_extension("noext", IMAGE_EXTENSIONS));
        assert!(has_allowed_extension("data.xls", SPREADSHEET_EXTENSIONS));
    }

    #[test]
    fn test_media_kind_segments() {
        assert_eq!(MediaKind::from_segment("video"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_segment("excel"), None);
        assert_eq!(
            MediaKind::Audio.declared_mime_type(Path::new("a.wav")).as_deref(),
            Some("audio/wav")
        );
        assert_eq!(
            MediaKind::Audio.declared_mime_type(Path::new("a.unknown")).as_deref(),
            Some("audio/mpeg")
        );
        assert!(MediaKind::Image.declared_mime_type(Path::new("a.png")).is_none());
    }

    #[test]
    fn test_guess_mime_type_prefers_magic_bytes() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(guess_mime_type(Path::new("wrong.jpg"), &png), "image/png");
        assert_eq!(guess_mime_type(Path::new("clip.mov"), b"??"), "video/quicktime");
        assert_eq!(
            guess_mime_type(Path::new("blob"), b"??"),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_temp_upload_removed_on_drop() {
        let temp = tempfile::tempdir().unwrap();
        let upload = TempUpload::save(temp.path(), "My Photo.png", b"bytes")
            .await
            .unwrap();
        let path = upload.path().to_path_buf();

        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("My_Photo.png"));
        assert_eq!(upload.original_stem(), "My_Photo");

        drop(upload);
        assert!(!path.exists());
    }
}
