use chrono::Utc;
use log::debug;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

use crate::models::DocumentKind;
use crate::utils::CredentialError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

/// Directory shared by concurrent runs. Every file it hands out carries a
/// millisecond timestamp plus a random suffix and is removed when dropped.
#[derive(Debug, Clone)]
pub struct TempArena {
    dir: PathBuf,
}

impl TempArena {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        TempArena { dir: dir.into() }
    }

    pub fn system() -> Self {
        TempArena::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty arena file named `<label>_<millis>_<random><extension>`.
    pub fn create(&self, label: &str, extension: &str) -> Result<NamedTempFile, CredentialError> {
        let prefix = format!("{}_{}_", label, Utc::now().timestamp_millis());
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(extension)
            .rand_bytes(8)
            .tempfile_in(&self.dir)?;
        debug!("Created temp file {:?}", file.path());
        Ok(file)
    }

    /// Write `bytes` to a fresh arena file and hand back its guard.
    pub fn write(&self, label: &str, extension: &str, bytes: &[u8]) -> Result<TempPath, CredentialError> {
        let mut file = self.create(label, extension)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file.into_temp_path())
    }
}

#[derive(Debug)]
enum Backing {
    // Deleted when the handle drops
    Owned(TempPath),
    // Left for the caller to manage
    Borrowed(PathBuf),
}

/// A document on disk plus what we know about its format.
#[derive(Debug)]
pub struct DocumentHandle {
    backing: Backing,
    kind: DocumentKind,
    mime_type: String,
    sha256: String,
}

impl DocumentHandle {
    /// Store fetched bytes in the arena. The file goes away with the handle.
    pub fn from_bytes(
        arena: &TempArena,
        label: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<Self, CredentialError> {
        let kind = Self::kind_from_content_type(content_type, bytes);
        let extension = match kind {
            DocumentKind::Pdf => ".pdf".to_string(),
            DocumentKind::Image => format!(".{}", Self::image_extension(bytes)),
        };
        let path = arena.write(label, &extension, bytes)?;

        Ok(DocumentHandle {
            backing: Backing::Owned(path),
            kind,
            mime_type: Self::mime_type_for(kind, bytes),
            sha256: Self::digest(bytes),
        })
    }

    /// Take ownership of an uploaded file; it is deleted when the handle drops.
    pub fn adopt(path: &Path) -> Result<Self, CredentialError> {
        let (kind, mime_type, sha256) = Self::inspect(path)?;
        Ok(DocumentHandle {
            backing: Backing::Owned(TempPath::from_path(path)),
            kind,
            mime_type,
            sha256,
        })
    }

    /// Reference a file the caller keeps ownership of.
    pub fn borrowed(path: &Path) -> Result<Self, CredentialError> {
        let (kind, mime_type, sha256) = Self::inspect(path)?;
        Ok(DocumentHandle {
            backing: Backing::Borrowed(path.to_path_buf()),
            kind,
            mime_type,
            sha256,
        })
    }

    pub fn path(&self) -> &Path {
        match &self.backing {
            Backing::Owned(path) => &**path,
            Backing::Borrowed(path) => path.as_path(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.backing, Backing::Owned(_))
    }

    fn inspect(path: &Path) -> Result<(DocumentKind, String, String), CredentialError> {
        if !path.is_file() {
            return Err(CredentialError::InvalidInput(format!(
                "Candidate document not found: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)?;
        let kind = Self::detect_kind(path, &bytes);
        Ok((kind, Self::mime_type_for(kind, &bytes), Self::digest(&bytes)))
    }

    /// Extension first; magic bytes decide when the extension is missing or
    /// not one we recognise.
    pub fn detect_kind(path: &Path, bytes: &[u8]) -> DocumentKind {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if extension == "pdf" {
            DocumentKind::Pdf
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            DocumentKind::Image
        } else if Self::is_pdf(bytes) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }

    /// Neither the header nor the bytes are trusted alone: a `%PDF` signature
    /// always wins, and a header claiming PDF is ignored when the signature
    /// is missing but the bytes look like an image.
    pub fn kind_from_content_type(content_type: Option<&str>, bytes: &[u8]) -> DocumentKind {
        if Self::is_pdf(bytes) {
            return DocumentKind::Pdf;
        }

        let claims_pdf = content_type
            .map(|ct| ct.to_lowercase().contains("pdf"))
            .unwrap_or(false);

        if claims_pdf && Self::sniff_image(bytes).is_none() {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }

    /// Check if the data is a PDF file
    pub fn is_pdf(bytes: &[u8]) -> bool {
        // Some generators put a few junk bytes before the header
        let window = &bytes[..bytes.len().min(1024)];
        window.windows(4).any(|w| w == b"%PDF")
    }

    fn sniff_image(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(("image/png", "png")),
            image::ImageFormat::Jpeg => Some(("image/jpeg", "jpg")),
            image::ImageFormat::Gif => Some(("image/gif", "gif")),
            image::ImageFormat::WebP => Some(("image/webp", "webp")),
            image::ImageFormat::Bmp => Some(("image/bmp", "bmp")),
            image::ImageFormat::Tiff => Some(("image/tiff", "tiff")),
            _ => None,
        }
    }

    fn image_extension(bytes: &[u8]) -> &'static str {
        Self::sniff_image(bytes).map(|(_, ext)| ext).unwrap_or("png")
    }

    fn mime_type_for(kind: DocumentKind, bytes: &[u8]) -> String {
        match kind {
            DocumentKind::Pdf => "application/pdf".to_string(),
            DocumentKind::Image => Self::sniff_image(bytes)
                .map(|(mime, _)| mime)
                .unwrap_or("image/png")
                .to_string(),
        }
    }

    fn digest(bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_detect_kind_prefers_extension() {
        assert_eq!(DocumentHandle::detect_kind(Path::new("a.pdf"), b"not really"), DocumentKind::Pdf);
        assert_eq!(DocumentHandle::detect_kind(Path::new("a.JPG"), b"%PDF-1.7"), DocumentKind::Image);
    }

    #[test]
    fn test_detect_kind_falls_back_to_magic_bytes() {
        assert_eq!(DocumentHandle::detect_kind(Path::new("upload"), b"%PDF-1.4\n..."), DocumentKind::Pdf);
        assert_eq!(DocumentHandle::detect_kind(Path::new("upload.bin"), PNG_MAGIC), DocumentKind::Image);
    }

    #[test]
    fn test_content_type_alone_is_not_trusted() {
        assert_eq!(
            DocumentHandle::kind_from_content_type(Some("application/pdf"), PNG_MAGIC),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentHandle::kind_from_content_type(Some("application/octet-stream"), b"%PDF-1.5"),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentHandle::kind_from_content_type(Some("application/pdf"), b"\x00\x01garbled"),
            DocumentKind::Pdf
        );
        assert_eq!(DocumentHandle::kind_from_content_type(None, b"????"), DocumentKind::Image);
    }

    #[test]
    fn test_arena_names_do_not_collide_and_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let arena = TempArena::new(dir.path());

        let first = arena.write("reference", ".pdf", b"%PDF-1.4").unwrap();
        let second = arena.write("reference", ".pdf", b"%PDF-1.4").unwrap();
        assert_ne!(first.to_path_buf(), second.to_path_buf());

        let name = first.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("reference_"));
        assert!(name.ends_with(".pdf"));

        let path = first.to_path_buf();
        drop(first);
        assert!(!path.exists());
    }

    #[test]
    fn test_fetched_handle_is_deleted_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let arena = TempArena::new(dir.path());

        let handle = DocumentHandle::from_bytes(&arena, "reference", PNG_MAGIC, Some("image/png")).unwrap();
        assert_eq!(handle.kind(), DocumentKind::Image);
        assert_eq!(handle.mime_type(), "image/png");
        assert!(handle.path().to_str().unwrap().ends_with(".png"));

        let path = handle.path().to_path_buf();
        assert!(path.exists());
        drop(handle);
        assert!(!path.exists());
    }

    #[test]
    fn test_borrowed_handle_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let handle = DocumentHandle::borrowed(&path).unwrap();
        assert_eq!(handle.kind(), DocumentKind::Pdf);
        assert_eq!(handle.sha256().len(), 64);
        drop(handle);
        assert!(path.exists());

        let adopted = DocumentHandle::adopt(&path).unwrap();
        assert!(adopted.is_owned());
        drop(adopted);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_candidate_is_invalid_input() {
        let err = DocumentHandle::borrowed(Path::new("/nonexistent/candidate.png")).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidInput(_)));
    }
}
