use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

/// Filter offered to the native file chooser.
pub const CHOOSER_ACCEPT: &str = "image/png, image/jpeg, image/webp";

#[derive(Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// A user-supplied file: a name, the MIME type it declares, and where its
/// bytes live. Bytes behind a path are only read when asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    mime_type: String,
    source: FileSource,
}

impl ImageFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        let mime_type = mime_for_path(&path).to_string();
        Self {
            name,
            mime_type,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn read_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match &self.source {
            FileSource::Path(path) => {
                std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))
            }
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Declared type for a path, judged by extension only.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{mime_for_path, FileSource, ImageFile};

    #[test]
    fn mime_follows_extension_case_insensitively() {
        assert_eq!(mime_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("b.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn from_path_derives_name_and_type() {
        let file = ImageFile::from_path("/tmp/people/alice.webp");
        assert_eq!(file.name(), "alice.webp");
        assert_eq!(file.mime_type(), "image/webp");
        assert!(file.is_image());
        assert!(matches!(file.source(), FileSource::Path(_)));
    }

    #[test]
    fn read_bytes_reads_lazily_from_disk() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("bob.png");
        let file = ImageFile::from_path(&path);
        assert!(file.read_bytes().is_err());

        std::fs::write(&path, b"png-bytes")?;
        assert_eq!(file.read_bytes()?, b"png-bytes".to_vec());
        Ok(())
    }

    #[test]
    fn non_image_declared_type_is_not_image() {
        let file = ImageFile::from_bytes("hello.txt", "text/plain", b"hello".to_vec());
        assert!(!file.is_image());
        assert_eq!(file.read_bytes().unwrap_or_default(), b"hello".to_vec());
    }
}
