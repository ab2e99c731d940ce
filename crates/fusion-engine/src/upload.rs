use fusion_contracts::files::CHOOSER_ACCEPT;
use fusion_contracts::{FusionError, ImageFile, SlotLabel};

use crate::encoder::data_uri;

/// What a selection or drop did to the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Selected,
    /// A non-image was offered. The slot is now empty.
    Rejected { mime_type: String },
    Cleared,
}

/// Request to show the native file chooser for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChooserRequest {
    pub label: SlotLabel,
    pub accept: &'static str,
}

/// One image slot fed by a file chooser or by drag-and-drop.
#[derive(Debug, Clone)]
pub struct UploadSurface {
    label: SlotLabel,
    file: Option<ImageFile>,
    preview: Option<String>,
    dragging_over: bool,
}

impl UploadSurface {
    pub fn new(label: SlotLabel) -> Self {
        Self {
            label,
            file: None,
            preview: None,
            dragging_over: false,
        }
    }

    pub fn label(&self) -> SlotLabel {
        self.label
    }

    /// The file reported to the owner, if any.
    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn is_dragging_over(&self) -> bool {
        self.dragging_over
    }

    pub fn click(&self) -> ChooserRequest {
        ChooserRequest {
            label: self.label,
            accept: CHOOSER_ACCEPT,
        }
    }

    /// Result of the chooser. `None` means the dialog was dismissed empty.
    pub fn select(&mut self, file: Option<ImageFile>) -> SlotChange {
        self.process(file)
    }

    pub fn drag_enter(&mut self) {
        self.dragging_over = true;
    }

    pub fn drag_leave(&mut self) {
        self.dragging_over = false;
    }

    /// Returns `true`: default handling is always suppressed so a drop can land.
    pub fn drag_over(&self) -> bool {
        true
    }

    pub fn drop_file(&mut self, file: Option<ImageFile>) -> SlotChange {
        self.dragging_over = false;
        self.process(file)
    }

    pub fn clear(&mut self) -> SlotChange {
        self.process(None)
    }

    pub fn status_hint(&self) -> &'static str {
        if self.preview.is_some() {
            "Click or Drop to change"
        } else if self.dragging_over {
            "Drop the image here!"
        } else {
            "Click or drag & drop"
        }
    }

    fn process(&mut self, file: Option<ImageFile>) -> SlotChange {
        // Whatever happens, nothing of the previous selection survives.
        self.preview = None;
        self.file = None;

        let Some(file) = file else {
            return SlotChange::Cleared;
        };

        if !file.is_image() {
            let rejected = FusionError::InputRejected {
                name: file.name().to_string(),
                mime_type: file.mime_type().to_string(),
            };
            tracing::warn!(slot = %self.label, "{rejected}");
            return SlotChange::Rejected {
                mime_type: file.mime_type().to_string(),
            };
        }

        match data_uri(&file) {
            Ok(preview) => self.preview = Some(preview),
            Err(err) => {
                tracing::warn!(slot = %self.label, file = file.name(), error = %err, "preview unavailable");
            }
        }
        tracing::debug!(slot = %self.label, file = file.name(), "image selected");
        self.file = Some(file);
        SlotChange::Selected
    }
}

#[cfg(test)]
mod tests {
    use fusion_contracts::{ImageFile, SlotLabel};

    use super::{SlotChange, UploadSurface};

    fn png(name: &str, bytes: &[u8]) -> ImageFile {
        ImageFile::from_bytes(name, "image/png", bytes.to_vec())
    }

    #[test]
    fn select_image_sets_file_and_preview() {
        let mut surface = UploadSurface::new(SlotLabel::Person1);
        assert_eq!(surface.status_hint(), "Click or drag & drop");

        let change = surface.select(Some(png("a.png", b"hello")));
        assert_eq!(change, SlotChange::Selected);
        assert_eq!(surface.file().map(ImageFile::name), Some("a.png"));
        assert_eq!(surface.preview(), Some("data:image/png;base64,aGVsbG8="));
        assert_eq!(surface.status_hint(), "Click or Drop to change");
    }

    #[test]
    fn dropping_non_image_leaves_slot_empty() {
        let mut surface = UploadSurface::new(SlotLabel::Person2);
        surface.drag_enter();
        assert!(surface.drag_over());
        let change = surface.drop_file(Some(ImageFile::from_bytes(
            "notes.txt",
            "text/plain",
            b"hello".to_vec(),
        )));

        assert_eq!(
            change,
            SlotChange::Rejected {
                mime_type: "text/plain".to_string()
            }
        );
        assert!(surface.file().is_none());
        assert!(surface.preview().is_none());
        assert!(!surface.is_dragging_over());
    }

    #[test]
    fn rejected_file_discards_previous_selection() {
        let mut surface = UploadSurface::new(SlotLabel::Person1);
        surface.select(Some(png("a.png", b"first")));
        surface.select(Some(ImageFile::from_bytes(
            "doc.pdf",
            "application/pdf",
            b"%PDF".to_vec(),
        )));
        assert!(surface.file().is_none());
        assert!(surface.preview().is_none());
    }

    #[test]
    fn new_selection_fully_replaces_old_one() {
        let mut surface = UploadSurface::new(SlotLabel::Person1);
        surface.select(Some(png("f.png", b"ffff")));
        let first_preview = surface.preview().map(str::to_string);

        surface.select(Some(ImageFile::from_bytes(
            "g.webp",
            "image/webp",
            b"gg".to_vec(),
        )));
        assert_eq!(surface.file().map(ImageFile::name), Some("g.webp"));
        assert_eq!(surface.preview(), Some("data:image/webp;base64,Z2c="));
        assert_ne!(surface.preview().map(str::to_string), first_preview);
    }

    #[test]
    fn drag_indicator_follows_enter_leave_and_drop() {
        let mut surface = UploadSurface::new(SlotLabel::Person1);
        surface.drag_enter();
        assert!(surface.is_dragging_over());
        assert_eq!(surface.status_hint(), "Drop the image here!");
        surface.drag_leave();
        assert!(!surface.is_dragging_over());

        surface.drag_enter();
        surface.drop_file(Some(png("a.png", b"x")));
        assert!(!surface.is_dragging_over());
        assert!(surface.file().is_some());
    }

    #[test]
    fn empty_drop_or_dismissed_dialog_clears() {
        let mut surface = UploadSurface::new(SlotLabel::Person1);
        surface.select(Some(png("a.png", b"x")));
        assert_eq!(surface.drop_file(None), SlotChange::Cleared);
        assert!(surface.file().is_none());
    }

    #[test]
    fn unreadable_image_is_kept_without_preview() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut surface = UploadSurface::new(SlotLabel::Person2);
        let change = surface.select(Some(ImageFile::from_path(temp.path().join("gone.png"))));
        assert_eq!(change, SlotChange::Selected);
        assert!(surface.file().is_some());
        assert!(surface.preview().is_none());
        Ok(())
    }

    #[test]
    fn click_requests_chooser_with_image_filter() {
        let surface = UploadSurface::new(SlotLabel::Person2);
        let request = surface.click();
        assert_eq!(request.label, SlotLabel::Person2);
        assert_eq!(request.accept, "image/png, image/jpeg, image/webp");
    }
}
