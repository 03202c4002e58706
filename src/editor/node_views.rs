//! Editing behaviour attached to each block: uploads, inline errors and the
//! control strip.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use super::blocks::{Block, BlockAttrs, GridImage, MediaSource};
use super::memory::MemoryManager;

pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp", "image/avif"];
pub const VIDEO_MIME_TYPES: &[&str] = &["video/mp4", "video/webm", "video/ogg"];
pub const IMAGE_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const VIDEO_MAX_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeViewKind {
    Image,
    Text,
    Testimony,
    Video,
    ImageGrid,
    Heading,
}

impl NodeViewKind {
    /// The kind of file the view accepts, if any.
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            NodeViewKind::Image | NodeViewKind::Testimony | NodeViewKind::ImageGrid => Some(MediaKind::Image),
            NodeViewKind::Video => Some(MediaKind::Video),
            NodeViewKind::Text | NodeViewKind::Heading => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_MIME_TYPES,
            MediaKind::Video => VIDEO_MIME_TYPES,
        }
    }

    pub fn max_bytes(self) -> u64 {
        match self {
            MediaKind::Image => IMAGE_MAX_BYTES,
            MediaKind::Video => VIDEO_MAX_BYTES,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Unsupported image format (JPG, PNG, WebP, AVIF only)")]
    UnsupportedImageFormat,
    #[error("Unsupported video format (MP4, WebM, OGG only)")]
    UnsupportedVideoFormat,
    #[error("Image too large (maximum 10MB)")]
    ImageTooLarge,
    #[error("Video too large (maximum 50MB)")]
    VideoTooLarge,
    #[error("This block does not accept files")]
    NotAccepted,
}

/// A file picked by the user, with the object URL the host created for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub preview_url: String,
}

impl FileCandidate {
    fn stem(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => self.name.clone(),
        }
    }
}

pub fn validate_upload(kind: MediaKind, file: &FileCandidate) -> Result<(), UploadError> {
    let mime = file.mime_type.to_ascii_lowercase();
    if !kind.mime_types().contains(&mime.as_str()) {
        return Err(match kind {
            MediaKind::Image => UploadError::UnsupportedImageFormat,
            MediaKind::Video => UploadError::UnsupportedVideoFormat,
        });
    }
    if file.size > kind.max_bytes() {
        return Err(match kind {
            MediaKind::Image => UploadError::ImageTooLarge,
            MediaKind::Video => UploadError::VideoTooLarge,
        });
    }
    Ok(())
}

/// A file waiting to be sent to the media API. Its id is what the block's
/// pending source points at.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub upload_id: String,
    pub file_name: String,
    pub preview_url: String,
    pub media: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFlag {
    Autoplay,
    Controls,
    Loop,
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    CycleVariant,
    RemoveGridImage(usize),
    MoveGridImage { from: usize, to: usize },
    StartDrag(usize),
    DropOn(usize),
    ToggleVideo(VideoFlag),
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    Unchanged,
    Updated,
    Uploads(Vec<PendingUpload>),
    DeleteRequested,
    Rejected,
}

/// Per-block editing state. The block itself stays in the document and is
/// passed in on each call.
#[derive(Debug, Clone)]
pub struct NodeView {
    block_id: String,
    kind: NodeViewKind,
    error: Option<String>,
    drag_from: Option<usize>,
    /// Preview URL of each upload this view started, by upload id.
    previews: HashMap<String, String>,
}

impl NodeView {
    pub fn new(block: &Block) -> Self {
        NodeView {
            block_id: block.id.clone(),
            kind: block.kind().view(),
            error: None,
            drag_from: None,
            previews: HashMap::new(),
        }
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    pub fn kind(&self) -> NodeViewKind {
        self.kind
    }

    /// Inline error shown under the block, if the last action failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Validates picked files and stores pending sources for the valid ones.
    /// Grids append every valid file; other views keep only the first.
    pub fn accept_upload(
        &mut self,
        block: &mut Block,
        files: Vec<FileCandidate>,
        memory: &mut MemoryManager,
    ) -> ViewOutcome {
        let Some(media) = self.kind.media_kind() else {
            self.error = Some(UploadError::NotAccepted.to_string());
            return ViewOutcome::Rejected;
        };

        let mut accepted = Vec::new();
        let mut last_error = None;
        for file in files {
            match validate_upload(media, &file) {
                Ok(()) => accepted.push(file),
                Err(e) => last_error = Some(e),
            }
        }
        if self.kind != NodeViewKind::ImageGrid {
            accepted.truncate(1);
        }
        if accepted.is_empty() {
            self.error = last_error.map(|e| e.to_string());
            return ViewOutcome::Rejected;
        }
        self.error = None;

        let mut pending = Vec::with_capacity(accepted.len());
        for file in accepted {
            let upload_id = Uuid::new_v4().to_string();
            let source = MediaSource::Pending {
                upload_id: upload_id.clone(),
            };
            let replaced = match &mut block.attrs {
                BlockAttrs::Image(a) => {
                    if a.alt.is_none() {
                        a.alt = Some(file.stem());
                    }
                    a.src.replace(source)
                }
                BlockAttrs::Video(a) => a.src.replace(source),
                BlockAttrs::Testimony(a) => a.author_image.replace(source),
                BlockAttrs::ImageGrid(a) => {
                    a.images.push(GridImage {
                        src: Some(source),
                        alt: Some(file.stem()),
                        has_video: false,
                        video_src: None,
                    });
                    None
                }
                BlockAttrs::Text(_) | BlockAttrs::Heading(_) => None,
            };
            if let Some(previous) = replaced.as_ref().and_then(MediaSource::pending_id) {
                self.release_preview(previous, memory);
            }
            memory.register_object_url(&file.preview_url, None);
            self.previews.insert(upload_id.clone(), file.preview_url.clone());
            pending.push(PendingUpload {
                upload_id,
                file_name: file.name,
                preview_url: file.preview_url,
                media,
            });
        }
        ViewOutcome::Uploads(pending)
    }

    /// Revokes the preview of `upload_id` once it is no longer shown.
    pub fn release_preview(&mut self, upload_id: &str, memory: &mut MemoryManager) -> bool {
        match self.previews.remove(upload_id) {
            Some(url) => memory.revoke_object_url(&url),
            None => false,
        }
    }

    pub fn set_attr(&mut self, block: &mut Block, name: &str, value: Value) -> ViewOutcome {
        let before = block.attrs.clone();
        block.set_attr(name, value);
        if block.attrs == before {
            ViewOutcome::Unchanged
        } else {
            self.error = None;
            ViewOutcome::Updated
        }
    }

    pub fn apply(&mut self, block: &mut Block, action: ControlAction) -> ViewOutcome {
        match (action, &mut block.attrs) {
            (ControlAction::Delete, _) => ViewOutcome::DeleteRequested,
            (ControlAction::CycleVariant, BlockAttrs::Image(a)) => {
                a.variant = a.variant.next();
                ViewOutcome::Updated
            }
            (ControlAction::RemoveGridImage(index), BlockAttrs::ImageGrid(a)) if index < a.images.len() => {
                a.images.remove(index);
                ViewOutcome::Updated
            }
            (ControlAction::MoveGridImage { from, to }, BlockAttrs::ImageGrid(a)) => move_image(&mut a.images, from, to),
            (ControlAction::StartDrag(index), BlockAttrs::ImageGrid(a)) if index < a.images.len() => {
                self.drag_from = Some(index);
                ViewOutcome::Unchanged
            }
            (ControlAction::DropOn(to), BlockAttrs::ImageGrid(a)) => match self.drag_from.take() {
                Some(from) => move_image(&mut a.images, from, to),
                None => ViewOutcome::Unchanged,
            },
            (ControlAction::ToggleVideo(flag), BlockAttrs::Video(a)) => {
                let slot = match flag {
                    VideoFlag::Autoplay => &mut a.autoplay,
                    VideoFlag::Controls => &mut a.controls,
                    VideoFlag::Loop => &mut a.loop_playback,
                    VideoFlag::Muted => &mut a.muted,
                };
                *slot = !*slot;
                ViewOutcome::Updated
            }
            _ => ViewOutcome::Unchanged,
        }
    }
}

fn move_image(images: &mut Vec<GridImage>, from: usize, to: usize) -> ViewOutcome {
    if from >= images.len() || to >= images.len() || from == to {
        return ViewOutcome::Unchanged;
    }
    let image = images.remove(from);
    images.insert(to, image);
    ViewOutcome::Updated
}
