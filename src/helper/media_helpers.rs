use actix_multipart::Multipart;
use actix_web::{web, web::BytesMut};
use chrono::Utc;
use futures_util::StreamExt;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use rand::Rng;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

use crate::error::ApiError;
use crate::models::db_operations::{media_db_operations, DbError};
use crate::models::{MediaType, NewMediaFile};

pub const MEDIA_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "video/mp4",
    "video/webm",
    "application/pdf",
];

pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Bounds for the optimised copy of an uploaded image (fit inside, never enlarged).
pub const OPTIMIZED_MAX: (u32, u32) = (1920, 1080);
/// Cover-cropped thumbnail created at upload time.
pub const UPLOAD_THUMBNAIL: (u32, u32) = (400, 300);
/// Fit-inside thumbnail produced by the regeneration endpoint.
pub const REGENERATED_THUMBNAIL: (u32, u32) = (300, 300);

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("File type not allowed: {0}")]
    UnsupportedType(String),
    #[error("File is too large. Maximum size is {0} bytes.")]
    TooLarge(u64),
    #[error("Invalid form field: {0}")]
    InvalidField(String),
    #[error("Upload stream error: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Public sync directory is not configured (set PUBLIC_SYNC_DIR)")]
    SyncNotConfigured,
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::MissingFile
            | MediaError::UnsupportedType(_)
            | MediaError::TooLarge(_)
            | MediaError::InvalidField(_)
            | MediaError::Multipart(_) => ApiError::BadRequest(err.to_string()),
            MediaError::Db(db) => db.into(),
            MediaError::SyncNotConfigured => ApiError::internal("Failed to sync files", err),
            other => ApiError::internal("Failed to process media", other),
        }
    }
}

fn mime_to_extension(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

fn unsafe_name_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9_-]+").expect("static regex is valid"))
}

/// Reduces a client file name to a safe lowercase stem.
pub fn sanitize_stem(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let cleaned = unsafe_name_chars().replace_all(&stem, "-");
    let trimmed: String = cleaned.trim_matches('-').chars().take(60).collect();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed
    }
}

/// `{stem}-{unix millis}-{random}`; the extension is added by the caller.
pub fn unique_basename(original_name: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}-{}", sanitize_stem(original_name), Utc::now().timestamp_millis(), suffix)
}

pub fn thumbnail_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    format!("{}-thumb.webp", stem)
}

pub fn public_url(url_prefix: &str, filename: &str) -> String {
    format!("{}/{}", url_prefix.trim_end_matches('/'), filename)
}

/// Last path segment of a stored URL, used to find the file on disk.
pub fn filename_from_url(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|name| !name.is_empty() && *name != "..")
}

/// A file streamed to disk plus the text fields that came with it.
#[derive(Debug)]
pub struct ReceivedUpload {
    pub path: PathBuf,
    pub basename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub fields: HashMap<String, String>,
}

/// Upper bound for a single non-file form field such as `alt` or `description`.
pub const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Removes a file written during a failed request.
pub fn discard_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Discarded '{}'", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::error!("Could not discard '{}': {}", path.display(), e),
    }
}

/// Streams the `file_field` part of a multipart body into `upload_dir`,
/// enforcing the MIME allow-list and the size ceiling while reading.
/// Nothing is left on disk when an error is returned.
pub async fn receive_upload(
    payload: Multipart,
    file_field: &str,
    upload_dir: &Path,
    allowed_mime_types: &[&str],
    max_size: u64,
) -> Result<ReceivedUpload, MediaError> {
    web::block({
        let dir = upload_dir.to_path_buf();
        move || fs::create_dir_all(dir)
    })
    .await??;

    let mut written = Vec::new();
    let result = read_parts(payload, file_field, upload_dir, allowed_mime_types, max_size, &mut written).await;
    if result.is_err() {
        for path in &written {
            discard_file(path);
        }
    }
    result
}

async fn read_parts(
    mut payload: Multipart,
    file_field: &str,
    upload_dir: &Path,
    allowed_mime_types: &[&str],
    max_size: u64,
    written: &mut Vec<PathBuf>,
) -> Result<ReceivedUpload, MediaError> {
    let mut upload: Option<ReceivedUpload> = None;
    let mut fields = HashMap::new();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();

        if field_name == file_field {
            if upload.is_some() {
                return Err(MediaError::InvalidField(format!("only one '{}' file may be uploaded", file_field)));
            }
            let mime_type = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default();
            if !allowed_mime_types.contains(&mime_type.as_str()) {
                return Err(MediaError::UnsupportedType(mime_type));
            }
            let ext = mime_to_extension(&mime_type).ok_or_else(|| MediaError::UnsupportedType(mime_type.clone()))?;

            let original_name = field
                .content_disposition()
                .get_filename()
                .unwrap_or("upload")
                .to_string();
            let basename = unique_basename(&original_name);
            let path = upload_dir.join(format!("{}.{}", basename, ext));

            let mut f = web::block({
                let path = path.clone();
                move || fs::File::create(path)
            })
            .await??;
            written.push(path.clone());

            let mut size: u64 = 0;
            while let Some(chunk) = field.next().await {
                let data = chunk?;
                size += data.len() as u64;
                if size > max_size {
                    return Err(MediaError::TooLarge(max_size));
                }
                f = web::block(move || f.write_all(&data).map(|_| f)).await??;
            }

            upload = Some(ReceivedUpload {
                path,
                basename,
                original_name,
                mime_type,
                size,
                fields: HashMap::new(),
            });
        } else {
            let mut data = BytesMut::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if data.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(MediaError::InvalidField(format!(
                        "'{}' exceeds {} bytes",
                        field_name, MAX_TEXT_FIELD_BYTES
                    )));
                }
                data.extend_from_slice(&chunk);
            }
            let value = String::from_utf8(data.to_vec())
                .map_err(|_| MediaError::InvalidField(format!("'{}' is not valid UTF-8", field_name)))?;
            fields.insert(field_name, value);
        }
    }

    let mut upload = upload.ok_or(MediaError::MissingFile)?;
    upload.fields = fields;
    Ok(upload)
}

/// Shrinks `img` to fit inside the box; smaller images are returned untouched.
fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if img.width() <= max_width && img.height() <= max_height {
        img
    } else {
        img.resize(max_width, max_height, FilterType::Lanczos3)
    }
}

fn save_webp(img: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
    DynamicImage::ImageRgba8(img.to_rgba8()).save_with_format(path, ImageFormat::WebP)
}

/// Result of optimising a stored image.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedImage {
    pub filename: String,
    pub thumbnail_filename: String,
    pub size: u64,
}

/// Re-encodes an uploaded image as WebP inside [`OPTIMIZED_MAX`] and writes
/// a cover-cropped thumbnail next to it. The source file is replaced.
pub fn optimize_image(source: &Path, basename: &str) -> Result<OptimizedImage, MediaError> {
    let dir = source.parent().unwrap_or_else(|| Path::new("."));
    let img = image::open(source)?;

    let filename = format!("{}.webp", basename);
    let output = dir.join(&filename);
    let optimized = fit_within(img.clone(), OPTIMIZED_MAX.0, OPTIMIZED_MAX.1);
    save_webp(&optimized, &output)?;

    let thumbnail_filename = thumbnail_filename(&filename);
    let thumbnail = img.resize_to_fill(UPLOAD_THUMBNAIL.0, UPLOAD_THUMBNAIL.1, FilterType::Lanczos3);
    save_webp(&thumbnail, &dir.join(&thumbnail_filename))?;

    if output != source {
        fs::remove_file(source)?;
    }

    Ok(OptimizedImage {
        filename,
        thumbnail_filename,
        size: fs::metadata(&output)?.len(),
    })
}

/// Turns a received upload into a media row. Images are optimised; when
/// decoding fails the original is kept without a thumbnail.
pub fn finalize_upload(upload: ReceivedUpload, url_prefix: &str) -> Result<NewMediaFile, MediaError> {
    let original_filename = upload
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let (filename, mime_type, size, thumbnail_url) = if upload.mime_type.starts_with("image/") {
        match optimize_image(&upload.path, &upload.basename) {
            Ok(optimized) => (
                optimized.filename,
                "image/webp".to_string(),
                optimized.size,
                Some(public_url(url_prefix, &optimized.thumbnail_filename)),
            ),
            Err(e) => {
                log::warn!("Keeping original '{}', optimisation failed: {}", original_filename, e);
                (original_filename, upload.mime_type.clone(), upload.size, None)
            }
        }
    } else {
        (original_filename, upload.mime_type.clone(), upload.size, None)
    };

    let field = |name: &str| upload.fields.get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    Ok(NewMediaFile {
        url: public_url(url_prefix, &filename),
        filename,
        original_name: field("name").unwrap_or_else(|| upload.original_name.clone()),
        media_type: MediaType::from_mime(&mime_type),
        mime_type,
        size: size as i64,
        thumbnail_url,
        alt: field("alt"),
        description: field("description"),
    })
}

/// Removes a stored file and its thumbnail. Failures are logged, never returned.
pub fn remove_media_files(upload_dir: &Path, filename: &str, thumbnail_url: Option<&str>) {
    let mut targets = vec![upload_dir.join(filename)];
    if let Some(thumb) = thumbnail_url.and_then(filename_from_url) {
        targets.push(upload_dir.join(thumb));
    }
    for path in targets {
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("Deleted '{}'", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("File '{}' was already missing", path.display())
            }
            Err(e) => log::error!("Could not delete '{}': {}", path.display(), e),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailStatus {
    Success,
    Skipped,
    Error,
}

#[derive(Debug, Serialize)]
pub struct ThumbnailResult {
    pub id: String,
    pub filename: String,
    pub status: ThumbnailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegenerateReport {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub results: Vec<ThumbnailResult>,
}

fn write_fit_thumbnail(source: &Path, dest: &Path) -> Result<(), MediaError> {
    let img = image::open(source)?;
    let thumb = fit_within(img, REGENERATED_THUMBNAIL.0, REGENERATED_THUMBNAIL.1);
    save_webp(&thumb, dest)?;
    Ok(())
}

/// Rebuilds the thumbnail of every image row whose original is on disk.
pub fn regenerate_thumbnails(
    conn: &Connection,
    upload_dir: &Path,
    url_prefix: &str,
) -> Result<RegenerateReport, MediaError> {
    let images = media_db_operations::list_images(conn)?;
    let mut results = Vec::with_capacity(images.len());

    for media in &images {
        let Some(filename) = filename_from_url(&media.url).map(str::to_string) else {
            continue;
        };
        let source = upload_dir.join(&filename);
        if !source.exists() {
            results.push(ThumbnailResult {
                id: media.id.clone(),
                filename,
                status: ThumbnailStatus::Skipped,
                reason: Some("original file not found".to_string()),
                url: None,
                error: None,
            });
            continue;
        }

        let thumb_name = thumbnail_filename(&filename);
        let outcome = write_fit_thumbnail(&source, &upload_dir.join(&thumb_name)).and_then(|_| {
            let url = public_url(url_prefix, &thumb_name);
            media_db_operations::set_thumbnail_url(conn, &media.id, &url)?;
            Ok(url)
        });

        results.push(match outcome {
            Ok(url) => ThumbnailResult {
                id: media.id.clone(),
                filename: thumb_name,
                status: ThumbnailStatus::Success,
                reason: None,
                url: Some(url),
                error: None,
            },
            Err(e) => {
                log::error!("Error generating thumbnail for {}: {}", filename, e);
                ThumbnailResult {
                    id: media.id.clone(),
                    filename,
                    status: ThumbnailStatus::Error,
                    reason: None,
                    url: None,
                    error: Some(e.to_string()),
                }
            }
        });
    }

    let success = results
        .iter()
        .filter(|r| matches!(r.status, ThumbnailStatus::Success))
        .count();
    Ok(RegenerateReport {
        total: images.len(),
        processed: results.len(),
        success,
        results,
    })
}

#[derive(Debug, Serialize)]
pub struct ThumbnailCheck {
    pub id: String,
    pub filename: String,
    pub exists: bool,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ThumbnailCheckReport {
    pub total: usize,
    pub missing: usize,
    pub thumbnails: Vec<ThumbnailCheck>,
}

pub fn check_thumbnails(conn: &Connection, upload_dir: &Path) -> Result<ThumbnailCheckReport, MediaError> {
    let thumbnails: Vec<ThumbnailCheck> = media_db_operations::list_images(conn)?
        .into_iter()
        .filter_map(|media| {
            let url = media.thumbnail_url?;
            let filename = filename_from_url(&url)?.to_string();
            Some(ThumbnailCheck {
                id: media.id,
                exists: upload_dir.join(&filename).is_file(),
                filename,
                url,
            })
        })
        .collect();

    Ok(ThumbnailCheckReport {
        total: thumbnails.len(),
        missing: thumbnails.iter().filter(|t| !t.exists).count(),
        thumbnails,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub message: String,
    pub copied: Vec<String>,
    pub up_to_date: usize,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Copies every top-level file of `source` into `target` when it is missing
/// there or older than the source.
pub fn sync_directory(source: &Path, target: &Path) -> Result<SyncReport, MediaError> {
    fs::create_dir_all(target)?;
    let mut copied = Vec::new();
    let mut up_to_date = 0;

    if source.is_dir() {
        for entry in WalkDir::new(source).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| MediaError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let dest = target.join(&name);
            let stale = match (modified(entry.path()), modified(&dest)) {
                (_, None) => true,
                (Some(src_time), Some(dest_time)) => src_time > dest_time,
                (None, Some(_)) => false,
            };
            if stale {
                fs::copy(entry.path(), &dest)?;
                copied.push(name);
            } else {
                up_to_date += 1;
            }
        }
    }

    log::info!("Synced uploads: {} copied, {} up to date", copied.len(), up_to_date);
    Ok(SyncReport {
        message: "Files synchronized successfully".to_string(),
        copied,
        up_to_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 40, 40]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn stems_are_sanitized() {
        assert_eq!(sanitize_stem("My Holiday Photo.JPG"), "my-holiday-photo");
        assert_eq!(sanitize_stem("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem("***.png"), "file");
        assert_eq!(thumbnail_filename("cat-1-2.webp"), "cat-1-2-thumb.webp");
        assert_eq!(filename_from_url("/uploads/cat.webp"), Some("cat.webp"));
    }

    #[test]
    fn optimize_converts_and_bounds_large_images() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("big.png");
        write_png(&source, 2400, 1200);

        let result = optimize_image(&source, "big").unwrap();
        assert_eq!(result.filename, "big.webp");
        assert!(!source.exists());

        let optimized = image::open(dir.path().join("big.webp")).unwrap();
        assert_eq!((optimized.width(), optimized.height()), (1920, 960));

        let thumb = image::open(dir.path().join(&result.thumbnail_filename)).unwrap();
        assert_eq!((thumb.width(), thumb.height()), UPLOAD_THUMBNAIL);
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("small.png");
        write_png(&source, 120, 80);
        optimize_image(&source, "small").unwrap();
        let optimized = image::open(dir.path().join("small.webp")).unwrap();
        assert_eq!((optimized.width(), optimized.height()), (120, 80));
    }

    #[test]
    fn undecodable_image_is_kept_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken-1-1.png");
        fs::write(&path, b"definitely not a png").unwrap();
        let upload = ReceivedUpload {
            path: path.clone(),
            basename: "broken-1-1".into(),
            original_name: "broken.png".into(),
            mime_type: "image/png".into(),
            size: 20,
            fields: HashMap::from([("alt".to_string(), " Alt text ".to_string())]),
        };
        let media = finalize_upload(upload, "/uploads").unwrap();
        assert_eq!(media.filename, "broken-1-1.png");
        assert_eq!(media.url, "/uploads/broken-1-1.png");
        assert!(media.thumbnail_url.is_none());
        assert_eq!(media.alt.as_deref(), Some("Alt text"));
        assert!(path.exists());
    }

    #[test]
    fn removing_missing_files_is_silent() {
        let dir = TempDir::new().unwrap();
        remove_media_files(dir.path(), "ghost.webp", Some("/uploads/ghost-thumb.webp"));
        discard_file(&dir.path().join("ghost.webp"));
    }

    #[test]
    fn regenerate_skips_missing_originals() {
        let dir = TempDir::new().unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();

        write_png(&dir.path().join("present.png"), 600, 400);
        for name in ["present.png", "gone.png"] {
            media_db_operations::insert_media(
                &conn,
                &NewMediaFile {
                    filename: name.into(),
                    original_name: name.into(),
                    mime_type: "image/png".into(),
                    size: 1,
                    url: format!("/uploads/{}", name),
                    thumbnail_url: None,
                    alt: None,
                    description: None,
                    media_type: MediaType::Image,
                },
            )
            .unwrap();
        }

        let report = regenerate_thumbnails(&conn, dir.path(), "/uploads").unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.processed, 2);
        assert_eq!(report.success, 1);

        let thumb = image::open(dir.path().join("present-thumb.webp")).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (300, 200));

        let check = check_thumbnails(&conn, dir.path()).unwrap();
        assert_eq!(check.total, 1);
        assert_eq!(check.missing, 0);
    }

    #[test]
    fn sync_copies_only_new_files() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(source.path().join("a.webp"), b"a").unwrap();
        fs::create_dir(source.path().join("nested")).unwrap();

        let first = sync_directory(source.path(), target.path()).unwrap();
        assert_eq!(first.copied, vec!["a.webp".to_string()]);

        let second = sync_directory(source.path(), target.path()).unwrap();
        assert!(second.copied.is_empty());
        assert_eq!(second.up_to_date, 1);
    }
}
