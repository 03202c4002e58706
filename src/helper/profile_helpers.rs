use std::fs;
use std::path::Path;
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::helper::media_helpers::{self, MediaError, ReceivedUpload};
use crate::models::payloads::SocialLinksPayload;
use crate::models::SocialLinks;

fn normalize_link(field: &str, value: Option<&str>) -> ApiResult<Option<String>> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(raw.to_string())),
        _ => Err(ApiError::field(field, format!("{} must be a valid URL", field))),
    }
}

/// Validates each link independently; empty values clear the link.
pub fn validate_social_links(payload: &SocialLinksPayload) -> ApiResult<SocialLinks> {
    Ok(SocialLinks {
        linkedin: normalize_link("linkedin", payload.linkedin.as_deref())?,
        dribbble: normalize_link("dribbble", payload.dribbble.as_deref())?,
        behance: normalize_link("behance", payload.behance.as_deref())?,
        medium: normalize_link("medium", payload.medium.as_deref())?,
    })
}

/// Stores a received profile photo as an optimised WebP and returns its
/// file name. The thumbnail produced on the way is not kept.
pub fn store_photo(upload: ReceivedUpload) -> Result<String, MediaError> {
    match media_helpers::optimize_image(&upload.path, &upload.basename) {
        Ok(optimized) => {
            let dir = upload.path.parent().unwrap_or_else(|| Path::new("."));
            if let Err(e) = fs::remove_file(dir.join(&optimized.thumbnail_filename)) {
                log::debug!("No photo thumbnail to discard: {}", e);
            }
            Ok(optimized.filename)
        }
        Err(e) => {
            let _ = fs::remove_file(&upload.path);
            Err(e)
        }
    }
}

/// Copies a file into the public mirror when one is configured. Best effort.
pub fn mirror_to_public(upload_dir: &Path, public_dir: Option<&Path>, filename: &str) {
    let Some(public_dir) = public_dir else {
        return;
    };
    let result = fs::create_dir_all(public_dir)
        .and_then(|_| fs::copy(upload_dir.join(filename), public_dir.join(filename)));
    match result {
        Ok(_) => log::info!("Copied '{}' to the public directory", filename),
        Err(e) => log::warn!("Could not copy '{}' to the public directory: {}", filename, e),
    }
}
