use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::helper::media_helpers::{self, IMAGE_MIME_TYPES};
use crate::helper::profile_helpers;
use crate::middleware::AuthenticatedAdmin;
use crate::models::db_operations::profile_db_operations;
use crate::models::payloads::{ProfilePayload, SocialLinksPayload};
use crate::DbPool;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .route("", web::get().to(get_profile))
            .route("", web::put().to(update_profile))
            .route("/photo", web::post().to(upload_photo))
            .route("/photo", web::delete().to(delete_photo))
            .route("/social", web::put().to(update_social_links)),
    );
}

fn not_found() -> ApiError {
    ApiError::NotFound("Profile not found".to_string())
}

async fn get_profile(pool: web::Data<DbPool>) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let profile = profile_db_operations::read_or_create_profile(&conn)?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn update_profile(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    payload: web::Json<ProfilePayload>,
) -> ApiResult<HttpResponse> {
    payload.validate()?;
    let conn = pool.get()?;
    let profile = profile_db_operations::read_or_create_profile(&conn)?;
    profile_db_operations::update_profile_fields(&conn, &profile.id, &payload)?;
    let profile = profile_db_operations::read_profile(&conn)?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn upload_photo(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let upload_dir = config.upload_path();
    let upload = media_helpers::receive_upload(
        payload,
        "photo",
        &upload_dir,
        IMAGE_MIME_TYPES,
        config.max_file_size,
    )
    .await?;
    let filename = web::block(move || profile_helpers::store_photo(upload).map_err(ApiError::from)).await??;
    let url = media_helpers::public_url(&config.upload_url_prefix(), &filename);

    let saved = pool.get().map_err(ApiError::from).and_then(|conn| {
        let profile = profile_db_operations::read_or_create_profile(&conn)?;
        profile_db_operations::set_photo(&conn, &profile.id, Some(&url))?;
        Ok((conn, profile))
    });
    let (conn, profile) = match saved {
        Ok(saved) => saved,
        Err(e) => {
            media_helpers::discard_file(&upload_dir.join(&filename));
            return Err(e);
        }
    };

    let previous = profile
        .photo
        .as_deref()
        .and_then(media_helpers::filename_from_url)
        .map(str::to_string);
    let public_dir = config.public_sync_path();
    web::block(move || {
        if let Some(previous) = previous.filter(|p| *p != filename) {
            media_helpers::remove_media_files(&upload_dir, &previous, None);
        }
        profile_helpers::mirror_to_public(&upload_dir, public_dir.as_deref(), &filename);
    })
    .await?;

    let profile = profile_db_operations::read_profile(&conn)?.ok_or_else(not_found)?;
    log::info!("Profile photo updated to {}", url);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile photo updated successfully",
        "profile": profile,
    })))
}

async fn delete_photo(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let profile = profile_db_operations::read_profile(&conn)?.ok_or_else(not_found)?;

    if let Some(filename) = profile.photo.as_deref().and_then(media_helpers::filename_from_url) {
        let upload_dir = config.upload_path();
        let filename = filename.to_string();
        web::block(move || media_helpers::remove_media_files(&upload_dir, &filename, None)).await?;
    }
    profile_db_operations::set_photo(&conn, &profile.id, None)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Profile photo deleted successfully" })))
}

async fn update_social_links(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    payload: web::Json<SocialLinksPayload>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let profile = profile_db_operations::read_profile(&conn)?.ok_or_else(not_found)?;
    let links = profile_helpers::validate_social_links(&payload)?;
    profile_db_operations::set_social_links(&conn, &profile.id, &links)?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Social links updated successfully",
        "socialLinks": links,
    })))
}
