use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::helper::media_helpers::{self, MediaError, MEDIA_MIME_TYPES};
use crate::middleware::AuthenticatedAdmin;
use crate::models::db_operations::media_db_operations;
use crate::models::payloads::MediaUpdatePayload;
use crate::models::{MediaFile, NewMediaFile, PageMeta, Paginated, Pagination};
use crate::routes::lenient_u32;
use crate::DbPool;

#[derive(Deserialize)]
pub struct MediaListQuery {
    page: Option<String>,
    limit: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/media")
            .route("", web::get().to(list_media))
            .route("", web::post().to(upload_media))
            .route("/regenerate-thumbnails", web::post().to(regenerate_thumbnails))
            .route("/check-thumbnails", web::get().to(check_thumbnails))
            .route("/sync", web::post().to(sync_media))
            .route("/{id}", web::get().to(get_media))
            .route("/{id}", web::put().to(update_media))
            .route("/{id}", web::delete().to(delete_media)),
    );
}

fn not_found() -> ApiError {
    ApiError::NotFound("Media file not found".to_string())
}

async fn list_media(pool: web::Data<DbPool>, query: web::Query<MediaListQuery>) -> ApiResult<HttpResponse> {
    let pagination = Pagination::from_query(lenient_u32(&query.page), lenient_u32(&query.limit));
    let conn = pool.get()?;
    let (media, total) = media_db_operations::list_media(&conn, pagination)?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: media,
        meta: PageMeta::new(pagination.page, pagination.limit, total),
    }))
}

async fn get_media(pool: web::Data<DbPool>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let media = media_db_operations::read_media(&conn, &id)?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(media))
}

async fn upload_media(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let upload = media_helpers::receive_upload(
        payload,
        "file",
        &config.upload_path(),
        MEDIA_MIME_TYPES,
        config.max_file_size,
    )
    .await?;
    log::debug!("Received '{}' ({} bytes)", upload.original_name, upload.size);

    let url_prefix = config.upload_url_prefix();
    let received_path = upload.path.clone();
    let finalized = web::block(move || media_helpers::finalize_upload(upload, &url_prefix).map_err(ApiError::from)).await;
    let new_media = match finalized.map_err(|e| ApiError::from(MediaError::from(e))).and_then(|result| result) {
        Ok(new_media) => new_media,
        Err(e) => {
            media_helpers::discard_file(&received_path);
            return Err(e.into());
        }
    };

    let media = match insert_row(&pool, &new_media) {
        Ok(media) => media,
        Err(e) => {
            let upload_dir = config.upload_path();
            web::block(move || {
                media_helpers::remove_media_files(&upload_dir, &new_media.filename, new_media.thumbnail_url.as_deref())
            })
            .await?;
            return Err(e);
        }
    };
    log::info!("Stored media '{}' as {}", media.original_name, media.filename);
    Ok(HttpResponse::Created().json(media))
}

fn insert_row(pool: &DbPool, new_media: &NewMediaFile) -> ApiResult<MediaFile> {
    let conn = pool.get()?;
    Ok(media_db_operations::insert_media(&conn, new_media)?)
}

async fn update_media(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    payload: web::Json<MediaUpdatePayload>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    if media_db_operations::read_media(&conn, &id)?.is_none() {
        return Err(not_found());
    }
    media_db_operations::update_media_metadata(
        &conn,
        &id,
        payload.name.as_deref(),
        payload.alt.as_deref(),
        payload.description.as_deref(),
    )?;
    let media = media_db_operations::read_media(&conn, &id)?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(media))
}

async fn delete_media(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let media = media_db_operations::read_media(&conn, &id)?.ok_or_else(not_found)?;

    let upload_dir = config.upload_path();
    let filename = media.filename.clone();
    let thumbnail_url = media.thumbnail_url.clone();
    web::block(move || media_helpers::remove_media_files(&upload_dir, &filename, thumbnail_url.as_deref())).await?;

    media_db_operations::delete_media(&conn, &media.id)?;
    log::info!("Deleted media {}", media.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Media file deleted successfully" })))
}

async fn regenerate_thumbnails(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let pool = pool.into_inner();
    let upload_dir = config.upload_path();
    let url_prefix = config.upload_url_prefix();

    let report = web::block(move || -> ApiResult<_> {
        let conn = pool.get()?;
        Ok(media_helpers::regenerate_thumbnails(&conn, &upload_dir, &url_prefix)?)
    })
    .await??;
    log::info!("Regenerated {}/{} thumbnails", report.success, report.total);
    Ok(HttpResponse::Ok().json(report))
}

async fn check_thumbnails(pool: web::Data<DbPool>, config: web::Data<Config>) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let report = media_helpers::check_thumbnails(&conn, &config.upload_path())?;
    Ok(HttpResponse::Ok().json(report))
}

async fn sync_media(_admin: AuthenticatedAdmin, config: web::Data<Config>) -> ApiResult<HttpResponse> {
    let target = config.public_sync_path().ok_or(MediaError::SyncNotConfigured)?;
    let source = config.upload_path();
    let report = web::block(move || media_helpers::sync_directory(&source, &target).map_err(ApiError::from)).await??;
    Ok(HttpResponse::Ok().json(report))
}
