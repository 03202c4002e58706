use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::error::ApiResult;
use crate::helper::auth_helpers;
use crate::middleware::AuthenticatedAdmin;
use crate::models::payloads::LoginPayload;
use crate::DbPool;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

async fn login(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    payload: web::Json<LoginPayload>,
) -> ApiResult<HttpResponse> {
    let pool = pool.into_inner();
    let ttl_hours = config.token_ttl_hours;
    // bcrypt verification is CPU bound.
    let response = web::block(move || auth_helpers::login(&pool, &payload, ttl_hours)).await??;
    Ok(HttpResponse::Ok().json(response))
}

async fn logout(admin: AuthenticatedAdmin, pool: web::Data<DbPool>) -> ApiResult<HttpResponse> {
    auth_helpers::logout(&pool, &admin.token)?;
    log::info!("Admin '{}' logged out", admin.username);
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out successfully" })))
}

async fn me(admin: AuthenticatedAdmin) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "id": admin.id, "username": admin.username }))
}
