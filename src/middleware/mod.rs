use actix_web::{dev, http::header, web, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::db_operations::admins_db_operations;
use crate::DbPool;

/// An admin resolved from a valid `Authorization: Bearer <token>` header.
/// Adding it to a handler's arguments makes that route require login.
#[derive(Debug, Serialize)]
pub struct AuthenticatedAdmin {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub token: String,
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedAdmin, ApiError> {
    let token = bearer_token(req).ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;

    let pool = req
        .app_data::<web::Data<DbPool>>()
        .ok_or_else(|| ApiError::internal("Authentication unavailable", "database pool is not registered"))?;
    let conn = pool.get()?;

    match admins_db_operations::find_admin_by_token(&conn, &token)? {
        Some(admin) => Ok(AuthenticatedAdmin {
            id: admin.id,
            username: admin.username,
            token,
        }),
        None => {
            log::warn!("Rejected request with an invalid or expired token");
            Err(ApiError::Unauthorized("Invalid or expired token".to_string()))
        }
    }
}

impl FromRequest for AuthenticatedAdmin {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
