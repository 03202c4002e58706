use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::db_operations::admins_db_operations;
use crate::models::payloads::LoginPayload;
use crate::DbPool;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub username: String,
}

/// Checks the credentials and issues a fresh token. Expired tokens are
/// purged on the way.
pub fn login(pool: &DbPool, payload: &LoginPayload, ttl_hours: i64) -> ApiResult<LoginResponse> {
    payload.validate()?;
    let conn = pool.get()?;

    let admin = admins_db_operations::verify_credentials(&conn, &payload.username, &payload.password)?
        .ok_or_else(|| {
            log::warn!("Failed login attempt for '{}'", payload.username);
            ApiError::Unauthorized("Invalid username or password".to_string())
        })?;

    match admins_db_operations::purge_expired_tokens(&conn) {
        Ok(removed) if removed > 0 => log::debug!("Purged {} expired tokens", removed),
        Ok(_) => {}
        Err(e) => log::warn!("Could not purge expired tokens: {}", e),
    }

    let (token, expires_at) = admins_db_operations::create_token(&conn, admin.id, ttl_hours)?;
    log::info!("Admin '{}' logged in", admin.username);
    Ok(LoginResponse {
        token,
        expires_at,
        username: admin.username,
    })
}

pub fn logout(pool: &DbPool, token: &str) -> ApiResult<()> {
    let conn = pool.get()?;
    admins_db_operations::revoke_token(&conn, token)?;
    Ok(())
}
