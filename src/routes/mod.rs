use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;

pub mod auth;
pub mod media;
pub mod profile;
pub mod projects;
pub mod template_projects;

/// JSON bodies up to 10 MiB; parse failures become `{error}` 400s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(10 * 1024 * 1024)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            ApiError::BadRequest(format!("Invalid JSON body: {}", err)).into()
        })
}

/// Mounts every API route under `/api`.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .route("/health", web::get().to(health))
            .configure(auth::config)
            .configure(projects::config)
            .configure(template_projects::config)
            .configure(media::config)
            .configure(profile::config),
    );
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "message": "Portfolio CMS API is running",
        "timestamp": Utc::now(),
    }))
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not Found" }))
}

/// Query values are parsed leniently: anything unparsable or zero falls back.
pub(crate) fn lenient_u32(value: &Option<String>) -> Option<u32> {
    value.as_deref().and_then(|v| v.trim().parse::<u32>().ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_u32(&Some("3".into())), Some(3));
        assert_eq!(lenient_u32(&Some("abc".into())), None);
        assert_eq!(lenient_u32(&Some("0".into())), None);
        assert_eq!(lenient_u32(&None), None);
    }
}
