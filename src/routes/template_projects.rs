use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::helper::template_project_helpers;
use crate::middleware::AuthenticatedAdmin;
use crate::models::db_operations::template_projects_db_operations;
use crate::models::payloads::{StatusPayload, TemplateProjectPayload};
use crate::models::{PageMeta, Paginated, Pagination, TemplateStatus};
use crate::routes::lenient_u32;
use crate::DbPool;

#[derive(Deserialize)]
pub struct TemplateListQuery {
    page: Option<String>,
    limit: Option<String>,
    status: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/template-projects")
            .route("", web::get().to(list_templates))
            .route("", web::post().to(create_template))
            .route("/{id}", web::get().to(get_template))
            .route("/{id}", web::put().to(update_template))
            .route("/{id}", web::delete().to(delete_template))
            .route("/{id}/duplicate", web::post().to(duplicate_template))
            .route("/{id}/status", web::patch().to(update_status)),
    );
}

async fn list_templates(pool: web::Data<DbPool>, query: web::Query<TemplateListQuery>) -> ApiResult<HttpResponse> {
    let pagination = Pagination::from_query(lenient_u32(&query.page), lenient_u32(&query.limit));
    // Unknown status values are ignored rather than rejected.
    let status = query.status.as_deref().and_then(TemplateStatus::parse);

    let conn = pool.get()?;
    let (templates, total) = template_projects_db_operations::list_templates(&conn, status, pagination)?;
    Ok(HttpResponse::Ok().json(Paginated {
        data: templates,
        meta: PageMeta::new(pagination.page, pagination.limit, total),
    }))
}

async fn get_template(pool: web::Data<DbPool>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let template = template_projects_db_operations::read_template(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Template project not found".to_string()))?;
    Ok(HttpResponse::Ok().json(template))
}

async fn create_template(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    payload: web::Json<TemplateProjectPayload>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let template = template_project_helpers::create_template(&conn, &payload)?;
    Ok(HttpResponse::Created().json(template))
}

async fn update_template(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    payload: web::Json<TemplateProjectPayload>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let template = template_project_helpers::update_template(&conn, &id, &payload)?;
    Ok(HttpResponse::Ok().json(template))
}

async fn delete_template(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    template_projects_db_operations::delete_template(&conn, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Template project deleted successfully" })))
}

async fn duplicate_template(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let template = template_project_helpers::duplicate_template(&conn, &id)?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Template project duplicated successfully",
        "project": template,
    })))
}

async fn update_status(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    payload: web::Json<StatusPayload>,
) -> ApiResult<HttpResponse> {
    let status = template_project_helpers::parse_status(&payload.status)?;
    let conn = pool.get()?;
    let template = template_project_helpers::set_status(&conn, &id, status)?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Template project {} successfully", status.as_str()),
        "project": template,
    })))
}
