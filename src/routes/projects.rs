use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::helper::{project_helpers, sanitization_helpers};
use crate::middleware::AuthenticatedAdmin;
use crate::models::db_operations::projects_db_operations::{self, ProjectFilter};
use crate::models::payloads::{ContentPayload, ProjectPayload, PublishPayload, ReorderPayload};
use crate::models::{PageMeta, Paginated, Pagination};
use crate::routes::lenient_u32;
use crate::DbPool;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    page: Option<String>,
    limit: Option<String>,
    category: Option<String>,
    is_published: Option<String>,
    format: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects")
            .route("", web::get().to(list_projects))
            .route("", web::post().to(create_project))
            // Must stay ahead of `/{id}`.
            .route("/reorder", web::put().to(reorder_projects))
            .route("/{id}", web::get().to(get_project))
            .route("/{id}", web::put().to(update_project))
            .route("/{id}", web::delete().to(delete_project))
            .route("/{id}/publish", web::patch().to(toggle_publish))
            .route("/{id}/duplicate", web::post().to(duplicate_project))
            .route("/{id}/content", web::get().to(get_content))
            .route("/{id}/content", web::put().to(update_content)),
    );
}

fn not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

async fn list_projects(pool: web::Data<DbPool>, query: web::Query<ProjectListQuery>) -> ApiResult<HttpResponse> {
    let pagination = Pagination::from_query(lenient_u32(&query.page), lenient_u32(&query.limit));
    let filter = ProjectFilter {
        category: query.category.clone().filter(|c| !c.is_empty()),
        is_published: match query.is_published.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        },
    };

    let conn = pool.get()?;
    let (projects, total) = projects_db_operations::list_projects(&conn, &filter, pagination)?;

    match query.format.as_deref() {
        None | Some("portfolio") => {
            let summaries: Vec<_> = projects.iter().map(project_helpers::to_summary).collect();
            Ok(HttpResponse::Ok().json(summaries))
        }
        _ => Ok(HttpResponse::Ok().json(Paginated {
            data: projects,
            meta: PageMeta::new(pagination.page, pagination.limit, total),
        })),
    }
}

async fn get_project(pool: web::Data<DbPool>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let project = projects_db_operations::read_project(&conn, &id)?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(project))
}

async fn create_project(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    payload: web::Json<ProjectPayload>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let project = project_helpers::create_project(&conn, &payload)?;
    log::info!("Created project '{}' ({})", project.title, project.id);
    Ok(HttpResponse::Created().json(project))
}

async fn update_project(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    payload: web::Json<ProjectPayload>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let project = project_helpers::update_project(&conn, &id, &payload)?;
    Ok(HttpResponse::Ok().json(project))
}

async fn delete_project(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    projects_db_operations::delete_project(&conn, &id)?;
    log::info!("Deleted project {}", id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Project deleted successfully" })))
}

async fn reorder_projects(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    payload: web::Json<ReorderPayload>,
) -> ApiResult<HttpResponse> {
    let orders = payload
        .project_orders
        .iter()
        .map(|item| match (&item.id, item.order) {
            (Some(id), Some(order)) if !id.is_empty() => Ok((id.clone(), order)),
            _ => Err(ApiError::BadRequest("Each item must have an id and an order".to_string())),
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let mut conn = pool.get()?;
    projects_db_operations::reorder_projects(&mut conn, &orders)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Projects reordered successfully" })))
}

async fn toggle_publish(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    payload: web::Json<PublishPayload>,
) -> ApiResult<HttpResponse> {
    let published = payload
        .is_published
        .as_bool()
        .ok_or_else(|| ApiError::BadRequest("isPublished must be a boolean".to_string()))?;

    let conn = pool.get()?;
    let project = projects_db_operations::set_published(&conn, &id, published)?;
    let message = if published {
        "Project published successfully"
    } else {
        "Project unpublished successfully"
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message, "project": project })))
}

async fn duplicate_project(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let project = project_helpers::duplicate_project(&conn, &id)?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Project duplicated successfully",
        "project": project,
    })))
}

async fn get_content(pool: web::Data<DbPool>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let conn = pool.get()?;
    let content = projects_db_operations::read_content(&conn, &id)?.ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "content": content.unwrap_or_default() })))
}

async fn update_content(
    _admin: AuthenticatedAdmin,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    payload: web::Json<ContentPayload>,
) -> ApiResult<HttpResponse> {
    let raw = payload
        .content
        .as_str()
        .ok_or_else(|| ApiError::BadRequest("Content must be a string".to_string()))?;
    let content = sanitization_helpers::sanitize_rich_content(raw);

    let conn = pool.get()?;
    projects_db_operations::update_content(&conn, &id, &content)?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Project content updated successfully",
        "project": { "id": id.as_str(), "content": content },
    })))
}
