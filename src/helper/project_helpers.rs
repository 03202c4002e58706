use chrono::{Datelike, Utc};
use regex::Regex;
use rusqlite::Connection;
use std::sync::OnceLock;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::helper::sanitization_helpers;
use crate::models::db_operations::projects_db_operations;
use crate::models::payloads::ProjectPayload;
use crate::models::{Project, ProjectSummary, PROJECT_CATEGORIES};

fn non_slug_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"))
}

/// Lowercases the title, collapses every run of other characters into `-`
/// and trims trailing dashes.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let dashed = non_slug_chars().replace_all(&lowered, "-");
    dashed.trim_end_matches('-').to_string()
}

fn parse_json_array(raw: &str) -> Option<Vec<serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => Some(items),
        _ => None,
    }
}

pub fn to_summary(project: &Project) -> ProjectSummary {
    let first_image = parse_json_array(&project.images)
        .and_then(|images| images.into_iter().next())
        .and_then(|first| first.as_str().map(str::to_string));
    ProjectSummary {
        id: project.id.clone(),
        title: project.title.clone(),
        description: project.description.clone(),
        slug: slugify(&project.title),
        image_url: first_image.unwrap_or_else(|| project.thumbnail.clone()),
        category: project.category.clone(),
        year: project.year,
        client: project.client.clone(),
        is_published: project.is_published,
    }
}

/// Field validation followed by the checks the derive cannot express:
/// category membership, the moving year ceiling and the JSON-array fields.
pub fn validate_payload(payload: &ProjectPayload) -> ApiResult<()> {
    payload.validate()?;

    if sanitization_helpers::strip_all_html(&payload.title).trim().is_empty() {
        return Err(ApiError::field("title", "title is required"));
    }

    if !PROJECT_CATEGORIES.contains(&payload.category.as_str()) {
        return Err(ApiError::field(
            "category",
            format!("category must be one of {}", PROJECT_CATEGORIES.join(", ")),
        ));
    }

    let max_year = Utc::now().year() + 1;
    if payload.year > max_year {
        return Err(ApiError::field("year", format!("year must be {} or earlier", max_year)));
    }

    if payload.images.as_str().and_then(parse_json_array).is_none() {
        return Err(ApiError::field("images", "images must be a valid JSON array"));
    }

    if let Some(scope) = payload.scope.as_deref().filter(|s| !s.is_empty()) {
        if parse_json_array(scope).is_none() {
            return Err(ApiError::field("scope", "scope must be a valid JSON array"));
        }
    }

    Ok(())
}

fn apply_payload(project: &mut Project, payload: &ProjectPayload) {
    project.title = sanitization_helpers::strip_all_html(&payload.title);
    project.description = payload.description.clone();
    project.category = payload.category.clone();
    project.thumbnail = payload.thumbnail.clone();
    project.images = payload.images.as_str().unwrap_or_default().to_string();
    project.year = payload.year;
    project.client = payload.client.clone();
    project.duration = payload.duration.clone();
    project.industry = payload.industry.clone();
    project.scope = payload.scope.clone();
    project.challenge = payload.challenge.clone();
    project.approach = payload.approach.clone();
    project.testimonial = payload.testimonial.clone();
    project.content = payload.content.as_deref().map(sanitization_helpers::sanitize_rich_content);
    project.is_published = payload.is_published;
}

/// Appends a new project after the current last one.
pub fn create_project(conn: &Connection, payload: &ProjectPayload) -> ApiResult<Project> {
    validate_payload(payload)?;

    let now = Utc::now();
    let mut project = Project {
        id: Uuid::new_v4().to_string(),
        title: String::new(),
        description: String::new(),
        category: String::new(),
        thumbnail: String::new(),
        images: String::new(),
        year: 0,
        client: String::new(),
        duration: None,
        industry: None,
        scope: None,
        challenge: None,
        approach: None,
        testimonial: None,
        content: None,
        is_published: false,
        order: projects_db_operations::next_order(conn)?,
        created_at: now,
        updated_at: now,
    };
    apply_payload(&mut project, payload);
    projects_db_operations::insert_project(conn, &project)?;
    Ok(project)
}

/// Full update. An omitted `order` keeps the stored position.
pub fn update_project(conn: &Connection, id: &str, payload: &ProjectPayload) -> ApiResult<Project> {
    let mut project = projects_db_operations::read_project(conn, id)?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    validate_payload(payload)?;

    apply_payload(&mut project, payload);
    if let Some(order) = payload.order {
        project.order = order;
    }
    project.updated_at = Utc::now();
    projects_db_operations::update_project(conn, &project)?;
    Ok(project)
}

pub fn duplicate_project(conn: &Connection, id: &str) -> ApiResult<Project> {
    let original = projects_db_operations::read_project(conn, id)?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let now = Utc::now();
    let copy = Project {
        id: Uuid::new_v4().to_string(),
        title: format!("{} (copy)", original.title),
        is_published: false,
        order: projects_db_operations::next_order(conn)?,
        created_at: now,
        updated_at: now,
        ..original
    };
    projects_db_operations::insert_project(conn, &copy)?;
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn payload() -> ProjectPayload {
        ProjectPayload {
            title: "Brand Refresh".into(),
            description: "A refresh".into(),
            category: "WEBSITE".into(),
            thumbnail: "/uploads/thumb.webp".into(),
            images: r#"["/uploads/one.webp", "/uploads/two.webp"]"#.into(),
            year: 2022,
            client: "ACME".into(),
            ..ProjectPayload::default()
        }
    }

    #[test]
    fn slug_matches_site_urls() {
        assert_eq!(slugify("Brand Refresh 2024!"), "brand-refresh-2024");
        assert_eq!(slugify("Café & Co."), "caf-co");
        assert_eq!(slugify("--Already--"), "-already");
    }

    #[test]
    fn rejects_non_array_images() {
        let mut p = payload();
        p.images = r#"{"not": "an array"}"#.into();
        let err = validate_payload(&p).unwrap_err();
        assert!(err.to_string().contains("images"));

        p.images = "not json".into();
        assert!(validate_payload(&p).unwrap_err().to_string().contains("images"));

        p.images = serde_json::json!(["/uploads/one.webp"]);
        assert!(validate_payload(&p).unwrap_err().to_string().contains("images"));

        p.images = serde_json::Value::Null;
        assert!(validate_payload(&p).unwrap_err().to_string().contains("images"));
    }

    #[test]
    fn title_must_survive_tag_stripping() {
        let mut p = payload();
        p.title = "<b></b>".into();
        assert!(validate_payload(&p).unwrap_err().to_string().contains("title"));
    }

    #[test]
    fn titles_round_trip_unescaped() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        let mut p = payload();
        p.title = "Design & Build".into();
        let created = create_project(&conn, &p).unwrap();
        assert_eq!(created.title, "Design & Build");

        p.title = created.title.clone();
        let updated = update_project(&conn, &created.id, &p).unwrap();
        assert_eq!(updated.title, "Design & Build");
    }

    #[test]
    fn rejects_bad_category_scope_and_future_year() {
        let mut p = payload();
        p.category = "GAME".into();
        assert!(validate_payload(&p).unwrap_err().to_string().contains("category"));

        let mut p = payload();
        p.scope = Some("UX, UI".into());
        assert!(validate_payload(&p).unwrap_err().to_string().contains("scope"));

        let mut p = payload();
        p.year = Utc::now().year() + 2;
        assert!(validate_payload(&p).unwrap_err().to_string().contains("year"));

        let mut p = payload();
        p.scope = Some(String::new());
        assert!(validate_payload(&p).is_ok());
    }

    #[test]
    fn summary_prefers_first_image() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        let project = create_project(&conn, &payload()).unwrap();
        let summary = to_summary(&project);
        assert_eq!(summary.image_url, "/uploads/one.webp");
        assert_eq!(summary.slug, "brand-refresh");

        let mut empty = project.clone();
        empty.images = "[]".into();
        assert_eq!(to_summary(&empty).image_url, "/uploads/thumb.webp");
    }

    #[test]
    fn create_appends_and_duplicate_copies() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();

        let first = create_project(&conn, &payload()).unwrap();
        assert_eq!(first.order, 0);
        let second = create_project(&conn, &payload()).unwrap();
        assert_eq!(second.order, 1);

        let copy = duplicate_project(&conn, &first.id).unwrap();
        assert_eq!(copy.title, "Brand Refresh (copy)");
        assert!(!copy.is_published);
        assert_eq!(copy.order, 2);
    }
}
