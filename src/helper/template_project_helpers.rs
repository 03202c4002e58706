use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::db_operations::template_projects_db_operations;
use crate::models::payloads::TemplateProjectPayload;
use crate::models::{TemplateProject, TemplateStatus};

pub fn parse_status(raw: &str) -> ApiResult<TemplateStatus> {
    TemplateStatus::parse(raw)
        .ok_or_else(|| ApiError::BadRequest("Status must be draft, published, or archived".to_string()))
}

/// `publishedAt` moves to now on every transition into `published` and is
/// otherwise carried over.
pub fn next_published_at(
    previous: Option<TemplateStatus>,
    next: TemplateStatus,
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if next == TemplateStatus::Published && previous != Some(TemplateStatus::Published) {
        Some(now)
    } else {
        published_at
    }
}

fn apply_payload(t: &mut TemplateProject, p: &TemplateProjectPayload) {
    t.title = p.title.clone();
    t.hero_image = p.hero_image.clone();
    t.challenge = p.challenge.clone();
    t.approach = p.approach.clone();
    t.client = p.client.clone();
    t.year = p.year.clone();
    t.duration = p.duration.clone();
    t.project_type = p.project_type.clone();
    t.industry = p.industry.clone();
    t.scope = p.scope.clone();
    t.image1 = p.image1.clone();
    t.text_section1 = p.text_section1.clone();
    t.image2 = p.image2.clone();
    t.image3 = p.image3.clone();
    t.image4 = p.image4.clone();
    t.video1 = p.video1.clone();
    t.video1_poster = p.video1_poster.clone();
    t.video2 = p.video2.clone();
    t.video2_poster = p.video2_poster.clone();
    t.testimonial_quote = p.testimonial_quote.clone();
    t.testimonial_author = p.testimonial_author.clone();
    t.testimonial_role = p.testimonial_role.clone();
    t.testimonial_image = p.testimonial_image.clone();
    t.final_image = p.final_image.clone();
    t.text_section2 = p.text_section2.clone();
    t.final_image1 = p.final_image1.clone();
    t.final_image2 = p.final_image2.clone();
}

fn payload_status(payload: &TemplateProjectPayload) -> ApiResult<Option<TemplateStatus>> {
    match payload.status.as_deref() {
        None => Ok(None),
        Some(raw) => TemplateStatus::parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::field("status", "status must be draft, published, or archived")),
    }
}

fn empty_template(now: DateTime<Utc>) -> TemplateProject {
    TemplateProject {
        id: Uuid::new_v4().to_string(),
        title: String::new(),
        hero_image: String::new(),
        challenge: String::new(),
        approach: String::new(),
        client: String::new(),
        year: String::new(),
        duration: String::new(),
        project_type: String::new(),
        industry: String::new(),
        scope: Vec::new(),
        image1: String::new(),
        text_section1: String::new(),
        image2: String::new(),
        image3: String::new(),
        image4: String::new(),
        video1: String::new(),
        video1_poster: String::new(),
        video2: String::new(),
        video2_poster: String::new(),
        testimonial_quote: String::new(),
        testimonial_author: String::new(),
        testimonial_role: String::new(),
        testimonial_image: String::new(),
        final_image: String::new(),
        text_section2: String::new(),
        final_image1: String::new(),
        final_image2: String::new(),
        status: TemplateStatus::Draft,
        published_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn create_template(conn: &Connection, payload: &TemplateProjectPayload) -> ApiResult<TemplateProject> {
    payload.validate()?;
    let status = payload_status(payload)?.unwrap_or(TemplateStatus::Draft);

    let now = Utc::now();
    let mut template = empty_template(now);
    apply_payload(&mut template, payload);
    template.status = status;
    template.published_at = next_published_at(None, status, None, now);

    template_projects_db_operations::insert_template(conn, &template)?;
    Ok(template)
}

pub fn update_template(
    conn: &Connection,
    id: &str,
    payload: &TemplateProjectPayload,
) -> ApiResult<TemplateProject> {
    let mut template = template_projects_db_operations::read_template(conn, id)?
        .ok_or_else(|| ApiError::NotFound("Template project not found".to_string()))?;
    payload.validate()?;
    let status = payload_status(payload)?.unwrap_or(TemplateStatus::Draft);

    let now = Utc::now();
    apply_payload(&mut template, payload);
    template.published_at = next_published_at(Some(template.status), status, template.published_at, now);
    template.status = status;
    template.updated_at = now;

    template_projects_db_operations::update_template(conn, &template)?;
    Ok(template)
}

pub fn set_status(conn: &Connection, id: &str, status: TemplateStatus) -> ApiResult<TemplateProject> {
    let mut template = template_projects_db_operations::read_template(conn, id)?
        .ok_or_else(|| ApiError::NotFound("Template project not found".to_string()))?;

    let now = Utc::now();
    template.published_at = next_published_at(Some(template.status), status, template.published_at, now);
    template.status = status;
    template.updated_at = now;

    template_projects_db_operations::update_template(conn, &template)?;
    Ok(template)
}

/// Copies a template as a fresh draft with " (copy)" appended to title and client.
pub fn duplicate_template(conn: &Connection, id: &str) -> ApiResult<TemplateProject> {
    let original = template_projects_db_operations::read_template(conn, id)?
        .ok_or_else(|| ApiError::NotFound("Template project not found".to_string()))?;

    let now = Utc::now();
    let copy = TemplateProject {
        id: Uuid::new_v4().to_string(),
        title: format!("{} (copy)", original.title),
        client: format!("{} (copy)", original.client),
        status: TemplateStatus::Draft,
        published_at: None,
        created_at: now,
        updated_at: now,
        ..original
    };
    template_projects_db_operations::insert_template(conn, &copy)?;
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;
    use chrono::Duration;

    fn payload(status: Option<&str>) -> TemplateProjectPayload {
        TemplateProjectPayload {
            title: "Case study".into(),
            client: "ACME".into(),
            year: "2024".into(),
            scope: vec!["Branding".into(), "Web".into()],
            status: status.map(str::to_string),
            ..TemplateProjectPayload::default()
        }
    }

    #[test]
    fn published_at_only_moves_on_transition() {
        let now = Utc::now();
        let earlier = now - Duration::days(3);
        use TemplateStatus::*;
        assert_eq!(next_published_at(None, Published, None, now), Some(now));
        assert_eq!(next_published_at(Some(Draft), Published, Some(earlier), now), Some(now));
        assert_eq!(next_published_at(Some(Published), Published, Some(earlier), now), Some(earlier));
        assert_eq!(next_published_at(Some(Published), Archived, Some(earlier), now), Some(earlier));
        assert_eq!(next_published_at(Some(Draft), Draft, None, now), None);
    }

    #[test]
    fn create_status_and_duplicate() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();

        let created = create_template(&conn, &payload(Some("published"))).unwrap();
        assert_eq!(created.status, TemplateStatus::Published);
        assert!(created.published_at.is_some());

        let copy = duplicate_template(&conn, &created.id).unwrap();
        assert_eq!(copy.title, "Case study (copy)");
        assert_eq!(copy.client, "ACME (copy)");
        assert_eq!(copy.status, TemplateStatus::Draft);
        assert!(copy.published_at.is_none());
        assert_eq!(copy.scope, created.scope);

        let archived = set_status(&conn, &copy.id, TemplateStatus::Archived).unwrap();
        assert_eq!(archived.status, TemplateStatus::Archived);
    }

    #[test]
    fn rejects_unknown_status() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        let err = create_template(&conn, &payload(Some("live"))).unwrap_err();
        assert!(err.to_string().contains("status"));
        assert!(parse_status("pending").is_err());
    }
}
