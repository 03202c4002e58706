use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{expect_changed, DbResult};
use crate::models::{Pagination, TemplateProject, TemplateStatus};

const TEMPLATE_COLUMNS: &str = "id, title, hero_image, challenge, approach, client, year, duration, \
     project_type, industry, scope, image1, text_section1, image2, image3, image4, video1, \
     video1_poster, video2, video2_poster, testimonial_quote, testimonial_author, testimonial_role, \
     testimonial_image, final_image, text_section2, final_image1, final_image2, status, \
     published_at, created_at, updated_at";

fn row_to_template(row: &Row) -> rusqlite::Result<TemplateProject> {
    let scope_json: String = row.get(10)?;
    let status: String = row.get(28)?;
    Ok(TemplateProject {
        id: row.get(0)?,
        title: row.get(1)?,
        hero_image: row.get(2)?,
        challenge: row.get(3)?,
        approach: row.get(4)?,
        client: row.get(5)?,
        year: row.get(6)?,
        duration: row.get(7)?,
        project_type: row.get(8)?,
        industry: row.get(9)?,
        scope: serde_json::from_str(&scope_json).unwrap_or_default(),
        image1: row.get(11)?,
        text_section1: row.get(12)?,
        image2: row.get(13)?,
        image3: row.get(14)?,
        image4: row.get(15)?,
        video1: row.get(16)?,
        video1_poster: row.get(17)?,
        video2: row.get(18)?,
        video2_poster: row.get(19)?,
        testimonial_quote: row.get(20)?,
        testimonial_author: row.get(21)?,
        testimonial_role: row.get(22)?,
        testimonial_image: row.get(23)?,
        final_image: row.get(24)?,
        text_section2: row.get(25)?,
        final_image1: row.get(26)?,
        final_image2: row.get(27)?,
        status: TemplateStatus::parse(&status).unwrap_or(TemplateStatus::Draft),
        published_at: row.get(29)?,
        created_at: row.get(30)?,
        updated_at: row.get(31)?,
    })
}

/// Newest edits first.
pub fn list_templates(
    conn: &Connection,
    status: Option<TemplateStatus>,
    pagination: Pagination,
) -> DbResult<(Vec<TemplateProject>, i64)> {
    let status = status.map(|s| s.as_str());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM template_projects WHERE (?1 IS NULL OR status = ?1)",
        [status],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM template_projects WHERE (?1 IS NULL OR status = ?1)
         ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3",
        TEMPLATE_COLUMNS
    ))?;
    let templates = stmt
        .query_map(params![status, pagination.limit, pagination.offset()], row_to_template)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((templates, total))
}

pub fn read_template(conn: &Connection, id: &str) -> DbResult<Option<TemplateProject>> {
    let template = conn
        .query_row(
            &format!("SELECT {} FROM template_projects WHERE id = ?1", TEMPLATE_COLUMNS),
            [id],
            row_to_template,
        )
        .optional()?;
    Ok(template)
}

pub fn insert_template(conn: &Connection, t: &TemplateProject) -> DbResult<()> {
    let scope = serde_json::to_string(&t.scope)?;
    conn.execute(
        &format!(
            "INSERT INTO template_projects ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
             ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28,
             ?29, ?30, ?31, ?32)",
            TEMPLATE_COLUMNS
        ),
        params![
            t.id,
            t.title,
            t.hero_image,
            t.challenge,
            t.approach,
            t.client,
            t.year,
            t.duration,
            t.project_type,
            t.industry,
            scope,
            t.image1,
            t.text_section1,
            t.image2,
            t.image3,
            t.image4,
            t.video1,
            t.video1_poster,
            t.video2,
            t.video2_poster,
            t.testimonial_quote,
            t.testimonial_author,
            t.testimonial_role,
            t.testimonial_image,
            t.final_image,
            t.text_section2,
            t.final_image1,
            t.final_image2,
            t.status.as_str(),
            t.published_at,
            t.created_at,
            t.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_template(conn: &Connection, t: &TemplateProject) -> DbResult<()> {
    let scope = serde_json::to_string(&t.scope)?;
    let changed = conn.execute(
        "UPDATE template_projects SET title = ?2, hero_image = ?3, challenge = ?4, approach = ?5,
            client = ?6, year = ?7, duration = ?8, project_type = ?9, industry = ?10, scope = ?11,
            image1 = ?12, text_section1 = ?13, image2 = ?14, image3 = ?15, image4 = ?16,
            video1 = ?17, video1_poster = ?18, video2 = ?19, video2_poster = ?20,
            testimonial_quote = ?21, testimonial_author = ?22, testimonial_role = ?23,
            testimonial_image = ?24, final_image = ?25, text_section2 = ?26, final_image1 = ?27,
            final_image2 = ?28, status = ?29, published_at = ?30, updated_at = ?31
         WHERE id = ?1",
        params![
            t.id,
            t.title,
            t.hero_image,
            t.challenge,
            t.approach,
            t.client,
            t.year,
            t.duration,
            t.project_type,
            t.industry,
            scope,
            t.image1,
            t.text_section1,
            t.image2,
            t.image3,
            t.image4,
            t.video1,
            t.video1_poster,
            t.video2,
            t.video2_poster,
            t.testimonial_quote,
            t.testimonial_author,
            t.testimonial_role,
            t.testimonial_image,
            t.final_image,
            t.text_section2,
            t.final_image1,
            t.final_image2,
            t.status.as_str(),
            t.published_at,
            t.updated_at,
        ],
    )?;
    expect_changed(changed, "Template project")
}

pub fn delete_template(conn: &Connection, id: &str) -> DbResult<()> {
    let changed = conn.execute("DELETE FROM template_projects WHERE id = ?1", [id])?;
    expect_changed(changed, "Template project")
}
