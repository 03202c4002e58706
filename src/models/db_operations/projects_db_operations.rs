use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};

use super::{expect_changed, DbError, DbResult};
use crate::models::{Pagination, Project};

const PROJECT_COLUMNS: &str = "id, title, description, category, thumbnail, images, year, client, \
     duration, industry, scope, challenge, approach, testimonial, content, is_published, \
     sort_order, created_at, updated_at";

/// Optional list filters, both applied with AND.
#[derive(Debug, Default, Clone)]
pub struct ProjectFilter {
    pub category: Option<String>,
    pub is_published: Option<bool>,
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        thumbnail: row.get(4)?,
        images: row.get(5)?,
        year: row.get(6)?,
        client: row.get(7)?,
        duration: row.get(8)?,
        industry: row.get(9)?,
        scope: row.get(10)?,
        challenge: row.get(11)?,
        approach: row.get(12)?,
        testimonial: row.get(13)?,
        content: row.get(14)?,
        is_published: row.get(15)?,
        order: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn where_clause(filter: &ProjectFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(category) = &filter.category {
        conditions.push("category = ?");
        values.push(Value::Text(category.clone()));
    }
    if let Some(published) = filter.is_published {
        conditions.push("is_published = ?");
        values.push(Value::Integer(published as i64));
    }
    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Returns one page of projects ordered by `sort_order`, plus the filtered total.
pub fn list_projects(
    conn: &Connection,
    filter: &ProjectFilter,
    pagination: Pagination,
) -> DbResult<(Vec<Project>, i64)> {
    let (clause, values) = where_clause(filter);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM projects{}", clause),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let mut page_values = values;
    page_values.push(Value::Integer(pagination.limit as i64));
    page_values.push(Value::Integer(pagination.offset()));

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM projects{} ORDER BY sort_order ASC, created_at ASC LIMIT ? OFFSET ?",
        PROJECT_COLUMNS, clause
    ))?;
    let projects = stmt
        .query_map(params_from_iter(page_values.iter()), row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((projects, total))
}

pub fn read_project(conn: &Connection, id: &str) -> DbResult<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
            [id],
            row_to_project,
        )
        .optional()?;
    Ok(project)
}

/// Order for a newly appended project: max + 1, or 0 for an empty table.
pub fn next_order(conn: &Connection) -> DbResult<i64> {
    let max: Option<i64> = conn.query_row("SELECT MAX(sort_order) FROM projects", [], |row| row.get(0))?;
    Ok(max.map(|m| m + 1).unwrap_or(0))
}

pub fn insert_project(conn: &Connection, project: &Project) -> DbResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO projects ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            PROJECT_COLUMNS
        ),
        params![
            project.id,
            project.title,
            project.description,
            project.category,
            project.thumbnail,
            project.images,
            project.year,
            project.client,
            project.duration,
            project.industry,
            project.scope,
            project.challenge,
            project.approach,
            project.testimonial,
            project.content,
            project.is_published,
            project.order,
            project.created_at,
            project.updated_at,
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column of an existing project.
pub fn update_project(conn: &Connection, project: &Project) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE projects SET title = ?2, description = ?3, category = ?4, thumbnail = ?5, images = ?6,
            year = ?7, client = ?8, duration = ?9, industry = ?10, scope = ?11, challenge = ?12,
            approach = ?13, testimonial = ?14, content = ?15, is_published = ?16, sort_order = ?17,
            updated_at = ?18
         WHERE id = ?1",
        params![
            project.id,
            project.title,
            project.description,
            project.category,
            project.thumbnail,
            project.images,
            project.year,
            project.client,
            project.duration,
            project.industry,
            project.scope,
            project.challenge,
            project.approach,
            project.testimonial,
            project.content,
            project.is_published,
            project.order,
            project.updated_at,
        ],
    )?;
    expect_changed(changed, "Project")
}

pub fn delete_project(conn: &Connection, id: &str) -> DbResult<()> {
    let changed = conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
    expect_changed(changed, "Project")
}

/// Applies every `(id, order)` pair in one transaction. An unknown id
/// rolls the whole batch back.
pub fn reorder_projects(conn: &mut Connection, orders: &[(String, i64)]) -> DbResult<()> {
    let tx = conn.transaction()?;
    let now = Utc::now();
    for (id, order) in orders {
        let changed = tx.execute(
            "UPDATE projects SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
            params![order, now, id],
        )?;
        if changed == 0 {
            // Dropping `tx` without commit rolls back.
            return Err(DbError::NotFound(format!("Project {}", id)));
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn set_published(conn: &Connection, id: &str, published: bool) -> DbResult<Project> {
    let changed = conn.execute(
        "UPDATE projects SET is_published = ?1, updated_at = ?2 WHERE id = ?3",
        params![published, Utc::now(), id],
    )?;
    expect_changed(changed, "Project")?;
    read_project(conn, id)?.ok_or_else(|| DbError::NotFound("Project".to_string()))
}

pub fn read_content(conn: &Connection, id: &str) -> DbResult<Option<Option<String>>> {
    let content = conn
        .query_row("SELECT content FROM projects WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(content)
}

pub fn update_content(conn: &Connection, id: &str, content: &str) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE projects SET content = ?1, updated_at = ?2 WHERE id = ?3",
        params![content, Utc::now(), id],
    )?;
    expect_changed(changed, "Project")
}
