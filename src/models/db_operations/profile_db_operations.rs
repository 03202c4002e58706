use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{expect_changed, DbResult};
use crate::models::payloads::ProfilePayload;
use crate::models::{Profile, SocialLinks};

const PROFILE_COLUMNS: &str =
    "id, name, title, description, email, phone, location, photo, social_links, created_at, updated_at";

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    let social_links: Option<String> = row.get(8)?;
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        location: row.get(6)?,
        photo: row.get(7)?,
        social_links: social_links
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// The profile is a singleton: the first row wins.
pub fn read_profile(conn: &Connection) -> DbResult<Option<Profile>> {
    let profile = conn
        .query_row(
            &format!("SELECT {} FROM profile ORDER BY created_at ASC LIMIT 1", PROFILE_COLUMNS),
            [],
            row_to_profile,
        )
        .optional()?;
    Ok(profile)
}

pub fn create_default_profile(conn: &Connection) -> DbResult<Profile> {
    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        name: "Your Name".to_string(),
        title: "Product Designer".to_string(),
        description: "Tell visitors about yourself and your work.".to_string(),
        email: "contact@example.com".to_string(),
        phone: None,
        location: Some("Paris, France".to_string()),
        photo: None,
        social_links: SocialLinks::default(),
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        &format!(
            "INSERT INTO profile ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            PROFILE_COLUMNS
        ),
        params![
            profile.id,
            profile.name,
            profile.title,
            profile.description,
            profile.email,
            profile.phone,
            profile.location,
            profile.photo,
            serde_json::to_string(&profile.social_links)?,
            profile.created_at,
            profile.updated_at,
        ],
    )?;
    Ok(profile)
}

pub fn read_or_create_profile(conn: &Connection) -> DbResult<Profile> {
    match read_profile(conn)? {
        Some(profile) => Ok(profile),
        None => create_default_profile(conn),
    }
}

pub fn update_profile_fields(conn: &Connection, id: &str, payload: &ProfilePayload) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE profile SET name = ?2, title = ?3, description = ?4, email = ?5, phone = ?6,
            location = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            id,
            payload.name,
            payload.title,
            payload.description,
            payload.email,
            payload.phone,
            payload.location,
            Utc::now(),
        ],
    )?;
    expect_changed(changed, "Profile")
}

pub fn set_photo(conn: &Connection, id: &str, photo: Option<&str>) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE profile SET photo = ?1, updated_at = ?2 WHERE id = ?3",
        params![photo, Utc::now(), id],
    )?;
    expect_changed(changed, "Profile")
}

pub fn set_social_links(conn: &Connection, id: &str, links: &SocialLinks) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE profile SET social_links = ?1, updated_at = ?2 WHERE id = ?3",
        params![serde_json::to_string(links)?, Utc::now(), id],
    )?;
    expect_changed(changed, "Profile")
}
