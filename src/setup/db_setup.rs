use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::DbPool;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("R2D2 pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens a pool on the SQLite file, creating its parent directory.
/// Every connection gets foreign keys and a busy timeout.
pub fn create_pool(db_path: &Path) -> Result<DbPool, SetupError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });
    Ok(Pool::builder().build(manager)?)
}

/// Creates every table. Safe to run on an existing database.
pub fn setup_database(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    log::debug!("Creating 'projects' table");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL CHECK(category IN ('WEBSITE', 'PRODUCT', 'MOBILE')),
            thumbnail TEXT NOT NULL,
            images TEXT NOT NULL,
            year INTEGER NOT NULL,
            client TEXT NOT NULL,
            duration TEXT,
            industry TEXT,
            scope TEXT,
            challenge TEXT,
            approach TEXT,
            testimonial TEXT,
            content TEXT,
            is_published INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    log::debug!("Creating 'template_projects' table");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS template_projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            hero_image TEXT NOT NULL DEFAULT '',
            challenge TEXT NOT NULL DEFAULT '',
            approach TEXT NOT NULL DEFAULT '',
            client TEXT NOT NULL,
            year TEXT NOT NULL,
            duration TEXT NOT NULL DEFAULT '',
            project_type TEXT NOT NULL DEFAULT '',
            industry TEXT NOT NULL DEFAULT '',
            scope TEXT NOT NULL DEFAULT '[]',
            image1 TEXT NOT NULL DEFAULT '',
            text_section1 TEXT NOT NULL DEFAULT '',
            image2 TEXT NOT NULL DEFAULT '',
            image3 TEXT NOT NULL DEFAULT '',
            image4 TEXT NOT NULL DEFAULT '',
            video1 TEXT NOT NULL DEFAULT '',
            video1_poster TEXT NOT NULL DEFAULT '',
            video2 TEXT NOT NULL DEFAULT '',
            video2_poster TEXT NOT NULL DEFAULT '',
            testimonial_quote TEXT NOT NULL DEFAULT '',
            testimonial_author TEXT NOT NULL DEFAULT '',
            testimonial_role TEXT NOT NULL DEFAULT '',
            testimonial_image TEXT NOT NULL DEFAULT '',
            final_image TEXT NOT NULL DEFAULT '',
            text_section2 TEXT NOT NULL DEFAULT '',
            final_image1 TEXT NOT NULL DEFAULT '',
            final_image2 TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'draft' CHECK(status IN ('draft', 'published', 'archived')),
            published_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    log::debug!("Creating 'media_files' table");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS media_files (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            original_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            url TEXT NOT NULL,
            thumbnail_url TEXT,
            alt TEXT,
            description TEXT,
            media_type TEXT NOT NULL CHECK(media_type IN ('image', 'video', 'document', 'other')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    log::debug!("Creating 'profile' table");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS profile (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            location TEXT,
            photo TEXT,
            social_links TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    log::debug!("Creating 'admins' table");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    log::debug!("Creating 'auth_tokens' table");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS auth_tokens (
            token TEXT PRIMARY KEY,
            admin_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (admin_id) REFERENCES admins(id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.commit()?;
    Ok(())
}
