use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};

use super::{expect_changed, DbResult};
use crate::models::Admin;

pub fn create_admin(conn: &Connection, username: &str, password: &str) -> DbResult<()> {
    let hashed_password = hash(password, DEFAULT_COST)?;
    conn.execute(
        "INSERT INTO admins (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![username, hashed_password, Utc::now()],
    )?;
    Ok(())
}

pub fn read_all_admins(conn: &Connection) -> DbResult<Vec<Admin>> {
    let mut stmt = conn.prepare("SELECT id, username, created_at FROM admins ORDER BY username")?;
    let admins = stmt
        .query_map([], |row| {
            Ok(Admin {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(admins)
}

pub fn change_password(conn: &Connection, username: &str, new_password: &str) -> DbResult<()> {
    let hashed_password = hash(new_password, DEFAULT_COST)?;
    let changed = conn.execute(
        "UPDATE admins SET password_hash = ?1 WHERE username = ?2",
        params![hashed_password, username],
    )?;
    expect_changed(changed, "Admin")
}

pub fn rename_admin(conn: &Connection, old_username: &str, new_username: &str) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE admins SET username = ?1 WHERE username = ?2",
        params![new_username, old_username],
    )?;
    expect_changed(changed, "Admin")
}

/// Returns the admin when the password matches its stored hash.
pub fn verify_credentials(conn: &Connection, username: &str, password: &str) -> DbResult<Option<Admin>> {
    let row: Option<(i64, String, String, DateTime<Utc>)> = conn
        .query_row(
            "SELECT id, username, password_hash, created_at FROM admins WHERE username = ?1",
            [username],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    match row {
        Some((id, username, password_hash, created_at)) if verify(password, &password_hash)? => {
            Ok(Some(Admin { id, username, created_at }))
        }
        _ => Ok(None),
    }
}

/// Issues a random 32-byte hex token valid for `ttl_hours`.
pub fn create_token(conn: &Connection, admin_id: i64, ttl_hours: i64) -> DbResult<(String, DateTime<Utc>)> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);

    conn.execute(
        "INSERT INTO auth_tokens (token, admin_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![token, admin_id, now, expires_at],
    )?;
    Ok((token, expires_at))
}

pub fn find_admin_by_token(conn: &Connection, token: &str) -> DbResult<Option<Admin>> {
    let admin = conn
        .query_row(
            "SELECT a.id, a.username, a.created_at
             FROM auth_tokens t JOIN admins a ON a.id = t.admin_id
             WHERE t.token = ?1 AND t.expires_at > ?2",
            params![token, Utc::now()],
            |row| {
                Ok(Admin {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(admin)
}

pub fn revoke_token(conn: &Connection, token: &str) -> DbResult<()> {
    conn.execute("DELETE FROM auth_tokens WHERE token = ?1", [token])?;
    Ok(())
}

pub fn purge_expired_tokens(conn: &Connection) -> DbResult<usize> {
    let removed = conn.execute("DELETE FROM auth_tokens WHERE expires_at <= ?1", params![Utc::now()])?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    #[test]
    fn login_token_lifecycle() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        create_admin(&conn, "owner", "s3cret").unwrap();

        assert!(verify_credentials(&conn, "owner", "wrong").unwrap().is_none());
        let admin = verify_credentials(&conn, "owner", "s3cret").unwrap().unwrap();

        let (token, _) = create_token(&conn, admin.id, 2).unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(find_admin_by_token(&conn, &token).unwrap().unwrap().username, "owner");

        revoke_token(&conn, &token).unwrap();
        assert!(find_admin_by_token(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        create_admin(&conn, "owner", "pw").unwrap();
        let admin = verify_credentials(&conn, "owner", "pw").unwrap().unwrap();

        let (token, _) = create_token(&conn, admin.id, -1).unwrap();
        assert!(find_admin_by_token(&conn, &token).unwrap().is_none());
        assert_eq!(purge_expired_tokens(&conn).unwrap(), 1);
    }

    #[test]
    fn rename_and_change_password() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        create_admin(&conn, "owner", "pw").unwrap();

        rename_admin(&conn, "owner", "editor").unwrap();
        change_password(&conn, "editor", "new-pw").unwrap();
        assert!(verify_credentials(&conn, "editor", "new-pw").unwrap().is_some());
        assert!(matches!(rename_admin(&conn, "ghost", "x"), Err(super::super::DbError::NotFound(_))));
    }
}
