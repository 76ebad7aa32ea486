//! User entity queries. All operations run inside a caller-owned [`Unit`].

use crate::{parse_ts, to_ts, Credential, NewUser, StoreResult, Unit, User};
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

fn parse_uuid(idx: usize, s: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(0, row.get::<_, String>(0)?)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        is_admin: row.get(4)?,
        created_at: parse_ts(row.get::<_, String>(5)?),
        updated_at: parse_ts(row.get::<_, String>(6)?),
    })
}

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, is_admin, created_at, updated_at";

/// Insert a new user and return the stored record.
pub fn create_user(unit: &Unit, user: &NewUser) -> StoreResult<User> {
    let now = to_ts(Utc::now());
    unit.conn()?.execute(
        "INSERT INTO users (id, username, first_name, last_name, is_admin, pass_salt, pass_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            user.id.to_string(),
            user.username,
            user.first_name,
            user.last_name,
            user.is_admin,
            user.credential.salt,
            user.credential.hash,
            now,
        ],
    )?;
    user_by_id(unit, user.id)?.ok_or_else(|| {
        crate::StoreError::NotFound("user not found after insert".to_string())
    })
}

/// Get a user by id.
pub fn user_by_id(unit: &Unit, id: Uuid) -> StoreResult<Option<User>> {
    let conn = unit.conn()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
    ))?;

    match stmt.query_row(params![id.to_string()], map_user) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get a user by username.
pub fn user_by_username(unit: &Unit, username: &str) -> StoreResult<Option<User>> {
    let conn = unit.conn()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))?;

    match stmt.query_row(params![username], map_user) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get a user together with its credential material, for login checks.
pub fn credential_by_username(
    unit: &Unit,
    username: &str,
) -> StoreResult<Option<(User, Credential)>> {
    let conn = unit.conn()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, first_name, last_name, is_admin, created_at, updated_at,
                pass_salt, pass_hash
         FROM users WHERE username = ?1",
    )?;

    let result = stmt.query_row(params![username], |row| {
        let user = map_user(row)?;
        let credential = Credential {
            salt: row.get(7)?,
            hash: row.get(8)?,
        };
        Ok((user, credential))
    });

    match result {
        Ok(pair) => Ok(Some(pair)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List all users ordered by username.
pub fn list_users(unit: &Unit) -> StoreResult<Vec<User>> {
    let conn = unit.conn()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"
    ))?;

    let users = stmt
        .query_map([], map_user)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

/// Update a user's profile fields. Returns false if the user is absent.
pub fn update_user(unit: &Unit, user: &User) -> StoreResult<bool> {
    let now = to_ts(Utc::now());
    let count = unit.conn()?.execute(
        "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, is_admin = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            user.username,
            user.first_name,
            user.last_name,
            user.is_admin,
            now,
            user.id.to_string(),
        ],
    )?;
    Ok(count > 0)
}

/// Replace a user's credential material. Returns false if the user is absent.
pub fn update_user_pass(unit: &Unit, id: Uuid, credential: &Credential) -> StoreResult<bool> {
    let now = to_ts(Utc::now());
    let count = unit.conn()?.execute(
        "UPDATE users SET pass_salt = ?1, pass_hash = ?2, updated_at = ?3 WHERE id = ?4",
        params![credential.salt, credential.hash, now, id.to_string()],
    )?;
    Ok(count > 0)
}

/// Delete a user. Returns false if the user is absent.
pub fn delete_user(unit: &Unit, id: Uuid) -> StoreResult<bool> {
    let count = unit
        .conn()?
        .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(count > 0)
}
