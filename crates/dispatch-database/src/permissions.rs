//! Permission set queries. A user's permissions are a set of tags; the
//! whole set is replaced in one statement pair so readers never observe a
//! mix of old and new tags.

use crate::{StoreResult, Unit};
use rusqlite::params;
use uuid::Uuid;

/// Get the permission set for a user, ordered by name.
pub fn permissions_by_user(unit: &Unit, user_id: Uuid) -> StoreResult<Vec<String>> {
    let conn = unit.conn()?;
    let mut stmt =
        conn.prepare("SELECT name FROM user_permissions WHERE user_id = ?1 ORDER BY name ASC")?;

    let permissions = stmt
        .query_map(params![user_id.to_string()], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(permissions)
}

/// Replace the permission set for a user. Duplicate tags collapse via the
/// primary key.
pub fn replace_permissions(unit: &Unit, user_id: Uuid, permissions: &[String]) -> StoreResult<()> {
    let conn = unit.conn()?;
    conn.execute(
        "DELETE FROM user_permissions WHERE user_id = ?1",
        params![user_id.to_string()],
    )?;

    let mut stmt = conn
        .prepare("INSERT OR IGNORE INTO user_permissions (user_id, name) VALUES (?1, ?2)")?;
    for name in permissions {
        stmt.execute(params![user_id.to_string(), name])?;
    }

    Ok(())
}
