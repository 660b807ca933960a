#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::types::{UserRef, UserRow};
use super::{USER_COLUMNS, user_from_row};
use pm_core::model::email_prefix_key;
use rusqlite::{Connection, OptionalExtension, params};

pub(in crate::store) fn user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()?)
}

pub(in crate::store) fn active_user_by_prefix(
    conn: &Connection,
    prefix: &str,
) -> Result<Option<UserRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email_prefix = ?1 AND is_active = 1"),
            params![prefix],
            user_from_row,
        )
        .optional()?)
}

/// A direct id must name an existing user; a lookup that matches nobody yields `None`.
pub(in crate::store) fn resolve_user_ref(
    conn: &Connection,
    user: &UserRef,
) -> Result<Option<i64>, StoreError> {
    if let Some(id) = user.id {
        if user_by_id(conn, id)?.is_none() {
            return Err(StoreError::validation(format!("user {id} does not exist")));
        }
        return Ok(Some(id));
    }
    let Some(key) = user.lookup.as_deref().and_then(email_prefix_key) else {
        return Ok(None);
    };
    Ok(active_user_by_prefix(conn, &key)?.map(|row| row.id))
}
