#![forbid(unsafe_code)]

use super::error::map_constraint_conflict;
use super::support::{USER_COLUMNS, now_ms, user_by_id, user_from_row};
use super::{NewUser, SqliteStore, StoreError, UserRow, begin_write};
use pm_core::model::{Actor, email_prefix_key};
use rusqlite::{OptionalExtension, Transaction, params};
use sha2::{Digest, Sha256};

fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn validate_new_user(user: &NewUser) -> Result<(String, String), StoreError> {
    let username = user.username.trim();
    if username.is_empty() {
        return Err(StoreError::validation("username must not be empty"));
    }
    let prefix = user
        .email
        .as_deref()
        .and_then(email_prefix_key)
        .or_else(|| email_prefix_key(username))
        .ok_or_else(|| StoreError::validation("user needs an email or username prefix"))?;
    Ok((username.to_string(), prefix))
}

fn user_by_username_tx(tx: &Transaction<'_>, username: &str) -> Result<Option<UserRow>, StoreError> {
    Ok(tx
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()?)
}

impl SqliteStore {
    pub fn create_user(&mut self, user: NewUser) -> Result<UserRow, StoreError> {
        let (username, prefix) = validate_new_user(&user)?;
        let tx = begin_write(&mut self.conn)?;
        tx.execute(
            "INSERT INTO users(username, email_prefix, email, full_name, is_admin, is_active, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![username, prefix, user.email, user.full_name, user.is_admin, now_ms()],
        )
        .map_err(|err| map_constraint_conflict(err, "username or email prefix already in use"))?;
        let id = tx.last_insert_rowid();
        let row = user_by_id(&tx, id)?.ok_or_else(|| StoreError::not_found(format!("user {id}")))?;
        tx.commit()?;
        Ok(row)
    }

    /// Inserts the user, or refreshes profile and admin flag when the username exists.
    pub fn upsert_user(&mut self, user: NewUser) -> Result<UserRow, StoreError> {
        let (username, prefix) = validate_new_user(&user)?;
        let tx = begin_write(&mut self.conn)?;
        let id = match user_by_username_tx(&tx, &username)? {
            Some(existing) => {
                tx.execute(
                    "UPDATE users SET email_prefix = ?2, email = ?3, full_name = ?4, is_admin = ?5, \
                       is_active = 1 WHERE id = ?1",
                    params![existing.id, prefix, user.email, user.full_name, user.is_admin],
                )
                .map_err(|err| map_constraint_conflict(err, "email prefix already in use"))?;
                existing.id
            }
            None => {
                tx.execute(
                    "INSERT INTO users(username, email_prefix, email, full_name, is_admin, is_active, created_at_ms) \
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                    params![username, prefix, user.email, user.full_name, user.is_admin, now_ms()],
                )
                .map_err(|err| map_constraint_conflict(err, "email prefix already in use"))?;
                tx.last_insert_rowid()
            }
        };
        let row = user_by_id(&tx, id)?.ok_or_else(|| StoreError::not_found(format!("user {id}")))?;
        tx.commit()?;
        Ok(row)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        user_by_id(&self.conn, id)
    }

    pub fn list_active_users(&self) -> Result<Vec<UserRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 ORDER BY username ASC"
        ))?;
        let rows = stmt.query_map([], user_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Registers a bearer token for `user_id`. Only its SHA-256 is kept.
    pub fn register_session(&mut self, user_id: i64, token: &str) -> Result<(), StoreError> {
        if token.trim().is_empty() {
            return Err(StoreError::InvalidArgument("session token must not be empty".to_string()));
        }
        let tx = begin_write(&mut self.conn)?;
        if user_by_id(&tx, user_id)?.is_none() {
            return Err(StoreError::not_found(format!("user {user_id}")));
        }
        tx.execute(
            "INSERT INTO sessions(token_sha256, user_id, created_at_ms) VALUES (?1, ?2, ?3) \
             ON CONFLICT(token_sha256) DO UPDATE SET user_id = excluded.user_id",
            params![token_digest(token), user_id, now_ms()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn revoke_session(&mut self, token: &str) -> Result<bool, StoreError> {
        let tx = begin_write(&mut self.conn)?;
        let removed = tx.execute(
            "DELETE FROM sessions WHERE token_sha256 = ?1",
            params![token_digest(token)],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Resolves a bearer token to the acting user; unknown tokens and inactive users yield `None`.
    pub fn resolve_session(&self, token: &str) -> Result<Option<Actor>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT u.id, u.username, u.is_admin FROM sessions s \
                 JOIN users u ON u.id = s.user_id \
                 WHERE s.token_sha256 = ?1 AND u.is_active = 1",
                params![token_digest(token)],
                |row| {
                    Ok(Actor {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        is_admin: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }
}
