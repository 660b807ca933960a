#![forbid(unsafe_code)]

use pm_core::model::Actor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email_prefix: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at_ms: i64,
}

impl UserRow {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_admin: bool,
}

/// How a request names a user: a direct id, or an email / email-prefix lookup.
///
/// A direct id must exist. A lookup that matches nobody resolves to no user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserRef {
    pub id: Option<i64>,
    pub lookup: Option<String>,
}

impl UserRef {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            lookup: None,
        }
    }

    pub fn by_lookup(value: impl Into<String>) -> Self {
        Self {
            id: None,
            lookup: Some(value.into()),
        }
    }
}
