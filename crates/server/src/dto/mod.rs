#![forbid(unsafe_code)]

mod identity;
mod projects;
mod work_items;

pub(crate) use identity::*;
pub(crate) use projects::*;
pub(crate) use work_items::*;

use crate::error::ApiError;
use pm_core::dates::{format_date, ms_to_rfc3339, parse_date, parse_timestamp, to_ms};
use pm_storage::{SqliteStore, StoreError, UserRef, UserRow};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn date_field(field: &'static str, value: Option<&str>) -> Result<Option<Date>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(parse_date(field, raw)?)),
        None => Ok(None),
    }
}

/// `None` leaves the field alone; `Some(None)` (explicit null or blank) clears it.
pub(crate) fn nullable_date_field(
    field: &'static str,
    value: Option<Option<String>>,
) -> Result<Option<Option<Date>>, ApiError> {
    match value {
        None => Ok(None),
        Some(inner) => date_field(field, inner.as_deref()).map(Some),
    }
}

pub(crate) fn timestamp_field(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<OffsetDateTime>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(parse_timestamp(field, raw)?)),
        None => Ok(None),
    }
}

pub(crate) fn iso_date(date: Option<Date>) -> Option<String> {
    date.map(format_date)
}

pub(crate) fn iso_timestamp(ts: Option<OffsetDateTime>) -> Option<String> {
    ts.map(|ts| ms_to_rfc3339(to_ms(ts)))
}

/// A direct id wins; otherwise a prefix, then an email, is looked up.
pub(crate) fn user_ref(id: Option<i64>, prefix: Option<String>, email: Option<String>) -> Option<UserRef> {
    if let Some(id) = id {
        return Some(UserRef::by_id(id));
    }
    let lookup = prefix
        .filter(|v| !v.trim().is_empty())
        .or_else(|| email.filter(|v| !v.trim().is_empty()))?;
    Some(UserRef::by_lookup(lookup.trim()))
}

/// Users referenced by a response, loaded once per request.
#[derive(Debug, Default)]
pub(crate) struct UserDirectory {
    users: BTreeMap<i64, UserRow>,
}

impl UserDirectory {
    pub(crate) fn load(
        store: &SqliteStore,
        ids: impl IntoIterator<Item = i64>,
    ) -> Result<Self, StoreError> {
        let mut users = BTreeMap::new();
        for id in ids {
            if users.contains_key(&id) {
                continue;
            }
            if let Some(user) = store.get_user(id)? {
                users.insert(id, user);
            }
        }
        Ok(Self { users })
    }

    pub(crate) fn username(&self, id: Option<i64>) -> Option<String> {
        id.and_then(|id| self.users.get(&id)).map(|u| u.username.clone())
    }

    pub(crate) fn email_prefix(&self, id: Option<i64>) -> Option<String> {
        id.and_then(|id| self.users.get(&id))
            .map(|u| u.email_prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "nullable")]
        value: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        let absent: Probe = serde_json::from_str("{}").expect("absent");
        assert_eq!(absent.value, None);
        let null: Probe = serde_json::from_str(r#"{"value":null}"#).expect("null");
        assert_eq!(null.value, Some(None));
        let set: Probe = serde_json::from_str(r#"{"value":"x"}"#).expect("set");
        assert_eq!(set.value, Some(Some("x".to_string())));
    }

    #[test]
    fn blank_dates_clear_and_bad_dates_fail() {
        assert_eq!(nullable_date_field("d", None).expect("absent"), None);
        assert_eq!(
            nullable_date_field("d", Some(Some(" ".to_string()))).expect("blank"),
            Some(None)
        );
        assert_eq!(
            nullable_date_field("d", Some(Some("2025-11-10".to_string()))).expect("date"),
            Some(Some(date!(2025 - 11 - 10)))
        );
        assert!(nullable_date_field("d", Some(Some("11/10/2025".to_string()))).is_err());
    }

    #[test]
    fn user_ref_prefers_id_then_prefix_then_email() {
        assert_eq!(
            user_ref(Some(3), Some("bob".into()), None),
            Some(UserRef::by_id(3))
        );
        assert_eq!(
            user_ref(None, Some("bob".into()), Some("carol@x.io".into())),
            Some(UserRef::by_lookup("bob"))
        );
        assert_eq!(
            user_ref(None, Some(" ".into()), Some("carol@x.io".into())),
            Some(UserRef::by_lookup("carol@x.io"))
        );
        assert_eq!(user_ref(None, None, None), None);
    }
}
