#![forbid(unsafe_code)]

mod clock;
mod projects_tx;
mod rows;
mod sanitize;
mod schema;
mod users_tx;
mod work_items_tx;

pub(super) use clock::{now, now_ms};
pub(super) use projects_tx::*;
pub(super) use rows::*;
pub(super) use schema::migrate_sqlite_schema;
pub(super) use users_tx::*;
pub(super) use work_items_tx::*;

pub use sanitize::sanitize_html;
