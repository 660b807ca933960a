#![forbid(unsafe_code)]

use pm_core::dates::{now_local, to_ms};
use time::OffsetDateTime;

pub(in crate::store) fn now() -> OffsetDateTime {
    now_local()
}

pub(in crate::store) fn now_ms() -> i64 {
    to_ms(now())
}
