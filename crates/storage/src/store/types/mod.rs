#![forbid(unsafe_code)]

mod operation_logs;
mod projects;
mod users;
mod work_items;

pub use operation_logs::*;
pub use projects::*;
pub use users::*;
pub use work_items::*;
