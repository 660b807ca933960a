#![forbid(unsafe_code)]

mod core;
mod indexes;
mod operation_logs;
mod projects;
mod work_items;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(core::SQL);
    sql.push_str(projects::SQL);
    sql.push_str(work_items::SQL);
    sql.push_str(operation_logs::SQL);
    sql.push_str(indexes::SQL);
    sql
}
