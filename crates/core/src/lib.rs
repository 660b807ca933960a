#![forbid(unsafe_code)]

pub mod lifecycle;
pub mod schedule;
pub mod worktime;

pub mod ids {
    use thiserror::Error;

    /// Entity kinds that receive human-readable codes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum CodePrefix {
        Pro,
        Job,
        Task,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Error)]
    #[error("invalid code prefix: {0:?} (expected PRO, JOB or TASK)")]
    pub struct CodePrefixError(pub String);

    impl CodePrefix {
        pub fn as_str(self) -> &'static str {
            match self {
                CodePrefix::Pro => "PRO",
                CodePrefix::Job => "JOB",
                CodePrefix::Task => "TASK",
            }
        }

        pub fn parse(value: &str) -> Result<Self, CodePrefixError> {
            match value {
                "PRO" => Ok(CodePrefix::Pro),
                "JOB" => Ok(CodePrefix::Job),
                "TASK" => Ok(CodePrefix::Task),
                other => Err(CodePrefixError(other.to_string())),
            }
        }

        /// `PREFIX-NNNN`, zero-padded to four digits; larger values keep growing.
        pub fn format(self, value: i64) -> String {
            format!("{}-{:04}", self.as_str(), value)
        }
    }

    /// Splits `JOB-0042` into its prefix and numeric value.
    pub fn parse_code(code: &str) -> Option<(CodePrefix, i64)> {
        let (prefix, digits) = code.split_once('-')?;
        let prefix = CodePrefix::parse(prefix).ok()?;
        if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value = digits.parse::<i64>().ok()?;
        Some((prefix, value))
    }
}

pub mod model {
    use crate::ids::CodePrefix;
    use thiserror::Error;

    #[derive(Clone, Debug, PartialEq, Eq, Error)]
    #[error("invalid {field}: {value:?}")]
    pub struct ParseEnumError {
        pub field: &'static str,
        pub value: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum WorkItemKind {
        Job,
        Task,
    }

    impl WorkItemKind {
        pub fn as_str(self) -> &'static str {
            match self {
                WorkItemKind::Job => "JOB",
                WorkItemKind::Task => "TASK",
            }
        }

        pub fn parse(value: &str) -> Result<Self, ParseEnumError> {
            match value {
                "JOB" => Ok(WorkItemKind::Job),
                "TASK" => Ok(WorkItemKind::Task),
                other => Err(ParseEnumError {
                    field: "kind",
                    value: other.to_string(),
                }),
            }
        }

        pub fn code_prefix(self) -> CodePrefix {
            match self {
                WorkItemKind::Job => CodePrefix::Job,
                WorkItemKind::Task => CodePrefix::Task,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum WorkItemStatus {
        Todo,
        Doing,
        Blocked,
        Done,
        Cancelled,
        Deleted,
    }

    impl WorkItemStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                WorkItemStatus::Todo => "todo",
                WorkItemStatus::Doing => "doing",
                WorkItemStatus::Blocked => "blocked",
                WorkItemStatus::Done => "done",
                WorkItemStatus::Cancelled => "cancelled",
                WorkItemStatus::Deleted => "deleted",
            }
        }

        pub fn parse(value: &str) -> Result<Self, ParseEnumError> {
            match value {
                "todo" => Ok(WorkItemStatus::Todo),
                "doing" => Ok(WorkItemStatus::Doing),
                "blocked" => Ok(WorkItemStatus::Blocked),
                "done" => Ok(WorkItemStatus::Done),
                "cancelled" => Ok(WorkItemStatus::Cancelled),
                "deleted" => Ok(WorkItemStatus::Deleted),
                other => Err(ParseEnumError {
                    field: "status",
                    value: other.to_string(),
                }),
            }
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub enum Priority {
        Low,
        #[default]
        Medium,
        High,
    }

    impl Priority {
        pub fn as_str(self) -> &'static str {
            match self {
                Priority::Low => "low",
                Priority::Medium => "medium",
                Priority::High => "high",
            }
        }

        pub fn parse(value: &str) -> Result<Self, ParseEnumError> {
            match value {
                "low" => Ok(Priority::Low),
                "medium" => Ok(Priority::Medium),
                "high" => Ok(Priority::High),
                other => Err(ParseEnumError {
                    field: "priority",
                    value: other.to_string(),
                }),
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ProjectStatus {
        Active,
        Archived,
    }

    impl ProjectStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                ProjectStatus::Active => "active",
                ProjectStatus::Archived => "archived",
            }
        }

        pub fn parse(value: &str) -> Result<Self, ParseEnumError> {
            match value {
                "active" => Ok(ProjectStatus::Active),
                "archived" => Ok(ProjectStatus::Archived),
                other => Err(ParseEnumError {
                    field: "project status",
                    value: other.to_string(),
                }),
            }
        }
    }

    /// Resolved caller identity, as handed over by the session layer.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Actor {
        pub id: i64,
        pub username: String,
        pub is_admin: bool,
    }

    /// Lookup key for a user: the local part of an email address.
    ///
    /// `alice@example.com` and `alice` both resolve to `alice`; blank input resolves to nothing.
    pub fn email_prefix_key(value: &str) -> Option<String> {
        let value = value.trim();
        let key = match value.split_once('@') {
            Some((local, _)) => local.trim(),
            None => value,
        };
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}

pub mod dates {
    use thiserror::Error;
    use time::format_description::well_known::Rfc3339;
    use time::macros::{format_description, offset};
    use time::{Date, OffsetDateTime, UtcOffset};

    /// Wall-clock offset used for "today" and for the calendar date of a completion.
    pub const BUSINESS_OFFSET: UtcOffset = offset!(+8);

    #[derive(Clone, Debug, PartialEq, Eq, Error)]
    #[error("invalid {field}: {value:?}")]
    pub struct DateParseError {
        pub field: &'static str,
        pub value: String,
    }

    pub fn parse_date(field: &'static str, value: &str) -> Result<Date, DateParseError> {
        Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
            DateParseError {
                field,
                value: value.to_string(),
            }
        })
    }

    pub fn format_date(date: Date) -> String {
        date.format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| date.to_string())
    }

    /// Accepts RFC 3339 timestamps, and bare dates as local midnight.
    pub fn parse_timestamp(field: &'static str, value: &str) -> Result<OffsetDateTime, DateParseError> {
        let trimmed = value.trim();
        if let Ok(ts) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Ok(ts);
        }
        parse_date(field, trimmed).map(|date| date.midnight().assume_offset(BUSINESS_OFFSET))
    }

    pub fn now_local() -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(BUSINESS_OFFSET)
    }

    /// The calendar date of `ts` on the local wall clock.
    pub fn local_date(ts: OffsetDateTime) -> Date {
        ts.to_offset(BUSINESS_OFFSET).date()
    }

    pub fn to_ms(ts: OffsetDateTime) -> i64 {
        let ms = ts.unix_timestamp_nanos() / 1_000_000i128;
        ms.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_ms(ms: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos((ms as i128) * 1_000_000i128)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn ms_to_rfc3339(ms: i64) -> String {
        from_ms(ms)
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}
