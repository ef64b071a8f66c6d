//! Data models for the blog API.
//!
//! Field names follow the backend's JSON (snake_case), so most types
//! derive serde directly without renames.

pub mod article;
pub mod user;

pub use article::{sort_newest_first, Article, ArticleDraft, Comment, CommentDraft};
pub use user::{NewUser, User};

/// Lenient timestamp parsing.
///
/// The backend serializes naive datetimes (`2024-05-01T09:30:00.123456`)
/// while other deployments emit RFC 3339. Naive values are taken as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{Datelike, Timelike};

        #[test]
        fn test_parse_naive_and_rfc3339() {
            let naive = parse("2024-05-01T09:30:00.123456").expect("naive timestamp");
            assert_eq!(naive.hour(), 9);
            assert_eq!(naive.day(), 1);

            let zoned = parse("2024-05-01T09:30:00+09:00").expect("rfc3339 timestamp");
            assert_eq!(zoned.hour(), 0);

            assert!(parse("yesterday").is_none());
        }
    }
}
