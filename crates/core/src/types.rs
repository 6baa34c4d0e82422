use crate::error::CoreError;

/// Database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Chat-platform user identifier (opaque snowflake).
pub type UserId = i64;

/// Chat-platform channel identifier. Conversation context is keyed by it.
pub type ChannelId = i64;

/// Chat-platform role identifier, used for VIP lookups.
pub type RoleId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Parse a comma-separated list of numeric ids, e.g. `"12, 34,56"`.
///
/// Blank entries are skipped so trailing commas are tolerated.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| CoreError::Config(format!("'{s}' is not a valid numeric id")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_with_whitespace_and_trailing_comma() {
        let ids = parse_id_list(" 1452047828741521491, 42 ,").unwrap();
        assert_eq!(ids, vec![1452047828741521491, 42]);
    }

    #[test]
    fn empty_string_yields_no_ids() {
        assert!(parse_id_list("").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_numeric_entry() {
        assert!(parse_id_list("1,admin").is_err());
    }
}
