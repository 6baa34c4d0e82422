//! Typed reads of environment variables with defaults.

use std::str::FromStr;

use crate::error::CoreError;

/// Read `key`, falling back to `default` when unset or empty.
pub fn var_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

/// Read `key` when set and non-empty.
pub fn var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse `key`, falling back to `default` when unset.
pub fn parse_or<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
{
    match var_opt(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Config(format!("{key} has an invalid value: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_vars_use_defaults() {
        assert_eq!(var_or("CLAIR_TEST_SURELY_UNSET", "x"), "x");
        assert_eq!(parse_or("CLAIR_TEST_SURELY_UNSET", 7u16).unwrap(), 7);
        assert!(var_opt("CLAIR_TEST_SURELY_UNSET").is_none());
    }
}
