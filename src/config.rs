use crate::error::PollError;
use std::env;
use std::time::Duration;

const DEFAULT_OPTIONS_RETRY_MS: u64 = 1; // one scheduling tick
const DEFAULT_ROUTE_PATTERN: &str = "polls/:id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailConfig {
    /// How long the options waiter sleeps between checks.
    pub options_retry: Duration,
    pub route_pattern: String,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            options_retry: Duration::from_millis(DEFAULT_OPTIONS_RETRY_MS),
            route_pattern: DEFAULT_ROUTE_PATTERN.to_string(),
        }
    }
}

impl DetailConfig {
    pub fn from_env() -> Result<Self, PollError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PollError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let options_retry = match lookup("POLL_OPTIONS_RETRY_MS") {
            Some(value) => {
                let millis = value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|millis| *millis > 0)
                    .ok_or(PollError::InvalidConfig {
                        key: "POLL_OPTIONS_RETRY_MS",
                        value: value.clone(),
                    })?;
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_OPTIONS_RETRY_MS),
        };

        let route_pattern = lookup("POLL_ROUTE_PATTERN").unwrap_or_else(|| DEFAULT_ROUTE_PATTERN.to_string());

        Ok(Self {
            options_retry,
            route_pattern,
        })
    }
}

/// Reads a boolean flag, accepting the usual spellings.
pub fn parse_flag(key: &'static str, value: &str) -> Result<bool, PollError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PollError::InvalidConfig {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = DetailConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DetailConfig::default());
        assert_eq!(config.options_retry, Duration::from_millis(1));
    }

    #[test]
    fn reads_overrides() {
        let config = DetailConfig::from_lookup(lookup(&[
            ("POLL_OPTIONS_RETRY_MS", "25"),
            ("POLL_ROUTE_PATTERN", "assignments/polls/:id"),
        ]))
        .unwrap();
        assert_eq!(config.options_retry, Duration::from_millis(25));
        assert_eq!(config.route_pattern, "assignments/polls/:id");
    }

    #[test]
    fn rejects_zero_and_garbage_intervals() {
        for bad in ["0", "soon"] {
            let err = DetailConfig::from_lookup(lookup(&[("POLL_OPTIONS_RETRY_MS", bad)])).unwrap_err();
            assert_eq!(
                err,
                PollError::InvalidConfig {
                    key: "POLL_OPTIONS_RETRY_MS",
                    value: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("POLL_AUTO_CONFIRM", "Yes"), Ok(true));
        assert_eq!(parse_flag("POLL_AUTO_CONFIRM", "0"), Ok(false));
        assert!(parse_flag("POLL_AUTO_CONFIRM", "maybe").is_err());
    }
}
