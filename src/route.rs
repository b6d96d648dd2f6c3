use crate::error::PollError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Parameters of the route the detail view was opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSnapshot {
    params: HashMap<String, String>,
}

impl RouteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Matches `path` against a pattern such as `polls/:id`.
    ///
    /// A path that does not match yields an empty snapshot; only a malformed
    /// pattern is an error.
    pub fn from_path(pattern: &str, path: &str) -> Result<Self, PollError> {
        let mut expr = String::from("^/?");
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            expr.push_str(&regex::escape(&pattern[last..whole.start()]));
            expr.push_str(&format!("(?P<{}>[^/]+)", name.as_str()));
            last = whole.end();
        }
        expr.push_str(&regex::escape(&pattern[last..]));
        expr.push_str("/?$");

        let matcher = Regex::new(&expr).map_err(|_| PollError::InvalidRoute(pattern.to_string()))?;
        let mut snapshot = Self::new();
        if let Some(caps) = matcher.captures(path.trim_start_matches('/')) {
            for name in matcher.capture_names().flatten() {
                if let Some(value) = caps.name(name) {
                    snapshot.params.insert(name.to_string(), value.as_str().to_string());
                }
            }
        }
        Ok(snapshot)
    }

    /// Empty values count as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn id(&self) -> Option<&str> {
        self.param("id")
    }
}
