//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its base URL
//! - Carry the health flag written by the health monitor

use std::fmt;

/// A single backend server.
///
/// Values handed out by the pool are snapshots; mutating one does not
/// change the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Base URL, e.g. `http://localhost:8001`.
    pub url: String,
    /// Whether the last probe succeeded. Backends start healthy.
    pub healthy: bool,
}

impl Backend {
    /// Create a new backend, initially healthy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            healthy: true,
        }
    }

    /// URL for a forwarded request: the base URL with `path` appended verbatim.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_is_healthy() {
        let b = Backend::new("http://localhost:8001");
        assert!(b.healthy);
        assert_eq!(b.to_string(), "http://localhost:8001");
    }

    #[test]
    fn test_url_for_appends_path() {
        let b = Backend::new("http://localhost:8001");
        assert_eq!(b.url_for("/a/b?c=1"), "http://localhost:8001/a/b?c=1");
        assert_eq!(b.url_for(""), "http://localhost:8001");
    }
}
