//! Routing table: virtual host to backend address.
//!
//! # Responsibilities
//! - Parse the routing file (one TOML section per virtual host)
//! - Answer exact, case-sensitive lookups
//! - Return explicit no-match rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Never mutated in place; a reload builds and publishes a new table
//! - O(1) host lookup via HashMap

use std::collections::HashMap;
use std::path::Path;

use crate::config::loader::{read_file, ConfigError};
use crate::config::validation::validate_sections;

/// An immutable snapshot of `virtual host -> host:port` mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<String, String>,
    generation: u64,
}

impl RoutingTable {
    /// Parse and validate a routing document.
    ///
    /// ```toml
    /// [api]
    /// host = "10.0.0.1:8080"
    /// ```
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let document: toml::Table = toml::from_str(content)?;
        let routes = validate_sections(&document).map_err(ConfigError::Validation)?;
        Ok(Self {
            routes,
            generation: 0,
        })
    }

    /// Read, parse and validate a routing file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Build a table directly from pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            routes: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            generation: 0,
        }
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Backend for `virtual_host`, matched exactly as received.
    pub fn lookup(&self, virtual_host: &str) -> Option<&str> {
        self.routes.get(virtual_host).map(String::as_str)
    }

    /// Sequence number assigned when the table was published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_exact() {
        let table = RoutingTable::parse(
            r#"
            [api]
            host = "10.0.0.1:8080"

            ["Chat.Example.com"]
            host = "10.0.0.2:9000"
            "#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("api"), Some("10.0.0.1:8080"));
        assert_eq!(table.lookup("Chat.Example.com"), Some("10.0.0.2:9000"));
        // Case-sensitive, no port stripping, no default.
        assert_eq!(table.lookup("chat.example.com"), None);
        assert_eq!(table.lookup("api:443"), None);
        assert_eq!(table.lookup(""), None);
    }

    #[test]
    fn missing_host_field_fails_the_whole_load() {
        let err = RoutingTable::parse("[api]\nhost = \"10.0.0.1:8080\"\n[web]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn empty_document_is_an_empty_table() {
        let table = RoutingTable::parse("").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn from_entries_builds_lookup() {
        let table = RoutingTable::from_entries([("a", "127.0.0.1:1"), ("b", "127.0.0.1:2")]);
        assert_eq!(table.lookup("b"), Some("127.0.0.1:2"));
        assert_eq!(table.len(), 2);
    }
}
