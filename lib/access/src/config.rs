//! Access engine configuration.
//!
//! The two addresses here drive every URI rewrite between the internal
//! storage namespace and the externally visible instance namespace, so
//! they must be mutually consistent. The configuration is an explicit
//! value handed to each component at construction, never read from
//! ambient global state.

use arbor_core::ShareTag;
use serde::Deserialize;

/// Configuration for URI-prefix rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessConfig {
    /// Externally visible base address of this instance,
    /// e.g. `https://share.example.org/`.
    pub instance_url: String,

    /// Internal storage address prefix,
    /// e.g. `https://db.example.org/`.
    pub database_prefix: String,
}

impl AccessConfig {
    /// Creates a configuration from the two addresses.
    #[must_use]
    pub fn new(instance_url: impl Into<String>, database_prefix: impl Into<String>) -> Self {
        Self {
            instance_url: instance_url.into(),
            database_prefix: database_prefix.into(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Rewrites an internal URI to its externally visible form.
    #[must_use]
    pub fn public_url(&self, uri: &str) -> String {
        uri.replacen(&self.database_prefix, &self.instance_url, 1)
    }

    /// Returns the accession URL for a share tag.
    #[must_use]
    pub fn alias_url(&self, tag: &ShareTag) -> String {
        format!("{}alias/{}", self.instance_url, tag)
    }

    /// Returns the public graph URI.
    #[must_use]
    pub fn public_graph(&self) -> String {
        format!("{}public", self.database_prefix)
    }

    /// Returns a user's namespace graph URI.
    #[must_use]
    pub fn user_graph(&self, username: &str) -> String {
        format!("{}user/{}", self.database_prefix, username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AccessConfig {
        AccessConfig::new("https://share.example.org/", "https://db.example.org/")
    }

    #[test]
    fn public_url_rewrites_storage_prefix() {
        let config = test_config();
        assert_eq!(
            config.public_url("https://db.example.org/user/alice/col1"),
            "https://share.example.org/user/alice/col1"
        );
    }

    #[test]
    fn public_url_leaves_foreign_uris_alone() {
        let config = test_config();
        assert_eq!(
            config.public_url("https://other.example.org/thing"),
            "https://other.example.org/thing"
        );
    }

    #[test]
    fn alias_url_appends_tag() {
        let config = test_config();
        let tag = ShareTag::from("01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(
            config.alias_url(&tag),
            "https://share.example.org/alias/01ARZ3NDEKTSV4RRFFQ69G5FAV"
        );
    }

    #[test]
    fn graph_uris_use_storage_prefix() {
        let config = test_config();
        assert_eq!(config.public_graph(), "https://db.example.org/public");
        assert_eq!(
            config.user_graph("alice"),
            "https://db.example.org/user/alice"
        );
    }
}
