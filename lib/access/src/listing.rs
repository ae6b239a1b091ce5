//! Enumeration of an identity's top-level shares.

use arbor_core::IdentityId;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::config::AccessConfig;
use crate::error::AccessError;
use crate::store::GrantStore;

/// A top-level shared resource with its public-facing URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedEntry {
    /// The internal resource URI.
    pub uri: String,
    /// The externally visible URL.
    pub url: String,
}

/// Lists the root grants held by a set of identities.
#[derive(Clone)]
pub struct ShareListing {
    config: AccessConfig,
    grants: Arc<dyn GrantStore>,
}

impl ShareListing {
    /// Creates a new share listing.
    #[must_use]
    pub fn new(config: AccessConfig, grants: Arc<dyn GrantStore>) -> Self {
        Self { config, grants }
    }

    /// Returns every root grant held by the identities, with the internal
    /// URI and its instance-addressed URL.
    #[instrument(skip(self, identity_ids), fields(identities = identity_ids.len()))]
    pub async fn list_shared(
        &self,
        identity_ids: &[IdentityId],
    ) -> Result<Vec<SharedEntry>, Report<AccessError>> {
        let roots = self
            .grants
            .roots_for(identity_ids)
            .await
            .map_err(AccessError::from)?;

        Ok(roots
            .into_iter()
            .map(|grant| SharedEntry {
                url: self.config.public_url(grant.uri()),
                uri: grant.uri().to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Grant;
    use crate::privilege::Privilege;
    use crate::store::InMemoryGrantStore;

    const INSTANCE: &str = "https://share.example.org/";
    const PREFIX: &str = "https://db.example.org/";

    #[tokio::test]
    async fn lists_only_root_grants_of_the_identities() {
        let store = InMemoryGrantStore::new();
        let holder = IdentityId::new();
        let other = IdentityId::new();

        let root = store
            .create(Grant::new(
                format!("{PREFIX}user/alice/col1"),
                holder,
                None,
                Privilege::Write,
            ))
            .await
            .unwrap();
        store
            .create(Grant::new(
                format!("{PREFIX}user/alice/col1/item1"),
                holder,
                Some(root),
                Privilege::Write,
            ))
            .await
            .unwrap();
        store
            .create(Grant::new(
                format!("{PREFIX}user/bob/col9"),
                other,
                None,
                Privilege::Read,
            ))
            .await
            .unwrap();

        let listing = ShareListing::new(
            AccessConfig::new(INSTANCE, PREFIX),
            Arc::new(store),
        );
        let shared = listing.list_shared(&[holder]).await.unwrap();

        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].uri, format!("{PREFIX}user/alice/col1"));
        assert_eq!(shared[0].url, format!("{INSTANCE}user/alice/col1"));
    }

    #[tokio::test]
    async fn empty_identities_list_nothing() {
        let listing = ShareListing::new(
            AccessConfig::new(INSTANCE, PREFIX),
            Arc::new(InMemoryGrantStore::new()),
        );
        let shared = listing.list_shared(&[]).await.unwrap();
        assert!(shared.is_empty());
    }
}
