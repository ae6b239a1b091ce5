//! Moving grant trees into the public namespace.

use futures::future::{BoxFuture, FutureExt};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::AccessError;
use crate::privilege::Privilege;
use crate::store::GrantStore;

/// Recursively moves or destroys grants so a resource tree becomes
/// addressable under the public namespace.
///
/// Grants below write level do not survive publication: the resource is
/// readable by anyone once public, and only collaborators with
/// write-or-better access keep a handle on it. Descendants are processed
/// before their ancestors are rewritten, so each level's pruning decision
/// sees that level's original URI.
#[derive(Clone)]
pub struct Publicizer {
    grants: Arc<dyn GrantStore>,
}

impl Publicizer {
    /// Creates a new publicizer.
    #[must_use]
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self { grants }
    }

    /// Publicizes every grant tree rooted at `uri`, replacing
    /// `user_prefix` with `public_prefix` in surviving grants' URIs.
    ///
    /// Per-grant steps (destroy, rewrite) are unconditional, so a retry
    /// after a partial failure repairs the tree.
    #[instrument(skip(self))]
    pub async fn publicize(
        &self,
        user_prefix: &str,
        public_prefix: &str,
        uri: &str,
    ) -> Result<(), Report<AccessError>> {
        self.visit(user_prefix, public_prefix, uri.to_string()).await
    }

    fn visit<'a>(
        &'a self,
        user_prefix: &'a str,
        public_prefix: &'a str,
        uri: String,
    ) -> BoxFuture<'a, Result<(), Report<AccessError>>> {
        async move {
            let auths = self
                .grants
                .find_by_uri(&uri)
                .await
                .map_err(AccessError::from)?;

            // Collect the full child list before any write at this level.
            let mut children = Vec::new();
            for auth in &auths {
                children.extend(
                    self.grants
                        .children_of(auth.id())
                        .await
                        .map_err(AccessError::from)?,
                );
            }
            for child in children {
                self.visit(user_prefix, public_prefix, child.uri().to_string())
                    .await?;
            }

            for mut auth in auths {
                if auth.privilege() < Privilege::Write {
                    debug!(grant = %auth.id(), "destroying sub-write grant");
                    self.grants
                        .delete(auth.id())
                        .await
                        .map_err(AccessError::from)?;
                } else {
                    auth.rewrite_uri(user_prefix, public_prefix);
                    self.grants
                        .set_uri(auth.id(), auth.uri())
                        .await
                        .map_err(AccessError::from)?;
                }
            }
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Grant;
    use crate::store::InMemoryGrantStore;
    use arbor_core::IdentityId;

    const USER_PREFIX: &str = "db/user/alice";
    const PUBLIC_PREFIX: &str = "db/public";

    #[tokio::test]
    async fn write_grants_are_rewritten() {
        let store = InMemoryGrantStore::new();
        let identity = IdentityId::new();
        let id = store
            .create(Grant::new(
                "db/user/alice/col1",
                identity,
                None,
                Privilege::Write,
            ))
            .await
            .unwrap();

        let publicizer = Publicizer::new(Arc::new(store.clone()));
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();

        let grant = store.get(id).await.unwrap().unwrap();
        assert_eq!(grant.uri(), "db/public/col1");
    }

    #[tokio::test]
    async fn sub_write_grants_are_destroyed() {
        let store = InMemoryGrantStore::new();
        let identity = IdentityId::new();
        let id = store
            .create(Grant::new(
                "db/user/alice/col1",
                identity,
                None,
                Privilege::Read,
            ))
            .await
            .unwrap();

        let publicizer = Publicizer::new(Arc::new(store.clone()));
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();

        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_surviving_grant_references_the_user_prefix() {
        let store = InMemoryGrantStore::new();
        let identity = IdentityId::new();

        let root = store
            .create(Grant::new(
                "db/user/alice/col1",
                identity,
                None,
                Privilege::Owner,
            ))
            .await
            .unwrap();
        store
            .create(Grant::new(
                "db/user/alice/col1/item1",
                identity,
                Some(root),
                Privilege::Write,
            ))
            .await
            .unwrap();
        store
            .create(Grant::new(
                "db/user/alice/col1/item2",
                identity,
                Some(root),
                Privilege::Read,
            ))
            .await
            .unwrap();

        let publicizer = Publicizer::new(Arc::new(store.clone()));
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();

        // item2 destroyed, root and item1 rewritten.
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.find_by_uri("db/public/col1").await.unwrap().len(),
            1
        );
        assert_eq!(
            store
                .find_by_uri("db/public/col1/item1")
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(store
            .find_by_uri("db/user/alice/col1/item2")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn children_are_processed_before_their_parents_are_rewritten() {
        // A grandchild below write level under a write-level chain must be
        // found via its pre-rewrite URI and destroyed.
        let store = InMemoryGrantStore::new();
        let identity = IdentityId::new();

        let root = store
            .create(Grant::new(
                "db/user/alice/col1",
                identity,
                None,
                Privilege::Write,
            ))
            .await
            .unwrap();
        let child = store
            .create(Grant::new(
                "db/user/alice/col1/sub",
                identity,
                Some(root),
                Privilege::Write,
            ))
            .await
            .unwrap();
        let grandchild = store
            .create(Grant::new(
                "db/user/alice/col1/sub/item",
                identity,
                Some(child),
                Privilege::Read,
            ))
            .await
            .unwrap();

        let publicizer = Publicizer::new(Arc::new(store.clone()));
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();

        assert!(store.get(grandchild).await.unwrap().is_none());
        assert_eq!(
            store.get(root).await.unwrap().unwrap().uri(),
            "db/public/col1"
        );
        assert_eq!(
            store.get(child).await.unwrap().unwrap().uri(),
            "db/public/col1/sub"
        );
    }

    #[tokio::test]
    async fn publicize_is_idempotent_for_surviving_grants() {
        let store = InMemoryGrantStore::new();
        let identity = IdentityId::new();
        let id = store
            .create(Grant::new(
                "db/user/alice/col1",
                identity,
                None,
                Privilege::Write,
            ))
            .await
            .unwrap();

        let publicizer = Publicizer::new(Arc::new(store.clone()));
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();
        // Retrying against the original URI finds nothing to do.
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();

        let grant = store.get(id).await.unwrap().unwrap();
        assert_eq!(grant.uri(), "db/public/col1");
    }

    #[tokio::test]
    async fn grants_of_other_identities_on_the_same_uri_are_visited() {
        let store = InMemoryGrantStore::new();
        let writer = IdentityId::new();
        let reader = IdentityId::new();

        let kept = store
            .create(Grant::new(
                "db/user/alice/col1",
                writer,
                None,
                Privilege::Write,
            ))
            .await
            .unwrap();
        let pruned = store
            .create(Grant::new(
                "db/user/alice/col1",
                reader,
                None,
                Privilege::Read,
            ))
            .await
            .unwrap();

        let publicizer = Publicizer::new(Arc::new(store.clone()));
        publicizer
            .publicize(USER_PREFIX, PUBLIC_PREFIX, "db/user/alice/col1")
            .await
            .unwrap();

        assert!(store.get(pruned).await.unwrap().is_none());
        assert_eq!(
            store.get(kept).await.unwrap().unwrap().uri(),
            "db/public/col1"
        );
    }
}
