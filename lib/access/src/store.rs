//! Storage interfaces for grants, identities, aliases, and ownership.
//!
//! The engine never follows in-memory pointers between grants: a grant
//! subtree is an arena of records keyed by ID with a parent back-reference,
//! and all traversal is a children-of store query. The in-memory
//! implementations here back the engine's tests and embedded deployments;
//! `arbor-store` provides the Postgres implementations.
//!
//! The ownership oracle is an interface onto the resource graph itself
//! (an external triple store); it is consumed, never implemented, by this
//! workspace beyond the in-memory stand-in.

use arbor_core::{GrantId, IdentityId, ShareTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::grant::{Grant, Identity, ShareAlias};
use crate::privilege::Privilege;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the operation failed transiently.
    Unavailable {
        /// Error details.
        details: String,
    },
    /// A referenced record does not exist.
    NotFound {
        /// Description of the missing record.
        what: String,
    },
    /// The operation conflicts with existing state.
    Conflict {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => write!(f, "store unavailable: {details}"),
            Self::NotFound { what } => write!(f, "not found: {what}"),
            Self::Conflict { details } => write!(f, "store conflict: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persisted forest of grant records.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Persists a grant, returning its ID.
    async fn create(&self, grant: Grant) -> Result<GrantId, StoreError>;

    /// Fetches a grant by ID.
    async fn get(&self, id: GrantId) -> Result<Option<Grant>, StoreError>;

    /// Fetches all grants covering a URI, across identities and roots.
    async fn find_by_uri(&self, uri: &str) -> Result<Vec<Grant>, StoreError>;

    /// Fetches grants held by any of the identities on a URI.
    async fn find_for_identities(
        &self,
        ids: &[IdentityId],
        uri: &str,
    ) -> Result<Vec<Grant>, StoreError>;

    /// Fetches the direct children of a grant.
    async fn children_of(&self, parent: GrantId) -> Result<Vec<Grant>, StoreError>;

    /// Fetches the root grants held by any of the identities.
    async fn roots_for(&self, ids: &[IdentityId]) -> Result<Vec<Grant>, StoreError>;

    /// Sets a grant's privilege. Unconditional, so retries converge.
    async fn set_privilege(&self, id: GrantId, privilege: Privilege) -> Result<(), StoreError>;

    /// Sets a grant's URI. Unconditional, so retries converge.
    async fn set_uri(&self, id: GrantId, uri: &str) -> Result<(), StoreError>;

    /// Deletes a grant. Deleting an already-deleted grant succeeds.
    async fn delete(&self, id: GrantId) -> Result<(), StoreError>;
}

/// The subset of the identity service consumed by this engine.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Creates a virtual identity with no login credentials.
    async fn create_virtual(&self) -> Result<Identity, StoreError>;

    /// Finds identities among `ids`, optionally filtered by username.
    async fn find(
        &self,
        ids: &[IdentityId],
        username: Option<&str>,
    ) -> Result<Vec<Identity>, StoreError>;
}

/// Persistence for share aliases.
#[async_trait]
pub trait AliasStore: Send + Sync {
    /// Records a share alias. Aliases are never mutated afterwards.
    async fn create(&self, alias: ShareAlias) -> Result<(), StoreError>;

    /// Resolves a share tag to its alias record.
    async fn find_by_tag(&self, tag: &ShareTag) -> Result<Option<ShareAlias>, StoreError>;
}

/// Query interface onto the resource graph's ownership triples.
#[async_trait]
pub trait OwnershipOracle: Send + Sync {
    /// Returns the URIs that own `uri` within `graph`. Pure query.
    async fn owned_by(&self, uri: &str, graph: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory grant store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGrantStore {
    grants: Arc<RwLock<HashMap<GrantId, Grant>>>,
}

impl InMemoryGrantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.read().unwrap().len()
    }

    /// Returns true if no grants are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn create(&self, grant: Grant) -> Result<GrantId, StoreError> {
        let id = grant.id();
        self.grants.write().unwrap().insert(id, grant);
        Ok(id)
    }

    async fn get(&self, id: GrantId) -> Result<Option<Grant>, StoreError> {
        Ok(self.grants.read().unwrap().get(&id).cloned())
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Vec<Grant>, StoreError> {
        Ok(self
            .grants
            .read()
            .unwrap()
            .values()
            .filter(|grant| grant.uri() == uri)
            .cloned()
            .collect())
    }

    async fn find_for_identities(
        &self,
        ids: &[IdentityId],
        uri: &str,
    ) -> Result<Vec<Grant>, StoreError> {
        Ok(self
            .grants
            .read()
            .unwrap()
            .values()
            .filter(|grant| grant.uri() == uri && ids.contains(&grant.identity_id()))
            .cloned()
            .collect())
    }

    async fn children_of(&self, parent: GrantId) -> Result<Vec<Grant>, StoreError> {
        Ok(self
            .grants
            .read()
            .unwrap()
            .values()
            .filter(|grant| grant.parent_id() == Some(parent))
            .cloned()
            .collect())
    }

    async fn roots_for(&self, ids: &[IdentityId]) -> Result<Vec<Grant>, StoreError> {
        Ok(self
            .grants
            .read()
            .unwrap()
            .values()
            .filter(|grant| grant.is_root() && ids.contains(&grant.identity_id()))
            .cloned()
            .collect())
    }

    async fn set_privilege(&self, id: GrantId, privilege: Privilege) -> Result<(), StoreError> {
        let mut grants = self.grants.write().unwrap();
        let grant = grants.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            what: format!("grant {id}"),
        })?;
        grant.set_privilege(privilege);
        Ok(())
    }

    async fn set_uri(&self, id: GrantId, uri: &str) -> Result<(), StoreError> {
        let mut grants = self.grants.write().unwrap();
        let grant = grants.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            what: format!("grant {id}"),
        })?;
        grant.set_uri(uri.to_string());
        Ok(())
    }

    async fn delete(&self, id: GrantId) -> Result<(), StoreError> {
        self.grants.write().unwrap().remove(&id);
        Ok(())
    }
}

/// In-memory identity store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<IdentityId, Identity>>>,
}

impl InMemoryIdentityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an identity, e.g. a real login for tests.
    pub fn add(&self, identity: Identity) {
        self.identities
            .write()
            .unwrap()
            .insert(identity.id(), identity);
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create_virtual(&self) -> Result<Identity, StoreError> {
        let identity = Identity::new_virtual();
        self.identities
            .write()
            .unwrap()
            .insert(identity.id(), identity.clone());
        Ok(identity)
    }

    async fn find(
        &self,
        ids: &[IdentityId],
        username: Option<&str>,
    ) -> Result<Vec<Identity>, StoreError> {
        Ok(self
            .identities
            .read()
            .unwrap()
            .values()
            .filter(|identity| ids.contains(&identity.id()))
            .filter(|identity| username.is_none_or(|name| identity.username() == name))
            .cloned()
            .collect())
    }
}

/// In-memory alias store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAliasStore {
    aliases: Arc<RwLock<HashMap<String, ShareAlias>>>,
}

impl InMemoryAliasStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AliasStore for InMemoryAliasStore {
    async fn create(&self, alias: ShareAlias) -> Result<(), StoreError> {
        let mut aliases = self.aliases.write().unwrap();
        let tag = alias.tag().as_str().to_string();
        if aliases.contains_key(&tag) {
            return Err(StoreError::Conflict {
                details: format!("alias tag {tag} already exists"),
            });
        }
        aliases.insert(tag, alias);
        Ok(())
    }

    async fn find_by_tag(&self, tag: &ShareTag) -> Result<Option<ShareAlias>, StoreError> {
        Ok(self.aliases.read().unwrap().get(tag.as_str()).cloned())
    }
}

/// In-memory ownership oracle with explicitly seeded ownership triples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOwnershipOracle {
    owners: Arc<RwLock<HashMap<(String, String), Vec<String>>>>,
}

impl InMemoryOwnershipOracle {
    /// Creates an empty oracle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `owner` an owner of `uri` within `graph`.
    pub fn add_owner(&self, uri: &str, graph: &str, owner: &str) {
        self.owners
            .write()
            .unwrap()
            .entry((uri.to_string(), graph.to_string()))
            .or_default()
            .push(owner.to_string());
    }
}

#[async_trait]
impl OwnershipOracle for InMemoryOwnershipOracle {
    async fn owned_by(&self, uri: &str, graph: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .owners
            .read()
            .unwrap()
            .get(&(uri.to_string(), graph.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grant_store_create_and_children() {
        let store = InMemoryGrantStore::new();
        let identity = IdentityId::new();

        let root = Grant::new("db/user/alice/col1", identity, None, Privilege::Write);
        let root_id = store.create(root).await.unwrap();

        let child = Grant::new(
            "db/user/alice/col1/item1",
            identity,
            Some(root_id),
            Privilege::Write,
        );
        store.create(child.clone()).await.unwrap();

        let children = store.children_of(root_id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].uri(), "db/user/alice/col1/item1");

        let roots = store.roots_for(&[identity]).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), root_id);
    }

    #[tokio::test]
    async fn set_privilege_on_missing_grant_fails() {
        let store = InMemoryGrantStore::new();
        let result = store.set_privilege(GrantId::new(), Privilege::Read).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryGrantStore::new();
        let grant = Grant::new("db/user/alice/col1", IdentityId::new(), None, Privilege::Read);
        let id = store.create(grant).await.unwrap();

        store.delete(id).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn identity_find_filters_by_username() {
        let store = InMemoryIdentityStore::new();
        let alice = Identity::real("alice");
        let bob = Identity::real("bob");
        store.add(alice.clone());
        store.add(bob.clone());

        let ids = vec![alice.id(), bob.id()];
        let found = store.find(&ids, Some("alice")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username(), "alice");

        let all = store.find(&ids, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn alias_tags_are_unique() {
        let store = InMemoryAliasStore::new();
        let tag = ShareTag::generate();
        let alias = ShareAlias::new(tag.clone(), "db/user/alice/col1", IdentityId::new(), "");

        store.create(alias.clone()).await.unwrap();
        let result = store.create(alias).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));

        let found = store.find_by_tag(&tag).await.unwrap().unwrap();
        assert_eq!(found.root_uri(), "db/user/alice/col1");
    }

    #[tokio::test]
    async fn oracle_returns_seeded_owners() {
        let oracle = InMemoryOwnershipOracle::new();
        oracle.add_owner(
            "db/user/alice/col1",
            "db/user/alice",
            "db/user/alice",
        );

        let owners = oracle
            .owned_by("db/user/alice/col1", "db/user/alice")
            .await
            .unwrap();
        assert_eq!(owners, vec!["db/user/alice".to_string()]);

        let none = oracle
            .owned_by("db/user/alice/col1", "db/public")
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
