//! Grant, identity, and share-alias records, and the URI tree input.
//!
//! Grants form a forest persisted through [`crate::store::GrantStore`]:
//! each record carries an optional parent grant ID instead of in-memory
//! child pointers, so all traversal is a children-of store query. A grant
//! with no parent is a root grant, the entry point of a shared subtree.

use arbor_core::{GrantId, IdentityId, ShareTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::privilege::Privilege;

/// A persisted authorization record binding an identity, a resource URI,
/// and a privilege level.
///
/// Several grants may target the same URI (different identities, different
/// roots). Privilege values within a subtree are independent per grant
/// until explicitly propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Unique grant ID, assigned on construction.
    id: GrantId,
    /// The resource this grant covers.
    uri: String,
    /// The grantee.
    identity_id: IdentityId,
    /// The grant this one descends from; `None` marks a root grant.
    parent_id: Option<GrantId>,
    /// Access level granted.
    privilege: Privilege,
}

impl Grant {
    /// Creates a new grant with a freshly generated ID.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        identity_id: IdentityId,
        parent_id: Option<GrantId>,
        privilege: Privilege,
    ) -> Self {
        Self {
            id: GrantId::new(),
            uri: uri.into(),
            identity_id,
            parent_id,
            privilege,
        }
    }

    /// Creates a grant with all fields specified.
    ///
    /// Use this when reconstituting a grant from storage.
    #[must_use]
    pub fn with_all_fields(
        id: GrantId,
        uri: String,
        identity_id: IdentityId,
        parent_id: Option<GrantId>,
        privilege: Privilege,
    ) -> Self {
        Self {
            id,
            uri,
            identity_id,
            parent_id,
            privilege,
        }
    }

    /// Returns the grant ID.
    #[must_use]
    pub fn id(&self) -> GrantId {
        self.id
    }

    /// Returns the resource URI this grant covers.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the grantee's identity ID.
    #[must_use]
    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    /// Returns the parent grant ID, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<GrantId> {
        self.parent_id
    }

    /// Returns the granted privilege.
    #[must_use]
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Returns true if this is a root grant.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Sets the privilege level.
    pub fn set_privilege(&mut self, privilege: Privilege) {
        self.privilege = privilege;
    }

    /// Replaces the first occurrence of `from` in the URI with `to`.
    pub fn rewrite_uri(&mut self, from: &str, to: &str) {
        self.uri = self.uri.replacen(from, to, 1);
    }

    pub(crate) fn set_uri(&mut self, uri: String) {
        self.uri = uri;
    }
}

/// An identity that can hold grants.
///
/// Virtual identities are auto-created to back share links; they have no
/// login credentials and never match a logged-in username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Internal identity ID.
    id: IdentityId,
    /// Login name for real identities; generated for virtual ones.
    username: String,
    /// True for auto-created share-link identities.
    #[serde(rename = "virtual")]
    is_virtual: bool,
}

impl Identity {
    /// Creates a real (login-backed) identity.
    #[must_use]
    pub fn real(username: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(),
            username: username.into(),
            is_virtual: false,
        }
    }

    /// Creates a virtual identity with a generated username.
    #[must_use]
    pub fn new_virtual() -> Self {
        let id = IdentityId::new();
        Self {
            username: format!("share-{}", id.as_ulid()),
            id,
            is_virtual: true,
        }
    }

    /// Creates an identity with all fields specified.
    ///
    /// Use this when reconstituting an identity from storage.
    #[must_use]
    pub fn with_all_fields(id: IdentityId, username: String, is_virtual: bool) -> Self {
        Self {
            id,
            username,
            is_virtual,
        }
    }

    /// Returns the identity ID.
    #[must_use]
    pub fn id(&self) -> IdentityId {
        self.id
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns true if this is a virtual (share-link) identity.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }
}

/// Maps an opaque share tag to a top-level URI and the virtual identity
/// that backs it.
///
/// Created once at grant time, never mutated, read when resolving the
/// public accession link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAlias {
    /// The opaque tag appearing in the accession URL.
    tag: ShareTag,
    /// The externally addressable top-level URI.
    root_uri: String,
    /// The virtual identity holding the grants.
    identity_id: IdentityId,
    /// Free-text notes supplied at grant time.
    notes: String,
}

impl ShareAlias {
    /// Creates a new share alias.
    #[must_use]
    pub fn new(
        tag: ShareTag,
        root_uri: impl Into<String>,
        identity_id: IdentityId,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            tag,
            root_uri: root_uri.into(),
            identity_id,
            notes: notes.into(),
        }
    }

    /// Returns the share tag.
    #[must_use]
    pub fn tag(&self) -> &ShareTag {
        &self.tag
    }

    /// Returns the top-level URI.
    #[must_use]
    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    /// Returns the backing identity's ID.
    #[must_use]
    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    /// Returns the notes.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }
}

/// A rooted tree of resource URIs to authorize together.
///
/// Each key is a URI; its value is the subtree of URIs beneath it. A tree
/// handed to the grant issuer must have exactly one root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UriTree(BTreeMap<String, UriTree>);

impl UriTree {
    /// Creates an empty tree (a leaf when nested under a URI).
    #[must_use]
    pub fn leaf() -> Self {
        Self::default()
    }

    /// Creates a tree with a single root URI and its subtree.
    #[must_use]
    pub fn root(uri: impl Into<String>, subtree: UriTree) -> Self {
        let mut map = BTreeMap::new();
        map.insert(uri.into(), subtree);
        Self(map)
    }

    /// Adds a URI with its subtree at this level.
    pub fn insert(&mut self, uri: impl Into<String>, subtree: UriTree) {
        self.0.insert(uri.into(), subtree);
    }

    /// Returns the number of URIs at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if this level has no URIs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the single root URI and its subtree, or `None` if this
    /// level does not contain exactly one URI.
    #[must_use]
    pub fn single_root(&self) -> Option<(&str, &UriTree)> {
        if self.0.len() != 1 {
            return None;
        }
        self.0.iter().next().map(|(uri, sub)| (uri.as_str(), sub))
    }

    /// Consumes the tree, yielding this level's URIs and subtrees.
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, UriTree)> {
        self.0.into_iter().collect()
    }

    /// Iterates over this level's URIs and subtrees.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &UriTree)> {
        self.0.iter().map(|(uri, sub)| (uri.as_str(), sub))
    }
}
