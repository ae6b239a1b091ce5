//! Resource-path canonicalization and graph scoping.
//!
//! Paths follow the repository convention `/user/<username>/...` or
//! `/public/...`, optionally suffixed by a recognized action segment or an
//! `/edit/<id>` pair. Both suffixes denote an operation on the parent
//! resource, not a distinct resource, and are stripped before privilege
//! lookup.

use crate::privilege::Privilege;

/// Trailing path segments that name an action on the parent resource.
pub const PERMITTED_ACTIONS: &[&str] = &[
    "subCollections",
    "twins",
    "uses",
    "similar",
    "removeCollection",
    "addToCollection",
    "remove",
    "removeMembership",
    "replace",
    "makePublic",
    "createBenchlingSequence",
    "createICEPart",
    "attach",
    "attachUrl",
    "download",
    "sbol",
    "sbolnr",
    "omex",
    "summary",
    "fasta",
    "gb",
    "gff",
    "metadata",
];

/// A resource path resolved to its canonical URI, scoping graph, and
/// privilege floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedResource {
    uri: String,
    graph: String,
    username: Option<String>,
    floor: Privilege,
}

impl ScopedResource {
    /// Scopes a resource path against a storage prefix.
    ///
    /// Paths under the public namespace scope to the public graph with a
    /// floor of [`Privilege::Read`]: everything public is at least
    /// readable. Anything else scopes to the owning user's namespace
    /// graph with no floor.
    #[must_use]
    pub fn scope(database_prefix: &str, path: &str) -> Self {
        let relative = path.strip_prefix('/').unwrap_or(path);
        let mut uri = format!("{database_prefix}{relative}");

        let segments: Vec<&str> = relative.split('/').collect();
        let username = (segments.first() == Some(&"user"))
            .then(|| segments.get(1).copied())
            .flatten()
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let public_graph = format!("{database_prefix}public");
        let (graph, floor) = if uri.starts_with(&public_graph) {
            (public_graph, Privilege::Read)
        } else {
            let graph = format!(
                "{database_prefix}user/{}",
                username.as_deref().unwrap_or_default()
            );
            (graph, Privilege::None)
        };

        let parts: Vec<&str> = uri.split('/').collect();
        if parts.len() >= 2 && parts[parts.len() - 2] == "edit" {
            uri = parts[..parts.len() - 2].join("/");
        } else if parts
            .last()
            .is_some_and(|last| PERMITTED_ACTIONS.contains(last))
        {
            uri = parts[..parts.len() - 1].join("/");
        }

        Self {
            uri,
            graph,
            username,
            floor,
        }
    }

    /// Returns the canonical resource URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the scoping graph URI.
    #[must_use]
    pub fn graph(&self) -> &str {
        &self.graph
    }

    /// Returns the username segment of a `/user/...` path.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the privilege floor implied by the namespace.
    #[must_use]
    pub fn floor(&self) -> Privilege {
        self.floor
    }
}
