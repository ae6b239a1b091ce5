//! Effective-privilege computation.

use arbor_core::IdentityId;
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::AccessConfig;
use crate::error::AccessError;
use crate::grant::Grant;
use crate::path::ScopedResource;
use crate::privilege::Privilege;
use crate::store::{GrantStore, IdentityStore, OwnershipOracle};

/// Computes the maximum privilege a set of identities holds over a
/// resource path.
///
/// Three sources combine via `max`: the namespace floor (public resources
/// are at least readable), stored grants, and ownership triples from the
/// resource graph. A logged-in identity short-circuits to [`Privilege::Owner`]
/// inside its own namespace. Resolution is monotonic (adding a grant or an
/// ownership relation never lowers a result) and idempotent.
#[derive(Clone)]
pub struct PrivilegeResolver {
    config: AccessConfig,
    grants: Arc<dyn GrantStore>,
    identities: Arc<dyn IdentityStore>,
    oracle: Arc<dyn OwnershipOracle>,
}

impl PrivilegeResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(
        config: AccessConfig,
        grants: Arc<dyn GrantStore>,
        identities: Arc<dyn IdentityStore>,
        oracle: Arc<dyn OwnershipOracle>,
    ) -> Self {
        Self {
            config,
            grants,
            identities,
            oracle,
        }
    }

    /// Resolves the effective privilege for `identity_ids` on `path`.
    #[instrument(skip(self, identity_ids), fields(identities = identity_ids.len()))]
    pub async fn resolve(
        &self,
        identity_ids: &[IdentityId],
        path: &str,
    ) -> Result<Privilege, Report<AccessError>> {
        let scoped = ScopedResource::scope(&self.config.database_prefix, path);
        let mut floor = scoped.floor();

        // Logged-in principals have full control of their own namespace
        // regardless of stored grants.
        if let Some(username) = scoped.username() {
            let logins = self
                .identities
                .find(identity_ids, Some(username))
                .await
                .map_err(AccessError::from)?;
            if logins.iter().any(|identity| !identity.is_virtual()) {
                debug!(username, "own-namespace access");
                return Ok(Privilege::Owner);
            }
        }

        let grants = self
            .grants
            .find_for_identities(identity_ids, scoped.uri())
            .await
            .map_err(AccessError::from)?;

        let namespaces: Vec<String> = self
            .identities
            .find(identity_ids, None)
            .await
            .map_err(AccessError::from)?
            .into_iter()
            .filter(|identity| !identity.is_virtual())
            .map(|identity| self.config.user_graph(identity.username()))
            .collect();

        let owners = self
            .oracle
            .owned_by(scoped.uri(), scoped.graph())
            .await
            .map_err(AccessError::from)?;
        if owners.iter().any(|owner| namespaces.contains(owner)) {
            floor = Privilege::Owner;
        }

        let granted = grants
            .iter()
            .map(Grant::privilege)
            .max()
            .unwrap_or(Privilege::None);
        let resolved = floor.max(granted);

        debug!(uri = scoped.uri(), %resolved, "resolved privilege");
        Ok(resolved)
    }
}
