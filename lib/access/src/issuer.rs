//! Grant subtree materialization.

use arbor_core::{GrantId, IdentityId, ShareTag};
use futures::future::{BoxFuture, FutureExt};
use rootcause::prelude::Report;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument};

use crate::config::AccessConfig;
use crate::error::AccessError;
use crate::grant::{Grant, Identity, ShareAlias, UriTree};
use crate::privilege::Privilege;
use crate::store::{AliasStore, GrantStore, IdentityStore};

/// Accepts a resource subtree and a requested privilege, and materializes
/// a matching grant subtree.
///
/// [`GrantIssuer::grant`] is fire-and-continue: it returns the computed
/// accession URL before the grant subtree is persisted, so the caller's
/// response latency is decoupled from storage latency. Callers needing
/// confirmation re-query through the privilege resolver, or use
/// [`GrantIssuer::materialize`] directly to await persistence.
#[derive(Clone)]
pub struct GrantIssuer {
    config: AccessConfig,
    grants: Arc<dyn GrantStore>,
    identities: Arc<dyn IdentityStore>,
    aliases: Arc<dyn AliasStore>,
}

impl GrantIssuer {
    /// Creates a new grant issuer.
    #[must_use]
    pub fn new(
        config: AccessConfig,
        grants: Arc<dyn GrantStore>,
        identities: Arc<dyn IdentityStore>,
        aliases: Arc<dyn AliasStore>,
    ) -> Self {
        Self {
            config,
            grants,
            identities,
            aliases,
        }
    }

    /// Grants `privilege` over every URI in `tree` and returns the
    /// accession URL.
    ///
    /// If `identity` is absent, a virtual identity is created and a share
    /// alias recorded; the returned URL is then the alias link. Otherwise
    /// the URL is the root URI rewritten to the instance address.
    ///
    /// The grant subtree is persisted on a spawned task; failures there
    /// are logged, not surfaced. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidTreeShape`] synchronously, before any
    /// mutation, if `tree` does not have exactly one root.
    #[instrument(skip(self, tree, notes), fields(privilege = %privilege))]
    pub fn grant(
        &self,
        identity: Option<Identity>,
        tree: UriTree,
        privilege: Privilege,
        notes: &str,
    ) -> Result<String, Report<AccessError>> {
        let (root_uri, _) = tree
            .single_root()
            .ok_or(AccessError::InvalidTreeShape { roots: tree.len() })?;

        let tag = ShareTag::generate();
        let accession_url = if identity.is_some() {
            self.config.public_url(root_uri)
        } else {
            self.config.alias_url(&tag)
        };

        let issuer = self.clone();
        let notes = notes.to_string();
        tokio::spawn(async move {
            if let Err(report) = issuer
                .materialize(identity, tree, privilege, &notes, tag)
                .await
            {
                error!(error = %report, "grant materialization failed");
            }
        });

        Ok(accession_url)
    }

    /// Materializes the grant subtree, awaiting full persistence.
    ///
    /// The root grant is created first; each child level fans out only
    /// once its parent's grant ID is known. Sibling subtrees are created
    /// concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidTreeShape`] for a malformed tree,
    /// [`AccessError::IdentityNotFound`] if `identity` does not resolve,
    /// or a store error. A failure partway through is not rolled back;
    /// re-running with the same arguments repairs the subtree.
    pub async fn materialize(
        &self,
        identity: Option<Identity>,
        tree: UriTree,
        privilege: Privilege,
        notes: &str,
        tag: ShareTag,
    ) -> Result<(), Report<AccessError>> {
        let (root_uri, _) = tree
            .single_root()
            .ok_or(AccessError::InvalidTreeShape { roots: tree.len() })?;
        let root_url = self.config.public_url(root_uri);

        let identity = self.validate_identity(identity).await?;

        if identity.is_virtual() {
            let alias = ShareAlias::new(tag, root_url, identity.id(), notes);
            self.aliases.create(alias).await.map_err(AccessError::from)?;
        }

        debug!(identity = %identity.id(), "materializing grant subtree");
        create_level(self.clone(), identity.id(), tree.into_entries(), privilege, None).await
    }

    /// Resolves the acting identity: verify a provided one, or create a
    /// virtual identity.
    async fn validate_identity(
        &self,
        identity: Option<Identity>,
    ) -> Result<Identity, Report<AccessError>> {
        match identity {
            Some(identity) => {
                let found = self
                    .identities
                    .find(&[identity.id()], None)
                    .await
                    .map_err(AccessError::from)?;
                if found.is_empty() {
                    return Err(AccessError::IdentityNotFound {
                        ids: vec![identity.id()],
                    }
                    .into());
                }
                Ok(identity)
            }
            None => Ok(self
                .identities
                .create_virtual()
                .await
                .map_err(AccessError::from)?),
        }
    }
}

/// Creates the grants for one tree level and recurses into each subtree.
///
/// A child's creation never starts before its parent's grant ID is
/// available; siblings are spawned onto a join set and run concurrently.
fn create_level(
    issuer: GrantIssuer,
    identity_id: IdentityId,
    entries: Vec<(String, UriTree)>,
    privilege: Privilege,
    parent: Option<GrantId>,
) -> BoxFuture<'static, Result<(), Report<AccessError>>> {
    async move {
        let mut tasks: JoinSet<Result<(), Report<AccessError>>> = JoinSet::new();
        for (uri, subtree) in entries {
            let issuer = issuer.clone();
            tasks.spawn(async move {
                let grant = Grant::new(uri, identity_id, parent, privilege);
                let grant_id = issuer
                    .grants
                    .create(grant)
                    .await
                    .map_err(AccessError::from)?;
                create_level(
                    issuer,
                    identity_id,
                    subtree.into_entries(),
                    privilege,
                    Some(grant_id),
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => result?,
                Err(err) => {
                    return Err(AccessError::TaskFailed {
                        details: err.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
    .boxed()
}
