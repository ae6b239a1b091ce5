//! Privilege propagation across grant subtrees.

use arbor_core::GrantId;
use futures::future::{BoxFuture, FutureExt};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::AccessError;
use crate::privilege::Privilege;
use crate::store::{GrantStore, StoreError};

/// Cascades a privilege change from a grant to every descendant grant.
///
/// Each step is an unconditional set, so re-running a propagation that
/// failed partway through converges to a consistent subtree. There is no
/// rollback: a partial failure leaves a mixed state until retried.
#[derive(Clone)]
pub struct Propagator {
    grants: Arc<dyn GrantStore>,
}

impl Propagator {
    /// Creates a new propagator.
    #[must_use]
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self { grants }
    }

    /// Sets `grant_id` and all of its descendants to `privilege`,
    /// depth-first.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::GrantNotFound`] if the named grant does not
    /// exist, or a store error from any step.
    #[instrument(skip(self), fields(privilege = %privilege))]
    pub async fn propagate(
        &self,
        grant_id: GrantId,
        privilege: Privilege,
    ) -> Result<(), Report<AccessError>> {
        self.grants
            .set_privilege(grant_id, privilege)
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => AccessError::GrantNotFound { id: grant_id },
                other => AccessError::from(other),
            })?;

        self.descend(grant_id, privilege).await
    }

    /// Updates all descendants of `parent`. Each level's child list is
    /// read in full before that level's writes are issued.
    fn descend(
        &self,
        parent: GrantId,
        privilege: Privilege,
    ) -> BoxFuture<'_, Result<(), Report<AccessError>>> {
        async move {
            let children = self
                .grants
                .children_of(parent)
                .await
                .map_err(AccessError::from)?;

            for child in children {
                debug!(grant = %child.id(), "updating descendant grant");
                self.grants
                    .set_privilege(child.id(), privilege)
                    .await
                    .map_err(AccessError::from)?;
                self.descend(child.id(), privilege).await?;
            }
            Ok(())
        }
        .boxed()
    }
}
