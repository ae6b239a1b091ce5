//! Privilege computation and grant propagation engine for arbor.
//!
//! Resources in an arbor repository are hierarchically addressed by URI:
//! collections contain sub-collections, which contain items. This crate
//! decides what a set of identities may do with such a resource, and keeps
//! grant subtrees consistent as privileges change or resources move into
//! the public namespace.
//!
//! The entry points are:
//! - [`PrivilegeResolver`]: the effective privilege a set of identities
//!   holds over a resource path.
//! - [`GrantIssuer`]: materializes a grant subtree for a resource tree and
//!   returns a shareable accession URL.
//! - [`Propagator`]: cascades a privilege change to every descendant grant.
//! - [`Publicizer`]: moves a grant tree into the public namespace, pruning
//!   grants below write level.
//! - [`ShareListing`]: enumerates an identity's top-level shares.
//!
//! Storage is abstracted behind the traits in [`store`]; `arbor-store`
//! provides the Postgres implementations.

pub mod config;
pub mod error;
pub mod grant;
pub mod issuer;
pub mod listing;
pub mod path;
pub mod privilege;
pub mod propagate;
pub mod publicize;
pub mod resolver;
pub mod store;

pub use config::AccessConfig;
pub use error::AccessError;
pub use grant::{Grant, Identity, ShareAlias, UriTree};
pub use issuer::GrantIssuer;
pub use listing::{ShareListing, SharedEntry};
pub use privilege::Privilege;
pub use propagate::Propagator;
pub use publicize::Publicizer;
pub use resolver::PrivilegeResolver;
pub use store::{AliasStore, GrantStore, IdentityStore, OwnershipOracle, StoreError};
