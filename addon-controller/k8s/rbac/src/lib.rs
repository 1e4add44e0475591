#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Hub-side permissions for add-on agents.
//!
//! Each grant is created when it is missing and otherwise left alone: objects
//! that already exist are never compared, updated or deleted. A pass that
//! fails part way leaves the objects it already created, and the next pass
//! picks up where it stopped.

mod grant;
mod store;

pub use self::{
    grant::{hub_grants, Grant, GrantId, GrantKind},
    store::{GrantStore, KubeStore},
};
use clusternet_addon_k8s_api::is_already_exists;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to get {id}: {source}")]
    Get {
        id: GrantId,
        #[source]
        source: clusternet_addon_k8s_api::Error,
    },

    #[error("failed to create {id}: {source}")]
    Create {
        id: GrantId,
        #[source]
        source: clusternet_addon_k8s_api::Error,
    },
}

/// Ensures the hub grants for a managed cluster's agent exist.
#[derive(Clone, Debug)]
pub struct PermissionReconciler<S> {
    store: S,
}

// === impl PermissionReconciler ===

impl<S: GrantStore> PermissionReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates whichever of the cluster's grants are missing, returning the
    /// ids of the objects this pass created.
    ///
    /// The first error aborts the pass. A create that loses a race with a
    /// concurrent pass for the same cluster is treated as success.
    pub async fn reconcile(&self, cluster: &str, addon: &str) -> Result<Vec<GrantId>, Error> {
        let mut created = Vec::new();
        for grant in hub_grants(cluster, addon) {
            let id = grant.id();
            let exists = self
                .store
                .exists(&id)
                .await
                .map_err(|source| Error::Get {
                    id: id.clone(),
                    source,
                })?;
            if exists {
                debug!(%cluster, %id, "Grant exists");
                continue;
            }

            match self.store.create(&grant).await {
                Ok(()) => {
                    info!(%cluster, %id, "Created grant");
                    created.push(id);
                }
                Err(error) if is_already_exists(&error) => {
                    debug!(%cluster, %id, "Grant created concurrently");
                }
                Err(source) => return Err(Error::Create { id, source }),
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests;
