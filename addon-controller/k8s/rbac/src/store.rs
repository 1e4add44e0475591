use crate::{Grant, GrantId, GrantKind};
use clusternet_addon_k8s_api::{
    Api, Client, ClusterRole, ClusterRoleBinding, Error, PostParams, Role, RoleBinding,
};

const FIELD_MANAGER: &str = "clusternet-addon-controller";

/// Reads and creates grant objects on the hub.
#[async_trait::async_trait]
pub trait GrantStore: Send + Sync {
    /// Returns true if the object exists; a missing object is not an error.
    async fn exists(&self, id: &GrantId) -> Result<bool, Error>;

    async fn create(&self, grant: &Grant) -> Result<(), Error>;
}

/// A [`GrantStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespace<'i>(id: &'i GrantId) -> &'i str {
        id.namespace.as_deref().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl GrantStore for KubeStore {
    async fn exists(&self, id: &GrantId) -> Result<bool, Error> {
        let client = self.client.clone();
        let found = match id.kind {
            GrantKind::Role => Api::<Role>::namespaced(client, Self::namespace(id))
                .get_opt(&id.name)
                .await?
                .is_some(),
            GrantKind::RoleBinding => Api::<RoleBinding>::namespaced(client, Self::namespace(id))
                .get_opt(&id.name)
                .await?
                .is_some(),
            GrantKind::ClusterRole => Api::<ClusterRole>::all(client)
                .get_opt(&id.name)
                .await?
                .is_some(),
            GrantKind::ClusterRoleBinding => Api::<ClusterRoleBinding>::all(client)
                .get_opt(&id.name)
                .await?
                .is_some(),
        };
        Ok(found)
    }

    async fn create(&self, grant: &Grant) -> Result<(), Error> {
        let client = self.client.clone();
        let id = grant.id();
        let params = PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        };
        match grant {
            Grant::Role(role) => {
                Api::<Role>::namespaced(client, Self::namespace(&id))
                    .create(&params, role)
                    .await?;
            }
            Grant::RoleBinding(binding) => {
                Api::<RoleBinding>::namespaced(client, Self::namespace(&id))
                    .create(&params, binding)
                    .await?;
            }
            Grant::ClusterRole(role) => {
                Api::<ClusterRole>::all(client)
                    .create(&params, role)
                    .await?;
            }
            Grant::ClusterRoleBinding(binding) => {
                Api::<ClusterRoleBinding>::all(client)
                    .create(&params, binding)
                    .await?;
            }
        }
        Ok(())
    }
}
