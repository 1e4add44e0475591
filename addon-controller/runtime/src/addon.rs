use crate::{
    core::{Approver, SignerConfiguration, AGENT_NAME, DEFAULT_INSTALL_NAMESPACE},
    manifests::{self, template, Manifest, Registry, Renderer, Values},
    rbac::{self, GrantId, GrantStore, PermissionReconciler},
};
use std::sync::Arc;

/// A spoke cluster registered with the hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedCluster {
    pub name: String,
}

/// The add-on as requested for one managed cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddonSpec {
    pub name: String,
    pub install_namespace: Option<String>,
}

/// Where and how the agent is installed on one managed cluster.
///
/// Recomputed on every pass and never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddonInstallation {
    pub cluster_name: String,
    pub install_namespace: String,
    pub agent_image: String,
}

/// The clusters the add-on is installed on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstallStrategy {
    AllClusters,
}

/// Provides the add-on lifecycle manager with everything it needs to install
/// the agent and admit it to the hub.
#[derive(Clone, Debug)]
pub struct ClusternetAddon {
    name: String,
    agent: String,
    image: String,
    renderer: Renderer,
}

/// How agents register with the hub: the certificate they request, how the
/// request is approved, and the permissions granted once it is.
#[derive(Clone, Debug)]
pub struct RegistrationOption<S> {
    addon: String,
    agent: String,
    approver: Approver,
    permissions: PermissionReconciler<S>,
}

// === impl ManagedCluster ===

impl ManagedCluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// === impl AddonInstallation ===

impl AddonInstallation {
    pub fn new(cluster: &ManagedCluster, addon: &AddonSpec, agent_image: &str) -> Self {
        let install_namespace = match addon.install_namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns.to_string(),
            _ => DEFAULT_INSTALL_NAMESPACE.to_string(),
        };
        Self {
            cluster_name: cluster.name.clone(),
            install_namespace,
            agent_image: agent_image.to_string(),
        }
    }

    /// The template values for this installation.
    pub fn values(&self, addon: &str) -> Values {
        [
            (template::CLUSTER_NAME, self.cluster_name.clone()),
            (template::INSTALL_NAMESPACE, self.install_namespace.clone()),
            (template::KUBECONFIG_SECRET, hub_kubeconfig_secret(addon)),
            (template::IMAGE, self.agent_image.clone()),
        ]
        .into_iter()
        .collect()
    }
}

/// The secret the hub kubeconfig of an add-on's agent is written to.
pub fn hub_kubeconfig_secret(addon: &str) -> String {
    format!("{addon}-hub-kubeconfig")
}

// === impl ClusternetAddon ===

impl ClusternetAddon {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        registry: Arc<Registry>,
    ) -> Result<Self, manifests::Error> {
        Ok(Self {
            name: name.into(),
            agent: AGENT_NAME.to_string(),
            image: image.into(),
            renderer: Renderer::new(registry)?,
        })
    }

    pub fn installation(&self, cluster: &ManagedCluster, addon: &AddonSpec) -> AddonInstallation {
        AddonInstallation::new(cluster, addon, &self.image)
    }

    /// Computes the template values for a cluster.
    pub fn values(&self, cluster: &ManagedCluster, addon: &AddonSpec) -> Values {
        self.installation(cluster, addon).values(&addon.name)
    }

    /// Renders the agent's manifests for a cluster.
    pub fn manifests(
        &self,
        cluster: &ManagedCluster,
        addon: &AddonSpec,
    ) -> Result<Vec<Manifest>, manifests::Error> {
        self.renderer.render(&self.values(cluster, addon))
    }

    pub fn approver(&self) -> Approver {
        Approver::new(&self.name, &self.agent)
    }

    /// Builds the registration option, granting permissions through `store`.
    pub fn registration<S: GrantStore>(&self, store: S) -> RegistrationOption<S> {
        RegistrationOption {
            addon: self.name.clone(),
            agent: self.agent.clone(),
            approver: self.approver(),
            permissions: PermissionReconciler::new(store),
        }
    }

    pub fn install_strategy(&self) -> InstallStrategy {
        InstallStrategy::AllClusters
    }
}

// === impl RegistrationOption ===

impl<S: GrantStore> RegistrationOption<S> {
    /// The certificates an agent on `cluster` requests.
    pub fn csr_configurations(&self, cluster: &ManagedCluster) -> Vec<SignerConfiguration> {
        vec![SignerConfiguration::for_cluster(
            &cluster.name,
            &self.addon,
            &self.agent,
        )]
    }

    pub fn approve_csr(&self, cluster: &ManagedCluster, signer: &str, request: &[u8]) -> bool {
        self.approver.approve(&cluster.name, signer, request)
    }

    /// Ensures the hub grants for the cluster's agent exist.
    pub async fn grant_permissions(
        &self,
        cluster: &ManagedCluster,
        addon: &AddonSpec,
    ) -> Result<Vec<GrantId>, rbac::Error> {
        self.permissions.reconcile(&cluster.name, &addon.name).await
    }

    /// The namespace agents are installed into by default.
    pub fn namespace(&self) -> &str {
        DEFAULT_INSTALL_NAMESPACE
    }
}
