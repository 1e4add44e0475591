//! Names shared by the hub and the spoke agent.
//!
//! The hub approves a signing request only when its subject matches these
//! names exactly, and the agent builds its request from the same functions,
//! so any change here must ship to both sides at once.

use crate::{AUTHENTICATED_GROUP, KUBE_APISERVER_CLIENT_SIGNER};

const GROUP_PREFIX: &str = "system:open-cluster-management";

/// The group shared by every agent of an add-on, on any cluster.
pub fn addon_group(addon: &str) -> String {
    format!("{GROUP_PREFIX}:addon:{addon}")
}

/// The group held only by the add-on's agents on one managed cluster.
pub fn cluster_group(cluster: &str, addon: &str) -> String {
    format!("{GROUP_PREFIX}:cluster:{cluster}:addon:{addon}")
}

/// The user name (certificate common name) of an add-on agent.
pub fn agent_user(cluster: &str, addon: &str, agent: &str) -> String {
    format!("{}:agent:{agent}", cluster_group(cluster, addon))
}

/// The groups an agent certificate carries, most specific first.
pub fn default_groups(cluster: &str, addon: &str) -> [String; 3] {
    [
        cluster_group(cluster, addon),
        addon_group(addon),
        AUTHENTICATED_GROUP.to_string(),
    ]
}

/// Describes the certificate an agent must request from the hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerConfiguration {
    pub signer_name: String,
    pub user: String,
    pub groups: Vec<String>,
}

// === impl SignerConfiguration ===

impl SignerConfiguration {
    pub fn for_cluster(cluster: &str, addon: &str, agent: &str) -> Self {
        Self {
            signer_name: KUBE_APISERVER_CLIENT_SIGNER.to_string(),
            user: agent_user(cluster, addon, agent),
            groups: default_groups(cluster, addon).into(),
        }
    }
}
