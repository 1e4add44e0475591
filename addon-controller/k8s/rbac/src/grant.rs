use clusternet_addon_core::identity;
use clusternet_addon_k8s_api::{
    ClusterRole, ClusterRoleBinding, ObjectMeta, PolicyRule, Role, RoleBinding, RoleRef, Subject,
    RBAC_API_GROUP,
};
use std::fmt;

const ADDON_API_GROUP: &str = "addon.open-cluster-management.io";
const PROXY_API_GROUP: &str = "proxies.clusternet.io";

/// A hub-side RBAC object granting an agent access.
#[derive(Clone, Debug, PartialEq)]
pub enum Grant {
    Role(Role),
    RoleBinding(RoleBinding),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrantKind {
    Role,
    RoleBinding,
    ClusterRole,
    ClusterRoleBinding,
}

/// Identifies a grant object on the hub.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrantId {
    pub kind: GrantKind,
    pub namespace: Option<String>,
    pub name: String,
}

/// Builds the grants an add-on agent on `cluster` needs on the hub.
///
/// Names depend only on the cluster and add-on names, so every pass for the
/// same cluster computes the same objects and distinct clusters never share
/// one.
pub fn hub_grants(cluster: &str, addon: &str) -> [Grant; 4] {
    let group = identity::cluster_group(cluster, addon);
    let read_only = || vec!["get".to_string(), "list".to_string(), "watch".to_string()];

    let role_name = format!("open-cluster-management:{addon}:agent");
    let role = Role {
        metadata: meta(&role_name, Some(cluster)),
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec!["".to_string()]),
                resources: Some(vec!["configmaps".to_string()]),
                verbs: read_only(),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec![ADDON_API_GROUP.to_string()]),
                resources: Some(vec!["managedclusteraddons".to_string()]),
                verbs: read_only(),
                ..Default::default()
            },
        ]),
    };
    let role_binding = RoleBinding {
        metadata: meta(&role_name, Some(cluster)),
        role_ref: role_ref("Role", &role_name),
        subjects: Some(vec![group_subject(&group)]),
    };

    let cluster_role_name = format!("open-cluster-management:{addon}-addon:{cluster}");
    let cluster_role = ClusterRole {
        metadata: meta(&cluster_role_name, None),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec![PROXY_API_GROUP.to_string()]),
            resources: Some(vec!["sockets".to_string()]),
            resource_names: Some(vec![cluster.to_string()]),
            verbs: vec!["*".to_string()],
            ..Default::default()
        }]),
        aggregation_rule: None,
    };
    let cluster_role_binding = ClusterRoleBinding {
        metadata: meta(&cluster_role_name, None),
        role_ref: role_ref("ClusterRole", &cluster_role_name),
        subjects: Some(vec![group_subject(&group)]),
    };

    [
        Grant::Role(role),
        Grant::RoleBinding(role_binding),
        Grant::ClusterRole(cluster_role),
        Grant::ClusterRoleBinding(cluster_role_binding),
    ]
}

fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(Into::into),
        ..Default::default()
    }
}

fn role_ref(kind: &str, name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

fn group_subject(group: &str) -> Subject {
    Subject {
        kind: "Group".to_string(),
        api_group: Some(RBAC_API_GROUP.to_string()),
        name: group.to_string(),
        namespace: None,
    }
}

// === impl Grant ===

impl Grant {
    pub fn kind(&self) -> GrantKind {
        match self {
            Self::Role(_) => GrantKind::Role,
            Self::RoleBinding(_) => GrantKind::RoleBinding,
            Self::ClusterRole(_) => GrantKind::ClusterRole,
            Self::ClusterRoleBinding(_) => GrantKind::ClusterRoleBinding,
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Role(o) => &o.metadata,
            Self::RoleBinding(o) => &o.metadata,
            Self::ClusterRole(o) => &o.metadata,
            Self::ClusterRoleBinding(o) => &o.metadata,
        }
    }

    pub fn id(&self) -> GrantId {
        let meta = self.metadata();
        GrantId {
            kind: self.kind(),
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

// === impl GrantKind ===

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// === impl GrantId ===

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}
