use crate::Error;
use clusternet_addon_k8s_api::{
    ClusterRole, ClusterRoleBinding, Deployment, Namespace, ObjectMeta, Resource, Role,
    RoleBinding, ServiceAccount, TypeMeta,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::HashMap, fmt};

/// A decoded manifest object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    Namespace(Namespace),
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Deployment(Deployment),
}

type Decode = Box<dyn Fn(&str) -> Result<Manifest, serde_yaml::Error> + Send + Sync>;

/// Maps `(apiVersion, kind)` pairs to typed decoders.
///
/// A registry is built once at startup and shared by reference afterwards.
pub struct Registry {
    decoders: HashMap<(String, String), Decode>,
}

// === impl Manifest ===

impl Manifest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Namespace(_) => "Namespace",
            Self::ServiceAccount(_) => "ServiceAccount",
            Self::Role(_) => "Role",
            Self::RoleBinding(_) => "RoleBinding",
            Self::ClusterRole(_) => "ClusterRole",
            Self::ClusterRoleBinding(_) => "ClusterRoleBinding",
            Self::Deployment(_) => "Deployment",
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Namespace(o) => &o.metadata,
            Self::ServiceAccount(o) => &o.metadata,
            Self::Role(o) => &o.metadata,
            Self::RoleBinding(o) => &o.metadata,
            Self::ClusterRole(o) => &o.metadata,
            Self::ClusterRoleBinding(o) => &o.metadata,
            Self::Deployment(o) => &o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }
}

// === impl Registry ===

impl Registry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers `K` under its own API version and kind.
    pub fn register<K>(&mut self, wrap: fn(K) -> Manifest)
    where
        K: Resource<DynamicType = ()> + DeserializeOwned + 'static,
    {
        let key = (K::api_version(&()).into_owned(), K::kind(&()).into_owned());
        self.decoders.insert(
            key,
            Box::new(move |text: &str| serde_yaml::from_str::<K>(text).map(wrap)),
        );
    }

    /// Decodes a single YAML document into its registered type.
    pub fn decode(&self, template: &'static str, text: &str) -> Result<Manifest, Error> {
        let decode_err = |source| Error::Decode { template, source };
        let TypeMeta { api_version, kind } = serde_yaml::from_str(text).map_err(decode_err)?;
        let key = (api_version, kind);
        match self.decoders.get(&key) {
            Some(decode) => decode(text).map_err(decode_err),
            None => {
                let (api_version, kind) = key;
                Err(Error::UnsupportedKind {
                    template,
                    api_version,
                    kind,
                })
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Manifest::Namespace);
        registry.register(Manifest::ServiceAccount);
        registry.register(Manifest::Role);
        registry.register(Manifest::RoleBinding);
        registry.register(Manifest::ClusterRole);
        registry.register(Manifest::ClusterRoleBinding);
        registry.register(Manifest::Deployment);
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self
            .decoders
            .keys()
            .map(|(api_version, kind)| format!("{api_version}/{kind}"))
            .collect::<Vec<_>>();
        kinds.sort();
        f.debug_struct("Registry").field("kinds", &kinds).finish()
    }
}
