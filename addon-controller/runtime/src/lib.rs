#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use clusternet_addon_core as core;
pub use clusternet_addon_k8s_api as k8s;
pub use clusternet_addon_k8s_manifests as manifests;
pub use clusternet_addon_k8s_rbac as rbac;

pub mod addon;
mod args;
pub mod image;
pub mod namespace;

pub use self::{
    addon::{AddonSpec, ClusternetAddon, InstallStrategy, ManagedCluster, RegistrationOption},
    args::Args,
};
