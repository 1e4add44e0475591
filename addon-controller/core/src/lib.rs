#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod csr;
pub mod identity;

pub use self::{
    csr::{Approver, Rejection, RequestSubject},
    identity::SignerConfiguration,
};

/// The name under which the add-on is registered with the hub.
pub const ADDON_NAME: &str = "clusternet";

/// The agent name embedded in the agent's client certificate user.
pub const AGENT_NAME: &str = "clusternet-addon-agent";

/// The namespace agents are installed into when the add-on does not
/// request one. Other add-ons share it, so it is never created or owned by
/// this add-on.
pub const DEFAULT_INSTALL_NAMESPACE: &str = "open-cluster-management-agent-addon";

/// The built-in signer that issues kube-apiserver client certificates.
pub const KUBE_APISERVER_CLIENT_SIGNER: &str = "kubernetes.io/kube-apiserver-client";

/// The group every authenticated user belongs to.
pub const AUTHENTICATED_GROUP: &str = "system:authenticated";
