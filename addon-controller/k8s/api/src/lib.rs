#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use k8s_openapi::api::{
    self,
    apps::v1::Deployment,
    core::v1::{Namespace, Pod, ServiceAccount},
    rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject},
};
pub use kube::{
    api::{Api, ObjectMeta, PostParams, ResourceExt},
    core::{ErrorResponse, TypeMeta},
    Client, Error, Resource,
};

/// The API group of all RBAC resources.
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Returns true if the API server reported that the object does not exist.
pub fn is_not_found(error: &Error) -> bool {
    matches!(error, Error::Api(rsp) if rsp.code == 404)
}

/// Returns true if the API server rejected a create because the object
/// already exists.
pub fn is_already_exists(error: &Error) -> bool {
    matches!(error, Error::Api(rsp) if rsp.code == 409 && rsp.reason == "AlreadyExists")
}
