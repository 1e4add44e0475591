use std::path::Path;
use tracing::debug;

/// Holds the namespace of the pod's service account.
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// The namespace the controller assumes when it cannot read its own.
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "open-cluster-management";

/// Returns the namespace this process runs in, or `default` outside a pod.
pub fn current(default: &str) -> String {
    read(Path::new(SERVICE_ACCOUNT_NAMESPACE_PATH), default)
}

/// Reads a namespace file, falling back to `default` when the file is
/// missing, unreadable or blank.
pub fn read(path: &Path, default: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(ns) if !ns.trim().is_empty() => ns.trim().to_string(),
        Ok(_) => {
            debug!(path = %path.display(), "Namespace file is empty");
            default.to_string()
        }
        Err(error) => {
            debug!(path = %path.display(), %error, "Failed to read namespace");
            default.to_string()
        }
    }
}
