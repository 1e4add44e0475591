use crate::k8s::{is_not_found, Api, Client, Pod, ResourceExt};
use thiserror::Error;
use tracing::debug;

/// The image agents run when none is configured.
pub const DEFAULT_AGENT_IMAGE: &str = "quay.io/skeeey/clusternet-addon:0.2";

/// The controller's container in its own pod. Agents run the same image.
pub const CONTROLLER_CONTAINER: &str = "clusternet-addon-controller";

#[derive(Debug, Error)]
pub enum Error {
    #[error("pod {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("failed to get pod {namespace}/{name}: {source}")]
    Get {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("pod {pod} has no container named {container}")]
    MissingContainer { pod: String, container: &'static str },

    #[error("container {container} in pod {pod} has no image")]
    MissingImage { pod: String, container: &'static str },
}

/// Looks up the image of the controller container in the pod `name`.
pub async fn discover(client: Client, namespace: &str, name: &str) -> Result<String, Error> {
    let pod = Api::<Pod>::namespaced(client, namespace)
        .get(name)
        .await
        .map_err(|source| {
            let namespace = namespace.to_string();
            let name = name.to_string();
            if is_not_found(&source) {
                Error::NotFound { namespace, name }
            } else {
                Error::Get {
                    namespace,
                    name,
                    source,
                }
            }
        })?;
    let image = controller_image(&pod)?;
    debug!(%namespace, pod = %name, %image, "Discovered agent image");
    Ok(image)
}

/// Returns the image of the pod's controller container.
pub fn controller_image(pod: &Pod) -> Result<String, Error> {
    let container = pod
        .spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .find(|c| c.name == CONTROLLER_CONTAINER)
        .ok_or_else(|| Error::MissingContainer {
            pod: pod.name_any(),
            container: CONTROLLER_CONTAINER,
        })?;
    match container.image.as_deref() {
        Some(image) if !image.is_empty() => Ok(image.to_string()),
        _ => Err(Error::MissingImage {
            pod: pod.name_any(),
            container: CONTROLLER_CONTAINER,
        }),
    }
}
