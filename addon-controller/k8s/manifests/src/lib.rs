#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod registry;
pub mod template;

pub use self::{
    registry::{Manifest, Registry},
    template::{Engine, Template, Values},
};
use clusternet_addon_core::DEFAULT_INSTALL_NAMESPACE;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const NAMESPACE: Template = Template::new(
    "namespace.yaml",
    include_str!("../templates/namespace.yaml"),
);

/// Templates rendered for every installation, in apply order.
pub const TEMPLATES: [Template; 6] = [
    Template::new(
        "serviceaccount.yaml",
        include_str!("../templates/serviceaccount.yaml"),
    ),
    Template::new("role.yaml", include_str!("../templates/role.yaml")),
    Template::new(
        "rolebinding.yaml",
        include_str!("../templates/rolebinding.yaml"),
    ),
    Template::new(
        "clusterrole.yaml",
        include_str!("../templates/clusterrole.yaml"),
    ),
    Template::new(
        "clusterrolebinding.yaml",
        include_str!("../templates/clusterrolebinding.yaml"),
    ),
    Template::new(
        "deployment.yaml",
        include_str!("../templates/deployment.yaml"),
    ),
];

#[derive(Debug, Error)]
pub enum Error {
    #[error("no value for {key:?}")]
    MissingValue { key: String },

    #[error("{template}: {source}")]
    Template {
        template: &'static str,
        #[source]
        source: minijinja::Error,
    },

    #[error("{template}: failed to decode: {source}")]
    Decode {
        template: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{template}: unsupported resource {api_version}/{kind}")]
    UnsupportedKind {
        template: &'static str,
        api_version: String,
        kind: String,
    },
}

/// Renders the agent's manifests for one managed cluster.
#[derive(Clone, Debug)]
pub struct Renderer {
    engine: Arc<Engine>,
    registry: Arc<Registry>,
}

// === impl Renderer ===

impl Renderer {
    /// Compiles the embedded templates.
    pub fn new(registry: Arc<Registry>) -> Result<Self, Error> {
        let engine = Engine::new(std::iter::once(NAMESPACE).chain(TEMPLATES))?;
        Ok(Self {
            engine: Arc::new(engine),
            registry,
        })
    }

    /// Lists the templates to render for an install namespace.
    ///
    /// The default install namespace is shared with other add-ons, so it is
    /// only included when the add-on is installed elsewhere.
    pub fn templates(install_namespace: &str) -> Vec<Template> {
        let mut templates = Vec::with_capacity(TEMPLATES.len() + 1);
        if install_namespace != DEFAULT_INSTALL_NAMESPACE {
            templates.push(NAMESPACE);
        }
        templates.extend(TEMPLATES);
        templates
    }

    /// Renders and decodes every template.
    ///
    /// Nothing is returned unless every template decodes.
    pub fn render(&self, values: &Values) -> Result<Vec<Manifest>, Error> {
        let install_namespace =
            values
                .get(template::INSTALL_NAMESPACE)
                .ok_or_else(|| Error::MissingValue {
                    key: template::INSTALL_NAMESPACE.to_string(),
                })?;

        Self::templates(install_namespace)
            .into_iter()
            .map(|template| {
                let text = self.engine.render(&template, values)?;
                let manifest = self.registry.decode(template.name, &text)?;
                debug!(template = %template.name, kind = %manifest.kind(), name = %manifest.name(), "Rendered");
                Ok(manifest)
            })
            .collect()
    }
}
