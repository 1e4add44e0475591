use crate::Error;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use std::collections::BTreeMap;

/// A named manifest template with `{{ key }}` substitution points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    text: &'static str,
}

/// Compiled templates, looked up by name.
///
/// Undefined keys are errors, and injected values are written verbatim.
#[derive(Debug)]
pub struct Engine {
    env: Environment<'static>,
}

/// A flat mapping of template keys to the literal values injected for them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<String, String>);

pub const CLUSTER_NAME: &str = "clusterName";
pub const INSTALL_NAMESPACE: &str = "addonInstallNamespace";
pub const KUBECONFIG_SECRET: &str = "kubeConfigSecret";
pub const IMAGE: &str = "image";

// === impl Template ===

impl Template {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }
}

// === impl Engine ===

impl Engine {
    pub fn new(templates: impl IntoIterator<Item = Template>) -> Result<Self, Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        for Template { name, text } in templates {
            env.add_template(name, text)
                .map_err(|source| Error::Template {
                    template: name,
                    source,
                })?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, template: &Template, values: &Values) -> Result<String, Error> {
        let error = |source| Error::Template {
            template: template.name,
            source,
        };
        self.env
            .get_template(template.name)
            .map_err(error)?
            .render(values)
            .map_err(error)
    }
}

// === impl Values ===

impl Values {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for Values {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
