//! Approval of agent certificate signing requests.
//!
//! A request is approved only when it is addressed to the kube-apiserver
//! client signer and its subject names exactly the identity the agent of one
//! managed cluster is expected to hold. Nothing here touches the cluster: a
//! request that is not approved is simply left pending.

use crate::{identity, AUTHENTICATED_GROUP, KUBE_APISERVER_CLIENT_SIGNER};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;
use x509_parser::prelude::{FromDer, X509CertificationRequest};

const CERTIFICATE_REQUEST_TAG: &str = "CERTIFICATE REQUEST";

/// The number of distinct organizations an agent request must carry.
const REQUIRED_ORGANIZATIONS: usize = 3;

/// Decides whether signing requests identify a legitimate add-on agent.
#[derive(Clone, Debug)]
pub struct Approver {
    addon: String,
    agent: String,
}

/// The parts of a request subject that identify the requester.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestSubject {
    /// Subject organizations, with duplicates collapsed.
    pub organizations: BTreeSet<String>,
    pub common_name: String,
}

/// The reason a signing request was not approved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("unexpected signer {0:?}")]
    Signer(String),

    #[error("request is not PEM encoded: {0}")]
    Pem(String),

    #[error("unexpected PEM block type {0:?}")]
    BlockType(String),

    #[error("invalid certificate request: {0}")]
    Request(String),

    #[error("expected exactly three organizations, found {0}")]
    OrganizationCount(usize),

    #[error("missing organization {0:?}")]
    MissingOrganization(String),

    #[error("unexpected common name {0:?}")]
    CommonName(String),
}

// === impl Approver ===

impl Approver {
    pub fn new(addon: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            addon: addon.into(),
            agent: agent.into(),
        }
    }

    /// Returns true if the request may be approved for `cluster`.
    ///
    /// Rejections are logged and never escalated.
    pub fn approve(&self, cluster: &str, signer: &str, request: &[u8]) -> bool {
        match self.check(cluster, signer, request) {
            Ok(()) => true,
            Err(error) => {
                debug!(%cluster, %signer, %error, "Signing request not approved");
                false
            }
        }
    }

    /// Validates a request, stopping at the first failed check.
    pub fn check(&self, cluster: &str, signer: &str, request: &[u8]) -> Result<(), Rejection> {
        if signer != KUBE_APISERVER_CLIENT_SIGNER {
            return Err(Rejection::Signer(signer.to_string()));
        }
        let subject = RequestSubject::from_pem(request)?;
        self.check_subject(cluster, &subject)
    }

    pub fn check_subject(&self, cluster: &str, subject: &RequestSubject) -> Result<(), Rejection> {
        if subject.organizations.len() != REQUIRED_ORGANIZATIONS {
            return Err(Rejection::OrganizationCount(subject.organizations.len()));
        }

        let required = [
            AUTHENTICATED_GROUP.to_string(),
            identity::addon_group(&self.addon),
            identity::cluster_group(cluster, &self.addon),
        ];
        if let Some(missing) = required
            .into_iter()
            .find(|org| !subject.organizations.contains(org))
        {
            return Err(Rejection::MissingOrganization(missing));
        }

        if subject.common_name != identity::agent_user(cluster, &self.addon, &self.agent) {
            return Err(Rejection::CommonName(subject.common_name.clone()));
        }

        Ok(())
    }
}

// === impl RequestSubject ===

impl RequestSubject {
    /// Decodes the first PEM block of `bytes` as a PKCS#10 request.
    pub fn from_pem(bytes: &[u8]) -> Result<Self, Rejection> {
        let block = pem::parse(bytes).map_err(|e| Rejection::Pem(e.to_string()))?;
        if block.tag() != CERTIFICATE_REQUEST_TAG {
            return Err(Rejection::BlockType(block.tag().to_string()));
        }
        Self::from_der(block.contents())
    }

    pub fn from_der(der: &[u8]) -> Result<Self, Rejection> {
        let (rest, request) = X509CertificationRequest::from_der(der)
            .map_err(|e| Rejection::Request(e.to_string()))?;
        if !rest.is_empty() {
            return Err(Rejection::Request("trailing data".to_string()));
        }
        let subject = &request.certification_request_info.subject;

        let organizations = subject
            .iter_organization()
            .map(|attr| attr.as_str().map(str::to_string))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| Rejection::Request(e.to_string()))?;

        // When the name repeats the attribute, the last value is the common name.
        let common_name = match subject.iter_common_name().last() {
            Some(attr) => attr
                .as_str()
                .map_err(|e| Rejection::Request(e.to_string()))?
                .to_string(),
            None => String::new(),
        };

        Ok(Self {
            organizations,
            common_name,
        })
    }
}
