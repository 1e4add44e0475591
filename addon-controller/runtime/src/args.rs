use crate::{
    addon::{AddonSpec, ClusternetAddon, ManagedCluster},
    core::{ADDON_NAME, KUBE_APISERVER_CLIENT_SIGNER},
    image,
    manifests::Registry,
    namespace,
    rbac::KubeStore,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::time::{self, Duration};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[clap(
    name = "clusternet-addon",
    about = "Installs and registers the clusternet agent on managed clusters",
    version
)]
pub struct Args {
    #[clap(
        long,
        default_value = "clusternet=info,warn",
        env = "CLUSTERNET_ADDON_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Prints the agent manifests for a managed cluster
    Manifests(ManifestsArgs),

    /// Checks a certificate signing request from an agent
    Approve(ApproveArgs),

    /// Creates the hub permissions of a managed cluster's agent
    Permissions(PermissionsArgs),
}

#[derive(Debug, clap::Args)]
struct ManifestsArgs {
    #[clap(long)]
    cluster_name: String,

    #[clap(long, default_value = ADDON_NAME)]
    addon_name: String,

    /// Defaults to the namespace shared by all add-ons
    #[clap(long)]
    install_namespace: Option<String>,

    #[clap(long, env = "IMAGE_NAME")]
    agent_image: Option<String>,

    /// Uses the image of this controller's own pod when no agent image is set
    #[clap(long)]
    discover_image: bool,

    #[clap(long, env = "POD_NAME")]
    pod_name: Option<String>,
}

#[derive(Debug, clap::Args)]
struct ApproveArgs {
    #[clap(long)]
    cluster_name: String,

    #[clap(long, default_value = ADDON_NAME)]
    addon_name: String,

    #[clap(long, default_value = KUBE_APISERVER_CLIENT_SIGNER)]
    signer_name: String,

    /// A PEM-encoded certificate request
    #[clap(long)]
    csr: PathBuf,
}

#[derive(Debug, clap::Args)]
struct PermissionsArgs {
    #[clap(long)]
    cluster_name: String,

    #[clap(long, default_value = ADDON_NAME)]
    addon_name: String,

    #[clap(long, default_value = "10000")]
    timeout_ms: u64,
}

impl Args {
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            command,
        } = self;

        log_format.try_init(log_level)?;

        match command {
            Command::Manifests(args) => manifests(client, args).await,
            Command::Approve(args) => approve(args),
            Command::Permissions(args) => permissions(client, args).await,
        }
    }
}

async fn manifests(client: kubert::ClientArgs, args: ManifestsArgs) -> Result<()> {
    let ManifestsArgs {
        cluster_name,
        addon_name,
        install_namespace,
        agent_image,
        discover_image,
        pod_name,
    } = args;

    let image = match agent_image.filter(|i| !i.is_empty()) {
        Some(image) => image,
        None if discover_image => {
            let pod_name = pod_name
                .ok_or_else(|| anyhow!("POD_NAME must be set to discover the agent image"))?;
            let ns = namespace::current(namespace::DEFAULT_CONTROLLER_NAMESPACE);
            let client = client.try_client().await?;
            image::discover(client, &ns, &pod_name).await?
        }
        None => image::DEFAULT_AGENT_IMAGE.to_string(),
    };
    debug!(%image, "Agent image");

    let addon = ClusternetAddon::new(&addon_name, image, Arc::new(Registry::default()))?;
    let cluster = ManagedCluster::new(cluster_name);
    let spec = AddonSpec {
        name: addon_name,
        install_namespace,
    };
    let docs = addon
        .manifests(&cluster, &spec)?
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", docs.join("---\n"));
    Ok(())
}

fn approve(args: ApproveArgs) -> Result<()> {
    let ApproveArgs {
        cluster_name,
        addon_name,
        signer_name,
        csr,
    } = args;

    let request =
        std::fs::read(&csr).with_context(|| format!("failed to read {}", csr.display()))?;
    let addon =
        ClusternetAddon::new(&addon_name, image::DEFAULT_AGENT_IMAGE, Default::default())?;
    let approver = addon.approver();
    match approver.check(&cluster_name, &signer_name, &request) {
        Ok(()) => {
            info!(cluster = %cluster_name, "Approved certificate request");
            Ok(())
        }
        Err(rejection) => {
            bail!("certificate request for {cluster_name} not approved: {rejection}")
        }
    }
}

async fn permissions(client: kubert::ClientArgs, args: PermissionsArgs) -> Result<()> {
    let PermissionsArgs {
        cluster_name,
        addon_name,
        timeout_ms,
    } = args;

    let client = client.try_client().await?;
    let addon =
        ClusternetAddon::new(&addon_name, image::DEFAULT_AGENT_IMAGE, Default::default())?;
    let registration = addon.registration(KubeStore::new(client));
    let cluster = ManagedCluster::new(cluster_name);
    let spec = AddonSpec {
        name: addon_name,
        install_namespace: None,
    };

    let created = time::timeout(
        Duration::from_millis(timeout_ms),
        registration.grant_permissions(&cluster, &spec),
    )
    .await
    .context("timed out granting permissions")??;
    info!(cluster = %cluster.name, created = created.len(), "Permissions granted");
    Ok(())
}
