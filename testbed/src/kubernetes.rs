/*!

Checks that a cluster installed on the testbed exposes the services it should.

!*/

use crate::error::{self, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use log::{debug, info, warn};
use snafu::{ensure, ResultExt};
use std::convert::TryFrom;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// The namespace Rook deploys Ceph into.
pub const DEFAULT_NAMESPACE: &str = "rook-ceph";

/// The services a healthy Rook/Ceph deployment exposes.
pub const DEFAULT_SERVICES: &[&str] = &[
    "csi-cephfsplugin-metrics",
    "csi-rbdplugin-metrics",
    "rook-ceph-mgr",
    "rook-ceph-mgr-dashboard",
    "rook-ceph-mon-a",
    "rook-ceph-mon-b",
    "rook-ceph-mon-c",
];

pub const DEFAULT_ITERATIONS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Answers whether a service exists.
#[async_trait]
pub trait ServiceLookup: Send + Sync {
    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool>;
}

/// Looks services up with the kubernetes API.
#[derive(Clone)]
pub struct KubeServices {
    client: Client,
}

impl KubeServices {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_kubeconfig(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path).context(error::KubeconfigSnafu { path })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(error::KubeconfigSnafu { path })?;
        let client = Client::try_from(config).context(error::KubeClientSnafu)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ServiceLookup for KubeServices {
    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let service = api
            .get_opt(name)
            .await
            .context(error::KubeRequestSnafu {
                what: format!("get service '{}/{}'", namespace, name),
            })?;
        Ok(service.is_some())
    }
}

/// Polls a [`ServiceLookup`] until services show up.
pub struct ServiceVerifier<L> {
    lookup: L,
    namespace: String,
    interval: Duration,
}

impl<L> ServiceVerifier<L>
where
    L: ServiceLookup,
{
    pub fn new<S: Into<String>>(lookup: L, namespace: S) -> Self {
        Self {
            lookup,
            namespace: namespace.into(),
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Asks for `name` up to `iterations` times, sleeping between attempts. Returns `false` if the
    /// service never showed up. Lookup errors end the wait.
    pub async fn wait_for_service(&self, name: &str, iterations: u32) -> Result<bool> {
        for attempt in 1..=iterations {
            if self.lookup.service_exists(&self.namespace, name).await? {
                info!("Found service '{}/{}'", self.namespace, name);
                return Ok(true);
            }
            debug!(
                "Service '{}/{}' not found, attempt {} of {}",
                self.namespace, name, attempt, iterations
            );
            if attempt < iterations {
                tokio::time::sleep(self.interval).await;
            }
        }
        warn!(
            "Service '{}/{}' did not show up after {} attempt(s)",
            self.namespace, name, iterations
        );
        Ok(false)
    }

    /// Waits for each of `names` in turn and fails with the full list of services that never
    /// showed up.
    pub async fn verify_all<S: AsRef<str>>(&self, names: &[S], iterations: u32) -> Result<()> {
        let mut missing = Vec::new();
        for name in names {
            if !self.wait_for_service(name.as_ref(), iterations).await? {
                missing.push(name.as_ref().to_string());
            }
        }
        ensure!(
            missing.is_empty(),
            error::MissingServicesSnafu {
                namespace: &self.namespace,
                names: missing,
            }
        );
        Ok(())
    }
}

/// Runs `kubectl apply -f manifest` against the cluster of `kubeconfig` and returns what kubectl
/// printed.
pub fn kubectl_apply(kubeconfig: &Path, manifest: &Path) -> Result<String> {
    info!("Applying '{}'", manifest.display());
    let output = Command::new("kubectl")
        .arg("--kubeconfig")
        .arg(kubeconfig)
        .arg("apply")
        .arg("-f")
        .arg(manifest)
        .output()
        .context(error::KubectlSpawnSnafu { program: "kubectl" })?;
    ensure!(
        output.status.success(),
        error::KubectlApplySnafu {
            manifest,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr),
        }
    );
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
