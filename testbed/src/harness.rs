/*!

One testbed run: provision the nodes a [`Settings`] asks for, prepare them, run the extra plays,
verify the cluster's services and tear everything down again.

!*/

use crate::ansible::AnsibleBuilder;
use crate::config::{ProviderSettings, ServiceSettings, Settings, DEFAULT_WORKSPACE_PREFIX};
use crate::distro;
use crate::error::{self, Result};
use crate::kubernetes::{kubectl_apply, KubeServices, ServiceLookup, ServiceVerifier};
use crate::provider::{ExecProvider, StaticProvider};
use log::info;
use snafu::{OptionExt, ResultExt};
use std::future::Future;
use testbed_hardware::{Distro, ExecutorBuilder, Hardware, Play, Provider, Workspace};

/// Creates the workspace directory of `settings`.
pub fn workspace(settings: &Settings) -> Result<Workspace> {
    let workspace = match &settings.name {
        Some(name) => Workspace::create(&settings.workspace_root, name.as_str())?,
        None => Workspace::generate(&settings.workspace_root, DEFAULT_WORKSPACE_PREFIX)?,
    };
    Ok(workspace)
}

/// Runs everything `settings` describes with `ansible-playbook` as the executor.
pub fn run(settings: &Settings) -> Result<()> {
    let distro = distro::from_name(&settings.distro).context(error::UnknownDistroSnafu {
        name: &settings.distro,
    })?;
    let plays = settings.ansible.load_extra_plays()?;
    let workspace = workspace(settings)?;
    let builder =
        AnsibleBuilder::new(workspace.working_dir()).with_program(&settings.ansible.program);
    match &settings.provider {
        ProviderSettings::Static { hosts } => run_with(
            settings,
            workspace,
            StaticProvider::new(hosts.clone()),
            builder,
            distro.as_ref(),
            &plays,
        ),
        ProviderSettings::Exec {
            boot_command,
            destroy_command,
        } => run_with(
            settings,
            workspace,
            ExecProvider::new(boot_command, destroy_command),
            builder,
            distro.as_ref(),
            &plays,
        ),
    }
}

/// Boots, prepares and exercises the nodes, then destroys them whatever happened.
pub fn run_with<P, B>(
    settings: &Settings,
    workspace: Workspace,
    provider: P,
    builder: B,
    distro: &dyn Distro,
    plays: &[Play],
) -> Result<()>
where
    P: Provider,
    B: ExecutorBuilder,
{
    let hardware = Hardware::new(
        workspace,
        provider,
        builder,
        settings.ansible.known_hosts_store(),
    )?;
    info!("Provisioning hardware {}", hardware);
    hardware.scoped(|hw| -> Result<()> {
        hw.boot_nodes(settings.masters, settings.workers, 0)?;
        hw.prepare_nodes(distro)?;
        for play in plays {
            hw.execute_play(play)?;
        }
        if settings.services.kubeconfig.is_some() {
            block_on(verify(&settings.services))??;
        } else {
            info!("No kubeconfig configured, skipping service verification");
        }
        Ok(())
    })
}

/// Applies the configured manifests and waits for the configured services.
pub async fn verify(settings: &ServiceSettings) -> Result<()> {
    let kubeconfig = settings.kubeconfig.as_ref().context(error::NoKubeconfigSnafu)?;
    for manifest in &settings.manifests {
        kubectl_apply(kubeconfig, manifest)?;
    }
    let services = KubeServices::from_kubeconfig(kubeconfig).await?;
    verify_with(services, settings).await
}

/// Waits for the configured services using `lookup`.
pub async fn verify_with<L: ServiceLookup>(lookup: L, settings: &ServiceSettings) -> Result<()> {
    ServiceVerifier::new(lookup, settings.namespace.as_str())
        .with_interval(settings.interval())
        .verify_all(settings.names.as_slice(), settings.iterations)
        .await?;
    info!(
        "All {} service(s) are present in namespace '{}'",
        settings.names.len(),
        settings.namespace
    );
    Ok(())
}

/// Drives `future` to completion on a runtime of its own. The hardware lifecycle is blocking, so
/// the async parts of a run get a runtime only while they need one.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context(error::CreateRuntimeSnafu)?;
    Ok(runtime.block_on(future))
}
