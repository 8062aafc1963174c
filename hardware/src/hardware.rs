use crate::credentials::Credentials;
use crate::driver::{BootRequest, Distro, Provider};
use crate::error::{self, Error, Result};
use crate::inventory::ConnectionVars;
use crate::known_hosts::KnownHosts;
use crate::node::{Node, NodeInfo, NodeRole};
use crate::play::{Play, PlayResult, TaskOutput};
use crate::registry::NodeRegistry;
use crate::runner::{ExecutorBuilder, PlayRunner};
use crate::workspace::Workspace;
use log::{debug, error, info};
use snafu::{ensure, ResultExt};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// The owner of every machine a testbed run provisions.
///
/// Constructing a `Hardware` object connects to the provider and generates the run's ssh
/// credentials. Nodes are then booted (or added one by one), prepared with the plays of a
/// [`Distro`] and finally destroyed. Dropping a `Hardware` object destroys whatever nodes are
/// still registered, so that a failing test or a panic does not leak machines. Use
/// [`Hardware::scoped`] when teardown errors need to be seen by the caller.
pub struct Hardware<P, B>
where
    P: Provider,
    B: ExecutorBuilder,
{
    workspace: Workspace,
    provider: P,
    conn: P::Connection,
    credentials: Credentials,
    nodes: NodeRegistry,
    runner: PlayRunner<B>,
    masters: Vec<NodeInfo>,
    workers: Vec<NodeInfo>,
    /// Set once `scoped` has run its teardown, which `Drop` then skips.
    torn_down: bool,
}

impl<P, B> Hardware<P, B>
where
    P: Provider,
    B: ExecutorBuilder,
{
    /// Connects to `provider` and generates credentials in `workspace`. Nothing is provisioned
    /// yet.
    pub fn new(
        workspace: Workspace,
        provider: P,
        builder: B,
        known_hosts: Box<dyn KnownHosts>,
    ) -> Result<Self> {
        let conn = provider.connect(&workspace).context(error::ConnectSnafu {
            provider: provider.name(),
        })?;
        info!("hardware {}: Using {}", provider.name(), workspace);
        let credentials = Credentials::generate(&workspace)?;
        Ok(Self {
            workspace,
            provider,
            conn,
            credentials,
            nodes: NodeRegistry::new(known_hosts),
            runner: PlayRunner::new(builder),
            masters: Vec::new(),
            workers: Vec::new(),
            torn_down: false,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn conn(&self) -> &P::Connection {
        &self.conn
    }

    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn sshkey_name(&self) -> &str {
        self.credentials.key_name()
    }

    pub fn public_key(&self) -> &str {
        self.credentials.public_key()
    }

    pub fn private_key(&self) -> &Path {
        self.credentials.private_key_path()
    }

    pub fn runner(&self) -> &PlayRunner<B> {
        &self.runner
    }

    pub fn node_add(&mut self, node: Box<dyn Node>) -> Result<()> {
        info!("adding new node {} to hardware {}", node.name(), self);
        self.nodes.add(node)
    }

    pub fn node_remove(&mut self, name: &str) -> Result<()> {
        info!("removing node {} from hardware {}", name, self);
        self.nodes.remove(name)
    }

    /// Has the provider boot `masters` masters and `workers` workers, numbering them from
    /// `offset`, and registers them. Nodes that were booted before a failure are registered too;
    /// nodes the registry rejects are destroyed right away.
    pub fn boot_nodes(&mut self, masters: usize, workers: usize, offset: usize) -> Result<()> {
        info!(
            "boot nodes: {} master(s), {} worker(s), offset {}",
            masters, workers, offset
        );
        let request = BootRequest::new(
            masters,
            workers,
            offset,
            &self.workspace,
            &self.credentials,
        );
        let mut booted = Vec::new();
        let outcome = self
            .provider
            .boot_nodes(&mut self.conn, &request, &mut booted);

        let booted_masters = booted
            .iter()
            .filter(|node| node.role() == &NodeRole::Master)
            .count();
        let booted_workers = booted
            .iter()
            .filter(|node| node.role() == &NodeRole::Worker)
            .count();
        // Register everything we can before reporting the first problem.
        let mut registration = Ok(());
        for node in booted {
            if let Err(e) = self.nodes.add(node) {
                error!("unable to register a booted node: {}", e);
                if registration.is_ok() {
                    registration = Err(e);
                }
            }
        }
        outcome.context(error::BootNodesSnafu {
            provider: self.provider.name(),
        })?;
        registration?;

        ensure!(
            booted_masters == masters && booted_workers == workers,
            error::BootMismatchSnafu {
                expected_masters: masters,
                expected_workers: workers,
                masters: booted_masters,
                workers: booted_workers,
            }
        );
        Ok(())
    }

    /// Waits for every node to accept connections and then bootstraps it, using the plays of
    /// `distro`. Stops at the first play that does not succeed on every node.
    pub fn prepare_nodes(&mut self, distro: &dyn Distro) -> Result<()> {
        info!("prepare nodes with distro {}", distro.name());
        self.execute_play(&distro.wait_for_connection_play())?;
        self.execute_play(&distro.bootstrap_play())?;
        Ok(())
    }

    /// Runs `play` against all nodes without judging the outcome.
    pub fn execute_play_raw(&mut self, play: &Play) -> Result<PlayResult> {
        let vars = self.connection_config_vars();
        self.runner.run(&self.nodes, &vars, play)
    }

    /// Runs `play` against all nodes and fails if any node failed or could not be reached.
    pub fn execute_play(&mut self, play: &Play) -> Result<PlayResult> {
        let result = self.execute_play_raw(play)?;
        if result.is_success() {
            return Ok(result);
        }
        if !result.host_unreachable().is_empty() {
            error!("One or more hosts were unreachable");
            error!("{}", pretty(result.host_unreachable()));
        }
        if !result.host_failed().is_empty() {
            error!("One or more hosts failed");
            error!("{}", pretty(result.host_failed()));
        }
        debug!("The successful hosts returned:");
        debug!("{}", pretty(result.host_ok()));
        error::PlayFailedSnafu {
            play: result.play(),
            unreachable: result.host_unreachable().keys().cloned().collect::<Vec<_>>(),
            failed: result.host_failed().keys().cloned().collect::<Vec<_>>(),
        }
        .fail()
    }

    /// Destroys every registered node. Does nothing if there are none.
    pub fn destroy(&mut self) -> Result<()> {
        self.masters.clear();
        self.workers.clear();
        if self.nodes.is_empty() {
            return Ok(());
        }
        info!("destroying {} node(s) of hardware {}", self.nodes.len(), self);
        self.nodes.destroy_all()
    }

    /// Runs `f` and then destroys every node, whether or not `f` succeeded. An error from `f` takes
    /// precedence over a teardown error, which is then only logged. Teardown is attempted once;
    /// nodes that fail to destroy here are not retried when the hardware is dropped.
    pub fn scoped<T, E, F>(mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let outcome = f(&mut self);
        let teardown = self.destroy();
        self.torn_down = true;
        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown)) => {
                error!("Teardown after a failure also failed: {}", teardown);
                Err(e)
            }
        }
    }

    /// The connection variables every inventory built for this hardware uses.
    pub fn connection_config_vars(&self) -> ConnectionVars {
        ConnectionVars::new(self.credentials.private_key_path().to_path_buf())
    }

    /// The master nodes as of this call.
    pub fn masters(&mut self) -> &[NodeInfo] {
        self.masters = self.nodes.by_role(&NodeRole::Master);
        &self.masters
    }

    /// The worker nodes as of this call.
    pub fn workers(&mut self) -> &[NodeInfo] {
        self.workers = self.nodes.by_role(&NodeRole::Worker);
        &self.workers
    }
}

impl<P, B> Display for Hardware<P, B>
where
    P: Provider,
    B: ExecutorBuilder,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider.name(), self.workspace.name())
    }
}

impl<P, B> Drop for Hardware<P, B>
where
    P: Provider,
    B: ExecutorBuilder,
{
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        if let Err(e) = self.destroy() {
            error!("unable to destroy hardware '{}': {}", self, e);
        }
    }
}

fn pretty(hosts: &BTreeMap<String, Vec<TaskOutput>>) -> String {
    serde_json::to_string_pretty(hosts).unwrap_or_else(|e| format!("Serialization failed: {}", e))
}
