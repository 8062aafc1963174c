mod error;

pub use self::error::{DriverError, DriverResult, IntoDriverError};
use crate::credentials::Credentials;
use crate::node::{Node, NodeRole};
use crate::play::Play;
use crate::workspace::Workspace;

/// You implement the [`Provider`] trait to hand machines to a [`Hardware`](crate::Hardware)
/// object. A provider usually wraps a cloud API, but anything that can produce reachable machines
/// will do (a pool of pre-provisioned hosts, a script that starts VMs, ...).
///
/// ## Custom Types
///
/// - `Connection` is whatever handle the provider needs to talk to its backend. It is opened once
///   by [`Provider::connect`] when the `Hardware` object is constructed and is then lent back to the
///   provider on every [`Provider::boot_nodes`] call.
///
pub trait Provider {
    type Connection;

    /// A short name used in log messages.
    fn name(&self) -> &str;

    /// Open the connection to the provider's backend. Failing here aborts the construction of the
    /// `Hardware` object.
    fn connect(&self, workspace: &Workspace) -> DriverResult<Self::Connection>;

    /// Provision `request.masters()` master nodes and `request.workers()` worker nodes and push
    /// each of them onto `booted` as soon as it exists. Every node pushed onto `booted` is
    /// registered with the `Hardware` object, even if this function later returns an error, so
    /// that tearing down the `Hardware` object releases it. A node that cannot be registered is
    /// destroyed immediately.
    fn boot_nodes(
        &self,
        conn: &mut Self::Connection,
        request: &BootRequest<'_>,
        booted: &mut Vec<Box<dyn Node>>,
    ) -> DriverResult<()>;
}

/// Everything a [`Provider`] needs to know to boot a batch of nodes.
#[derive(Debug, Clone, Copy)]
pub struct BootRequest<'a> {
    masters: usize,
    workers: usize,
    offset: usize,
    workspace: &'a Workspace,
    credentials: &'a Credentials,
}

impl<'a> BootRequest<'a> {
    pub fn new(
        masters: usize,
        workers: usize,
        offset: usize,
        workspace: &'a Workspace,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            masters,
            workers,
            offset,
            workspace,
            credentials,
        }
    }

    pub fn masters(&self) -> usize {
        self.masters
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The index offset used to keep node names unique across repeated boots.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn workspace(&self) -> &'a Workspace {
        self.workspace
    }

    /// The credentials whose public key must be authorized on every booted node.
    pub fn credentials(&self) -> &'a Credentials {
        self.credentials
    }

    /// The roles to boot, masters first, in the order nodes are expected to be created.
    pub fn roles(&self) -> impl Iterator<Item = (NodeRole, usize)> {
        let offset = self.offset;
        (0..self.masters)
            .map(move |i| (NodeRole::Master, i + offset))
            .chain((0..self.workers).map(move |i| (NodeRole::Worker, i + offset)))
    }

    /// The conventional name for the node of `role` at `index`, e.g. `demo-1-worker-3`.
    pub fn node_name(&self, role: &NodeRole, index: usize) -> String {
        format!("{}-{}-{}", self.workspace.name(), role, index)
    }
}

/// A [`Distro`] supplies the two plays that bring freshly booted machines of one operating system
/// to a state where the cluster can be installed.
pub trait Distro {
    fn name(&self) -> &str;

    /// Waits until every node accepts connections.
    fn wait_for_connection_play(&self) -> Play;

    /// Installs and configures the packages the cluster needs.
    fn bootstrap_play(&self) -> Play;
}
