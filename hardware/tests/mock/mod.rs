/*!

Mock implementations of the [`Provider`], [`Node`], [`ExecutorBuilder`] and [`KnownHosts`] traits
that make it possible to test the hardware lifecycle without a cloud or a configuration-management
tool. Every mock records what happened to it in a shared [`Journal`].

!*/

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use testbed_hardware::{
    BootRequest, Distro, DriverError, DriverResult, ExecutorBuilder, HostReport, HostStatus,
    Inventory, KnownHosts, Node, NodeRole, Play, PlayExecutor, PlayResult, Provider, Workspace,
};

/// Everything the mocks observed, shared between the test and the mocks.
#[derive(Debug, Default)]
pub struct Journal {
    /// Names of destroyed nodes, in order.
    pub destroyed: Vec<String>,
    /// Names of nodes a destroy was attempted on, including failed attempts.
    pub destroy_attempts: Vec<String>,
    /// Addresses that were forgotten by the known-hosts store, in order.
    pub forgotten: Vec<String>,
    /// The host names of every inventory an executor was built for.
    pub inventories: Vec<Vec<String>>,
    /// `(executor id, play name)` for every play that was run.
    pub runs: Vec<(usize, String)>,
    /// Hosts that report as unreachable.
    pub unreachable: BTreeSet<String>,
    /// Hosts that report as failed.
    pub failed: BTreeSet<String>,
    /// Nodes whose destroy operation fails.
    pub undestroyable: BTreeSet<String>,
}

pub type SharedJournal = Rc<RefCell<Journal>>;

#[derive(Debug)]
pub struct MockNode {
    name: String,
    role: NodeRole,
    address: String,
    journal: SharedJournal,
}

impl MockNode {
    pub fn boxed(name: &str, role: NodeRole, journal: &SharedJournal) -> Box<dyn Node> {
        Box::new(Self {
            name: name.to_string(),
            role,
            address: format!("{}.mock", name),
            journal: journal.clone(),
        })
    }
}

impl Node for MockNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &NodeRole {
        &self.role
    }

    fn ssh_address(&self) -> &str {
        &self.address
    }

    fn destroy(&mut self) -> DriverResult<()> {
        let mut journal = self.journal.borrow_mut();
        journal.destroy_attempts.push(self.name.clone());
        if journal.undestroyable.contains(&self.name) {
            return Err(DriverError::new_with_context(format!(
                "instance '{}' is stuck",
                self.name
            )));
        }
        journal.destroyed.push(self.name.clone());
        Ok(())
    }
}

/// Boots `MockNode`s. `fail_after` makes the provider give up after booting that many nodes of a
/// request.
pub struct MockProvider {
    pub journal: SharedJournal,
    pub fail_connect: bool,
    pub fail_after: Option<usize>,
}

pub struct MockConnection {
    pub boots: usize,
}

impl Provider for MockProvider {
    type Connection = MockConnection;

    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&self, _workspace: &Workspace) -> DriverResult<Self::Connection> {
        if self.fail_connect {
            Err(DriverError::new_with_context("the endpoint refused"))
        } else {
            Ok(MockConnection { boots: 0 })
        }
    }

    fn boot_nodes(
        &self,
        conn: &mut Self::Connection,
        request: &BootRequest<'_>,
        booted: &mut Vec<Box<dyn Node>>,
    ) -> DriverResult<()> {
        conn.boots += 1;
        for (role, index) in request.roles() {
            if Some(booted.len()) == self.fail_after {
                return Err(DriverError::new_with_context("quota exceeded"));
            }
            let name = request.node_name(&role, index);
            booted.push(MockNode::boxed(&name, role, &self.journal));
        }
        Ok(())
    }
}

pub struct MockBuilder {
    pub journal: SharedJournal,
}

pub struct MockExecutor {
    id: usize,
    hosts: Vec<String>,
    journal: SharedJournal,
}

impl ExecutorBuilder for MockBuilder {
    type Executor = MockExecutor;

    fn build(&self, inventory: &Inventory) -> DriverResult<Self::Executor> {
        let hosts: Vec<String> = inventory.hosts().iter().map(|h| h.name.clone()).collect();
        let mut journal = self.journal.borrow_mut();
        journal.inventories.push(hosts.clone());
        Ok(MockExecutor {
            id: journal.inventories.len(),
            hosts,
            journal: self.journal.clone(),
        })
    }
}

impl PlayExecutor for MockExecutor {
    fn run_play(&self, play: &Play) -> DriverResult<PlayResult> {
        let mut journal = self.journal.borrow_mut();
        journal.runs.push((self.id, play.name.clone()));
        let reports: Vec<HostReport> = self
            .hosts
            .iter()
            .map(|host| {
                let status = if journal.unreachable.contains(host) {
                    HostStatus::Unreachable
                } else if journal.failed.contains(host) {
                    HostStatus::Failed
                } else {
                    HostStatus::Ok
                };
                HostReport::new(host.as_str(), status)
            })
            .collect();
        Ok(PlayResult::new(play.name.as_str(), reports))
    }
}

#[derive(Debug)]
pub struct MemoryKnownHosts {
    pub journal: SharedJournal,
}

impl KnownHosts for MemoryKnownHosts {
    fn forget(&mut self, address: &str) -> DriverResult<()> {
        self.journal.borrow_mut().forgotten.push(address.to_string());
        Ok(())
    }
}

pub struct MockDistro;

impl Distro for MockDistro {
    fn name(&self) -> &str {
        "mock-linux"
    }

    fn wait_for_connection_play(&self) -> Play {
        Play::new("wait-for-connection")
    }

    fn bootstrap_play(&self) -> Play {
        Play::new("bootstrap").become_root(true)
    }
}
