use log::info;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use testbed_hardware::{
    BootRequest, DriverError, DriverResult, IntoDriverError, Node, NodeRole, Provider, Workspace,
};

/// A machine that already exists and accepts the run's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticHost {
    pub address: String,
    #[serde(default)]
    pub user: Option<String>,
}

/// Boots nodes by assigning them hosts from a fixed list, in order. The hosts must already
/// authorize the run's public key.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    hosts: Vec<StaticHost>,
}

impl StaticProvider {
    pub fn new(hosts: Vec<StaticHost>) -> Self {
        Self { hosts }
    }
}

/// The hosts of a [`StaticProvider`] that are not assigned to a node. Destroyed nodes give their
/// host back.
#[derive(Debug, Clone, Default)]
pub struct StaticPool {
    free: Rc<RefCell<VecDeque<StaticHost>>>,
}

impl StaticPool {
    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }
}

impl Provider for StaticProvider {
    type Connection = StaticPool;

    fn name(&self) -> &str {
        "static"
    }

    fn connect(&self, workspace: &Workspace) -> DriverResult<Self::Connection> {
        if self.hosts.is_empty() {
            return Err(DriverError::new_with_context(
                "The static provider was not given any hosts",
            ));
        }
        info!(
            "Static pool of {} host(s) for workspace '{}'",
            self.hosts.len(),
            workspace.name()
        );
        Ok(StaticPool {
            free: Rc::new(RefCell::new(self.hosts.iter().cloned().collect())),
        })
    }

    fn boot_nodes(
        &self,
        conn: &mut Self::Connection,
        request: &BootRequest<'_>,
        booted: &mut Vec<Box<dyn Node>>,
    ) -> DriverResult<()> {
        for (role, index) in request.roles() {
            let name = request.node_name(&role, index);
            let host = conn.free.borrow_mut().pop_front().context(format!(
                "The static pool ran out of hosts while booting '{}'",
                name
            ))?;
            info!("Assigning '{}' to node '{}'", host.address, name);
            booted.push(Box::new(StaticNode {
                name,
                role,
                host,
                pool: conn.free.clone(),
            }));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct StaticNode {
    name: String,
    role: NodeRole,
    host: StaticHost,
    pool: Rc<RefCell<VecDeque<StaticHost>>>,
}

impl Node for StaticNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &NodeRole {
        &self.role
    }

    fn ssh_address(&self) -> &str {
        &self.host.address
    }

    fn ssh_user(&self) -> Option<&str> {
        self.host.user.as_deref()
    }

    fn destroy(&mut self) -> DriverResult<()> {
        info!(
            "Releasing '{}' from node '{}' back to the static pool",
            self.host.address, self.name
        );
        self.pool.borrow_mut().push_back(self.host.clone());
        Ok(())
    }
}
