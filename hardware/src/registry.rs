use crate::error::{self, Error, Result};
use crate::known_hosts::KnownHosts;
use crate::node::{Node, NodeInfo, NodeRole};
use log::{error, info};
use snafu::{ensure, OptionExt, ResultExt};

/// Owns the nodes of one `Hardware` object.
///
/// Every successful `add` or `remove` bumps a generation counter which executors use to tell
/// whether the inventory they were built from is still current.
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: Vec<Box<dyn Node>>,
    generation: u64,
    known_hosts: Box<dyn KnownHosts>,
}

impl NodeRegistry {
    pub fn new(known_hosts: Box<dyn KnownHosts>) -> Self {
        Self {
            nodes: Vec::new(),
            generation: 0,
            known_hosts,
        }
    }

    /// Registers `node` after removing any stale host key for its address. A node that cannot be
    /// registered is destroyed.
    pub fn add(&mut self, mut node: Box<dyn Node>) -> Result<()> {
        if let Err(e) = self.admit(node.as_ref()) {
            info!("Destroying rejected node '{}'", node.name());
            if let Err(destroy) = node.destroy() {
                error!("Unable to destroy rejected node '{}': {}", node.name(), destroy);
            }
            return Err(e);
        }
        self.nodes.push(node);
        self.generation += 1;
        Ok(())
    }

    fn admit(&mut self, node: &dyn Node) -> Result<()> {
        ensure!(
            !self.contains(node.name()),
            error::DuplicateNodeSnafu { name: node.name() }
        );
        info!("Adding node '{}' ({})", node.name(), node.role());
        self.known_hosts
            .forget(node.ssh_address())
            .context(error::ForgetHostKeySnafu {
                address: node.ssh_address(),
            })
    }

    /// Destroys the node named `name` and then evicts it. If destroying fails, the node stays
    /// registered so that a later teardown can try again.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let index = self
            .position(name)
            .context(error::UnknownNodeSnafu { name })?;
        info!("Removing node '{}'", name);
        self.nodes[index]
            .destroy()
            .context(error::DestroyNodeSnafu { name })?;
        self.nodes.remove(index);
        self.generation += 1;
        Ok(())
    }

    /// Removes every node, continuing past failures. Each node is destroyed at most once; the
    /// nodes that could not be destroyed remain registered and are reported together.
    pub fn destroy_all(&mut self) -> Result<()> {
        let mut errors = Vec::new();
        for name in self.names() {
            if let Err(e) = self.remove(&name) {
                error!("{}", e);
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown { errors })
        }
    }

    /// A fresh snapshot of the nodes with `role`, in the order they were added.
    pub fn by_role(&self, role: &NodeRole) -> Vec<NodeInfo> {
        self.nodes
            .iter()
            .filter(|node| node.role() == role)
            .map(|node| node.info())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Node> {
        self.nodes
            .iter()
            .find(|node| node.name() == name)
            .map(|node| node.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The names of all nodes in the order they were added.
    pub fn names(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.name().to_string()).collect()
    }

    /// Snapshots of all nodes in the order they were added.
    pub fn infos(&self) -> Vec<NodeInfo> {
        self.nodes.iter().map(|node| node.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Changes whenever the set of nodes changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name() == name)
    }
}
