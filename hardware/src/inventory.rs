use crate::node::{NodeInfo, NodeRole};
use crate::registry::NodeRegistry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const STRICT_HOST_KEY_CHECKING_OFF: &str = "-o StrictHostKeyChecking=no";
const PYTHON_INTERPRETER: &str = "/usr/bin/python3";

/// The connection parameters that every host of an inventory shares. Serializes to the variable
/// names Ansible expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionVars {
    #[serde(rename = "ansible_ssh_private_key_file")]
    pub private_key_file: PathBuf,
    #[serde(rename = "ansible_host_key_checking")]
    pub host_key_checking: bool,
    #[serde(rename = "ansible_ssh_host_key_checking")]
    pub ssh_host_key_checking: bool,
    #[serde(rename = "ansible_scp_extra_args")]
    pub scp_extra_args: String,
    #[serde(rename = "ansible_ssh_extra_args")]
    pub ssh_extra_args: String,
    #[serde(rename = "ansible_python_interpreter")]
    pub python_interpreter: String,
}

impl ConnectionVars {
    /// Key-based access with `private_key_file` and host key checking disabled everywhere.
    pub fn new(private_key_file: PathBuf) -> Self {
        Self {
            private_key_file,
            host_key_checking: false,
            ssh_host_key_checking: false,
            scp_extra_args: STRICT_HOST_KEY_CHECKING_OFF.to_string(),
            ssh_extra_args: STRICT_HOST_KEY_CHECKING_OFF.to_string(),
            python_interpreter: PYTHON_INTERPRETER.to_string(),
        }
    }
}

/// The hosts an executor targets, in registration order, together with their shared connection
/// variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    hosts: Vec<NodeInfo>,
    vars: ConnectionVars,
}

impl Inventory {
    pub fn new(hosts: Vec<NodeInfo>, vars: ConnectionVars) -> Self {
        Self { hosts, vars }
    }

    /// Snapshots every node of `registry`.
    pub fn from_registry(registry: &NodeRegistry, vars: ConnectionVars) -> Self {
        Self::new(registry.infos(), vars)
    }

    pub fn hosts(&self) -> &[NodeInfo] {
        &self.hosts
    }

    pub fn vars(&self) -> &ConnectionVars {
        &self.vars
    }

    /// The distinct roles of the hosts, in order of first appearance.
    pub fn roles(&self) -> Vec<&NodeRole> {
        let mut roles: Vec<&NodeRole> = Vec::new();
        for host in &self.hosts {
            if !roles.contains(&&host.role) {
                roles.push(&host.role);
            }
        }
        roles
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
