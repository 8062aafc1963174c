use crate::driver::DriverResult;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The function of a node within the provisioned cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeRole {
    Master,
    Worker,
    Other(String),
}

impl NodeRole {
    pub fn as_str(&self) -> &str {
        match self {
            NodeRole::Master => "master",
            NodeRole::Worker => "worker",
            NodeRole::Other(role) => role.as_str(),
        }
    }
}

impl Display for NodeRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

impl From<&str> for NodeRole {
    fn from(s: &str) -> Self {
        match s {
            "master" => NodeRole::Master,
            "worker" => NodeRole::Worker,
            other => NodeRole::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeRole {
    fn from(s: String) -> Self {
        NodeRole::from(s.as_str())
    }
}

impl From<NodeRole> for String {
    fn from(role: NodeRole) -> Self {
        role.as_str().to_string()
    }
}

/// One provisioned machine. Providers implement [`Node`] for whatever handle they keep for the
/// machines they boot.
///
/// A node is owned by exactly one [`NodeRegistry`](crate::NodeRegistry) and `destroy` is called at
/// most once for each successful removal.
pub trait Node: Debug {
    /// The name of the node, unique within one `Hardware` object.
    fn name(&self) -> &str;

    fn role(&self) -> &NodeRole;

    /// The address (IP or resolvable host name) used to reach the node over ssh.
    fn ssh_address(&self) -> &str;

    /// The remote user to log in as, if it differs from the configuration-management default.
    fn ssh_user(&self) -> Option<&str> {
        None
    }

    /// Release every provider-side resource held by this node.
    fn destroy(&mut self) -> DriverResult<()>;

    /// An owned snapshot of the node's identity.
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: self.name().to_string(),
            role: self.role().clone(),
            address: self.ssh_address().to_string(),
            user: self.ssh_user().map(str::to_string),
        }
    }
}

/// A detached copy of a [`Node`]'s identity. Role queries and inventories hand these out so that
/// callers never hold on to the nodes themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub role: NodeRole,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}
