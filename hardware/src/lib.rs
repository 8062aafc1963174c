/*!

The `testbed-hardware` library owns the lifecycle of the machines that a testbed run provisions.
A [`Hardware`] object opens a connection through a [`Provider`], generates the [`Credentials`]
that are injected into every machine, keeps the booted [`Node`]s in a [`NodeRegistry`], and runs
declarative [`Play`]s against them through a cached executor (see [`PlayRunner`]).

You plug in a cloud (or anything else that can hand out machines) by implementing [`Provider`] and
[`Node`], and a configuration-management tool by implementing [`ExecutorBuilder`] and
[`PlayExecutor`]. Operating system specific plays come from a [`Distro`].

!*/

mod credentials;
pub mod driver;
mod error;
mod hardware;
mod inventory;
pub mod known_hosts;
mod node;
mod play;
mod registry;
mod runner;
mod workspace;

pub use credentials::{Credentials, PRIVATE_KEY_FILENAME};
pub use driver::{BootRequest, Distro, DriverError, DriverResult, IntoDriverError, Provider};
pub use error::{Error, Result};
pub use hardware::Hardware;
pub use inventory::{ConnectionVars, Inventory};
pub use known_hosts::KnownHosts;
pub use node::{Node, NodeInfo, NodeRole};
pub use play::{HostReport, HostStatus, Play, PlayResult, TaskOutput, TaskStatus};
pub use registry::NodeRegistry;
pub use runner::{ExecutorBuilder, PlayExecutor, PlayRunner};
pub use workspace::Workspace;
