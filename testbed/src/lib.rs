/*!

`testbed` binds the [`testbed_hardware`] lifecycle to real tools: an Ansible executor, the
operating system plays for the supported distros, providers for pre-provisioned hosts and for
external provisioning scripts, and Kubernetes service verification. [`harness`] strings them
together the way the `testbed` command line tool runs them.

!*/

pub mod ansible;
pub mod config;
pub mod distro;
mod error;
pub mod harness;
pub mod kubernetes;
pub mod provider;

pub use error::{Error, Result};
