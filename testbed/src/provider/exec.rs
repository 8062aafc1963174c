use super::driver_error_for_cmd_output;
use log::{debug, error, info};
use maplit::btreemap;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use testbed_hardware::{
    BootRequest, DriverError, DriverResult, IntoDriverError, Node, NodeRole, Provider, Workspace,
};

const DEFAULT_SHELL: &str = "sh";

/// Boots and destroys nodes by running shell commands, one invocation per node.
///
/// The boot command sees `TESTBED_NODE_NAME`, `TESTBED_NODE_ROLE`, `TESTBED_NODE_INDEX`,
/// `TESTBED_WORKSPACE`, `TESTBED_WORKSPACE_DIR`, `TESTBED_KEY_NAME`, `TESTBED_PUBLIC_KEY` and
/// `TESTBED_PRIVATE_KEY` and must print the address of the new node as the last non-empty line of
/// its stdout. The destroy command sees `TESTBED_NODE_NAME`, `TESTBED_NODE_ROLE`,
/// `TESTBED_NODE_ADDRESS` and `TESTBED_WORKSPACE`.
#[derive(Debug, Clone)]
pub struct ExecProvider {
    boot_command: String,
    destroy_command: String,
    shell: PathBuf,
}

impl ExecProvider {
    pub fn new<S1, S2>(boot_command: S1, destroy_command: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            boot_command: boot_command.into(),
            destroy_command: destroy_command.into(),
            shell: PathBuf::from(DEFAULT_SHELL),
        }
    }

    pub fn with_shell<P: Into<PathBuf>>(mut self, shell: P) -> Self {
        self.shell = shell.into();
        self
    }
}

/// What an [`ExecProvider`] remembers between boots.
#[derive(Debug, Clone)]
pub struct ExecSession {
    workspace: Workspace,
    booted: usize,
}

impl ExecSession {
    /// The number of nodes booted so far.
    pub fn booted(&self) -> usize {
        self.booted
    }
}

impl Provider for ExecProvider {
    type Connection = ExecSession;

    fn name(&self) -> &str {
        "exec"
    }

    fn connect(&self, workspace: &Workspace) -> DriverResult<Self::Connection> {
        if self.boot_command.trim().is_empty() {
            return Err(DriverError::new_with_context(
                "The exec provider needs a boot command",
            ));
        }
        Ok(ExecSession {
            workspace: workspace.clone(),
            booted: 0,
        })
    }

    fn boot_nodes(
        &self,
        conn: &mut Self::Connection,
        request: &BootRequest<'_>,
        booted: &mut Vec<Box<dyn Node>>,
    ) -> DriverResult<()> {
        let credentials = request.credentials();
        for (role, index) in request.roles() {
            let name = request.node_name(&role, index);
            info!("Booting node '{}'", name);
            let env: BTreeMap<&str, OsString> = btreemap! {
                "TESTBED_NODE_NAME" => OsString::from(&name),
                "TESTBED_NODE_ROLE" => OsString::from(role.as_str()),
                "TESTBED_NODE_INDEX" => OsString::from(index.to_string()),
                "TESTBED_WORKSPACE" => OsString::from(conn.workspace.name()),
                "TESTBED_WORKSPACE_DIR" => conn.workspace.working_dir().into(),
                "TESTBED_KEY_NAME" => OsString::from(credentials.key_name()),
                "TESTBED_PUBLIC_KEY" => OsString::from(credentials.public_key()),
                "TESTBED_PRIVATE_KEY" => credentials.private_key_path().into(),
            };
            let output = Command::new(&self.shell)
                .arg("-c")
                .arg(&self.boot_command)
                .envs(&env)
                .output()
                .context(format!("Unable to run the boot command for '{}'", name))?;
            let stdout = driver_error_for_cmd_output(output, &self.boot_command)?;
            let address = stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .map(str::to_string);
            let mut node = ExecNode {
                name,
                role,
                address: address.clone().unwrap_or_default(),
                destroy_command: self.destroy_command.clone(),
                shell: self.shell.clone(),
                workspace: conn.workspace.name().to_string(),
            };
            if address.is_none() {
                // The boot command succeeded, so it may have created something.
                if let Err(e) = node.destroy() {
                    error!("Unable to clean up after booting '{}': {}", node.name, e);
                }
                return Err(DriverError::new_with_context(format!(
                    "The boot command did not print an address for '{}'",
                    node.name
                )));
            }
            debug!("Node '{}' is at '{}'", node.name, node.address);
            conn.booted += 1;
            booted.push(Box::new(node));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ExecNode {
    name: String,
    role: NodeRole,
    address: String,
    destroy_command: String,
    shell: PathBuf,
    workspace: String,
}

impl Node for ExecNode {
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
        if self.destroy_command.trim().is_empty() {
            info!("No destroy command, leaving '{}' as it is", self.name);
            return Ok(());
        }
        info!("Destroying node '{}'", self.name);
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.destroy_command)
            .envs(btreemap! {
                "TESTBED_NODE_NAME" => self.name.as_str(),
                "TESTBED_NODE_ROLE" => self.role.as_str(),
                "TESTBED_NODE_ADDRESS" => self.address.as_str(),
                "TESTBED_WORKSPACE" => self.workspace.as_str(),
            })
            .output()
            .context(format!(
                "Unable to run the destroy command for '{}'",
                self.name
            ))?;
        driver_error_for_cmd_output(output, &self.destroy_command)?;
        Ok(())
    }
}
