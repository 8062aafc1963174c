/*!

Nodes are often re-created at an address that an earlier run already used, which leaves a stale
host key in the local known-hosts store and makes the next ssh connection fail. Every node that is
added to a [`NodeRegistry`](crate::NodeRegistry) is therefore first forgotten by a [`KnownHosts`]
store.

The store is injected so that tests (and parallel runs) do not have to touch the user's
`~/.ssh/known_hosts`.

!*/

use crate::driver::{DriverResult, IntoDriverError};
use log::{debug, trace};
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// A place where ssh remembers host keys.
pub trait KnownHosts: Debug {
    /// Remove every entry recorded for `address`.
    fn forget(&mut self, address: &str) -> DriverResult<()>;
}

/// Forgets host keys with `ssh-keygen -R`. This handles hashed entries, which is why it is the
/// default store.
#[derive(Debug, Clone)]
pub struct SshKeygen {
    program: PathBuf,
    file: Option<PathBuf>,
}

impl SshKeygen {
    /// Operates on the default known-hosts file of the current user.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ssh-keygen"),
            file: None,
        }
    }

    /// Operates on `file` instead of the default known-hosts file.
    pub fn with_file<P: Into<PathBuf>>(file: P) -> Self {
        Self {
            program: PathBuf::from("ssh-keygen"),
            file: Some(file.into()),
        }
    }
}

impl Default for SshKeygen {
    fn default() -> Self {
        Self::new()
    }
}

impl KnownHosts for SshKeygen {
    fn forget(&mut self, address: &str) -> DriverResult<()> {
        let mut command = Command::new(&self.program);
        command.arg("-R").arg(address);
        if let Some(file) = &self.file {
            command.arg("-f").arg(file);
        }
        let output = command
            .output()
            .context(format!("Unable to run '{}'", self.program.display()))?;
        // A missing known_hosts file or an unknown host is reported with a non-zero exit code,
        // neither of which matters to us.
        if !output.status.success() {
            debug!(
                "'ssh-keygen -R {}' exited with {}: {}",
                address,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Edits a plain-text known-hosts file in process. Hashed entries (`|1|...`) cannot be matched
/// and are left untouched.
#[derive(Debug, Clone)]
pub struct KnownHostsFile {
    path: PathBuf,
}

impl KnownHostsFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl KnownHosts for KnownHostsFile {
    fn forget(&mut self, address: &str) -> DriverResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let contents = fs::read_to_string(&self.path)
            .context(format!("Unable to read '{}'", self.path.display()))?;
        let kept: Vec<&str> = contents
            .lines()
            .filter(|line| !entry_matches(line, address))
            .collect();
        trace!(
            "Removed {} entries for '{}' from '{}'",
            contents.lines().count() - kept.len(),
            address,
            self.path.display()
        );
        let mut rewritten = kept.join("\n");
        if !rewritten.is_empty() {
            rewritten.push('\n');
        }
        fs::write(&self.path, rewritten)
            .context(format!("Unable to write '{}'", self.path.display()))
    }
}

/// Whether the known-hosts `line` has a host pattern for `address`, either bare or as
/// `[address]:port`.
fn entry_matches(line: &str, address: &str) -> bool {
    let mut fields = line.split_whitespace();
    let hosts = match fields.next() {
        Some(marker) if marker.starts_with('@') => fields.next(),
        first => first,
    };
    let hosts = match hosts {
        Some(hosts) if !hosts.starts_with('#') => hosts,
        _ => return false,
    };
    let bracketed = format!("[{}]:", address);
    hosts
        .split(',')
        .any(|host| host == address || host.starts_with(&bracketed))
}
