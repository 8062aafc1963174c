/*!

The TOML file that describes a testbed run.

```toml
workspace_root = "/var/tmp/testbed"
name = "demo-1"
distro = "opensuse-leap"
masters = 1
workers = 2

[provider]
kind = "static"
hosts = [
    { address = "10.0.0.10", user = "root" },
    { address = "10.0.0.11", user = "root" },
    { address = "10.0.0.12", user = "root" },
]

[ansible]
extra_plays = ["plays/rook.yaml"]

[services]
kubeconfig = "/var/tmp/testbed/demo-1/kubeconfig"
manifests = ["manifests/object-store.yaml"]
```

!*/

use crate::ansible::DEFAULT_PROGRAM;
use crate::error::{self, Result};
use crate::kubernetes::{DEFAULT_INTERVAL, DEFAULT_ITERATIONS, DEFAULT_NAMESPACE, DEFAULT_SERVICES};
use crate::provider::StaticHost;
use serde::Deserialize;
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use testbed_hardware::known_hosts::{KnownHostsFile, SshKeygen};
use testbed_hardware::{KnownHosts, Play};

/// Prefix of generated workspace names when no `name` is configured.
pub const DEFAULT_WORKSPACE_PREFIX: &str = "testbed";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// The directory the workspace directory is created in.
    pub workspace_root: PathBuf,

    /// The workspace name. A unique name is generated when this is not set.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_distro")]
    pub distro: String,

    #[serde(default = "default_masters")]
    pub masters: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,

    pub provider: ProviderSettings,

    #[serde(default)]
    pub ansible: AnsibleSettings,

    #[serde(default)]
    pub services: ServiceSettings,
}

fn default_distro() -> String {
    String::from("opensuse-leap")
}

fn default_masters() -> usize {
    1
}

fn default_workers() -> usize {
    2
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProviderSettings {
    Static {
        hosts: Vec<StaticHost>,
    },
    Exec {
        boot_command: String,
        #[serde(default)]
        destroy_command: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnsibleSettings {
    pub program: PathBuf,

    /// Playbooks that run, in order, after the nodes have been prepared.
    pub extra_plays: Vec<PathBuf>,

    /// A known-hosts file to clean instead of the user's default one.
    pub known_hosts: Option<PathBuf>,
}

impl Default for AnsibleSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            extra_plays: Vec::new(),
            known_hosts: None,
        }
    }
}

impl AnsibleSettings {
    /// Reads every play of every `extra_plays` playbook.
    pub fn load_extra_plays(&self) -> Result<Vec<Play>> {
        let mut plays = Vec::new();
        for path in &self.extra_plays {
            plays.extend(load_playbook(path)?);
        }
        Ok(plays)
    }

    /// The store stale host keys are removed from.
    pub fn known_hosts_store(&self) -> Box<dyn KnownHosts> {
        match &self.known_hosts {
            Some(path) => Box::new(KnownHostsFile::new(path)),
            None => Box::new(SshKeygen::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSettings {
    /// Service verification is skipped when there is no kubeconfig.
    pub kubeconfig: Option<PathBuf>,
    pub namespace: String,
    pub names: Vec<String>,
    pub iterations: u32,
    pub interval_secs: u64,

    /// Manifests applied before waiting for services.
    pub manifests: Vec<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            names: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
            iterations: DEFAULT_ITERATIONS,
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            manifests: Vec::new(),
        }
    }
}

impl ServiceSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Settings {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).context(error::ReadConfigSnafu { path })?;
        toml::from_str(&contents).context(error::ParseConfigSnafu { path })
    }
}

impl FromStr for Settings {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// Reads a YAML playbook, which is a list of plays.
pub fn load_playbook<P: AsRef<Path>>(path: P) -> Result<Vec<Play>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).context(error::ReadPlaybookSnafu { path })?;
    serde_yaml::from_str(&contents).context(error::ParsePlaybookSnafu { path })
}

#[cfg(test)]
mod test {
    use super::{load_playbook, ProviderSettings, Settings};
    use crate::kubernetes::DEFAULT_SERVICES;
    use crate::provider::StaticHost;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn minimal_static_config() {
        let settings: Settings = r#"
            workspace_root = "/var/tmp/testbed"

            [provider]
            kind = "static"
            hosts = [{ address = "10.0.0.10" }, { address = "10.0.0.11", user = "sles" }]
        "#
        .parse()
        .unwrap();
        assert_eq!(settings.workspace_root, PathBuf::from("/var/tmp/testbed"));
        assert_eq!(settings.name, None);
        assert_eq!(settings.distro, "opensuse-leap");
        assert_eq!((settings.masters, settings.workers), (1, 2));
        assert_eq!(
            settings.provider,
            ProviderSettings::Static {
                hosts: vec![
                    StaticHost {
                        address: "10.0.0.10".to_string(),
                        user: None
                    },
                    StaticHost {
                        address: "10.0.0.11".to_string(),
                        user: Some("sles".to_string())
                    },
                ]
            }
        );
        assert_eq!(settings.ansible.program, PathBuf::from("ansible-playbook"));
        assert_eq!(settings.services.namespace, "rook-ceph");
        assert_eq!(settings.services.names.len(), DEFAULT_SERVICES.len());
        assert_eq!(settings.services.iterations, 10);
        assert!(settings.services.kubeconfig.is_none());
    }

    #[test]
    fn full_exec_config() {
        let settings: Settings = r#"
            workspace_root = "/srv/testbed"
            name = "demo-1"
            distro = "ubuntu"
            masters = 3
            workers = 0

            [provider]
            kind = "exec"
            boot_command = "./boot.sh"
            destroy_command = "./destroy.sh"

            [ansible]
            program = "/opt/ansible/bin/ansible-playbook"
            extra_plays = ["rook.yaml"]
            known_hosts = "/srv/testbed/known_hosts"

            [services]
            kubeconfig = "/srv/testbed/kubeconfig"
            names = ["rook-ceph-rgw-my-store"]
            iterations = 30
            interval_secs = 2
            manifests = ["object-store.yaml"]
        "#
        .parse()
        .unwrap();
        assert_eq!(settings.name.as_deref(), Some("demo-1"));
        assert_eq!(settings.masters, 3);
        assert!(matches!(
            settings.provider,
            ProviderSettings::Exec { ref destroy_command, .. } if destroy_command == "./destroy.sh"
        ));
        assert_eq!(settings.ansible.extra_plays, vec![PathBuf::from("rook.yaml")]);
        assert_eq!(settings.services.namespace, "rook-ceph");
        assert_eq!(settings.services.names, vec!["rook-ceph-rgw-my-store"]);
        assert_eq!(settings.services.interval().as_secs(), 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(r#"
            workspace_root = "/tmp"
            wrokers = 3
            [provider]
            kind = "static"
            hosts = []
        "#
        .parse::<Settings>()
        .is_err());
        assert!(r#"
            workspace_root = "/tmp"
            [provider]
            kind = "cloud"
        "#
        .parse::<Settings>()
        .is_err());
    }

    #[test]
    fn reads_playbook_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rook.yaml");
        std::fs::write(
            &path,
            r#"
- name: install rook
  hosts: master
  become: true
  tasks:
    - name: Apply the operator
      command: kubectl apply -f /tmp/operator.yaml
- name: label workers
  hosts: worker
"#,
        )
        .unwrap();
        let plays = load_playbook(&path).unwrap();
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0].hosts, "master");
        assert!(plays[0].become_root);
        assert_eq!(plays[0].tasks[0]["command"], "kubectl apply -f /tmp/operator.yaml");
        assert!(plays[1].tasks.is_empty());

        assert!(load_playbook(dir.path().join("missing.yaml")).is_err());
    }
}
