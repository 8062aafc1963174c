/*!

The [`Distro`]s a testbed can prepare.

!*/

mod opensuse;
mod ubuntu;

pub use opensuse::OpenSuseLeap;
pub use ubuntu::Ubuntu;

use serde_json::json;
use testbed_hardware::{Distro, Play};

/// The names accepted by [`from_name`].
pub const DISTROS: &[&str] = &[opensuse::NAME, ubuntu::NAME];

/// How long nodes get to start accepting ssh connections.
pub const CONNECTION_TIMEOUT_SECS: u64 = 600;

/// Looks up a distro by the name used in configuration files.
pub fn from_name(name: &str) -> Option<Box<dyn Distro>> {
    match name {
        opensuse::NAME => Some(Box::new(OpenSuseLeap)),
        ubuntu::NAME => Some(Box::new(Ubuntu)),
        _ => None,
    }
}

/// Waits for every node over a raw connection, so that nodes without python yet still succeed,
/// and gathers facts once they are up.
pub(crate) fn wait_for_connection_play() -> Play {
    Play::new("wait-for-connection")
        .task(json!({
            "name": "Wait for the node to accept connections",
            "wait_for_connection": {
                "delay": 5,
                "timeout": CONNECTION_TIMEOUT_SECS,
            },
        }))
        .task(json!({
            "name": "Gather facts",
            "setup": {},
        }))
}

/// Kernel settings every kubernetes node needs, whatever the distro.
pub(crate) fn kernel_tasks() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": "Disable swap",
            "command": "swapoff -a",
            "when": "ansible_swaptotal_mb > 0",
        }),
        json!({
            "name": "Load br_netfilter",
            "community.general.modprobe": {"name": "br_netfilter", "state": "present"},
        }),
        json!({
            "name": "Persist br_netfilter",
            "copy": {"dest": "/etc/modules-load.d/br_netfilter.conf", "content": "br_netfilter\n"},
        }),
        json!({
            "name": "Let iptables see bridged traffic",
            "ansible.posix.sysctl": {
                "name": "net.bridge.bridge-nf-call-iptables",
                "value": "1",
                "sysctl_set": true,
            },
        }),
        json!({
            "name": "Enable ip forwarding",
            "ansible.posix.sysctl": {
                "name": "net.ipv4.ip_forward",
                "value": "1",
                "sysctl_set": true,
            },
        }),
    ]
}

#[cfg(test)]
mod test {
    use super::{from_name, DISTROS};

    #[test]
    fn every_listed_distro_resolves() {
        for name in DISTROS {
            let distro = from_name(name).unwrap();
            assert_eq!(distro.name(), *name);
            let wait = distro.wait_for_connection_play();
            assert_eq!(wait.name, "wait-for-connection");
            assert!(!wait.gather_facts);
            let bootstrap = distro.bootstrap_play();
            assert!(bootstrap.become_root);
            assert!(!bootstrap.tasks.is_empty());
        }
        assert!(from_name("windows").is_none());
    }

    #[test]
    fn wait_uses_connection_timeout() {
        let play = from_name("ubuntu").unwrap().wait_for_connection_play();
        assert_eq!(play.tasks[0]["wait_for_connection"]["timeout"], 600);
    }
}
