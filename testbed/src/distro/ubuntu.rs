use super::{kernel_tasks, wait_for_connection_play};
use serde_json::json;
use testbed_hardware::{Distro, Play};

pub(super) const NAME: &str = "ubuntu";

const PACKAGES: &[&str] = &["containerd", "conntrack", "ethtool", "socat", "lvm2"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Ubuntu;

impl Distro for Ubuntu {
    fn name(&self) -> &str {
        NAME
    }

    fn wait_for_connection_play(&self) -> Play {
        wait_for_connection_play()
    }

    fn bootstrap_play(&self) -> Play {
        let mut play = Play::new("bootstrap-ubuntu")
            .become_root(true)
            .task(json!({
                "name": "Upgrade all packages",
                "apt": {"update_cache": true, "upgrade": "dist"},
            }))
            .task(json!({
                "name": "Install cluster prerequisites",
                "apt": {"name": PACKAGES, "state": "present"},
            }))
            .task(json!({
                "name": "Enable containerd",
                "systemd": {"name": "containerd", "enabled": true, "state": "started"},
            }));
        play.tasks.extend(kernel_tasks());
        play.task(json!({
            "name": "Check whether a reboot is needed",
            "stat": {"path": "/var/run/reboot-required"},
            "register": "reboot_required",
        }))
        .task(json!({
            "name": "Reboot",
            "reboot": {},
            "when": "reboot_required.stat.exists",
        }))
    }
}
