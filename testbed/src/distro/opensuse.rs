use super::{kernel_tasks, wait_for_connection_play};
use serde_json::json;
use testbed_hardware::{Distro, Play};

pub(super) const NAME: &str = "opensuse-leap";

const PACKAGES: &[&str] = &[
    "containerd",
    "conntrack-tools",
    "ethtool",
    "socat",
    "lvm2",
    "python3",
];

/// openSUSE Leap, refreshed and updated with zypper.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSuseLeap;

impl Distro for OpenSuseLeap {
    fn name(&self) -> &str {
        NAME
    }

    fn wait_for_connection_play(&self) -> Play {
        wait_for_connection_play()
    }

    fn bootstrap_play(&self) -> Play {
        let mut play = Play::new("bootstrap-opensuse-leap")
            .become_root(true)
            .task(json!({
                "name": "Refresh repositories",
                "community.general.zypper_repository": {"repo": "*", "runrefresh": true},
            }))
            .task(json!({
                "name": "Update all packages",
                "community.general.zypper": {"name": "*", "state": "latest", "type": "package"},
            }))
            .task(json!({
                "name": "Install cluster prerequisites",
                "community.general.zypper": {"name": PACKAGES, "state": "present"},
            }))
            .task(json!({
                "name": "Enable containerd",
                "systemd": {"name": "containerd", "enabled": true, "state": "started"},
            }));
        play.tasks.extend(kernel_tasks());
        play.task(json!({
            "name": "Check whether a reboot is needed",
            "command": "zypper needs-rebooting",
            "register": "needs_reboot",
            "changed_when": false,
            "failed_when": "needs_reboot.rc not in [0, 102]",
        }))
        .task(json!({
            "name": "Reboot",
            "reboot": {},
            "when": "needs_reboot.rc == 102",
        }))
    }
}
