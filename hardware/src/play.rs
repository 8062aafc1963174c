use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A declarative, named set of configuration-management tasks that targets a group of hosts. The
/// field names follow Ansible's play syntax so that a `Play` can be written out as a playbook
/// as-is, and so that playbook files can be read into a `Play`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    pub name: String,

    /// The host pattern the play targets, `all` by default.
    #[serde(default = "all_hosts")]
    pub hosts: String,

    #[serde(default)]
    pub gather_facts: bool,

    #[serde(default, rename = "become")]
    pub become_root: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<serde_json::Value>,
}

fn all_hosts() -> String {
    String::from("all")
}

impl Play {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            hosts: all_hosts(),
            gather_facts: false,
            become_root: false,
            tasks: Vec::new(),
        }
    }

    pub fn hosts<S: Into<String>>(mut self, hosts: S) -> Self {
        self.hosts = hosts.into();
        self
    }

    pub fn gather_facts(mut self, gather_facts: bool) -> Self {
        self.gather_facts = gather_facts;
        self
    }

    pub fn become_root(mut self, become_root: bool) -> Self {
        self.become_root = become_root;
        self
    }

    pub fn task(mut self, task: serde_json::Value) -> Self {
        self.tasks.push(task);
        self
    }
}

/// The outcome of one task on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Ok,
    Changed,
    Skipped,
    Failed,
    Unreachable,
}

/// Task-level output kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The overall outcome of a play on one host. The ordering is from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Ok,
    Failed,
    Unreachable,
}

/// What an executor reports about one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub host: String,
    pub status: HostStatus,
    pub tasks: Vec<TaskOutput>,
}

impl HostReport {
    pub fn new<S: Into<String>>(host: S, status: HostStatus) -> Self {
        Self {
            host: host.into(),
            status,
            tasks: Vec::new(),
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<TaskOutput>) -> Self {
        self.tasks = tasks;
        self
    }
}

/// The outcome of running one [`Play`], with every targeted host in exactly one of three buckets:
/// succeeded, failed or unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayResult {
    play: String,
    host_ok: BTreeMap<String, Vec<TaskOutput>>,
    host_failed: BTreeMap<String, Vec<TaskOutput>>,
    host_unreachable: BTreeMap<String, Vec<TaskOutput>>,
}

impl PlayResult {
    /// Partitions `reports` by host. A host that is reported more than once ends up in the bucket
    /// of its worst status and keeps the task output of all of its reports.
    pub fn new<S, I>(play: S, reports: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = HostReport>,
    {
        let mut hosts: BTreeMap<String, (HostStatus, Vec<TaskOutput>)> = BTreeMap::new();
        for report in reports {
            let entry = hosts
                .entry(report.host)
                .or_insert_with(|| (report.status, Vec::new()));
            entry.0 = entry.0.max(report.status);
            entry.1.extend(report.tasks);
        }

        let mut result = Self {
            play: play.into(),
            host_ok: BTreeMap::new(),
            host_failed: BTreeMap::new(),
            host_unreachable: BTreeMap::new(),
        };
        for (host, (status, tasks)) in hosts {
            let bucket = match status {
                HostStatus::Ok => &mut result.host_ok,
                HostStatus::Failed => &mut result.host_failed,
                HostStatus::Unreachable => &mut result.host_unreachable,
            };
            bucket.insert(host, tasks);
        }
        result
    }

    /// The name of the play that produced this result.
    pub fn play(&self) -> &str {
        &self.play
    }

    pub fn host_ok(&self) -> &BTreeMap<String, Vec<TaskOutput>> {
        &self.host_ok
    }

    pub fn host_failed(&self) -> &BTreeMap<String, Vec<TaskOutput>> {
        &self.host_failed
    }

    pub fn host_unreachable(&self) -> &BTreeMap<String, Vec<TaskOutput>> {
        &self.host_unreachable
    }

    /// `true` when no host failed and every host was reachable.
    pub fn is_success(&self) -> bool {
        self.host_failed.is_empty() && self.host_unreachable.is_empty()
    }

    /// The status of `host`, or `None` if the play did not target it.
    pub fn status(&self, host: &str) -> Option<HostStatus> {
        if self.host_ok.contains_key(host) {
            Some(HostStatus::Ok)
        } else if self.host_failed.contains_key(host) {
            Some(HostStatus::Failed)
        } else if self.host_unreachable.contains_key(host) {
            Some(HostStatus::Unreachable)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::{HostReport, HostStatus, Play, PlayResult, TaskOutput, TaskStatus};
    use serde_json::json;

    fn task(name: &str, status: TaskStatus) -> TaskOutput {
        TaskOutput {
            task: name.to_string(),
            status,
            message: None,
        }
    }

    #[test]
    fn partitions_hosts() {
        let result = PlayResult::new(
            "bootstrap",
            vec![
                HostReport::new("a", HostStatus::Ok),
                HostReport::new("b", HostStatus::Failed),
                HostReport::new("c", HostStatus::Unreachable),
            ],
        );
        assert_eq!(result.play(), "bootstrap");
        assert_eq!(result.host_ok().keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(result.host_failed().keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(result.host_unreachable().keys().collect::<Vec<_>>(), vec!["c"]);
        assert!(!result.is_success());
        assert_eq!(result.status("d"), None);
    }

    #[test]
    fn repeated_host_keeps_worst_status() {
        let result = PlayResult::new(
            "wait",
            vec![
                HostReport::new("a", HostStatus::Unreachable)
                    .with_tasks(vec![task("ping", TaskStatus::Unreachable)]),
                HostReport::new("a", HostStatus::Ok).with_tasks(vec![task("facts", TaskStatus::Ok)]),
                HostReport::new("b", HostStatus::Ok),
            ],
        );
        assert_eq!(result.status("a"), Some(HostStatus::Unreachable));
        assert!(!result.host_ok().contains_key("a"));
        assert_eq!(result.host_unreachable()["a"].len(), 2);
        assert!(result.host_ok().contains_key("b"));
    }

    #[test]
    fn success_regardless_of_host_count() {
        assert!(PlayResult::new("empty", Vec::new()).is_success());
        let many = (0..5).map(|i| HostReport::new(format!("n{}", i), HostStatus::Ok));
        assert!(PlayResult::new("many", many).is_success());
    }

    #[test]
    fn play_reads_playbook_syntax() {
        let play: Play = serde_json::from_value(json!({
            "name": "install rook",
            "become": true,
            "tasks": [{"name": "ping", "ping": {}}]
        }))
        .unwrap();
        assert_eq!(play.hosts, "all");
        assert!(play.become_root);
        assert!(!play.gather_facts);
        assert_eq!(play.tasks.len(), 1);
    }
}
