/*!

An [`ExecutorBuilder`] and [`PlayExecutor`] backed by `ansible-playbook`.

The builder renders the inventory once per node set. The runner writes each play to its own
playbook file, runs it with the JSON stdout callback and turns the callback's `stats` and `plays`
sections into a [`PlayResult`].

!*/

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use testbed_hardware::{
    ConnectionVars, DriverError, DriverResult, ExecutorBuilder, HostReport, HostStatus,
    IntoDriverError, Inventory, Play, PlayExecutor, PlayResult, TaskOutput, TaskStatus,
};

pub const DEFAULT_PROGRAM: &str = "ansible-playbook";
pub const INVENTORY_FILENAME: &str = "inventory.yaml";
const PLAYS_DIR: &str = "plays";

/// Renders inventories into a working directory and hands out [`AnsibleRunner`]s for them.
#[derive(Debug, Clone)]
pub struct AnsibleBuilder {
    program: PathBuf,
    working_dir: PathBuf,
}

impl AnsibleBuilder {
    pub fn new<P: Into<PathBuf>>(working_dir: P) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            working_dir: working_dir.into(),
        }
    }

    /// Use `program` instead of `ansible-playbook` from the `PATH`.
    pub fn with_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.program = program.into();
        self
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.working_dir.join(INVENTORY_FILENAME)
    }
}

impl ExecutorBuilder for AnsibleBuilder {
    type Executor = AnsibleRunner;

    fn build(&self, inventory: &Inventory) -> DriverResult<Self::Executor> {
        let path = self.inventory_path();
        let rendered = render_inventory(inventory).context("Unable to render the inventory")?;
        fs::write(&path, rendered)
            .context(format!("Unable to write inventory '{}'", path.display()))?;
        info!(
            "Wrote inventory with {} host(s) to '{}'",
            inventory.hosts().len(),
            path.display()
        );
        Ok(AnsibleRunner {
            program: self.program.clone(),
            inventory: path,
            plays_dir: self.working_dir.join(PLAYS_DIR),
        })
    }
}

/// Runs plays with `ansible-playbook` against one rendered inventory.
#[derive(Debug, Clone)]
pub struct AnsibleRunner {
    program: PathBuf,
    inventory: PathBuf,
    plays_dir: PathBuf,
}

impl AnsibleRunner {
    pub fn inventory(&self) -> &Path {
        &self.inventory
    }

    fn write_playbook(&self, play: &Play) -> DriverResult<PathBuf> {
        fs::create_dir_all(&self.plays_dir).context(format!(
            "Unable to create directory '{}'",
            self.plays_dir.display()
        ))?;
        let path = self.plays_dir.join(format!("{}.yaml", slug(&play.name)));
        let rendered = serde_yaml::to_string(&[play])
            .context(format!("Unable to render play '{}'", play.name))?;
        fs::write(&path, rendered)
            .context(format!("Unable to write playbook '{}'", path.display()))?;
        Ok(path)
    }
}

impl PlayExecutor for AnsibleRunner {
    fn run_play(&self, play: &Play) -> DriverResult<PlayResult> {
        let playbook = self.write_playbook(play)?;
        info!("Running play '{}' from '{}'", play.name, playbook.display());
        let output = Command::new(&self.program)
            .arg("-i")
            .arg(&self.inventory)
            .arg(&playbook)
            .env("ANSIBLE_STDOUT_CALLBACK", "json")
            .env("ANSIBLE_HOST_KEY_CHECKING", "False")
            .env("ANSIBLE_RETRY_FILES_ENABLED", "False")
            .output()
            .context(format!("Unable to start '{}'", self.program.display()))?;

        // Host failures make ansible-playbook exit non-zero; the JSON still describes them.
        debug!(
            "'{}' exited with {} for play '{}'",
            self.program.display(),
            output.status,
            play.name
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!("ansible-playbook stdout:\n{}", stdout);
        parse_output(&play.name, &stdout).map_err(|e| {
            DriverError::new_with_source_and_context(
                format!(
                    "Unable to read the results of play '{}' ({}), stderr:\n{}",
                    play.name,
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
                e,
            )
        })
    }
}

#[derive(Serialize)]
struct InventoryFile<'a> {
    all: AllGroup<'a>,
}

#[derive(Serialize)]
struct AllGroup<'a> {
    vars: &'a ConnectionVars,
    hosts: BTreeMap<&'a str, HostVars<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<&'a str, ChildGroup<'a>>,
}

#[derive(Serialize)]
struct HostVars<'a> {
    ansible_host: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ansible_user: Option<&'a str>,
}

#[derive(Serialize)]
struct ChildGroup<'a> {
    hosts: BTreeMap<&'a str, BTreeMap<String, String>>,
}

/// Renders `inventory` as an Ansible YAML inventory. Every role becomes a group, so plays can
/// target `master` or `worker` as well as `all`.
pub fn render_inventory(inventory: &Inventory) -> Result<String, serde_yaml::Error> {
    let mut hosts = BTreeMap::new();
    let mut children: BTreeMap<&str, ChildGroup<'_>> = BTreeMap::new();
    for host in inventory.hosts() {
        hosts.insert(
            host.name.as_str(),
            HostVars {
                ansible_host: &host.address,
                ansible_user: host.user.as_deref(),
            },
        );
        children
            .entry(host.role.as_str())
            .or_insert_with(|| ChildGroup {
                hosts: BTreeMap::new(),
            })
            .hosts
            .insert(host.name.as_str(), BTreeMap::new());
    }
    serde_yaml::to_string(&InventoryFile {
        all: AllGroup {
            vars: inventory.vars(),
            hosts,
            children,
        },
    })
}

#[derive(Debug, Deserialize)]
struct PlaybookOutput {
    #[serde(default)]
    plays: Vec<PlayOutput>,
    #[serde(default)]
    stats: BTreeMap<String, HostStats>,
}

#[derive(Debug, Deserialize)]
struct PlayOutput {
    #[serde(default)]
    tasks: Vec<TaskOutputJson>,
}

#[derive(Debug, Deserialize)]
struct TaskOutputJson {
    task: TaskHeader,
    #[serde(default)]
    hosts: BTreeMap<String, HostTaskJson>,
}

#[derive(Debug, Deserialize)]
struct TaskHeader {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct HostTaskJson {
    #[serde(default)]
    changed: bool,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    skipped: bool,
    #[serde(default)]
    unreachable: bool,
    #[serde(default)]
    msg: Option<serde_json::Value>,
}

impl HostTaskJson {
    fn status(&self) -> TaskStatus {
        if self.unreachable {
            TaskStatus::Unreachable
        } else if self.failed {
            TaskStatus::Failed
        } else if self.skipped {
            TaskStatus::Skipped
        } else if self.changed {
            TaskStatus::Changed
        } else {
            TaskStatus::Ok
        }
    }

    fn message(&self) -> Option<String> {
        match &self.msg {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct HostStats {
    #[serde(default)]
    failures: u32,
    #[serde(default)]
    unreachable: u32,
}

impl HostStats {
    fn status(&self) -> HostStatus {
        if self.unreachable > 0 {
            HostStatus::Unreachable
        } else if self.failures > 0 {
            HostStatus::Failed
        } else {
            HostStatus::Ok
        }
    }
}

/// Parses the output of the JSON stdout callback. Anything ansible prints before the JSON document
/// (warnings, deprecation notices) is skipped.
pub fn parse_output(play: &str, stdout: &str) -> Result<PlayResult, serde_json::Error> {
    let output: PlaybookOutput = serde_json::from_str(json_document(stdout))?;

    let mut tasks: BTreeMap<String, Vec<TaskOutput>> = BTreeMap::new();
    let mut fallback: BTreeMap<String, HostStatus> = BTreeMap::new();
    for task in output.plays.iter().flat_map(|play| play.tasks.iter()) {
        for (host, result) in &task.hosts {
            let status = result.status();
            let worst = fallback.entry(host.clone()).or_insert(HostStatus::Ok);
            *worst = (*worst).max(match status {
                TaskStatus::Unreachable => HostStatus::Unreachable,
                TaskStatus::Failed => HostStatus::Failed,
                _ => HostStatus::Ok,
            });
            tasks.entry(host.clone()).or_default().push(TaskOutput {
                task: task.task.name.clone(),
                status,
                message: result.message(),
            });
        }
    }

    // The stats are authoritative since they account for ignored errors and rescues. Hosts that
    // only show up in task output fall back to their worst task.
    let mut reports = Vec::new();
    for (host, stats) in &output.stats {
        let host_tasks = tasks.remove(host).unwrap_or_default();
        reports.push(HostReport::new(host.as_str(), stats.status()).with_tasks(host_tasks));
    }
    for (host, host_tasks) in tasks {
        let status = fallback.get(&host).copied().unwrap_or(HostStatus::Ok);
        reports.push(HostReport::new(host, status).with_tasks(host_tasks));
    }
    Ok(PlayResult::new(play, reports))
}

/// The JSON document in `stdout`, which starts at the first line that opens an object. Warnings
/// can contain braces of their own, so a line has to start with one to count.
fn json_document(stdout: &str) -> &str {
    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        if line.starts_with('{') {
            return &stdout[offset..];
        }
        offset += line.len();
    }
    stdout
}

/// A file name friendly version of `name`.
fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        String::from("play")
    } else {
        slug.to_string()
    }
}
