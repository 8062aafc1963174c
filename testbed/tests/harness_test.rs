use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tempfile::TempDir;
use testbed::config::{ProviderSettings, ServiceSettings, Settings};
use testbed::distro::Ubuntu;
use testbed::harness::{block_on, run_with, verify_with, workspace};
use testbed::kubernetes::ServiceLookup;
use testbed::provider::{StaticHost, StaticProvider};
use testbed::Error;
use testbed_hardware::{
    DriverResult, ExecutorBuilder, HostReport, HostStatus, Inventory, Play, PlayExecutor,
    PlayResult,
};

/// Plays that were run, and the plays every host fails.
#[derive(Debug, Default)]
struct Record {
    plays: Vec<String>,
    hosts: Vec<Vec<String>>,
    failing: BTreeSet<String>,
}

#[derive(Clone, Default)]
struct RecordingBuilder {
    record: Rc<RefCell<Record>>,
}

struct RecordingExecutor {
    hosts: Vec<String>,
    record: Rc<RefCell<Record>>,
}

impl ExecutorBuilder for RecordingBuilder {
    type Executor = RecordingExecutor;

    fn build(&self, inventory: &Inventory) -> DriverResult<Self::Executor> {
        let hosts: Vec<String> = inventory
            .hosts()
            .iter()
            .map(|host| host.address.clone())
            .collect();
        self.record.borrow_mut().hosts.push(hosts.clone());
        Ok(RecordingExecutor {
            hosts,
            record: self.record.clone(),
        })
    }
}

impl PlayExecutor for RecordingExecutor {
    fn run_play(&self, play: &Play) -> DriverResult<PlayResult> {
        let mut record = self.record.borrow_mut();
        record.plays.push(play.name.clone());
        let status = if record.failing.contains(&play.name) {
            HostStatus::Failed
        } else {
            HostStatus::Ok
        };
        Ok(PlayResult::new(
            play.name.as_str(),
            self.hosts
                .iter()
                .map(|host| HostReport::new(host.as_str(), status)),
        ))
    }
}

struct AllServices;

#[async_trait]
impl ServiceLookup for AllServices {
    async fn service_exists(&self, _namespace: &str, name: &str) -> testbed::Result<bool> {
        Ok(name.starts_with("rook-ceph") || name.starts_with("csi-"))
    }
}

fn settings(dir: &TempDir) -> Settings {
    let hosts = (10..13)
        .map(|i| StaticHost {
            address: format!("10.0.0.{}", i),
            user: Some("ubuntu".to_string()),
        })
        .collect();
    Settings {
        workspace_root: dir.path().to_path_buf(),
        name: Some("demo-1".to_string()),
        distro: "ubuntu".to_string(),
        masters: 1,
        workers: 2,
        provider: ProviderSettings::Static { hosts },
        ansible: Default::default(),
        services: ServiceSettings::default(),
    }
}

fn settings_with_known_hosts(dir: &TempDir) -> Settings {
    let mut settings = settings(dir);
    settings.ansible.known_hosts = Some(dir.path().join("known_hosts"));
    settings
}

fn static_provider(settings: &Settings) -> StaticProvider {
    match &settings.provider {
        ProviderSettings::Static { hosts } => StaticProvider::new(hosts.clone()),
        ProviderSettings::Exec { .. } => unreachable!(),
    }
}

#[test]
fn runs_prepare_and_extra_plays_in_order() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with_known_hosts(&dir);
    std::fs::write(
        dir.path().join("known_hosts"),
        "10.0.0.10 ssh-ed25519 AAAAold\nother.example ssh-ed25519 AAAAkeep\n",
    )
    .unwrap();
    let builder = RecordingBuilder::default();
    let extra = vec![Play::new("install rook"), Play::new("label nodes")];

    run_with(
        &settings,
        workspace(&settings).unwrap(),
        static_provider(&settings),
        builder.clone(),
        &Ubuntu,
        &extra,
    )
    .unwrap();

    let record = builder.record.borrow();
    assert_eq!(
        record.plays,
        vec![
            "wait-for-connection",
            "bootstrap-ubuntu",
            "install rook",
            "label nodes"
        ]
    );
    assert_eq!(record.hosts, vec![vec!["10.0.0.10", "10.0.0.11", "10.0.0.12"]]);
    assert!(dir.path().join("demo-1").join("private.key").is_file());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("known_hosts")).unwrap(),
        "other.example ssh-ed25519 AAAAkeep\n"
    );
}

#[test]
fn failed_bootstrap_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let settings = settings_with_known_hosts(&dir);
    let builder = RecordingBuilder::default();
    builder
        .record
        .borrow_mut()
        .failing
        .insert("bootstrap-ubuntu".to_string());

    let e = run_with(
        &settings,
        workspace(&settings).unwrap(),
        static_provider(&settings),
        builder.clone(),
        &Ubuntu,
        &[Play::new("install rook")],
    )
    .unwrap_err();
    assert!(e.to_string().contains("bootstrap-ubuntu"));
    assert_eq!(
        builder.record.borrow().plays,
        vec!["wait-for-connection", "bootstrap-ubuntu"]
    );
}

#[test]
fn too_few_hosts_fails_the_boot() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings_with_known_hosts(&dir);
    settings.workers = 5;
    let builder = RecordingBuilder::default();
    let e = run_with(
        &settings,
        workspace(&settings).unwrap(),
        static_provider(&settings),
        builder.clone(),
        &Ubuntu,
        &[],
    )
    .unwrap_err();
    assert!(matches!(e, Error::Hardware { .. }));
    assert!(builder.record.borrow().plays.is_empty());
}

#[test]
fn generated_workspace_names_are_unique() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(&dir);
    settings.name = None;
    let first = workspace(&settings).unwrap();
    let second = workspace(&settings).unwrap();
    assert_ne!(first.name(), second.name());
    assert!(first.name().starts_with("testbed-"));
    assert!(first.working_dir().is_dir());
}

#[test]
fn verifies_services_with_lookup() {
    let mut services = ServiceSettings {
        interval_secs: 0,
        iterations: 2,
        ..ServiceSettings::default()
    };
    block_on(verify_with(AllServices, &services))
        .unwrap()
        .unwrap();

    services.names.push("object-store".to_string());
    let e = block_on(verify_with(AllServices, &services))
        .unwrap()
        .unwrap_err();
    assert!(e.to_string().contains("object-store"));
}
