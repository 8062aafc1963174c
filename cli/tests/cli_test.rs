use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("testbed.toml");
    std::fs::write(
        &path,
        format!(
            "workspace_root = '{}'\nname = 'cli'\n{}",
            dir.join("work").display(),
            body
        ),
    )
    .unwrap();
    path.display().to_string()
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("testbed").unwrap();
    cmd.arg("--help");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("verify"));
}

#[test]
fn missing_config_fails() {
    let mut cmd = Command::cargo_bin("testbed").unwrap();
    cmd.args(&["run", "--config", "/this/path/does/not/exist.toml"]);
    cmd.assert().failure().code(1);
}

#[test]
fn unknown_distro_fails_before_provisioning() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "distro = 'plan9'\n[provider]\nkind = 'exec'\nboot_command = 'echo 10.0.0.1'\n",
    );
    let mut cmd = Command::cargo_bin("testbed").unwrap();
    cmd.args(&["run", "--config", config.as_str()]);
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("plan9"));
    assert!(!dir.path().join("work").exists());
}

#[test]
fn failed_run_destroys_booted_nodes() {
    let dir = TempDir::new().unwrap();
    let destroyed = dir.path().join("destroyed");
    let config = write_config(
        dir.path(),
        &format!(
            "workers = 1\n\
             [provider]\n\
             kind = 'exec'\n\
             boot_command = 'echo 192.0.2.1'\n\
             destroy_command = 'echo $TESTBED_NODE_NAME >> {}'\n\
             [ansible]\n\
             program = 'true'\n\
             known_hosts = '{}'\n",
            destroyed.display(),
            dir.path().join("known_hosts").display()
        ),
    );
    let mut cmd = Command::cargo_bin("testbed").unwrap();
    cmd.args(&["--log-level", "debug", "run", "--config", config.as_str()]);
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("wait-for-connection"));
    assert_eq!(
        std::fs::read_to_string(&destroyed).unwrap(),
        "cli-master-0\ncli-worker-0\n"
    );
    assert!(dir.path().join("work").join("cli").join("private.key").is_file());
}

#[test]
fn verify_needs_a_kubeconfig() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "[provider]\nkind = 'static'\nhosts = [{ address = '10.0.0.1' }]\n",
    );
    let mut cmd = Command::cargo_bin("testbed").unwrap();
    cmd.args(&["verify", "--config", config.as_str()]);
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("kubeconfig"));
}
