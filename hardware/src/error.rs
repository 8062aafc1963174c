use crate::driver::DriverError;
use snafu::Snafu;
use std::path::PathBuf;

/// The error type returned by [`Hardware`](crate::Hardware) and its building blocks.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "Booted {} master(s) and {} worker(s) but {} master(s) and {} worker(s) were requested",
        masters,
        workers,
        expected_masters,
        expected_workers
    ))]
    BootMismatch {
        expected_masters: usize,
        expected_workers: usize,
        masters: usize,
        workers: usize,
    },

    #[snafu(display("Provider '{}' failed to boot nodes: {}", provider, source))]
    BootNodes {
        provider: String,
        source: DriverError,
    },

    #[snafu(display("Unable to build an executor for the current inventory: {}", source))]
    BuildExecutor { source: DriverError },

    #[snafu(display("Unable to connect to provider '{}': {}", provider, source))]
    Connect {
        provider: String,
        source: DriverError,
    },

    #[snafu(display("Unable to create workspace directory '{}': {}", path.display(), source))]
    CreateWorkspace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to destroy node '{}': {}", name, source))]
    DestroyNode { name: String, source: DriverError },

    #[snafu(display("A node named '{}' is already registered", name))]
    DuplicateNode { name: String },

    #[snafu(display("Unable to encode ssh key: {}", source))]
    EncodeKey { source: ssh_key::Error },

    #[snafu(display("Unable to remove stale host keys for '{}': {}", address, source))]
    ForgetHostKey {
        address: String,
        source: DriverError,
    },

    #[snafu(display("Unable to generate ssh key: {}", source))]
    GenerateKey { source: ssh_key::Error },

    #[snafu(display("Unable to restrict permissions of '{}': {}", path.display(), source))]
    KeyPermissions {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "Failure running play '{}' (unreachable: {:?}, failed: {:?})",
        play,
        unreachable,
        failed
    ))]
    PlayFailed {
        play: String,
        unreachable: Vec<String>,
        failed: Vec<String>,
    },

    #[snafu(display("Unable to run play '{}': {}", play, source))]
    RunPlay { play: String, source: DriverError },

    #[snafu(display("Failed to destroy {} node(s): {}", errors.len(), join(errors)))]
    Teardown { errors: Vec<Error> },

    #[snafu(display("No node named '{}' is registered", name))]
    UnknownNode { name: String },

    #[snafu(display("Unable to write private key to '{}': {}", path.display(), source))]
    WritePrivateKey {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The result type returned by this library.
pub type Result<T> = std::result::Result<T, Error>;

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
