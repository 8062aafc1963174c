use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to create the async runtime: {}", source))]
    CreateRuntime { source: std::io::Error },

    #[snafu(display("{}", source))]
    #[snafu(context(false))]
    Hardware { source: testbed_hardware::Error },

    #[snafu(display("Unable to create a kubernetes client: {}", source))]
    KubeClient { source: kube::Error },

    #[snafu(display("Unable to load kubeconfig '{}': {}", path.display(), source))]
    Kubeconfig {
        path: PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Kubernetes request to {} failed: {}", what, source))]
    KubeRequest { what: String, source: kube::Error },

    #[snafu(display(
        "Unable to apply '{}', kubectl exited with {}:\n{}",
        manifest.display(),
        status,
        stderr
    ))]
    KubectlApply {
        manifest: PathBuf,
        status: String,
        stderr: String,
    },

    #[snafu(display("Unable to run '{}': {}", program, source))]
    KubectlSpawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("Services missing in namespace '{}': {}", namespace, names.join(", ")))]
    MissingServices {
        namespace: String,
        names: Vec<String>,
    },

    #[snafu(display("No kubeconfig was configured for service verification"))]
    NoKubeconfig,

    #[snafu(display("Unable to parse config '{}': {}", path.display(), source))]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("Unable to parse playbook '{}': {}", path.display(), source))]
    ParsePlaybook {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Unable to read config '{}': {}", path.display(), source))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to read playbook '{}': {}", path.display(), source))]
    ReadPlaybook {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "Unknown distro '{}', expected one of: {}",
        name,
        crate::distro::DISTROS.join(", ")
    ))]
    UnknownDistro { name: String },
}
