use crate::error::{self, Result};
use crate::workspace::Workspace;
use log::debug;
use snafu::ResultExt;
use ssh_key::private::{KeypairData, RsaKeypair};
use ssh_key::{LineEnding, PrivateKey};
use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// The name of the private key file inside the workspace directory.
pub const PRIVATE_KEY_FILENAME: &str = "private.key";

const KEY_BITS: usize = 2048;

/// The ssh keypair that grants access to every node of one `Hardware` object. The private half
/// lives in `<workspace>/private.key` and is readable by its owner only; the public half is kept in
/// memory so that providers can inject it into the machines they boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    key_name: String,
    public_key: String,
    private_key: PathBuf,
}

impl Credentials {
    /// Generates a new RSA keypair and writes its private half into the workspace directory. A key
    /// file left behind by an earlier run in the same directory is replaced.
    pub fn generate(workspace: &Workspace) -> Result<Self> {
        let private_key = workspace.working_dir().join(PRIVATE_KEY_FILENAME);
        let key_name = format!("{}_key", workspace.name());

        debug!("Generating {} bit RSA key '{}'", KEY_BITS, key_name);
        let keypair = RsaKeypair::random(&mut rand_core::OsRng, KEY_BITS)
            .context(error::GenerateKeySnafu)?;
        let key = PrivateKey::new(KeypairData::from(keypair), key_name.as_str())
            .context(error::GenerateKeySnafu)?;

        let pem = key
            .to_openssh(LineEnding::LF)
            .context(error::EncodeKeySnafu)?;
        write_owner_only(&private_key, pem.as_bytes())?;

        // `to_openssh` renders `<algorithm> <base64> <comment>`; we only keep the first two.
        let openssh = key
            .public_key()
            .to_openssh()
            .context(error::EncodeKeySnafu)?;
        let public_key = openssh
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            key_name,
            public_key,
            private_key,
        })
    }

    /// Assembles credentials from values that were produced elsewhere, e.g. by a test.
    pub fn from_parts<S1, S2>(key_name: S1, public_key: S2, private_key: PathBuf) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            key_name: key_name.into(),
            public_key: public_key.into(),
            private_key,
        }
    }

    /// The identifier under which providers register the public key, `<workspace-name>_key`.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// The public key in `<algorithm> <base64>` form, ready for an `authorized_keys` line.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key
    }
}

fn write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).context(error::WritePrivateKeySnafu { path })?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .context(error::WritePrivateKeySnafu { path })?;
    file.write_all(contents)
        .context(error::WritePrivateKeySnafu { path })?;
    fs::set_permissions(path, Permissions::from_mode(0o400))
        .context(error::KeyPermissionsSnafu { path })
}
