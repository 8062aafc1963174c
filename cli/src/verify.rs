use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use std::path::PathBuf;
use testbed::config::Settings;
use testbed::harness;

/// Check that the services of a config exist in the cluster its kubeconfig points at.
#[derive(Debug, Parser)]
pub(crate) struct Verify {
    /// Path to the testbed TOML config.
    #[clap(long, short = 'c', value_parser = value_parser!(PathBuf))]
    config: PathBuf,

    /// Use this kubeconfig instead of the one in the config.
    #[clap(long, value_parser = value_parser!(PathBuf))]
    kubeconfig: Option<PathBuf>,
}

impl Verify {
    pub(crate) fn run(&self) -> Result<()> {
        let mut settings = Settings::from_path(&self.config)
            .context(format!("Unable to load '{}'", self.config.display()))?;
        if let Some(kubeconfig) = &self.kubeconfig {
            settings.services.kubeconfig = Some(kubeconfig.clone());
        }
        harness::block_on(harness::verify(&settings.services))?
            .context("Service verification failed")?;
        println!(
            "All {} service(s) are present.",
            settings.services.names.len()
        );
        Ok(())
    }
}
