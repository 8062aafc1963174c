use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use std::path::PathBuf;
use testbed::config::Settings;
use testbed::harness;

/// Run the full lifecycle described by a config file.
#[derive(Debug, Parser)]
pub(crate) struct Run {
    /// Path to the testbed TOML config.
    #[clap(long, short = 'c', value_parser = value_parser!(PathBuf))]
    config: PathBuf,

    /// Override the number of master nodes.
    #[clap(long)]
    masters: Option<usize>,

    /// Override the number of worker nodes.
    #[clap(long)]
    workers: Option<usize>,
}

impl Run {
    pub(crate) fn run(&self) -> Result<()> {
        let mut settings = Settings::from_path(&self.config)
            .context(format!("Unable to load '{}'", self.config.display()))?;
        if let Some(masters) = self.masters {
            settings.masters = masters;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        harness::run(&settings).context("Testbed run failed")?;
        println!("Testbed run succeeded.");
        Ok(())
    }
}
