//! `lexisync init [--source <dir>] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use lexisync_core::{config, paths, SyncConfig};

/// Create the lexisync home with a default config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory holding dashboard.json and the level pages.
    /// Defaults to ~/.lexisync/source.
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let config_path = paths::config_path(&home);
        if config_path.exists() && !self.force {
            bail!(
                "{} already exists; pass --force to overwrite it",
                config_path.display()
            );
        }

        let source = match self.source {
            Some(dir) => {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("cannot create {}", dir.display()))?;
                Some(
                    dir.canonicalize()
                        .with_context(|| format!("cannot resolve path '{}'", dir.display()))?,
                )
            }
            None => None,
        };
        let cfg = SyncConfig {
            source_dir: source,
            ..SyncConfig::default()
        };
        let source_dir = cfg.source_dir_at(&home);
        std::fs::create_dir_all(&source_dir)
            .with_context(|| format!("cannot create {}", source_dir.display()))?;
        let saved = config::save_at(&home, &cfg).context("failed to write config")?;

        println!("✓ Initialized {}", paths::lexisync_root(&home).display());
        println!("  Config: {}", saved.display());
        println!("  Source: {}", source_dir.display());
        Ok(())
    }
}
