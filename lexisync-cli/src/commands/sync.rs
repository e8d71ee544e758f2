//! `lexisync sync`: reconcile the local store with the source.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use lexisync_core::{config, FileStore, SyncConfig};
use lexisync_sync::{
    CancellationToken, DispatchMode, FixtureClient, JsonLevelParser, RemoteRepository,
    SyncReport, TierCounts, TracingAudit, UpdateManager,
};

/// Arguments for `lexisync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Report what would change without writing to the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Source directory for this run, overriding the config.
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let cfg: SyncConfig = config::load_at(&home).context("failed to load config")?;
        let source = self
            .source
            .clone()
            .unwrap_or_else(|| cfg.source_dir_at(&home));

        let store = FileStore::open_at(&home).context("failed to open local store")?;
        let remote = RemoteRepository::new(
            Arc::new(FixtureClient::new(&source)),
            Arc::new(JsonLevelParser),
        )
        .with_page_limit(cfg.page_limit)
        .with_max_concurrent_fetches(cfg.max_concurrent_fetches);
        let mode = if self.dry_run {
            DispatchMode::DryRun
        } else {
            DispatchMode::Apply
        };
        let mut manager =
            UpdateManager::from_config(Arc::new(remote), store, Arc::new(TracingAudit), &cfg, mode);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let cancel = CancellationToken::new();
        let report = runtime
            .block_on(async {
                let run = manager.update(&cancel);
                tokio::pin!(run);
                tokio::select! {
                    res = &mut run => res,
                    signal = tokio::signal::ctrl_c() => {
                        on_interrupt(signal, &cancel);
                        run.await
                    }
                }
            })
            .with_context(|| format!("sync from {} failed", source.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

/// Cancel only on a delivered Ctrl-C; a listener that failed to install
/// leaves the run going.
fn on_interrupt(signal: std::io::Result<()>, cancel: &CancellationToken) {
    match signal {
        Ok(()) => {
            tracing::warn!("interrupted; stopping before the next write");
            cancel.cancel();
        }
        Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
    }
}

fn counts_line(label: &str, counts: &TierCounts) -> String {
    format!(
        "  {label:<8} {} created, {} updated, {} deleted, {} unchanged",
        counts.created, counts.updated, counts.deleted, counts.unchanged
    )
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    if report.has_changes() {
        println!("{prefix}✓ sync finished in {} ms", report.duration_ms);
    } else {
        println!("{prefix}✓ nothing to do ({} ms)", report.duration_ms);
    }
    println!("{}", counts_line("courses", &report.courses));
    println!("{}", counts_line("levels", &report.levels));
    println!("{}", counts_line("words", &report.words));

    if !report.failures.is_empty() {
        println!(
            "{}",
            format!("{} course(s) not reconciled:", report.failures.len()).yellow()
        );
        for failure in &report.failures {
            println!("  ✗ course {}: {}", failure.course_id, failure.reason);
        }
    }
}
