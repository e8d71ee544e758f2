//! `lexisync status`: what the local store holds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use lexisync_core::{FileStore, Store};

/// Arguments for `lexisync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Include disabled courses.
    #[arg(long)]
    pub all: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let store = FileStore::open_at(&home).context("failed to open local store")?;

        let report = build_report(&store, self.all)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    summary: StatusSummary,
    courses: Vec<CourseStatus>,
}

#[derive(Debug, Serialize)]
struct StatusSummary {
    courses: usize,
    disabled: usize,
    levels: usize,
    words: usize,
    saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CourseStatus {
    id: u64,
    name: String,
    levels: usize,
    words: usize,
    difficult: u32,
    disabled: bool,
}

#[derive(Tabled)]
struct CourseRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "course")]
    name: String,
    #[tabled(rename = "levels")]
    levels: usize,
    #[tabled(rename = "words")]
    words: usize,
    #[tabled(rename = "difficult")]
    difficult: u32,
    #[tabled(rename = "state")]
    state: String,
}

fn build_report(store: &FileStore, include_disabled: bool) -> Result<StatusReport> {
    let all = store.all_courses().context("failed to read courses")?;
    let disabled = all.iter().filter(|c| c.is_disabled).count();

    let mut rows = Vec::new();
    let (mut level_total, mut word_total) = (0, 0);
    for course in all {
        let levels = store
            .levels_of(course.id)
            .with_context(|| format!("failed to read levels of course {}", course.id))?;
        let words: usize = levels.iter().map(|l| l.words.len()).sum();
        if !course.is_disabled {
            level_total += levels.len();
            word_total += words;
        }
        if course.is_disabled && !include_disabled {
            continue;
        }
        rows.push(CourseStatus {
            id: course.id.0,
            name: course.name,
            levels: levels.len(),
            words,
            difficult: course.difficult,
            disabled: course.is_disabled,
        });
    }

    Ok(StatusReport {
        summary: StatusSummary {
            courses: rows.iter().filter(|c| !c.disabled).count(),
            disabled,
            levels: level_total,
            words: word_total,
            saved_at: store.saved_at(),
        },
        courses: rows,
    })
}

fn print_table(report: StatusReport) {
    let last = report
        .summary
        .saved_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "Lexisync v{} | {} courses | {} disabled | {} levels | {} words | last sync: {}",
        env!("CARGO_PKG_VERSION"),
        report.summary.courses,
        report.summary.disabled,
        report.summary.levels,
        report.summary.words,
        last,
    );

    if report.courses.is_empty() {
        println!("No courses stored. Run `lexisync sync` first.");
        return;
    }

    let rows: Vec<CourseRow> = report
        .courses
        .into_iter()
        .map(|c| CourseRow {
            id: c.id,
            name: c.name,
            levels: c.levels,
            words: c.words,
            difficult: c.difficult,
            state: if c.disabled {
                "DISABLED".bright_black().to_string()
            } else {
                "active".green().to_string()
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
