//! Human and JSON rendering of run results.

use crate::Format;
use anyhow::Result;
use colored::Colorize;
use mendgraph_engine::{Conflict, ScanReport};
use mendgraph_storage::{MigrationOutcome, RepairOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Repair,
    Check,
}

pub fn print_outcome(outcome: &RepairOutcome, format: Format, mode: Mode) -> Result<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let report = &outcome.report;
    let document = outcome.document.display().to_string();
    if outcome.is_clean() {
        println!("{} {} needs no repair", "ok".green().bold(), document.bold());
    } else {
        let verb = match mode {
            Mode::Repair => "repaired",
            Mode::Check => "would repair",
        };
        println!(
            "{} {} ({} changes, {} nodes deleted)",
            verb.yellow().bold(),
            document.bold(),
            report.changes,
            report.nodes_deleted
        );
        for (fixer, count) in &report.changes_by_fixer {
            println!("  {:<24} {count}", fixer);
        }
    }

    print_conflicts(&report.conflicts);

    if !outcome.log.is_empty() {
        println!();
        for entry in outcome.log.entries() {
            println!("  {} {}", entry.guid.to_string().dimmed(), entry.description);
        }
    }

    if let Some(backup) = &outcome.backup {
        println!();
        println!("{} {}", "backup".green().bold(), backup.display());
    }
    if let Some(log_file) = &outcome.log_file {
        println!("{} {}", "change log".green().bold(), log_file.display());
    }
    for m in &outcome.migrations {
        match &m.outcome {
            MigrationOutcome::Migrated { to, .. } => {
                println!("{} {} -> {}", "migrated".green().bold(), m.old_tag, to.display());
            }
            MigrationOutcome::Missing => {}
            MigrationOutcome::TargetExists { path } => {
                println!(
                    "{} {} -> {}: {} already exists",
                    "skipped".yellow().bold(),
                    m.old_tag,
                    m.new_tag,
                    path.display()
                );
            }
            MigrationOutcome::Failed { error } => {
                println!("{} {} -> {}: {error}", "failed".red().bold(), m.old_tag, m.new_tag);
            }
        }
    }
    Ok(())
}

pub fn print_scan(scan: &ScanReport, format: Format) -> Result<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(scan)?);
        return Ok(());
    }

    let stats = &scan.stats;
    println!("{}", "Index".bold());
    println!("  nodes              {}", stats.nodes);
    println!("  identities         {}", stats.identities);
    println!("  owned edges        {}", stats.owned_edges);
    println!("  custom fields      {}", scan.custom_fields);
    println!("{}", "Classes".bold());
    let mut classes: Vec<(&String, &u64)> = stats.classes.iter().collect();
    classes.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (class, count) in classes {
        println!("  {:<28} {count}", class);
    }
    print_conflicts(&scan.conflicts);
    Ok(())
}

fn print_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        return;
    }
    println!(
        "{} {} structural conflicts (reported, not repaired)",
        "warning:".yellow().bold(),
        conflicts.len()
    );
    for conflict in conflicts {
        match conflict {
            Conflict::DuplicateIdentity { guid, class } => {
                println!("  duplicate identity {guid} ({class})");
            }
            Conflict::DoubleOwnership {
                child,
                kept_owner,
                rejected_owner,
            } => {
                println!("  {child} claimed by {kept_owner} and {rejected_owner}; kept {kept_owner}");
            }
        }
    }
}
