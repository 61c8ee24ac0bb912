//! Status viewer — `harvest status`.
//!
//! A read-only convenience over the same artifact the admin web view
//! polls. Tolerates the file being absent (daemon not started yet) and
//! being unparsable (should not happen given atomic publishes, but a
//! viewer must never crash on its input).

use anyhow::{Context, Result};
use std::path::Path;

use harvest::config::{Config, DEFAULT_STATUS_FILE};
use harvest::errors::ConfigError;
use harvest::status::StatusDocument;

pub fn cmd_status(work_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    // The viewer should work without a config file; fall back to the
    // default artifact location when there is none to read.
    let status_file = match Config::load(work_dir, config_path) {
        Ok(config) => config.status_file,
        Err(ConfigError::ReadFailed { .. }) => work_dir.join(DEFAULT_STATUS_FILE),
        Err(e) => return Err(e.into()),
    };

    if !status_file.exists() {
        println!("No status file found. The supervisor has not run yet.");
        return Ok(());
    }

    let content = std::fs::read_to_string(&status_file).context("Failed to read status file")?;

    match serde_json::from_str::<StatusDocument>(&content) {
        Ok(doc) => print_status(&doc),
        Err(e) => {
            eprintln!("Warning: Could not parse status file: {}", e);
            println!("Raw status: {}", content);
        }
    }

    Ok(())
}

fn print_status(doc: &StatusDocument) {
    println!();
    println!("{}", console::style("Harvest Pipeline Status").bold().cyan());
    println!("─────────────────────────");

    let state = if doc.running {
        match &doc.current_stage {
            Some(stage) => format!("running ({})", stage),
            None => "running".to_string(),
        }
    } else if doc.shutdown_requested {
        "stopped".to_string()
    } else {
        "idle".to_string()
    };
    println!("State:    {}", state);
    println!("Cycle:    #{}", doc.current_cycle_number);

    if let Some(started) = doc.started_at {
        println!("Started:  {}", started.to_rfc3339());
    }
    if let Some(finished) = doc.finished_at {
        println!("Finished: {}", finished.to_rfc3339());
    }

    println!();
    println!(
        "Stages:   {}/{} completed",
        doc.stages_completed.len(),
        doc.total_stages
    );
    for stage in &doc.stages_completed {
        let outcome = if stage.succeeded() {
            console::style("ok".to_string()).green()
        } else {
            console::style(format!("exit {}", stage.exit_code)).red()
        };
        println!(
            "  {:<20} {:<8} {:>8.1}s",
            stage.name, outcome, stage.duration_seconds
        );
    }

    if let Some(next) = doc.next_run_at {
        println!();
        println!("Next run: {}", next.to_rfc3339());
    }
    println!("Updated:  {}", doc.last_update.to_rfc3339());
}
