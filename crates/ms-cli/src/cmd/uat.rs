use super::require_planning;
use crate::output::print_json;
use anyhow::Context;
use clap::{Args, Subcommand};
use ms_core::root::RootProvider;
use ms_core::uat::{find_uat_file, init_uat, parse_record_payload, UatFile, UatInit};
use serde_json::Value as JsonValue;
use std::io::Read;

#[derive(Subcommand)]
pub enum UatSubcommand {
    /// Create the UAT file from a JSON payload on stdin
    Init { phase: String },
    /// Update a test, batch, or session fields, or append a fix or assumption
    Update {
        phase: String,
        #[command(flatten)]
        target: UpdateTarget,
        /// key=value pairs (ignored for --append-fix / --append-assumption)
        fields: Vec<String>,
    },
    /// Show compact resume status
    Status { phase: String },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct UpdateTarget {
    /// Test number to update
    #[arg(long)]
    test: Option<u32>,
    /// Batch number to update
    #[arg(long)]
    batch: Option<u32>,
    /// Update frontmatter session fields
    #[arg(long)]
    session: bool,
    /// Append a fix record read as JSON from stdin
    #[arg(long)]
    append_fix: bool,
    /// Append an assumption record read as JSON from stdin
    #[arg(long)]
    append_assumption: bool,
}

pub fn run(provider: &dyn RootProvider, subcmd: UatSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        UatSubcommand::Init { phase } => init(provider, &phase, json),
        UatSubcommand::Update {
            phase,
            target,
            fields,
        } => update(provider, &phase, target, &fields, json),
        UatSubcommand::Status { phase } => status(provider, &phase),
    }
}

fn read_stdin() -> anyhow::Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

/// `key=value` arguments; anything without `=` is ignored.
fn parse_fields(args: &[String]) -> Vec<(String, String)> {
    args.iter()
        .filter_map(|arg| match arg.split_once('=') {
            Some((k, v)) => Some((k.to_string(), v.to_string())),
            None => {
                tracing::warn!(arg = %arg, "ignoring argument without '='");
                None
            }
        })
        .collect()
}

fn describe(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn payload_test(record: &serde_json::Map<String, JsonValue>) -> String {
    match record.get("test") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "?".to_string(),
    }
}

fn init(provider: &dyn RootProvider, phase: &str, json: bool) -> anyhow::Result<()> {
    let planning = require_planning(provider)?;
    let payload = UatInit::from_json(&read_stdin()?)?;
    let (path, uat) = init_uat(planning.dir(), phase, &payload)?;

    if json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "tests": uat.tests().len(),
            "batches": uat.batches().len(),
        }))?;
    } else {
        println!(
            "Created {} with {} tests in {} batches",
            path.display(),
            uat.tests().len(),
            uat.batches().len()
        );
    }
    Ok(())
}

fn update(
    provider: &dyn RootProvider,
    phase: &str,
    target: UpdateTarget,
    args: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let planning = require_planning(provider)?;
    let path = find_uat_file(planning.dir(), phase)?;
    let mut uat = UatFile::load(&path)?;
    let fields = parse_fields(args);

    let label = if let Some(num) = target.test {
        uat.update_test(num, &fields)?;
        format!("Updated test {num}: {}", describe(&fields))
    } else if let Some(num) = target.batch {
        uat.update_batch(num, &fields)?;
        format!("Updated batch {num}: {}", describe(&fields))
    } else if target.session {
        uat.update_session(&fields)?;
        format!("Updated session: {}", describe(&fields))
    } else if target.append_fix {
        let record = parse_record_payload(&read_stdin()?)?;
        uat.append_fix(&record)?;
        format!("Appended fix for test {}", payload_test(&record))
    } else {
        let record = parse_record_payload(&read_stdin()?)?;
        uat.append_assumption(&record)?;
        format!("Appended assumption for test {}", payload_test(&record))
    };

    uat.save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({
            "updated": label,
            "path": path.display().to_string(),
            "progress": uat.progress(),
        }))?;
    } else {
        println!("{label} | Progress: {}", uat.progress_summary());
    }
    Ok(())
}

fn status(provider: &dyn RootProvider, phase: &str) -> anyhow::Result<()> {
    let planning = require_planning(provider)?;
    let path = find_uat_file(planning.dir(), phase)?;
    let uat = UatFile::load(&path)?;
    print_json(&uat.status(&path))
}
