//! Diagnostics accumulated while grouping a snapshot

use anyhow::Result;
use kubelet_lib::Snapshot;
use serde::Serialize;
use tabled::Tabled;

use super::{take_snapshot, Target};
use crate::output::{print_json, print_success, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct ErrorRow {
    #[tabled(rename = "Stage")]
    stage: &'static str,
    #[tabled(rename = "Error")]
    message: String,
}

fn error_rows(snapshot: &Snapshot) -> Vec<ErrorRow> {
    let extract = snapshot.extract_errors.iter().map(|e| ErrorRow {
        stage: "extract",
        message: e.to_string(),
    });
    let identify = snapshot.sample_errors.iter().map(|e| ErrorRow {
        stage: "identify",
        message: e.to_string(),
    });

    extract.chain(identify).collect()
}

/// Show every entity that was skipped or only partially identified
pub async fn show_errors(target: &Target, format: OutputFormat) -> Result<()> {
    let snapshot = take_snapshot(target).await?;
    let rows = error_rows(&snapshot);

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table if rows.is_empty() => {
            print_success("Snapshot grouped without errors");
        }
        OutputFormat::Table => print_table(rows),
    }

    Ok(())
}
