//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use kubelet_lib::RawValue;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a nanocore rate as cores or millicores
pub fn format_nanocores(nanocores: u64) -> String {
    let millicores = nanocores / 1_000_000;
    if millicores >= 1000 {
        format!("{:.1}", nanocores as f64 / 1_000_000_000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Render an optional raw value with `format`, `-` when absent or not an integer
pub fn format_metric(value: Option<&RawValue>, format: fn(u64) -> String) -> String {
    value
        .and_then(RawValue::as_u64)
        .map(format)
        .unwrap_or_else(|| "-".to_string())
}

/// Color an entity type by its category
pub fn color_entity_type(entity_type: &str) -> String {
    if entity_type.ends_with(":node") {
        entity_type.blue().to_string()
    } else if entity_type.ends_with(":pod") {
        entity_type.green().to_string()
    } else {
        entity_type.to_string()
    }
}
