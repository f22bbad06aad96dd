//! Grouped raw metrics of one snapshot

use anyhow::Result;
use colored::Colorize;
use kubelet_lib::{definition::NODE, RawGroups, RawMetrics};
use tabled::Tabled;

use super::{take_snapshot, GroupArg, Target};
use crate::output::{
    format_bytes, format_metric, format_nanocores, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the snapshot table
#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Entity")]
    raw_entity_id: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Metrics")]
    metric_count: usize,
}

fn entity_row(group: &str, raw_entity_id: &str, metrics: &RawMetrics) -> EntityRow {
    // Nodes prefix their memory fields, pods carry no usage at all
    let memory_key = if group == NODE {
        "memoryUsageBytes"
    } else {
        "usageBytes"
    };

    EntityRow {
        group: group.to_string(),
        raw_entity_id: raw_entity_id.to_string(),
        cpu: format_metric(metrics.get("usageNanoCores"), format_nanocores),
        memory: format_metric(metrics.get(memory_key), format_bytes),
        metric_count: metrics.len(),
    }
}

fn rows(groups: &RawGroups, group: Option<GroupArg>) -> Vec<EntityRow> {
    groups
        .iter()
        .filter(|(label, _)| group.map_or(true, |g| g.label() == *label))
        .flat_map(|(label, entities)| {
            entities
                .iter()
                .map(move |(raw_entity_id, metrics)| entity_row(label, raw_entity_id, metrics))
        })
        .collect()
}

/// Show the grouped raw metrics
pub async fn show_snapshot(
    target: &Target,
    group: Option<GroupArg>,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = take_snapshot(target).await?;

    match format {
        OutputFormat::Json => match group {
            Some(group) => {
                let entities = snapshot.groups.group(group.label()).cloned().unwrap_or_default();
                print_json(&entities)?;
            }
            None => print_json(&snapshot.groups)?,
        },
        OutputFormat::Table => {
            println!("{}", "Kubelet Snapshot".bold());
            println!("{}", "=".repeat(60));
            println!("Kubelet: {}", target.client.endpoint.cyan());
            println!(
                "Entities: {} nodes, {} pods, {} containers",
                snapshot.node_count(),
                snapshot.pod_count(),
                snapshot.container_count()
            );
            println!();

            print_table(rows(&snapshot.groups, group));

            let skipped = snapshot.skipped_messages().len();
            if skipped > 0 {
                println!();
                print_warning(&format!(
                    "{} entities skipped, run `kstats errors` for details",
                    skipped
                ));
            }
        }
    }

    Ok(())
}

/// Show one entity's raw metrics as key/value pairs
pub async fn show_entity(
    target: &Target,
    group: GroupArg,
    raw_entity_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = take_snapshot(target).await?;

    let Some(metrics) = snapshot.groups.entity(group.label(), raw_entity_id) else {
        print_warning(&format!(
            "No {} entity with key {:?} in this snapshot",
            group.label(),
            raw_entity_id
        ));
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(metrics)?,
        OutputFormat::Table => print_table(
            metrics
                .iter()
                .map(|(key, value)| MetricRow {
                    key: key.clone(),
                    value: value.to_string(),
                })
                .collect(),
        ),
    }

    Ok(())
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}
