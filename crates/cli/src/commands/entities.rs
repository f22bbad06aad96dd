//! Derived entity identities of one snapshot

use anyhow::Result;
use colored::Colorize;
use kubelet_lib::{RawValue, Sample};
use tabled::Tabled;

use super::{take_snapshot, GroupArg, Target};
use crate::output::{color_entity_type, print_json, print_table, print_warning, OutputFormat};

/// Row for the entities table
#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Event Type")]
    event_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    entity_type: String,
}

fn entity_row(sample: &Sample) -> EntityRow {
    EntityRow {
        event_type: sample
            .metrics
            .get("event_type")
            .map(RawValue::to_string)
            .unwrap_or_default(),
        name: sample.entity.name.clone(),
        entity_type: color_entity_type(&sample.entity.entity_type),
    }
}

fn filter_samples(samples: &[Sample], group: Option<GroupArg>) -> Vec<&Sample> {
    let event_type = group.map(|g| kubelet_lib::sample::metric_set_type_guesser(g.label()));

    samples
        .iter()
        .filter(|sample| match &event_type {
            Some(wanted) => sample.metrics.get("event_type") == Some(&RawValue::from(wanted.as_str())),
            None => true,
        })
        .collect()
}

/// Show the identified entities and their types
pub async fn show_entities(
    target: &Target,
    group: Option<GroupArg>,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = take_snapshot(target).await?;
    let samples = filter_samples(&snapshot.samples, group);

    match format {
        OutputFormat::Json => print_json(&samples)?,
        OutputFormat::Table => {
            println!("{}", "Entities".bold());
            println!("{}", "=".repeat(60));
            println!("Cluster: {}", target.cluster_name.cyan());
            println!();

            print_table(samples.iter().map(|s| entity_row(s)).collect());
            println!("\nTotal: {} entities", samples.len());

            if !snapshot.sample_errors.is_empty() {
                print_warning(&format!(
                    "{} entities could not be fully identified",
                    snapshot.sample_errors.len()
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubelet_lib::definition::{RawGroups, RawMetrics, CONTAINER, NODE};
    use kubelet_lib::{build_samples, kubelet_specs};

    fn samples() -> Vec<Sample> {
        let mut groups = RawGroups::new();

        let mut node = RawMetrics::new();
        node.insert("nodeName".into(), "node-1".into());
        groups.insert(NODE, "node-1", node);

        let mut container = RawMetrics::new();
        container.insert("containerName".into(), "nginx".into());
        container.insert("namespace".into(), "shop".into());
        groups.insert(CONTAINER, "shop_web-0_nginx", container);

        build_samples(&groups, &kubelet_specs(), "prod").0
    }

    #[test]
    fn test_filter_samples() {
        let samples = samples();

        assert_eq!(filter_samples(&samples, None).len(), 2);

        let containers = filter_samples(&samples, Some(GroupArg::Container));
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].entity.name, "nginx");

        assert!(filter_samples(&samples, Some(GroupArg::Pod)).is_empty());
    }

    #[test]
    fn test_entity_row() {
        colored::control::set_override(false);
        let samples = samples();
        let node = samples.iter().find(|s| s.entity.name == "node-1").unwrap();

        let row = entity_row(node);
        assert_eq!(row.event_type, "K8sNodeSample");
        assert_eq!(row.entity_type, "k8s:prod:node");
    }
}
