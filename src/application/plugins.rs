//! Per-plugin statistics.
//!
//! Plugin lists are the one place a list is interpreted: each element's `id` and `name`
//! become labels so plugin identities never end up in metric names.

use crate::application::flattener::{Flattened, TreeFlattener, join_path};
use crate::domain::errors::ScrapeError;
use crate::domain::stats::{LabelSet, StatsNode};

pub const PLUGIN_SECTIONS: [&str; 3] = ["inputs", "filters", "outputs"];

const ID_KEY: &str = "id";
const NAME_KEY: &str = "name";

/// Flattens every plugin listed under `section` of `container` with prefix
/// `<name_prefix>_<section>`.
///
/// `labels` is the label set of the enclosing pipeline; `id` and `name` are added per plugin.
/// A missing or malformed section fails as a whole; a malformed entry is skipped and reported
/// in the returned errors.
pub fn collect_plugins(
    flattener: &TreeFlattener,
    name_prefix: &str,
    section: &str,
    container: &StatsNode,
    labels: &LabelSet,
) -> Result<Flattened, ScrapeError> {
    let section_path = join_path(name_prefix, section);

    let plugins = container
        .as_mapping()
        .ok_or_else(|| ScrapeError::shape(name_prefix, "mapping", container.kind()))?
        .get(section)
        .ok_or_else(|| ScrapeError::shape(section_path.clone(), "list", "nothing"))?;
    let plugins = plugins
        .as_list()
        .ok_or_else(|| ScrapeError::shape(section_path.clone(), "list", plugins.kind()))?;

    let mut collected = Flattened::default();
    for plugin in plugins {
        let Some(entries) = plugin.as_mapping() else {
            collected
                .errors
                .push(ScrapeError::shape(section_path.clone(), "mapping", plugin.kind()));
            continue;
        };

        let mut plugin_labels = labels.clone();
        plugin_labels.insert(ID_KEY.to_string(), label_value(entries.get(ID_KEY)));
        plugin_labels.insert(NAME_KEY.to_string(), label_value(entries.get(NAME_KEY)));

        collected.append(flattener.flatten_entries(
            &section_path,
            entries,
            &[ID_KEY, NAME_KEY],
            &plugin_labels,
        ));
    }

    Ok(collected)
}

fn label_value(node: Option<&StatsNode>) -> String {
    match node {
        Some(StatsNode::Text(text)) => text.clone(),
        Some(StatsNode::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
