//! `domains`: the selectable catalog tree.

use serde::Serialize;
use tabled::Tabled;

use hostmirror_core::{Catalog, expand_selection};

use crate::cli::{GlobalOpts, SelectionArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct DomainEntry {
    id: &'static str,
    label: &'static str,
    depth: usize,
    queryable: bool,
    default: bool,
    selected: bool,
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Label")]
    label: &'static str,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Selected")]
    selected: String,
}

pub fn handle(args: &SelectionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global, &args.domains)?;
    let catalog = Catalog::builtin();
    let selection = expand_selection(catalog, &cfg.domains);

    let entries: Vec<DomainEntry> = catalog
        .walk()
        .into_iter()
        .map(|(depth, node)| {
            let queryable = catalog.is_queryable(node.id);
            DomainEntry {
                id: node.id,
                label: node.label,
                depth,
                queryable,
                default: node.default_selected,
                // A category counts as selected once every queryable descendant is.
                selected: if queryable {
                    selection.contains(node.id)
                } else {
                    let children = expand_selection(catalog, &[node.id]);
                    !children.is_empty() && children.iter().all(|id| selection.contains(id))
                },
            }
        })
        .collect();

    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &entries,
        |e| DomainRow {
            domain: format!("{}{}", "  ".repeat(e.depth), e.id),
            label: e.label,
            default: output::marker(e.default, color),
            selected: output::marker(e.selected, color),
        },
        |e| e.id.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
