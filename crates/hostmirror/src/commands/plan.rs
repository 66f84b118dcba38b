//! `plan`: the merged query for the effective selection.

use serde::Serialize;

use hostmirror_core::{Catalog, build_query_plan, expand_selection};

use crate::cli::{GlobalOpts, SelectionArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct PlanView {
    domains: Vec<&'static str>,
    roots: Vec<String>,
    query: Option<String>,
}

pub fn handle(args: &SelectionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global, &args.domains)?;
    let catalog = Catalog::builtin();
    let selection = expand_selection(catalog, &cfg.domains);
    let plan = build_query_plan(&selection.definitions(catalog));

    let view = PlanView {
        domains: selection.iter().collect(),
        roots: plan
            .as_ref()
            .map(|p| p.roots().map(str::to_owned).collect())
            .unwrap_or_default(),
        query: plan.map(|p| p.text().to_owned()),
    };
    let out = output::render_single(global.output, &view, |v| {
        v.query.clone().unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
