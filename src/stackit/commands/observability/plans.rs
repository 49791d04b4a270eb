use super::models::PlansResponse;
use super::paths;
use crate::cells;
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::client::Service;
use crate::error::{Result, ResultExt};
use crate::examples::Example;
use crate::flags::{apply_limit, LIMIT_FLAG};
use crate::globalflags::GlobalFlags;
use crate::output::table::or_empty;
use serde::Serialize;

pub fn command() -> CommandNode {
    CommandNode::leaf(
        "plans",
        "Lists all Observability service plans",
        "Lists all Observability service plans.",
        run,
    )
    .with_flags(vec![FlagSpec::value(
        LIMIT_FLAG,
        "Maximum number of entries to list",
    )])
    .with_examples(vec![
        Example::new(
            "List all Observability service plans",
            &["$ stackit observability plans"],
        ),
        Example::new(
            "List all Observability service plans in JSON format",
            &["$ stackit observability plans --output-format json"],
        ),
        Example::new(
            "List up to 10 Observability service plans",
            &["$ stackit observability plans --limit 10"],
        ),
    ])
}

#[derive(Debug, Serialize)]
struct Input {
    #[serde(flatten)]
    globals: GlobalFlags,
    limit: Option<usize>,
}

fn run(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input {
        globals: inv.globals.clone(),
        limit: inv.flags().limit()?,
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let response: PlansResponse = client
        .get(&paths::plans(&project))
        .context("get Observability service plans")?;

    if response.plans.is_empty() {
        let label = inv.project_label(&project);
        inv.renderer()
            .empty(&format!("No plans found for project {label:?}"));
        return Ok(());
    }

    let plans = apply_limit(response.plans, input.limit);
    inv.renderer().render(&plans, |table| {
        table.set_header(&["ID", "PLAN NAME", "DESCRIPTION"]);
        for plan in &plans {
            table.add_row(cells![
                or_empty(&plan.id),
                or_empty(&plan.name),
                or_empty(&plan.description)
            ]);
        }
        Ok(())
    })
}
