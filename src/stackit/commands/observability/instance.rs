//! `stackit observability instance ...`

use super::models::{CreateInstanceResponse, Instance, InstancePayload, InstancesResponse, PlansResponse};
use super::{
    instance_label, instance_waiter, operation_state, paths, InstanceOperation, PlanRef,
};
use crate::args::ArgSchema;
use crate::cells;
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::client::{Service, ServiceClient};
use crate::error::{InputError, Result, ResultExt};
use crate::examples::Example;
use crate::flags::{apply_limit, validate_uuid, LIMIT_FLAG};
use crate::globalflags::GlobalFlags;
use crate::output::table::or_empty;
use serde::Serialize;

pub const NAME_FLAG: &str = "name";
pub const PLAN_ID_FLAG: &str = "plan-id";
pub const PLAN_NAME_FLAG: &str = "plan-name";

const INSTANCE_ID_ARG: &str = "INSTANCE_ID";

pub fn command() -> CommandNode {
    CommandNode::group(
        "instance",
        "Provides functionality for Observability instances",
        "Provides functionality for Observability instances.",
    )
    .with_children(vec![
        create_command(),
        delete_command(),
        describe_command(),
        list_command(),
        update_command(),
    ])
}

fn create_command() -> CommandNode {
    CommandNode::leaf(
        "create",
        "Creates an Observability instance",
        "Creates an Observability instance.",
        create,
    )
    .with_flags(vec![
        FlagSpec::value(NAME_FLAG, "Instance name").short('n').required(),
        FlagSpec::value(PLAN_ID_FLAG, "Plan ID"),
        FlagSpec::value(PLAN_NAME_FLAG, "Plan name"),
    ])
    .with_examples(vec![
        Example::new(
            r#"Create an Observability instance with name "my-instance" and specify plan by name"#,
            &["$ stackit observability instance create --name my-instance --plan-name Monitoring-Starter-EU01"],
        ),
        Example::new(
            r#"Create an Observability instance with name "my-instance" and specify plan by ID"#,
            &["$ stackit observability instance create --name my-instance --plan-id xxx"],
        ),
    ])
}

fn delete_command() -> CommandNode {
    CommandNode::leaf(
        "delete INSTANCE_ID",
        "Deletes an Observability instance",
        "Deletes an Observability instance.",
        delete,
    )
    .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
    .with_examples(vec![Example::new(
        r#"Delete an Observability instance with ID "xxx""#,
        &["$ stackit observability instance delete xxx"],
    )])
}

fn describe_command() -> CommandNode {
    CommandNode::leaf(
        "describe INSTANCE_ID",
        "Shows details of an Observability instance",
        "Shows details of an Observability instance.",
        describe,
    )
    .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
    .with_examples(vec![
        Example::new(
            r#"Get details of an Observability instance with ID "xxx""#,
            &["$ stackit observability instance describe xxx"],
        ),
        Example::new(
            r#"Get details of an Observability instance with ID "xxx" in JSON format"#,
            &["$ stackit observability instance describe xxx --output-format json"],
        ),
    ])
}

fn list_command() -> CommandNode {
    CommandNode::leaf(
        "list",
        "Lists all Observability instances",
        "Lists all Observability instances.",
        list,
    )
    .with_flags(vec![FlagSpec::value(
        LIMIT_FLAG,
        "Maximum number of entries to list",
    )])
    .with_examples(vec![
        Example::new(
            "List all Observability instances",
            &["$ stackit observability instance list"],
        ),
        Example::new(
            "List all Observability instances in JSON format",
            &["$ stackit observability instance list --output-format json"],
        ),
        Example::new(
            "List up to 10 Observability instances",
            &["$ stackit observability instance list --limit 10"],
        ),
    ])
}

fn update_command() -> CommandNode {
    CommandNode::leaf(
        "update INSTANCE_ID",
        "Updates an Observability instance",
        "Updates an Observability instance.",
        update,
    )
    .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
    .with_flags(vec![
        FlagSpec::value(NAME_FLAG, "Instance name").short('n'),
        FlagSpec::value(PLAN_ID_FLAG, "Plan ID"),
        FlagSpec::value(PLAN_NAME_FLAG, "Plan name"),
    ])
    .with_examples(vec![
        Example::new(
            r#"Update the plan of an Observability instance with ID "xxx" by specifying the plan ID"#,
            &["$ stackit observability instance update xxx --plan-id yyy"],
        ),
        Example::new(
            r#"Update the plan of an Observability instance with ID "xxx" by specifying the plan name"#,
            &["$ stackit observability instance update xxx --plan-name Frontend-Starter-EU01"],
        ),
        Example::new(
            r#"Update the name of an Observability instance with ID "xxx""#,
            &["$ stackit observability instance update xxx --name new-instance-name"],
        ),
    ])
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_name: String,
    plan_id: Option<String>,
    plan_name: Option<String>,
}

fn fetch_plans(client: &ServiceClient, project: &str) -> Result<PlansResponse> {
    client
        .get(&paths::plans(project))
        .context("get Observability plans")
}

fn create(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let plan = PlanRef::required(inv)?;
    let input = CreateInput {
        globals: inv.globals.clone(),
        instance_name: inv.flags().string(NAME_FLAG),
        plan_id: plan.id().map(str::to_string),
        plan_name: plan.name().map(str::to_string),
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let project_label = inv.project_label(&project);
    inv.confirm(&format!(
        "Are you sure you want to create an Observability instance for project {project_label:?}?"
    ))?;

    let plans = fetch_plans(&client, &project)?;
    let payload = InstancePayload {
        name: input.instance_name.clone(),
        plan_id: plan.resolve(&plans.plans)?,
    };
    let response: CreateInstanceResponse = client
        .post(&paths::instances(&project), &payload)
        .context("create Observability instance")?;

    if !inv.is_async() {
        inv.wait(
            "Creating instance",
            instance_waiter(inv, &client, &project, &response.instance_id, InstanceOperation::Create),
        )
        .context("wait for Observability instance creation")?;
    }

    let state = operation_state(inv, "Created", "Triggered creation of");
    inv.renderer().outcome(
        Some(&response),
        &format!(
            "{state} instance for project {project_label:?}. Instance ID: {}",
            response.instance_id
        ),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
}

fn instance_input(inv: &Invocation) -> InstanceInput {
    InstanceInput {
        globals: inv.globals.clone(),
        instance_id: inv.arg().to_string(),
    }
}

fn delete(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = instance_input(inv);
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);
    inv.confirm(&format!(
        "Are you sure you want to delete instance {label:?}? (This cannot be undone)"
    ))?;

    client
        .delete(&paths::instance(&project, &input.instance_id))
        .context("delete Observability instance")?;

    if !inv.is_async() {
        inv.wait(
            "Deleting instance",
            instance_waiter(inv, &client, &project, &input.instance_id, InstanceOperation::Delete),
        )
        .context("wait for Observability instance deletion")?;
    }

    let state = operation_state(inv, "Deleted", "Triggered deletion of");
    inv.renderer()
        .outcome::<()>(None, &format!("{state} instance {label:?}"))
}

fn describe(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = instance_input(inv);
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let instance: Instance = client
        .get(&paths::instance(&project, &input.instance_id))
        .context("read Observability instance")?;

    inv.renderer().render(&instance, |table| {
        table.add_row(cells!["ID", or_empty(&instance.id)]);
        table.add_separator();
        table.add_row(cells!["NAME", or_empty(&instance.name)]);
        table.add_separator();
        table.add_row(cells!["STATUS", or_empty(&instance.status)]);
        table.add_separator();
        table.add_row(cells!["PLAN NAME", or_empty(&instance.plan_name)]);
        table.add_separator();
        table.add_row(cells!["PLAN ID", or_empty(&instance.plan_id)]);
        table.add_separator();
        for (title, path) in [
            ("DASHBOARD URL", &["dashboardUrl"][..]),
            ("GRAFANA URL", &["instance", "grafanaUrl"][..]),
            ("METRICS URL", &["instance", "metricsUrl"][..]),
        ] {
            table.add_row(cells![title, instance.extra_str(path).unwrap_or_default()]);
            table.add_separator();
        }
        Ok(())
    })
}

#[derive(Debug, Serialize)]
struct ListInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    limit: Option<usize>,
}

fn list(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = ListInput {
        globals: inv.globals.clone(),
        limit: inv.flags().limit()?,
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let response: InstancesResponse = client
        .get(&paths::instances(&project))
        .context("get Observability instances")?;

    if response.instances.is_empty() {
        let label = inv.project_label(&project);
        inv.renderer()
            .empty(&format!("No instances found for project {label:?}"));
        return Ok(());
    }

    let instances = apply_limit(response.instances, input.limit);
    inv.renderer().render(&instances, |table| {
        table.set_header(&["ID", "NAME", "PLAN", "STATUS"]);
        for instance in &instances {
            table.add_row(cells![
                or_empty(&instance.id),
                or_empty(&instance.name),
                or_empty(&instance.plan_name),
                or_empty(&instance.status)
            ]);
        }
        Ok(())
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
    instance_name: Option<String>,
    plan_id: Option<String>,
    plan_name: Option<String>,
}

fn update(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let plan = PlanRef::optional(inv)?;
    let name = inv.flags().string_opt(NAME_FLAG).filter(|n| !n.is_empty());
    if plan.is_none() && name.is_none() {
        return Err(InputError::EmptyUpdate.into());
    }
    let input = UpdateInput {
        globals: inv.globals.clone(),
        instance_id: inv.arg().to_string(),
        instance_name: name,
        plan_id: plan.as_ref().and_then(PlanRef::id).map(str::to_string),
        plan_name: plan.as_ref().and_then(PlanRef::name).map(str::to_string),
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);
    inv.confirm(&format!("Are you sure you want to update instance {label:?}?"))?;

    let path = paths::instance(&project, &input.instance_id);
    let plans = fetch_plans(&client, &project)?;
    let current: Instance = client.get(&path).context("get Observability instance")?;

    let plan_id = match &plan {
        Some(plan) => plan.resolve(&plans.plans)?,
        None => current.plan_id.clone().unwrap_or_default(),
    };
    let payload = InstancePayload {
        name: input
            .instance_name
            .clone()
            .or(current.name)
            .unwrap_or_default(),
        plan_id,
    };
    client
        .put::<_, serde_json::Value>(&path, &payload)
        .context("update Observability instance")?;

    if !inv.is_async() {
        inv.wait(
            "Updating instance",
            instance_waiter(inv, &client, &project, &input.instance_id, InstanceOperation::Update),
        )
        .context("wait for Observability instance update")?;
    }

    let state = operation_state(inv, "Updated", "Triggered update of");
    inv.renderer()
        .outcome::<()>(None, &format!("{state} instance {label:?}"))
}
