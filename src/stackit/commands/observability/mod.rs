//! `stackit observability`: plans, instances, credentials and scrape
//! configurations of the Observability service.
//!
//! Shared pieces live here: API paths, plan lookup, instance labels and the
//! waiters for asynchronous operations.

pub mod credentials;
pub mod grafana;
pub mod instance;
pub mod models;
pub mod plans;
pub mod scrape_config;

use crate::cli::{CommandNode, Invocation};
use crate::client::ServiceClient;
use crate::error::{CliError, InputError, Result};
use crate::wait::{Poller, WaitHandle, WaitState};
use models::{Instance, JobResponse, Plan};
use std::time::Duration;

pub const SERVICE: &str = "observability";

pub const INSTANCE_ID_FLAG: &str = "instance-id";

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const INSTANCE_TIMEOUT: Duration = Duration::from_secs(45 * 60);
const SCRAPE_CONFIG_TIMEOUT: Duration = Duration::from_secs(20 * 60);

pub fn command() -> CommandNode {
    CommandNode::group(
        "observability",
        "Provides functionality for Observability",
        "Provides functionality for Observability.",
    )
    .with_children(vec![
        plans::command(),
        instance::command(),
        credentials::command(),
        grafana::command(),
        scrape_config::command(),
    ])
}

pub(crate) mod paths {
    pub fn plans(project: &str) -> String {
        format!("/v1/projects/{project}/plans")
    }

    pub fn instances(project: &str) -> String {
        format!("/v1/projects/{project}/instances")
    }

    pub fn instance(project: &str, instance: &str) -> String {
        format!("{}/{instance}", instances(project))
    }

    pub fn credentials(project: &str, instance: &str) -> String {
        format!("{}/credentials", self::instance(project, instance))
    }

    pub fn credential(project: &str, instance: &str, username: &str) -> String {
        format!("{}/{username}", credentials(project, instance))
    }

    pub fn grafana_configs(project: &str, instance: &str) -> String {
        format!("{}/grafana-configs", self::instance(project, instance))
    }

    pub fn scrape_configs(project: &str, instance: &str) -> String {
        format!("{}/scrapeconfigs", self::instance(project, instance))
    }

    pub fn scrape_config(project: &str, instance: &str, job: &str) -> String {
        format!("{}/{job}", scrape_configs(project, instance))
    }
}

/// Which of `--plan-id` / `--plan-name` was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRef {
    Id(String),
    Name(String),
}

impl PlanRef {
    /// Reads the plan flags; at most one may be given.
    pub fn optional(inv: &Invocation) -> Result<Option<Self>> {
        let flags = inv.flags();
        let id = flags.uuid_opt(instance::PLAN_ID_FLAG)?;
        let name = flags
            .string_opt(instance::PLAN_NAME_FLAG)
            .filter(|n| !n.is_empty());
        match (id, name) {
            (Some(_), Some(_)) => Err(plan_selection_error(inv)),
            (None, None) => Ok(None),
            (Some(id), None) => Ok(Some(PlanRef::Id(id))),
            (None, Some(name)) => Ok(Some(PlanRef::Name(name))),
        }
    }

    /// Exactly one of the plan flags must be given.
    pub fn required(inv: &Invocation) -> Result<Self> {
        Self::optional(inv)?.ok_or_else(|| plan_selection_error(inv))
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            PlanRef::Id(id) => Some(id),
            PlanRef::Name(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            PlanRef::Name(name) => Some(name),
            PlanRef::Id(_) => None,
        }
    }

    /// The plan id, checked against the available plans.
    pub fn resolve(&self, plans: &[Plan]) -> Result<String> {
        match self {
            PlanRef::Id(id) => validate_plan_id(id, plans).map(|_| id.clone()),
            PlanRef::Name(name) => load_plan_id(name, plans),
        }
    }
}

fn plan_selection_error(inv: &Invocation) -> CliError {
    let mut command_path = inv.command_path.clone();
    for arg in &inv.args {
        command_path.push(' ');
        command_path.push_str(arg);
    }
    InputError::PlanSelection {
        command_path,
        service: SERVICE.to_string(),
    }
    .into()
}

pub fn validate_plan_id(plan_id: &str, plans: &[Plan]) -> Result<()> {
    let known = plans
        .iter()
        .filter_map(|p| p.id.as_deref())
        .any(|id| id.eq_ignore_ascii_case(plan_id));
    if known {
        return Ok(());
    }
    Err(InputError::InvalidPlan {
        service: SERVICE.to_string(),
        details: format!("You provided plan ID {plan_id:?}, which is invalid."),
    }
    .into())
}

/// Case-insensitive lookup of a plan id by name.
pub fn load_plan_id(plan_name: &str, plans: &[Plan]) -> Result<String> {
    let mut available = String::new();
    for plan in plans {
        let Some(name) = plan.name.as_deref() else {
            continue;
        };
        if name.eq_ignore_ascii_case(plan_name) {
            if let Some(id) = &plan.id {
                return Ok(id.clone());
            }
        }
        available.push_str("\n- ");
        available.push_str(name);
    }
    Err(InputError::InvalidPlan {
        service: SERVICE.to_string(),
        details: format!(
            "You provided plan name {plan_name:?}, which is invalid. Available plan names are: {available}"
        ),
    }
    .into())
}

/// Instance name for prompts and messages, falling back to the id.
pub fn instance_label(inv: &Invocation, client: &ServiceClient, project: &str, id: &str) -> String {
    match client.get::<Instance>(&paths::instance(project, id)) {
        Ok(Instance {
            name: Some(name), ..
        }) if !name.is_empty() => name,
        Ok(_) => id.to_string(),
        Err(e) => {
            inv.printer.debug(format!("get instance name: {e}"));
            id.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceOperation {
    Create,
    Update,
    Delete,
}

impl InstanceOperation {
    fn succeeded(self) -> &'static str {
        match self {
            InstanceOperation::Create => "CREATE_SUCCEEDED",
            InstanceOperation::Update => "UPDATE_SUCCEEDED",
            InstanceOperation::Delete => "DELETE_SUCCEEDED",
        }
    }

    fn failed(self) -> &'static str {
        match self {
            InstanceOperation::Create => "CREATE_FAILED",
            InstanceOperation::Update => "UPDATE_FAILED",
            InstanceOperation::Delete => "DELETE_FAILED",
        }
    }
}

/// Polls an instance until `operation` reaches a terminal status. A deleted
/// instance that is already gone counts as done.
pub fn instance_waiter<'c>(
    inv: &Invocation,
    client: &'c ServiceClient,
    project: &str,
    id: &str,
    operation: InstanceOperation,
) -> impl WaitHandle<Output = ()> + 'c {
    let path = paths::instance(project, id);
    let id = id.to_string();
    Poller::new(
        move || -> Result<WaitState<()>> {
            let instance = match client.get::<Instance>(&path) {
                Ok(instance) => instance,
                Err(e) if operation == InstanceOperation::Delete && is_not_found(&e) => {
                    return Ok(WaitState::Done(()))
                }
                Err(e) => return Err(e),
            };
            let status = instance.status.as_deref().unwrap_or_default();
            tracing::debug!(instance = %id, status, "polled instance");
            if status == operation.succeeded() {
                Ok(WaitState::Done(()))
            } else if status == operation.failed() {
                Err(CliError::Remote(format!(
                    "instance {id} ended in status {status}"
                )))
            } else {
                Ok(WaitState::Pending)
            }
        },
        inv.wait_interval(POLL_INTERVAL),
        INSTANCE_TIMEOUT,
    )
}

/// Polls until the job exists (`present`) or is gone (`!present`).
pub fn scrape_config_waiter<'c>(
    inv: &Invocation,
    client: &'c ServiceClient,
    project: &str,
    instance: &str,
    job: &str,
    present: bool,
) -> impl WaitHandle<Output = ()> + 'c {
    let path = paths::scrape_config(project, instance, job);
    Poller::new(
        move || -> Result<WaitState<()>> {
            match client.get::<JobResponse>(&path) {
                Ok(_) if present => Ok(WaitState::Done(())),
                Ok(_) => Ok(WaitState::Pending),
                Err(e) if is_not_found(&e) && !present => Ok(WaitState::Done(())),
                Err(e) if is_not_found(&e) => Ok(WaitState::Pending),
                Err(e) => Err(e),
            }
        },
        inv.wait_interval(POLL_INTERVAL),
        SCRAPE_CONFIG_TIMEOUT,
    )
}

fn is_not_found(e: &CliError) -> bool {
    matches!(e.root(), CliError::NotFound { .. })
}

/// "Created" or "Triggered creation of", depending on `--async`.
pub fn operation_state(inv: &Invocation, done: &'static str, triggered: &'static str) -> &'static str {
    if inv.is_async() {
        triggered
    } else {
        done
    }
}
