//! `stackit observability scrape-config ...`

use super::models::{Job, JobResponse, JobsResponse};
use super::{instance_label, operation_state, paths, scrape_config_waiter, INSTANCE_ID_FLAG};
use crate::args::ArgSchema;
use crate::cells;
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::client::Service;
use crate::error::{InputError, Result, ResultExt};
use crate::examples::Example;
use crate::flags::{apply_limit, LIMIT_FLAG};
use crate::globalflags::GlobalFlags;
use crate::output::table::or_empty;
use crate::output::to_json;
use serde::Serialize;
use std::fs;

pub const PAYLOAD_FLAG: &str = "payload";
pub const JOB_NAME_FLAG: &str = "job-name";
pub const FILE_PATH_FLAG: &str = "file-path";

const JOB_NAME_ARG: &str = "JOB_NAME";

const PAYLOAD_DOCS: &str = "See https://docs.api.stackit.cloud/documentation/argus/version/v1#tag/scrape-config/operation/v1_projects_instances_scrapeconfigs_create for information regarding the payload structure.";

pub fn command() -> CommandNode {
    CommandNode::group(
        "scrape-config",
        "Provides functionality for scrape configurations in Observability",
        "Provides functionality for scrape configurations in Observability.",
    )
    .with_children(vec![
        create_command(),
        delete_command(),
        describe_command(),
        generate_payload_command(),
        list_command(),
        update_command(),
    ])
}

fn instance_flag() -> FlagSpec {
    FlagSpec::value(INSTANCE_ID_FLAG, "Instance ID").required()
}

fn create_command() -> CommandNode {
    CommandNode::leaf(
        "create",
        "Creates a scrape configuration for an Observability instance",
        "Creates a scrape configuration job for an Observability instance.\nThe payload can be provided as a JSON string or a file path prefixed with \"@\".\nIf no payload is provided, a default payload will be used.\nSee https://docs.api.stackit.cloud/documentation/argus/version/v1#tag/scrape-config/operation/v1_projects_instances_scrapeconfigs_create for information regarding the payload structure.",
        create,
    )
    .with_flags(vec![
        FlagSpec::value(
            PAYLOAD_FLAG,
            "Request payload (JSON). Can be a string or a file path, if prefixed with \"@\" (example: @./payload.json). If unset, will use a default payload (you can check it by running \"stackit observability scrape-config generate-payload\")",
        ),
        instance_flag(),
    ])
    .with_examples(vec![
        Example::new(
            r#"Create a scrape configuration on Observability instance "xxx" using default configuration"#,
            &["$ stackit observability scrape-config create --instance-id xxx"],
        ),
        Example::new(
            r#"Create a scrape configuration on Observability instance "xxx" using an API payload sourced from the file "./payload.json""#,
            &["$ stackit observability scrape-config create --payload @./payload.json --instance-id xxx"],
        ),
        Example::new(
            r#"Create a scrape configuration on Observability instance "xxx" using an API payload provided as a JSON string"#,
            &[r#"$ stackit observability scrape-config create --payload "{...}" --instance-id xxx"#],
        ),
        Example::new(
            "Generate a payload with default values, and adapt it with custom values for the different configuration options",
            &[
                "$ stackit observability scrape-config generate-payload > ./payload.json",
                "<Modify payload in file, if needed>",
                "$ stackit observability scrape-config create --payload @./payload.json --instance-id xxx",
            ],
        ),
    ])
}

fn delete_command() -> CommandNode {
    CommandNode::leaf(
        "delete JOB_NAME",
        "Deletes a scrape configuration from an Observability instance",
        "Deletes a scrape configuration from an Observability instance.",
        delete,
    )
    .with_args(ArgSchema::single(JOB_NAME_ARG))
    .with_flags(vec![instance_flag()])
    .with_examples(vec![Example::new(
        r#"Delete a scrape configuration job with name "my-config" from Observability instance "xxx""#,
        &["$ stackit observability scrape-config delete my-config --instance-id xxx"],
    )])
}

fn describe_command() -> CommandNode {
    CommandNode::leaf(
        "describe JOB_NAME",
        "Shows details of a scrape configuration from an Observability instance",
        "Shows details of a scrape configuration from an Observability instance.",
        describe,
    )
    .with_args(ArgSchema::single(JOB_NAME_ARG))
    .with_flags(vec![instance_flag()])
    .with_examples(vec![
        Example::new(
            r#"Get details of a scrape configuration with name "my-config" from Observability instance "xxx""#,
            &["$ stackit observability scrape-config describe my-config --instance-id xxx"],
        ),
        Example::new(
            r#"Get details of a scrape configuration with name "my-config" from Observability instance "xxx" in JSON format"#,
            &["$ stackit observability scrape-config describe my-config --output-format json"],
        ),
    ])
}

fn generate_payload_command() -> CommandNode {
    CommandNode::leaf(
        "generate-payload",
        "Generates a payload to create/update scrape configurations for an Observability instance ",
        "Generates a JSON payload with values to be used as --payload input for scrape configurations creation or update.\nThis command can be used to generate a payload to update an existing scrape config or to create a new scrape config job.\nTo update an existing scrape config job, provide the job name and the instance ID of the Observability instance.\nTo obtain a default payload to create a new scrape config job, run the command with no flags.\nNote that some of the default values provided, such as the job name, the metrics path and URL of the targets, should be adapted to your use case.\nSee https://docs.api.stackit.cloud/documentation/argus/version/v1#tag/scrape-config/operation/v1_projects_instances_scrapeconfigs_create for information regarding the payload structure.",
        generate_payload,
    )
    .with_flags(vec![
        FlagSpec::value(INSTANCE_ID_FLAG, "Instance ID"),
        FlagSpec::value(
            JOB_NAME_FLAG,
            "If set, generates an update payload with the current state of the given scrape config. If unset, generates a create payload with default values",
        )
        .short('n'),
        FlagSpec::value(
            FILE_PATH_FLAG,
            "If set, writes the payload to the given file. If unset, writes the payload to the standard output",
        )
        .short('f'),
    ])
    .with_examples(vec![
        Example::new(
            "Generate a Create payload with default values, and adapt it with custom values for the different configuration options",
            &[
                "$ stackit observability scrape-config generate-payload --file-path ./payload.json",
                "<Modify payload in file, if needed>",
                "$ stackit observability scrape-config create my-config --payload @./payload.json",
            ],
        ),
        Example::new(
            r#"Generate an Update payload with the values of an existing configuration named "my-config" for Observability instance xxx, and adapt it with custom values for the different configuration options"#,
            &[
                "$ stackit observability scrape-config generate-payload --job-name my-config --instance-id xxx --file-path ./payload.json",
                "<Modify payload in file>",
                "$ stackit observability scrape-config update my-config --payload @./payload.json",
            ],
        ),
        Example::new(
            r#"Generate an Update payload with the values of an existing configuration named "my-config" for Observability instance xxx, and preview it in the terminal"#,
            &["$ stackit observability scrape-config generate-payload --job-name my-config --instance-id xxx"],
        ),
    ])
}

fn list_command() -> CommandNode {
    CommandNode::leaf(
        "list",
        "Lists all scrape configurations of an Observability instance",
        "Lists all scrape configurations of an Observability instance.",
        list,
    )
    .with_flags(vec![
        instance_flag(),
        FlagSpec::value(LIMIT_FLAG, "Maximum number of entries to list"),
    ])
    .with_examples(vec![
        Example::new(
            r#"List all scrape configurations of Observability instance "xxx""#,
            &["$ stackit observability scrape-config list --instance-id xxx"],
        ),
        Example::new(
            r#"List all scrape configurations of Observability instance "xxx" in JSON format"#,
            &["$ stackit observability scrape-config list --instance-id xxx --output-format json"],
        ),
        Example::new(
            r#"List up to 10 scrape configurations of Observability instance "xxx""#,
            &["$ stackit observability scrape-config list --instance-id xxx --limit 10"],
        ),
    ])
}

fn update_command() -> CommandNode {
    CommandNode::leaf(
        "update JOB_NAME",
        "Updates a scrape configuration of an Observability instance",
        "Updates a scrape configuration of an Observability instance.\nThe payload can be provided as a JSON string or a file path prefixed with \"@\".\nSee https://docs.api.stackit.cloud/documentation/argus/version/v1#tag/scrape-config/operation/v1_projects_instances_scrapeconfigs_update for information regarding the payload structure.",
        update,
    )
    .with_args(ArgSchema::single(JOB_NAME_ARG))
    .with_flags(vec![
        FlagSpec::value(
            PAYLOAD_FLAG,
            "Request payload (JSON). Can be a string or a file path, if prefixed with \"@\". Example: @./payload.json",
        )
        .required(),
        instance_flag(),
    ])
    .with_examples(vec![
        Example::new(
            r#"Update a scrape configuration with name "my-config" from Observability instance "xxx", using an API payload sourced from the file "./payload.json""#,
            &["$ stackit observability scrape-config update my-config --payload @./payload.json --instance-id xxx"],
        ),
        Example::new(
            "Generate a payload with the current values of a scrape configuration, and adapt it with custom values for the different configuration options",
            &[
                "$ stackit observability scrape-config generate-payload --job-name my-config > ./payload.json",
                "<Modify payload in file>",
                "$ stackit observability scrape-config update my-config --payload @./payload.json",
            ],
        ),
    ])
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Input {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Job>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

impl Input {
    fn parse(inv: &Invocation) -> Result<Self> {
        Ok(Self {
            globals: inv.globals.clone(),
            instance_id: inv.flags().uuid(INSTANCE_ID_FLAG)?,
            job_name: inv.args.first().cloned(),
            payload: parse_payload(inv)?,
            limit: None,
        })
    }

    /// `--payload` or the default one. The payload has to name its job; the
    /// name is returned alongside.
    fn parse_create(inv: &Invocation) -> Result<(Self, String)> {
        let mut input = Self::parse(inv)?;
        let payload = input.payload.take().unwrap_or_else(Job::default_payload);
        let job_name = payload
            .job_name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                InputError::flag(
                    PAYLOAD_FLAG,
                    format!("the payload must contain a jobName. {PAYLOAD_DOCS}"),
                )
            })?;
        input.job_name = Some(job_name.clone());
        input.payload = Some(payload);
        Ok((input, job_name))
    }
}

/// `--payload`: inline JSON or `@file`.
fn parse_payload(inv: &Invocation) -> Result<Option<Job>> {
    match inv.flags().read_from_file(PAYLOAD_FLAG)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| InputError::flag(PAYLOAD_FLAG, format!("encode payload: {e}")).into()),
        None => Ok(None),
    }
}

fn create(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let (input, job_name) = Input::parse_create(inv)?;
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);

    inv.confirm(&format!(
        "Are you sure you want to create scrape configuration {job_name:?} on Observability instance {label:?}?"
    ))?;

    client
        .post::<_, serde_json::Value>(
            &paths::scrape_configs(&project, &input.instance_id),
            &input.payload,
        )
        .context("create scrape configuration")?;

    if !inv.is_async() {
        inv.wait(
            "Creating scrape config",
            scrape_config_waiter(inv, &client, &project, &input.instance_id, &job_name, true),
        )
        .context("wait for scrape configuration creation")?;
    }

    let state = operation_state(inv, "Created", "Triggered creation of");
    inv.renderer().outcome::<()>(
        None,
        &format!(
            "{state} scrape configuration with name {job_name:?} for Observability instance {label:?}"
        ),
    )
}

fn delete(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input::parse(inv)?;
    inv.debug_input(&input);
    let job_name = inv.arg().to_string();

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);
    inv.confirm(&format!(
        "Are you sure you want to delete scrape configuration {job_name:?} on Observability instance {label:?}? (This cannot be undone)"
    ))?;

    client
        .delete(&paths::scrape_config(&project, &input.instance_id, &job_name))
        .context("delete scrape configuration")?;

    if !inv.is_async() {
        inv.wait(
            "Deleting scrape config",
            scrape_config_waiter(inv, &client, &project, &input.instance_id, &job_name, false),
        )
        .context("wait for scrape config deletion")?;
    }

    let state = operation_state(inv, "Deleted", "Triggered deletion of");
    inv.renderer().outcome::<()>(
        None,
        &format!(
            "{state} scrape configuration with name {job_name:?} for Observability instance {label:?}"
        ),
    )
}

fn describe(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input::parse(inv)?;
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let response: JobResponse = client
        .get(&paths::scrape_config(&project, &input.instance_id, inv.arg()))
        .context("read scrape configuration")?;
    let job = response.data;

    inv.renderer().render(&job, |table| {
        table.add_row(cells!["NAME", or_empty(&job.job_name)]);
        table.add_separator();
        table.add_row(cells!["METRICS PATH", or_empty(&job.metrics_path)]);
        table.add_separator();
        table.add_row(cells!["SCHEME", or_empty(&job.scheme)]);
        table.add_separator();
        table.add_row(cells!["SCRAPE INTERVAL", or_empty(&job.scrape_interval)]);
        table.add_separator();
        table.add_row(cells!["SCRAPE TIMEOUT", or_empty(&job.scrape_timeout)]);
        table.add_separator();
        let saml2 = if job.saml2_enabled() { "Enabled" } else { "Disabled" };
        table.add_row(cells!["SAML2", saml2]);
        table.add_separator();
        match &job.basic_auth {
            None => table.add_row(cells!["AUTHENTICATION", "None"]),
            Some(auth) => {
                table.add_row(cells!["AUTHENTICATION", "Basic Auth"]);
                table.add_separator();
                table.add_row(cells!["USERNAME", or_empty(&auth.username)]);
                table.add_separator();
                table.add_row(cells!["PASSWORD", or_empty(&auth.password)]);
            }
        }
        table.add_separator();
        for (i, target) in job.static_configs.iter().flatten().enumerate() {
            let labels = match &target.labels {
                Some(labels) if !labels.is_empty() => labels
                    .iter()
                    .map(|(k, v)| format!("{k}:{v}"))
                    .collect::<Vec<_>>()
                    .join(","),
                _ => "N/A".to_string(),
            };
            let urls = if target.targets.is_empty() {
                "N/A".to_string()
            } else {
                target.targets.join(",")
            };
            table.add_row(cells![
                format!("TARGET #{}", i + 1),
                format!("labels: {labels}\nurls: {urls}")
            ]);
            table.add_separator();
        }
        Ok(())
    })
}

fn list(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let mut input = Input::parse(inv)?;
    input.limit = inv.flags().limit()?;
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let response: JobsResponse = client
        .get(&paths::scrape_configs(&project, &input.instance_id))
        .context("get scrape configurations")?;

    if response.data.is_empty() {
        let label = instance_label(inv, &client, &project, &input.instance_id);
        inv.renderer().empty(&format!(
            "No scrape configurations found for instance {label:?}"
        ));
        return Ok(());
    }

    let jobs = apply_limit(response.data, input.limit);
    inv.renderer().render(&jobs, |table| {
        table.set_header(&["NAME", "TARGETS", "SCRAPE INTERVAL"]);
        for job in &jobs {
            let targets: usize = job
                .static_configs
                .iter()
                .flatten()
                .map(|c| c.targets.len())
                .sum();
            table.add_row(cells![
                or_empty(&job.job_name),
                targets,
                or_empty(&job.scrape_interval)
            ]);
        }
        Ok(())
    })
}

fn update(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let mut input = Input::parse(inv)?;
    inv.debug_input(&input);
    let job_name = inv.arg().to_string();
    let payload = input
        .payload
        .take()
        .ok_or_else(|| InputError::flag(PAYLOAD_FLAG, "must not be empty"))?
        .into_update_payload();

    let client = inv.client(Service::Observability)?;
    inv.confirm(&format!(
        "Are you sure you want to update scrape configuration {job_name:?}?"
    ))?;

    client
        .put::<_, serde_json::Value>(
            &paths::scrape_config(&project, &input.instance_id, &job_name),
            &payload,
        )
        .context("update scrape config")?;

    inv.renderer().outcome::<()>(
        None,
        &format!("Updated Observability scrape configuration with name {job_name:?}"),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateInput {
    #[serde(flatten)]
    globals: GlobalFlags,
    job_name: Option<String>,
    instance_id: Option<String>,
    file_path: Option<String>,
}

fn generate_payload(inv: &mut Invocation) -> Result<()> {
    let flags = inv.flags();
    let input = GenerateInput {
        globals: inv.globals.clone(),
        job_name: flags.string_opt(JOB_NAME_FLAG).filter(|n| !n.is_empty()),
        instance_id: flags.uuid_opt(INSTANCE_ID_FLAG)?,
        file_path: flags.string_opt(FILE_PATH_FLAG).filter(|p| !p.is_empty()),
    };
    inv.debug_input(&input);

    let payload = match &input.job_name {
        None => Job::default_payload(),
        Some(job_name) => {
            let (Some(project), Some(instance_id)) =
                (input.globals.project_id.as_deref(), input.instance_id.as_deref())
            else {
                return Err(InputError::Invalid(
                    "if a job-name is provided then instance-id and project-id must be provided"
                        .to_string(),
                )
                .into());
            };
            let client = inv.client(Service::Observability)?;
            let response: JobResponse = client
                .get(&paths::scrape_config(project, instance_id, job_name))
                .context("read Observability scrape config")?;
            response.data.into_update_payload()
        }
    };

    let json = to_json(&payload)?;
    match &input.file_path {
        Some(path) => fs::write(path, format!("{json}\n")).context("write payload to the file")?,
        None => inv.printer.output(&json),
    }
    Ok(())
}
