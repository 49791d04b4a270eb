//! `stackit observability credentials ...`

use super::models::{CreateCredentialsResponse, CredentialsResponse};
use super::{instance_label, paths, INSTANCE_ID_FLAG};
use crate::args::ArgSchema;
use crate::cells;
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::client::Service;
use crate::error::{Result, ResultExt};
use crate::examples::Example;
use crate::flags::{apply_limit, LIMIT_FLAG};
use crate::globalflags::GlobalFlags;
use crate::output::table::or_empty;
use crate::output::OutputFormat;
use serde::Serialize;
use serde_json::json;

pub fn command() -> CommandNode {
    CommandNode::group(
        "credentials",
        "Provides functionality for Observability credentials",
        "Provides functionality for Observability credentials.",
    )
    .with_children(vec![create_command(), delete_command(), list_command()])
}

fn instance_flag() -> FlagSpec {
    FlagSpec::value(INSTANCE_ID_FLAG, "Instance ID").required()
}

fn create_command() -> CommandNode {
    CommandNode::leaf(
        "create",
        "Creates credentials for an Observability instance.",
        "Creates credentials (username and password) for an Observability instance.\nThe credentials will be generated and included in the response. You won't be able to retrieve the password later.",
        create,
    )
    .with_flags(vec![instance_flag()])
    .with_examples(vec![Example::new(
        r#"Create credentials for Observability instance with ID "xxx""#,
        &["$ stackit observability credentials create --instance-id xxx"],
    )])
}

fn delete_command() -> CommandNode {
    CommandNode::leaf(
        "delete USERNAME",
        "Deletes credentials of an Observability instance",
        "Deletes credentials of an Observability instance.",
        delete,
    )
    .with_args(ArgSchema::single("USERNAME"))
    .with_flags(vec![instance_flag()])
    .with_examples(vec![Example::new(
        r#"Delete credentials of username "xxx" for Observability instance with ID "yyy""#,
        &["$ stackit observability credentials delete xxx --instance-id yyy"],
    )])
}

fn list_command() -> CommandNode {
    CommandNode::leaf(
        "list",
        "Lists the usernames of all credentials for an Observability instance",
        "Lists the usernames of all credentials for an Observability instance.",
        list,
    )
    .with_flags(vec![
        instance_flag(),
        FlagSpec::value(LIMIT_FLAG, "Maximum number of entries to list"),
    ])
    .with_examples(vec![
        Example::new(
            r#"List the usernames of all credentials for an Observability instance with ID "xxx""#,
            &["$ stackit observability credentials list --instance-id xxx"],
        ),
        Example::new(
            r#"List the usernames of all credentials for an Observability instance in JSON format"#,
            &["$ stackit observability credentials list --instance-id xxx --output-format json"],
        ),
        Example::new(
            r#"List the usernames of up to 10 credentials for an Observability instance"#,
            &["$ stackit observability credentials list --instance-id xxx --limit 10"],
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
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

fn create(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input {
        globals: inv.globals.clone(),
        instance_id: inv.flags().uuid(INSTANCE_ID_FLAG)?,
        username: None,
        limit: None,
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);
    inv.confirm(&format!(
        "Are you sure you want to create credentials for instance {label:?}?"
    ))?;

    let response: CreateCredentialsResponse = client
        .post(&paths::credentials(&project, &input.instance_id), &json!({}))
        .context("create credentials for Observability instance")?;

    let renderer = inv.renderer();
    let summary = format!("Created credentials for instance {label:?}.");
    if renderer.format() != OutputFormat::Pretty {
        return renderer.outcome(Some(&response), &summary);
    }
    inv.printer.output(&format!(
        "{summary}\n\nUsername: {}\nPassword: {}",
        response.credentials.username, response.credentials.password
    ));
    Ok(())
}

fn delete(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input {
        globals: inv.globals.clone(),
        instance_id: inv.flags().uuid(INSTANCE_ID_FLAG)?,
        username: Some(inv.arg().to_string()),
        limit: None,
    };
    inv.debug_input(&input);
    let username = input.username.clone().unwrap_or_default();

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);
    inv.confirm(&format!(
        "Are you sure you want to delete credentials for username {username:?} of instance {label:?}? (This cannot be undone)"
    ))?;

    client
        .delete(&paths::credential(&project, &input.instance_id, &username))
        .context("delete Observability credentials")?;

    inv.renderer().outcome::<()>(
        None,
        &format!("Deleted credentials of username {username:?}"),
    )
}

fn list(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input {
        globals: inv.globals.clone(),
        instance_id: inv.flags().uuid(INSTANCE_ID_FLAG)?,
        username: None,
        limit: inv.flags().limit()?,
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let response: CredentialsResponse = client
        .get(&paths::credentials(&project, &input.instance_id))
        .context("list credentials for Observability instance")?;

    if response.credentials.is_empty() {
        let label = instance_label(inv, &client, &project, &input.instance_id);
        inv.renderer()
            .empty(&format!("No credentials found for instance {label:?}"));
        return Ok(());
    }

    let credentials = apply_limit(response.credentials, input.limit);
    inv.renderer().render(&credentials, |table| {
        table.set_header(&["USERNAME"]);
        for credential in &credentials {
            table.add_row(cells![or_empty(&credential.name)]);
        }
        Ok(())
    })
}
