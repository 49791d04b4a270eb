//! `stackit observability grafana ...`

use super::instance_label;
use super::models::{GrafanaConfigs, Instance};
use super::paths;
use crate::args::ArgSchema;
use crate::cells;
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::client::{Service, ServiceClient};
use crate::error::{Result, ResultExt};
use crate::examples::Example;
use crate::flags::validate_uuid;
use crate::globalflags::GlobalFlags;
use crate::output::table::or_empty;
use serde::Serialize;

pub const SHOW_PASSWORD_FLAG: &str = "show-password";

const INSTANCE_ID_ARG: &str = "INSTANCE_ID";
const HIDDEN: &str = "<hidden>";

pub fn command() -> CommandNode {
    CommandNode::group(
        "grafana",
        "Provides functionality for the Grafana configuration of Observability instances",
        "Provides functionality for the Grafana configuration of Observability instances.",
    )
    .with_children(vec![
        describe_command(),
        public_read_access_command(),
        single_sign_on_command(),
    ])
}

fn describe_command() -> CommandNode {
    CommandNode::leaf(
        "describe INSTANCE_ID",
        "Shows details of the Grafana configuration of an Observability instance",
        "Shows details of the Grafana configuration of an Observability instance.\nThe Grafana dashboard URL and initial credentials (admin user and password) will be shown in the \"pretty\" output format. These credentials are only valid for first login. Please change the password after first login. After changing, the initial password is no longer valid.\nThe initial password is hidden by default, if you want to show it use the \"--show-password\" flag.",
        describe,
    )
    .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
    .with_flags(vec![
        FlagSpec::bool(SHOW_PASSWORD_FLAG, "Show password in output").short('s')
    ])
    .with_examples(vec![
        Example::new(
            r#"Get details of the Grafana configuration of an Observability instance with ID "xxx""#,
            &["$ stackit observability grafana describe xxx"],
        ),
        Example::new(
            r#"Get details of the Grafana configuration of an Observability instance with ID "xxx" and show the initial admin password"#,
            &["$ stackit observability grafana describe xxx --show-password"],
        ),
        Example::new(
            r#"Get details of the Grafana configuration of an Observability instance with ID "xxx" in JSON format"#,
            &["$ stackit observability grafana describe xxx --output-format json"],
        ),
    ])
}

fn public_read_access_command() -> CommandNode {
    CommandNode::group(
        "public-read-access",
        "Enable or disable public read access for Grafana in Observability instances",
        "Enable or disable public read access for Grafana in Observability instances.\nWhen enabled, anyone can access the Grafana dashboards of the instance without logging in. Otherwise, a login is required.",
    )
    .with_children(vec![
        CommandNode::leaf(
            "enable INSTANCE_ID",
            "Enables public read access for Grafana on Observability instances",
            "Enables public read access for Grafana on Observability instances.\nWhen enabled, anyone can access the Grafana dashboards of the instance without logging in. Otherwise, a login is required.",
            enable_public_read_access,
        )
        .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
        .with_examples(vec![Example::new(
            r#"Enable public read access for Grafana on an Observability instance with ID "xxx""#,
            &["$ stackit observability grafana public-read-access enable xxx"],
        )]),
        CommandNode::leaf(
            "disable INSTANCE_ID",
            "Disables public read access for Grafana on Observability instances",
            "Disables public read access for Grafana on Observability instances.\nWhen disabled, a login is required to access the Grafana dashboards of the instance. Otherwise, anyone can access the dashboards.",
            disable_public_read_access,
        )
        .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
        .with_examples(vec![Example::new(
            r#"Disable public read access for Grafana on an Observability instance with ID "xxx""#,
            &["$ stackit observability grafana public-read-access disable xxx"],
        )]),
    ])
}

fn single_sign_on_command() -> CommandNode {
    CommandNode::group(
        "single-sign-on",
        "Enable or disable single sign-on for Grafana in Observability instances",
        "Enable or disable single sign-on for Grafana in Observability instances.\nWhen enabled for an instance, overwrites the generic OAuth2 authentication and configures STACKIT single sign-on for that instance.",
    )
    .with_children(vec![
        CommandNode::leaf(
            "enable INSTANCE_ID",
            "Enables single sign-on for Grafana on Observability instances",
            "Enables single sign-on for Grafana on Observability instances.\nWhen enabled for an instance, overwrites the generic OAuth2 authentication and configures STACKIT single sign-on for that instance.",
            enable_single_sign_on,
        )
        .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
        .with_examples(vec![Example::new(
            r#"Enable single sign-on for Grafana on an Observability instance with ID "xxx""#,
            &["$ stackit observability grafana single-sign-on enable xxx"],
        )]),
        CommandNode::leaf(
            "disable INSTANCE_ID",
            "Disables single sign-on for Grafana on Observability instances",
            "Disables single sign-on for Grafana on Observability instances.\nWhen disabled for an instance, the generic OAuth2 authentication is used for that instance.",
            disable_single_sign_on,
        )
        .with_args(ArgSchema::single_validated(INSTANCE_ID_ARG, validate_uuid))
        .with_examples(vec![Example::new(
            r#"Disable single sign-on for Grafana on an Observability instance with ID "xxx""#,
            &["$ stackit observability grafana single-sign-on disable xxx"],
        )]),
    ])
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Input {
    #[serde(flatten)]
    globals: GlobalFlags,
    instance_id: String,
    show_password: bool,
}

fn describe(inv: &mut Invocation) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input {
        globals: inv.globals.clone(),
        instance_id: inv.arg().to_string(),
        show_password: inv.flags().bool(SHOW_PASSWORD_FLAG)?,
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let configs = fetch_configs(&client, &project, &input.instance_id)?;
    let instance: Instance = client
        .get(&paths::instance(&project, &input.instance_id))
        .context("get instance")?;

    inv.renderer().render(&configs, |table| {
        let password = if input.show_password {
            instance
                .extra_str(&["instance", "grafanaAdminPassword"])
                .unwrap_or_default()
        } else {
            HIDDEN
        };
        table.add_row(cells![
            "GRAFANA DASHBOARD",
            instance.extra_str(&["instance", "grafanaUrl"]).unwrap_or_default()
        ]);
        table.add_separator();
        table.add_row(cells!["PUBLIC READ ACCESS", or_empty(&configs.public_read_access)]);
        table.add_separator();
        table.add_row(cells!["SINGLE SIGN-ON", or_empty(&configs.use_stackit_sso)]);
        table.add_separator();
        table.add_row(cells![
            "INITIAL ADMIN USER (DEFAULT)",
            instance.extra_str(&["instance", "grafanaAdminUser"]).unwrap_or_default()
        ]);
        table.add_separator();
        table.add_row(cells!["INITIAL ADMIN PASSWORD (DEFAULT)", password]);
        Ok(())
    })
}

fn fetch_configs(client: &ServiceClient, project: &str, instance: &str) -> Result<GrafanaConfigs> {
    client
        .get(&paths::grafana_configs(project, instance))
        .context("get Grafana configs")
}

#[derive(Debug, Clone, Copy)]
enum Setting {
    PublicReadAccess,
    SingleSignOn,
}

impl Setting {
    fn describe(self) -> &'static str {
        match self {
            Setting::PublicReadAccess => "Grafana public read access",
            Setting::SingleSignOn => "single sign-on for Grafana",
        }
    }
}

fn enable_public_read_access(inv: &mut Invocation) -> Result<()> {
    switch(inv, Setting::PublicReadAccess, true)
}

fn disable_public_read_access(inv: &mut Invocation) -> Result<()> {
    switch(inv, Setting::PublicReadAccess, false)
}

fn enable_single_sign_on(inv: &mut Invocation) -> Result<()> {
    switch(inv, Setting::SingleSignOn, true)
}

fn disable_single_sign_on(inv: &mut Invocation) -> Result<()> {
    switch(inv, Setting::SingleSignOn, false)
}

/// Reads the current Grafana configuration and writes it back with one
/// setting changed.
fn switch(inv: &mut Invocation, setting: Setting, enabled: bool) -> Result<()> {
    let project = inv.project_id()?;
    let input = Input {
        globals: inv.globals.clone(),
        instance_id: inv.arg().to_string(),
        show_password: false,
    };
    inv.debug_input(&input);

    let client = inv.client(Service::Observability)?;
    let label = instance_label(inv, &client, &project, &input.instance_id);
    let verb = if enabled { "enable" } else { "disable" };
    inv.confirm(&format!(
        "Are you sure you want to {verb} {} for instance {label:?}?",
        setting.describe()
    ))?;

    let current = fetch_configs(&client, &project, &input.instance_id)?;
    let payload = match setting {
        Setting::PublicReadAccess => current.with_changes(None, Some(enabled)),
        Setting::SingleSignOn => current.with_changes(Some(enabled), None),
    };
    client
        .put::<_, serde_json::Value>(&paths::grafana_configs(&project, &input.instance_id), &payload)
        .context(&format!("{verb} {}", setting.describe()))?;

    let state = if enabled { "Enabled" } else { "Disabled" };
    inv.renderer().outcome::<()>(
        None,
        &format!("{state} {} for instance {label:?}", setting.describe()),
    )
}

#[cfg(test)]
mod tests {
    use crate::cli::invocation::testing::{Harness, PROJECT_ID};
    use crate::client::Method;
    use crate::error::ErrorKind;
    use serde_json::json;

    const INSTANCE_ID: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";

    const CONFIGS: &str = r#"{"genericOauth": {"apiUrl": "https://api", "enabled": true}, "publicReadAccess": false, "useStackitSso": true}"#;

    fn instance() -> String {
        format!(
            r#"{{"id": "{INSTANCE_ID}", "name": "prod", "instance": {{"grafanaUrl": "https://grafana.example", "grafanaAdminUser": "admin", "grafanaAdminPassword": "Initial-Pw-1"}}}}"#
        )
    }

    fn configs_url() -> String {
        format!(
            "https://argus.api.stackit.cloud/v1/projects/{PROJECT_ID}/instances/{INSTANCE_ID}/grafana-configs"
        )
    }

    #[test]
    fn test_describe_hides_password_by_default() {
        let h = Harness::new("");
        h.transport.respond(200, CONFIGS);
        h.transport.respond(200, &instance());
        h.run(&[
            "observability", "grafana", "describe", INSTANCE_ID, "--project-id", PROJECT_ID,
        ])
        .unwrap();
        let out = h.out.contents();
        assert!(out.contains("https://grafana.example"), "{out}");
        assert!(out.contains("admin"));
        assert!(out.contains("<hidden>"));
        assert!(!out.contains("Initial-Pw-1"));
        assert_eq!(h.transport.methods()[0], (Method::Get, configs_url()));
    }

    #[test]
    fn test_describe_show_password() {
        let h = Harness::new("");
        h.transport.respond(200, CONFIGS);
        h.transport.respond(200, &instance());
        h.run(&[
            "observability", "grafana", "describe", INSTANCE_ID, "--project-id", PROJECT_ID,
            "--show-password",
        ])
        .unwrap();
        assert!(h.out.contents().contains("Initial-Pw-1"));
    }

    #[test]
    fn test_describe_json_is_the_config_record() {
        let h = Harness::new("");
        h.transport.respond(200, CONFIGS);
        h.transport.respond(200, &instance());
        h.run(&[
            "observability", "grafana", "describe", INSTANCE_ID, "--project-id", PROJECT_ID,
            "-o", "json", "-s",
        ])
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&h.out.contents()).unwrap();
        assert_eq!(parsed["useStackitSso"], true);
        assert!(!h.out.contents().contains("Initial-Pw-1"));
    }

    #[test]
    fn test_describe_rejects_bad_id() {
        let h = Harness::new("");
        let err = h
            .run(&["observability", "grafana", "describe", "nope", "--project-id", PROJECT_ID])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(h.transport.requests.borrow().is_empty());
    }

    #[test]
    fn test_enable_public_read_access_keeps_other_settings() {
        let h = Harness::new("");
        h.transport.respond(200, &instance());
        h.transport.respond(200, CONFIGS);
        h.transport.respond(200, "{}");
        h.run(&[
            "observability", "grafana", "public-read-access", "enable", INSTANCE_ID,
            "--project-id", PROJECT_ID, "-y",
        ])
        .unwrap();

        let requests = h.transport.requests.borrow();
        assert_eq!(requests[2].method, Method::Put);
        assert_eq!(requests[2].url, configs_url());
        assert_eq!(
            requests[2].body,
            Some(json!({
                "genericOauth": {"apiUrl": "https://api", "enabled": true},
                "publicReadAccess": true,
                "useStackitSso": true
            }))
        );
        assert_eq!(
            h.out.contents(),
            "Enabled Grafana public read access for instance \"prod\"\n"
        );
    }

    #[test]
    fn test_disable_single_sign_on() {
        let h = Harness::new("");
        h.transport.respond(200, &instance());
        h.transport.respond(200, CONFIGS);
        h.transport.respond(200, "{}");
        h.run(&[
            "observability", "grafana", "single-sign-on", "disable", INSTANCE_ID,
            "--project-id", PROJECT_ID, "-y",
        ])
        .unwrap();
        let requests = h.transport.requests.borrow();
        let body = requests[2].body.as_ref().unwrap();
        assert_eq!(body["useStackitSso"], false);
        assert_eq!(body["publicReadAccess"], false);
        assert_eq!(
            h.out.contents(),
            "Disabled single sign-on for Grafana for instance \"prod\"\n"
        );
    }

    #[test]
    fn test_declined_switch_sends_no_update() {
        let h = Harness::new("n\n");
        h.transport.respond(200, &instance());
        let err = h
            .run(&[
                "observability", "grafana", "single-sign-on", "enable", INSTANCE_ID,
                "--project-id", PROJECT_ID,
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(h
            .transport
            .methods()
            .iter()
            .all(|(method, _)| *method != Method::Put));
    }
}
