//! `stackit config profile ...`
//!
//! Profiles are switched by updating the persisted active pointer. When
//! `STACKIT_CLI_PROFILE` is set it wins over that pointer, so the switching
//! commands warn about it.

use crate::args::ArgSchema;
use crate::auth;
use crate::auth::storage::CredentialStore;
use crate::cells;
use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::config::{keys, validate_profile_name, DEFAULT_PROFILE};
use crate::error::{Result, ResultExt};
use crate::examples::Example;
use serde::Serialize;

const PROFILE_ARG: &str = "PROFILE";
const NO_SET_FLAG: &str = "no-set";
const EMPTY_FLAG: &str = "empty";
const NEW_NAME_FLAG: &str = "new-name";

pub fn command() -> CommandNode {
    CommandNode::group(
        "profile",
        "Manage the CLI configuration profiles",
        "Manage the CLI configuration profiles.\nThe profile to be used can be managed via the \"STACKIT_CLI_PROFILE\" environment variable or using the \"stackit config profile set PROFILE\" and \"stackit config profile unset\" commands.\nThe environment variable takes precedence over what is set via the commands.",
    )
    .with_children(vec![
        create_command(),
        delete_command(),
        list_command(),
        rename_command(),
        set_command(),
        unset_command(),
    ])
}

fn profile_name(value: &str) -> std::result::Result<(), String> {
    validate_profile_name(value).map_err(|e| e.to_string())
}

fn create_command() -> CommandNode {
    CommandNode::leaf(
        "create PROFILE",
        "Creates a CLI configuration profile",
        "Creates a CLI configuration profile based on the active profile and sets it as active.\nThe profile name can be provided via the STACKIT_CLI_PROFILE environment variable or as an argument in this command.\nThe environment variable takes precedence over the argument.\nIf you do not want to set the profile as active, use the --no-set flag.\nIf you want to create the new profile with the initial default configurations, use the --empty flag.",
        create,
    )
    .with_args(ArgSchema::single_validated(PROFILE_ARG, profile_name))
    .with_flags(vec![
        FlagSpec::bool(NO_SET_FLAG, "Do not set the profile as the active profile"),
        FlagSpec::bool(EMPTY_FLAG, "Create the profile with the initial default configurations"),
    ])
    .with_examples(vec![
        Example::new(
            "Create a new configuration profile \"my-profile\" with the current configuration, setting it as the active profile",
            &["$ stackit config profile create my-profile"],
        ),
        Example::new(
            "Create a new configuration profile \"my-profile\" with a default initial configuration and don't set it as the active profile",
            &["$ stackit config profile create my-profile --empty --no-set"],
        ),
    ])
}

fn delete_command() -> CommandNode {
    CommandNode::leaf(
        "delete PROFILE",
        "Delete a CLI configuration profile",
        "Delete a CLI configuration profile.\nIf the deleted profile is the active profile, the default profile will be set to active.",
        delete,
    )
    .with_args(ArgSchema::single(PROFILE_ARG))
    .with_examples(vec![Example::new(
        "Delete the configuration profile \"my-profile\"",
        &["$ stackit config profile delete my-profile"],
    )])
}

fn list_command() -> CommandNode {
    CommandNode::leaf(
        "list",
        "Lists all CLI configuration profiles",
        "Lists all CLI configuration profiles.",
        list,
    )
    .with_examples(vec![
        Example::new(
            "List the configuration profiles",
            &["$ stackit config profile list"],
        ),
        Example::new(
            "List the configuration profiles in a json format",
            &["$ stackit config profile list --output-format json"],
        ),
    ])
}

fn rename_command() -> CommandNode {
    CommandNode::leaf(
        "rename PROFILE",
        "Rename a CLI configuration profile",
        "Rename a CLI configuration profile.",
        rename,
    )
    .with_args(ArgSchema::single(PROFILE_ARG))
    .with_flags(vec![FlagSpec::value(NEW_NAME_FLAG, "The new name of the profile").required()])
    .with_examples(vec![Example::new(
        "Rename profile \"my-profile\" to \"my-new-profile\"",
        &["$ stackit config profile rename my-profile --new-name my-new-profile"],
    )])
}

fn set_command() -> CommandNode {
    CommandNode::leaf(
        "set PROFILE",
        "Set a CLI configuration profile",
        "Set a CLI configuration profile as the active profile.\nThe environment variable takes precedence over what is set via the commands.\nWhen no profile is set, the default profile is used.",
        set,
    )
    .with_args(ArgSchema::single(PROFILE_ARG))
    .with_examples(vec![Example::new(
        "Set the configuration profile \"my-profile\" as the active profile",
        &["$ stackit config profile set my-profile"],
    )])
}

fn unset_command() -> CommandNode {
    CommandNode::leaf(
        "unset",
        "Unset the current active CLI configuration profile",
        "Unset the current active CLI configuration profile.\nWhen no profile is set, the default profile will be used.",
        unset,
    )
    .with_examples(vec![Example::new(
        "Unset the currently active configuration profile. The default profile will be used.",
        &["$ stackit config profile unset"],
    )])
}

/// Warns when `STACKIT_CLI_PROFILE` overrides what is being stored.
fn warn_env_override(inv: &Invocation) {
    if let Some(name) = inv.env.get(keys::PROFILE_ENV).filter(|n| !n.is_empty()) {
        inv.printer.warn(format!(
            "The profile {name:?} set via the {} environment variable takes precedence over the one set via the commands",
            keys::PROFILE_ENV
        ));
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput {
    profile: String,
    no_set: bool,
    empty: bool,
}

fn create(inv: &mut Invocation) -> Result<()> {
    let flags = inv.flags();
    let input = CreateInput {
        profile: inv.arg().to_string(),
        no_set: flags.bool(NO_SET_FLAG)?,
        empty: flags.bool(EMPTY_FLAG)?,
    };
    inv.debug_input(&input);

    inv.config.create_profile(&input.profile, !input.empty)?;
    if !input.no_set {
        inv.config.set_active(&input.profile)?;
    }
    inv.config.save()?;

    inv.printer.info(format!("Successfully created profile {:?}", input.profile));
    if !input.no_set {
        inv.printer
            .info(format!("Successfully activated profile {:?}", input.profile));
        warn_env_override(inv);
    }
    Ok(())
}

fn delete(inv: &mut Invocation) -> Result<()> {
    let profile = inv.arg().to_string();
    inv.debug_input(&serde_json::json!({ "profile": profile }));

    if !inv.config.profile_exists(&profile) {
        return inv.config.delete_profile(&profile);
    }
    if inv.config.stored_active() == profile {
        inv.printer.warn(
            "The profile you are trying to delete is the active profile. The default profile will be set to active.",
        );
    }
    inv.confirm(&format!(
        "Are you sure you want to delete profile {profile:?}? (This cannot be undone)"
    ))?;

    inv.config.delete_profile(&profile)?;
    inv.config.save()?;
    auth::logout(&CredentialStore::new(&inv.config_dir), &profile)
        .context("delete profile credentials")?;

    inv.printer.info(format!("Successfully deleted profile {profile:?}"));
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProfileEntry {
    name: String,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

fn list(inv: &mut Invocation) -> Result<()> {
    let credentials = CredentialStore::new(&inv.config_dir);
    let active = inv.config.active_profile().to_string();
    let profiles: Vec<ProfileEntry> = inv
        .config
        .profile_names()
        .into_iter()
        .map(|name| {
            let email = match credentials.load(&name) {
                Ok(creds) => creds.and_then(|c| c.principal().map(str::to_string)),
                Err(e) => {
                    inv.printer.debug(format!("read credentials of profile {name:?}: {e}"));
                    None
                }
            };
            ProfileEntry {
                active: name == active,
                name,
                email,
            }
        })
        .collect();

    inv.renderer().render(&profiles, |table| {
        table.set_header(&["NAME", "ACTIVE", "EMAIL"]);
        for profile in &profiles {
            let marker = if profile.active { "*" } else { "" };
            let email = profile.email.as_deref().unwrap_or("Not authenticated");
            table.add_row(cells![profile.name, marker, email]);
            table.add_separator();
        }
        Ok(())
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameInput {
    profile: String,
    new_name: String,
}

fn rename(inv: &mut Invocation) -> Result<()> {
    let input = RenameInput {
        profile: inv.arg().to_string(),
        new_name: inv.flags().string(NEW_NAME_FLAG),
    };
    inv.debug_input(&input);

    inv.config.rename_profile(&input.profile, &input.new_name)?;
    inv.config.save()?;
    CredentialStore::new(&inv.config_dir)
        .rename(&input.profile, &input.new_name)
        .context("move profile credentials")?;

    inv.printer.info(format!(
        "Successfully renamed profile {:?} to {:?}",
        input.profile, input.new_name
    ));
    Ok(())
}

fn set(inv: &mut Invocation) -> Result<()> {
    let profile = inv.arg().to_string();
    inv.debug_input(&serde_json::json!({ "profile": profile }));

    inv.config.set_active(&profile)?;
    inv.config.save()?;
    inv.printer
        .info(format!("Successfully set active profile to {profile:?}"));
    warn_env_override(inv);
    Ok(())
}

fn unset(inv: &mut Invocation) -> Result<()> {
    inv.config.set_active(DEFAULT_PROFILE)?;
    inv.config.save()?;
    inv.printer
        .info("Profile unset successfully. The default profile will be used.");
    warn_env_override(inv);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::invocation::testing::{Harness, PROJECT_ID};
    use crate::env::Environment;
    use crate::error::ErrorKind;

    #[test]
    fn test_create_copies_active_and_activates() {
        let h = Harness::new("");
        h.run(&["config", "set", "--project-id", PROJECT_ID]).unwrap();
        h.run(&["config", "profile", "create", "dev"]).unwrap();
        let config = h.config();
        assert_eq!(config.active_profile(), "dev");
        assert_eq!(config.get_string("project-id").as_deref(), Some(PROJECT_ID));
        assert!(h.err.contents().contains("Successfully activated profile \"dev\""));
    }

    #[test]
    fn test_create_empty_without_activation() {
        let h = Harness::new("");
        h.run(&["config", "set", "--region", "eu02"]).unwrap();
        h.run(&["config", "profile", "create", "dev", "--empty", "--no-set"])
            .unwrap();
        let config = h.config();
        assert_eq!(config.active_profile(), "default");
        assert!(config.profile_exists("dev"));
        assert!(!h.err.contents().contains("activated"));
    }

    #[test]
    fn test_create_rejects_bad_name() {
        let h = Harness::new("");
        let err = h.run(&["config", "profile", "create", "Dev_1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(!h.config().profile_exists("Dev_1"));
    }

    #[test]
    fn test_create_existing_is_config_error() {
        let h = Harness::new("");
        h.run(&["config", "profile", "create", "dev"]).unwrap();
        let err = h.run(&["config", "profile", "create", "dev"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_delete_active_falls_back_to_default() {
        let h = Harness::new("");
        h.run(&["config", "profile", "create", "dev"]).unwrap();
        h.run(&["config", "profile", "delete", "dev", "-y"]).unwrap();
        let config = h.config();
        assert!(!config.profile_exists("dev"));
        assert_eq!(config.active_profile(), "default");
        assert!(h.err.contents().contains("is the active profile"));
    }

    #[test]
    fn test_delete_declined_keeps_profile() {
        let h = Harness::new("n\n");
        h.run(&["config", "profile", "create", "dev", "--no-set"]).unwrap();
        let err = h.run(&["config", "profile", "delete", "dev"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(h.config().profile_exists("dev"));
    }

    #[test]
    fn test_delete_default_is_refused() {
        let h = Harness::new("");
        let err = h
            .run(&["config", "profile", "delete", "default", "-y"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_rename_keeps_active_pointer() {
        let h = Harness::new("");
        h.run(&["config", "profile", "create", "dev"]).unwrap();
        h.run(&["config", "profile", "rename", "dev", "--new-name", "prod"])
            .unwrap();
        let config = h.config();
        assert_eq!(config.active_profile(), "prod");
        assert!(!config.profile_exists("dev"));
    }

    #[test]
    fn test_set_unknown_profile() {
        let h = Harness::new("");
        let err = h.run(&["config", "profile", "set", "ghost"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("\"ghost\""));
    }

    #[test]
    fn test_set_and_unset() {
        let h = Harness::new("");
        h.run(&["config", "profile", "create", "dev", "--no-set"]).unwrap();
        h.run(&["config", "profile", "set", "dev"]).unwrap();
        assert_eq!(h.config().active_profile(), "dev");
        h.run(&["config", "profile", "unset"]).unwrap();
        assert_eq!(h.config().active_profile(), "default");
    }

    #[test]
    fn test_set_warns_about_env_override() {
        let mut h = Harness::new("");
        h.run(&["config", "profile", "create", "dev", "--no-set"]).unwrap();
        h.env = Environment::from_pairs([("STACKIT_CLI_PROFILE", "default")]);
        h.run(&["config", "profile", "set", "dev"]).unwrap();
        assert!(h.err.contents().contains("STACKIT_CLI_PROFILE"));
    }

    #[test]
    fn test_list_marks_active() {
        let h = Harness::new("");
        h.run(&["config", "profile", "create", "dev"]).unwrap();
        h.run(&["config", "profile", "list", "-o", "json"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&h.out.contents()).unwrap();
        assert_eq!(parsed[0]["name"], "default");
        assert_eq!(parsed[0]["active"], false);
        assert_eq!(parsed[1]["name"], "dev");
        assert_eq!(parsed[1]["active"], true);
    }
}
