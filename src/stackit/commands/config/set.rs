use crate::cli::{CommandNode, FlagSpec, Invocation};
use crate::config::keys::{self, ValueKind, KEYS};
use crate::config::ConfigValue;
use crate::error::{InputError, Result};
use crate::examples::Example;
use crate::flags::DurationBounds;
use std::collections::BTreeMap;

pub fn command() -> CommandNode {
    CommandNode::leaf(
        "set",
        "Sets CLI configuration options",
        "Sets CLI configuration options.\nAll of the configuration options can be set using an environment variable, which takes precedence over what is configured.\nThe environment variable is the name of the flag, with underscores (\"_\") instead of dashes (\"-\") and the \"STACKIT\" prefix.\nExample: to set the project ID you can set the environment variable STACKIT_PROJECT_ID.",
        run,
    )
    .with_flags(local_flags())
    .with_examples(vec![
        Example::new(
            r#"Set a project ID in your active configuration. This project ID will be used by every command (unless overridden by the "STACKIT_PROJECT_ID" environment variable)"#,
            &["$ stackit config set --project-id xxx"],
        ),
        Example::new(
            "Set the session time limit to 1 hour",
            &["$ stackit config set --session-time-limit 1h"],
        ),
        Example::new(
            "Set the Observability custom endpoint. This endpoint will be used on all calls to Observability",
            &["$ stackit config set --observability-custom-endpoint yyy"],
        ),
    ])
}

/// Global keys are already flags on every command; the rest are local here.
fn local_flags() -> Vec<FlagSpec> {
    KEYS.iter()
        .filter(|k| !k.global)
        .map(|k| match k.kind {
            ValueKind::String => FlagSpec::value(k.name, k.help),
            ValueKind::Bool => FlagSpec::bool(k.name, k.help),
        })
        .collect()
}

fn run(inv: &mut Invocation) -> Result<()> {
    let flags = inv.flags();
    let mut updates: BTreeMap<&'static str, ConfigValue> = BTreeMap::new();
    for key in KEYS {
        if !flags.is_set(key.name) {
            continue;
        }
        let value = match key.kind {
            ValueKind::Bool => flags.bool_opt(key.name)?.map(ConfigValue::Bool),
            ValueKind::String => flags.string_opt(key.name).map(ConfigValue::String),
        };
        if let Some(value) = value {
            updates.insert(key.name, value);
        }
    }
    if updates.contains_key(keys::SESSION_TIME_LIMIT) {
        flags.duration_opt(keys::SESSION_TIME_LIMIT, DurationBounds::default())?;
    }
    inv.debug_input(&updates);

    if updates.is_empty() {
        return Err(InputError::EmptyUpdate.into());
    }

    for (key, value) in updates {
        inv.config.set(key, value);
    }
    inv.config.save()?;
    inv.printer.verbose(format!(
        "Updated configuration of profile {:?}",
        inv.config.active_profile()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::invocation::testing::{Harness, PROJECT_ID};
    use crate::config::ConfigValue;
    use crate::error::ErrorKind;

    #[test]
    fn test_sets_global_and_local_keys() {
        let h = Harness::new("");
        h.run(&[
            "config", "set", "--project-id", PROJECT_ID, "--observability-custom-endpoint",
            "http://localhost:8080", "--assume-yes",
        ])
        .unwrap();
        let config = h.config();
        assert_eq!(config.get_string("project-id").as_deref(), Some(PROJECT_ID));
        assert_eq!(
            config.get_string("observability-custom-endpoint").as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(config.get("assume-yes").unwrap().0, &ConfigValue::Bool(true));
        assert!(h.out.contents().is_empty());
    }

    #[test]
    fn test_bool_false_is_stored() {
        let h = Harness::new("");
        h.run(&["config", "set", "--async=false"]).unwrap();
        assert_eq!(h.config().get("async").unwrap().0, &ConfigValue::Bool(false));
    }

    #[test]
    fn test_nothing_to_set() {
        let h = Harness::new("");
        let err = h.run(&["config", "set"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().starts_with("please specify at least one field to update"));
    }

    #[test]
    fn test_invalid_session_time_limit() {
        let h = Harness::new("");
        let err = h
            .run(&["config", "set", "--session-time-limit", "forever"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(h.config().get("session-time-limit").is_none());
    }

    #[test]
    fn test_write_failure_is_config_error() {
        let h = Harness::new("");
        h.store.set_fail_writes(true);
        let err = h.run(&["config", "set", "--region", "eu02"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
