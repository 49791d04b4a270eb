use crate::cells;
use crate::cli::{CommandNode, Invocation};
use crate::config::{ConfigValue, ValueSource, DEFAULT_PROFILE};
use crate::error::Result;
use crate::examples::Example;
use std::collections::BTreeMap;

pub fn command() -> CommandNode {
    CommandNode::leaf(
        "list",
        "Lists the current CLI configuration values",
        "Lists the current CLI configuration values, based on the following sources (in order of precedence):\n- Environment variable\n  The environment variable is the name of the flag, with underscores (\"_\") instead of dashes (\"-\") and the \"STACKIT\" prefix.\n  Example: you can set the project ID by setting the environment variable STACKIT_PROJECT_ID.\n- Configuration set in the active profile\n- Configuration set in the default profile\n\nThe environment variables are not shown here.",
        run,
    )
    .with_examples(vec![
        Example::new(
            "List your active configuration",
            &["$ stackit config list"],
        ),
        Example::new(
            "List your active configuration in JSON format",
            &["$ stackit config list --output-format json"],
        ),
    ])
}

fn run(inv: &mut Invocation) -> Result<()> {
    let profile = inv.config.active_profile().to_string();
    inv.debug_input(&BTreeMap::from([("profile", profile.clone())]));

    let entries = inv.config.entries();
    if entries.is_empty() {
        inv.renderer().empty(&format!(
            "No configuration values set for profile {profile:?}"
        ));
        return Ok(());
    }

    let values: BTreeMap<&str, &ConfigValue> =
        entries.iter().map(|(k, (v, _))| (k.as_str(), v)).collect();
    inv.renderer().render(&values, |table| {
        table.set_title(format!("Profile: {profile}"));
        table.set_header(&["NAME", "VALUE", "SOURCE"]);
        for (key, (value, source)) in &entries {
            let source = match source {
                ValueSource::ActiveProfile => profile.as_str(),
                ValueSource::DefaultProfile => DEFAULT_PROFILE,
            };
            table.add_row(cells![key, value, source]);
        }
        Ok(())
    })
}
