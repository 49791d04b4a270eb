use crate::args::ArgSchema;
use crate::cli::{CommandNode, Invocation};
use crate::config::keys::{self, KEYS};
use crate::error::{InputError, Result};
use crate::examples::Example;

pub fn command() -> CommandNode {
    CommandNode::leaf(
        "unset KEY...",
        "Unsets CLI configuration options",
        "Unsets CLI configuration options, undoing past usages of the `stackit config set` command.\nThe keys are the names of the options, e.g. \"project-id\".",
        run,
    )
    .with_args(ArgSchema::RangeArgs(1, KEYS.len()))
    .with_examples(vec![
        Example::new(
            "Unset the project ID stored in your configuration",
            &["$ stackit config unset project-id"],
        ),
        Example::new(
            "Unset the session time limit and the Observability custom endpoint",
            &["$ stackit config unset session-time-limit observability-custom-endpoint"],
        ),
    ])
}

fn run(inv: &mut Invocation) -> Result<()> {
    let names = inv.args.clone();
    inv.debug_input(&names);
    for name in &names {
        if keys::lookup(name).is_none() {
            let known: Vec<&str> = KEYS.iter().map(|k| k.name).collect();
            return Err(InputError::arg(
                name,
                format!("unknown configuration key, must be one of: {}", known.join(", ")),
            )
            .into());
        }
    }

    for name in &names {
        if !inv.config.unset(name) {
            inv.printer.verbose(format!(
                "{name} is not set in profile {:?}",
                inv.config.active_profile()
            ));
        }
    }
    inv.config.save()
}
