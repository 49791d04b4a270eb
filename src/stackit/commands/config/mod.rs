//! `stackit config`: the stored option values and the profiles that hold
//! them.

pub mod list;
pub mod profile;
pub mod set;
pub mod unset;

use crate::cli::CommandNode;

pub fn command() -> CommandNode {
    CommandNode::group(
        "config",
        "Provides functionality for CLI configuration options",
        "Provides functionality for CLI configuration options.\nThe configuration is stored in profiles. Values set in the active profile take precedence over the default profile.",
    )
    .with_children(vec![
        list::command(),
        set::command(),
        unset::command(),
        profile::command(),
    ])
}
