//! The shipped command tree.
//!
//! Each group module exposes a `command()` returning its [`CommandNode`];
//! leaves are plain functions of an [`Invocation`](crate::cli::Invocation).

use crate::cli::CommandNode;

pub mod auth;
pub mod config;
pub mod observability;

pub fn root() -> CommandNode {
    CommandNode::group(
        "stackit",
        "Manage STACKIT cloud services",
        "Manage STACKIT cloud services.",
    )
    .with_children(vec![
        auth::command(),
        config::command(),
        observability::command(),
    ])
}
