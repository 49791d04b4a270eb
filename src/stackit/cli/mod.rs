//! # Dispatcher
//!
//! One invocation runs through these steps:
//!
//! 1. clap tokenizes the arguments against the tree built from
//!    [`crate::commands::root`]. `--help` and `--version` end here.
//! 2. The addressed node is located; unknown subcommands are input errors.
//! 3. The config is loaded and the global flags are resolved.
//! 4. Groups print their help. Leaves get their required flags and
//!    positionals checked, then run with an [`Invocation`].
//! 5. An error is printed at the verbosity in force and mapped to the exit
//!    code of its kind.

pub mod invocation;
pub mod setup;
pub mod tree;

use crate::client::Transport;
use crate::config::fs::FileStore;
use crate::config::{self, keys, Config, ConfigStore};
use crate::env::Environment;
use crate::error::{InputError, Result};
use crate::flags::Flags;
use crate::globalflags::{self, CliValues};
use crate::print::{Printer, Verbosity};
use crate::signal::CancelToken;
use clap::error::ErrorKind as ClapErrorKind;
use clap::ArgMatches;
use std::ffi::OsString;
use std::path::PathBuf;
use std::rc::Rc;

pub use invocation::Invocation;
pub use tree::{CommandNode, FlagKind, FlagSpec, RunFn};

/// Entry point of the binary. Returns the process exit code.
pub fn run() -> i32 {
    let printer = Printer::stdio();
    let env = Environment::from_process();
    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_handler() {
        printer.debug(e);
    }
    let result = dispatch(&printer, &env, &cancel, std::env::args_os(), Overrides::default());
    finish(&printer, result)
}

/// Prints the error, if any, and returns the exit code.
pub fn finish(printer: &Printer, result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            printer.error(e.render(printer.verbosity()));
            e.exit_code()
        }
    }
}

/// Replacements for the process-level collaborators, used by tests.
#[derive(Default)]
pub(crate) struct Overrides {
    pub store: Option<Box<dyn ConfigStore>>,
    pub transport: Option<Rc<dyn Transport>>,
}

pub(crate) fn dispatch<I, T>(
    printer: &Printer,
    env: &Environment,
    cancel: &CancelToken,
    argv: I,
    overrides: Overrides,
) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let root = crate::commands::root();
    let mut cmd = setup::root_command(&root);
    let matches = match cmd.try_get_matches_from_mut(argv) {
        Ok(matches) => matches,
        Err(e) => return clap_failure(printer, e),
    };

    let (node, leaf_matches, path) = locate(&root, &matches)?;

    let (store, config_dir): (Box<dyn ConfigStore>, PathBuf) = match overrides.store {
        Some(store) => (
            store,
            env.get(keys::CONFIG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_default(),
        ),
        None => {
            let dir = config::config_dir(env.get(keys::CONFIG_DIR_ENV))?;
            (Box::new(FileStore::new(&dir)), dir)
        }
    };
    let config = Config::load(store, env.get(keys::PROFILE_ENV))?;

    let globals = globalflags::resolve(&cli_global_values(leaf_matches), env, &config)?;
    printer.set_verbosity(globals.verbosity);
    init_tracing(globals.verbosity);
    for var in env.unknown_vars() {
        printer.debug(format!("unknown environment variable {var} ignored"));
    }
    for var in env.skipped_vars() {
        printer.debug(format!("environment variable {var} is not valid UTF-8, ignored"));
    }

    let Some(run) = node.run else {
        let names: Vec<&str> = path.split_whitespace().skip(1).collect();
        printer.output(&group_help(&mut cmd, &names));
        return Ok(());
    };

    let args = positionals(leaf_matches);
    check_leaf(node, leaf_matches, &args, &path)?;
    tracing::debug!(command = %path, profile = config.active_profile(), "running command");

    let mut invocation = Invocation::new(
        printer,
        env,
        cancel,
        globals,
        config,
        config_dir,
        leaf_matches,
        args,
        path,
    );
    if let Some(transport) = overrides.transport {
        invocation = invocation.with_transport(transport);
    }
    run(&mut invocation)
}

/// Help and version requests are successes; every other clap failure is an
/// input error.
fn clap_failure(printer: &Printer, e: clap::Error) -> Result<()> {
    match e.kind() {
        ClapErrorKind::DisplayHelp
        | ClapErrorKind::DisplayVersion
        | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            printer.output(&e.render().to_string());
            Ok(())
        }
        _ => {
            let rendered = e.render().to_string();
            let message = rendered
                .trim()
                .trim_start_matches("error: ")
                .to_string();
            Err(InputError::Invalid(message).into())
        }
    }
}

/// Walks the matches down the tree. Returns the addressed node, its matches
/// and its qualified path.
pub(crate) fn locate<'t, 'm>(
    root: &'t CommandNode,
    matches: &'m ArgMatches,
) -> Result<(&'t CommandNode, &'m ArgMatches, String)> {
    let mut node = root;
    let mut current = matches;
    let mut path = vec![setup::BIN_NAME.to_string()];
    while let Some((name, sub)) = current.subcommand() {
        let Some(child) = node.child(name) else {
            return Err(InputError::usage(
                format!("unknown subcommand {name:?}"),
                &path.join(" "),
            )
            .into());
        };
        node = child;
        current = sub;
        path.push(name.to_string());
    }
    Ok((node, current, path.join(" ")))
}

/// Global flags given on the command line.
pub(crate) fn cli_global_values(matches: &ArgMatches) -> CliValues {
    let flags = Flags::new(matches);
    setup::global_flags()
        .iter()
        .filter_map(|flag| flags.string_opt(flag.name).map(|v| (flag.name.to_string(), v)))
        .collect()
}

pub(crate) fn positionals(matches: &ArgMatches) -> Vec<String> {
    match matches.try_get_many::<String>(tree::ARGS_ID) {
        Ok(Some(values)) => values.cloned().collect(),
        _ => Vec::new(),
    }
}

/// Required flags first, then the argument schema.
pub(crate) fn check_leaf(
    node: &CommandNode,
    matches: &ArgMatches,
    args: &[String],
    path: &str,
) -> Result<()> {
    let flags = Flags::new(matches);
    let missing: Vec<String> = node
        .required_flags()
        .filter(|f| !flags.is_set(f.name))
        .map(|f| f.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InputError::RequiredFlags(missing).into());
    }
    node.args.validate(args, path)
}

fn group_help(cmd: &mut clap::Command, names: &[&str]) -> String {
    if let Some((name, rest)) = names.split_first() {
        if let Some(sub) = cmd.find_subcommand_mut(name) {
            return group_help(sub, rest);
        }
    }
    cmd.render_help().to_string()
}

/// Developer trace on stderr. `RUST_LOG` wins over the verbosity.
fn init_tracing(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Debug => "debug",
        _ => "warn",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("stackit={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(console::Term::stderr().is_term())
        .with_target(false)
        .without_time()
        .try_init();
}
