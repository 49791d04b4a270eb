//! Error taxonomy.
//!
//! Every fallible operation in the crate returns [`CliError`]. The dispatcher
//! turns the error into an exit code through [`CliError::kind`] and into a
//! user-facing message through [`CliError::render`], whose amount of detail
//! depends on the verbosity in force.
//!
//! Leaves wrap lower-level errors with a short operation noun:
//!
//! ```text
//! client.post(..).map_err(|e| e.context("create scrape configuration"))?;
//! ```
//!
//! which renders as `create scrape configuration: request failed (500): ...`.

use crate::print::Verbosity;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

pub const MISSING_PROJECT_ID: &str = "the project ID is not currently set.

It can be set on the command level by re-running your command with the --project-id flag.

You can configure it for all commands by running:

  $ stackit config set --project-id xxx

or you can also set it through the environment variable [STACKIT_PROJECT_ID]";

pub const EMPTY_UPDATE: &str = "please specify at least one field to update.

Get details on the available flags by re-running your command with the --help flag.";

pub const FAILED_AUTH: &str = "you are not authenticated.

You can authenticate as a user by running:
  $ stackit auth login

or use a service account by running:
  $ stackit auth activate-service-account";

pub const FAILED_SERVICE_ACCOUNT_ACTIVATION: &str = "could not setup authentication based on the provided service account credentials.
Please double check if they are correctly configured.

For more details run:
  $ stackit auth activate-service-account -h";

/// Coarse classification used for exit codes and for scripts that want to
/// tell failures apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Auth,
    Config,
    Api,
    NotFound,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Cancelled => 130,
            ErrorKind::Internal => 2,
            _ => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Input => "input-error",
            ErrorKind::Auth => "auth-error",
            ErrorKind::Config => "config-error",
            ErrorKind::Api => "api-error",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Validation failures of flags, arguments and input records.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{}", MISSING_PROJECT_ID)]
    MissingProjectId,

    #[error("{}", EMPTY_UPDATE)]
    EmptyUpdate,

    #[error("the provided flag --{flag} is invalid: {details}")]
    Flag { flag: String, details: String },

    #[error("the provided argument \"{arg}\" is invalid: {details}")]
    Arg { arg: String, details: String },

    #[error("required flag(s) {} not set", quoted(.0))]
    RequiredFlags(Vec<String>),

    #[error(
        "if any flags in the group [{}] are set none of the others can be; [{}] were all set",
        .0.join(" "),
        .0.join(" ")
    )]
    MutuallyExclusive(Vec<String>),

    /// A usage problem reported together with the help hint for the command.
    #[error("{message}.\n\nFor usage help, run:\n  $ {command_path} --help")]
    Usage {
        message: String,
        command_path: String,
    },

    /// Neither or both of `--plan-id` and `--plan-name` were given.
    #[error(
        "the instance plan was not correctly provided.\n\nEither provide the plan ID:\n  $ {command_path} --plan-id <PLAN ID> [flags]\n\nor provide plan name:\n  $ {command_path} --plan-name <PLAN NAME> [flags]\n\nFor more details on the available plans, run:\n  $ stackit {service} plans"
    )]
    PlanSelection {
        command_path: String,
        service: String,
    },

    #[error(
        "the provided instance plan is not valid.\n\n  {details}\n\nFor more details on the available plans, run:\n  $ stackit {service} plans"
    )]
    InvalidPlan { service: String, details: String },

    #[error("{0}")]
    Invalid(String),
}

impl InputError {
    pub fn flag(flag: &str, details: impl Into<String>) -> Self {
        InputError::Flag {
            flag: flag.to_string(),
            details: details.into(),
        }
    }

    pub fn arg(arg: &str, details: impl Into<String>) -> Self {
        InputError::Arg {
            arg: arg.to_string(),
            details: details.into(),
        }
    }

    pub fn usage(message: impl Into<String>, command_path: &str) -> Self {
        InputError::Usage {
            message: message.into(),
            command_path: command_path.to_string(),
        }
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{}", FAILED_AUTH)]
    NotAuthenticated,

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Config(String),

    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request failed (404): {message}")]
    NotFound { message: String },

    /// The backend could not be reached or an operation ended in a failure state.
    #[error("{0}")]
    Remote(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("{operation}: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<CliError>,
    },
}

impl CliError {
    pub fn aborted() -> Self {
        CliError::Cancelled("command aborted".to_string())
    }

    pub fn interrupted() -> Self {
        CliError::Cancelled("interrupted".to_string())
    }

    /// Wraps the error with the name of the operation that failed.
    pub fn context(self, operation: impl Into<String>) -> Self {
        CliError::Context {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error of a context chain.
    pub fn root(&self) -> &CliError {
        match self {
            CliError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            CliError::Input(_) => ErrorKind::Input,
            CliError::NotAuthenticated | CliError::Auth(_) => ErrorKind::Auth,
            CliError::Config(_) => ErrorKind::Config,
            CliError::Api { .. } | CliError::Remote(_) => ErrorKind::Api,
            CliError::NotFound { .. } => ErrorKind::NotFound,
            CliError::Cancelled(_) => ErrorKind::Cancelled,
            _ => ErrorKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    fn operations(&self) -> Vec<&str> {
        let mut ops = Vec::new();
        let mut current = self;
        while let CliError::Context { operation, source } = current {
            ops.push(operation.as_str());
            current = source;
        }
        ops
    }

    /// Message shown to the user.
    ///
    /// - default and below: outermost operation and root cause
    /// - info: every wrap joined by `: `
    /// - debug: one layer per line, followed by the error kind
    pub fn render(&self, verbosity: Verbosity) -> String {
        let ops = self.operations();
        let root = self.root().to_string();
        match verbosity {
            Verbosity::Debug => {
                let mut lines: Vec<String> = Vec::new();
                for (i, op) in ops.iter().enumerate() {
                    if i == 0 {
                        lines.push(op.to_string());
                    } else {
                        lines.push(format!("  caused by: {op}"));
                    }
                }
                if lines.is_empty() {
                    lines.push(root);
                } else {
                    lines.push(format!("  caused by: {root}"));
                }
                lines.push(format!("  kind: {}", self.kind().as_str()));
                lines.join("\n")
            }
            Verbosity::Info => self.to_string(),
            _ => match ops.first() {
                Some(op) => format!("{op}: {root}"),
                None => root,
            },
        }
    }
}

pub trait ResultExt<T> {
    fn context(self, operation: &str) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, operation: &str) -> Result<T> {
        self.map_err(|e| e.into().context(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chained() -> CliError {
        CliError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .context("list plans")
        .context("create Observability instance")
    }

    #[test]
    fn test_exit_codes_per_kind() {
        let cases: Vec<(CliError, i32)> = vec![
            (InputError::MissingProjectId.into(), 1),
            (CliError::NotAuthenticated, 1),
            (CliError::Config("bad".into()), 1),
            (
                CliError::Api {
                    status: 409,
                    message: "conflict".into(),
                },
                1,
            ),
            (
                CliError::NotFound {
                    message: "gone".into(),
                },
                1,
            ),
            (CliError::aborted(), 130),
            (CliError::Internal("oops".into()), 2),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err:?}");
        }
    }

    #[test]
    fn test_kind_follows_root_cause() {
        let err = CliError::aborted().context("delete instance");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(chained().kind(), ErrorKind::Api);
    }

    #[test]
    fn test_render_default_shows_outermost_and_cause() {
        assert_eq!(
            chained().render(Verbosity::Default),
            "create Observability instance: request failed (500): boom"
        );
    }

    #[test]
    fn test_render_info_shows_all_wraps() {
        assert_eq!(
            chained().render(Verbosity::Info),
            "create Observability instance: list plans: request failed (500): boom"
        );
    }

    #[test]
    fn test_render_debug_lists_layers_and_kind() {
        let rendered = chained().render(Verbosity::Debug);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "create Observability instance");
        assert_eq!(lines[1], "  caused by: list plans");
        assert_eq!(lines[2], "  caused by: request failed (500): boom");
        assert_eq!(lines[3], "  kind: api-error");
    }

    #[test]
    fn test_flag_error_names_flag() {
        let err = InputError::flag("limit", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "the provided flag --limit is invalid: must be greater than 0"
        );
    }

    #[test]
    fn test_mutually_exclusive_message() {
        let err = InputError::MutuallyExclusive(vec!["used".into(), "unused".into()]);
        assert!(err.to_string().contains("[used unused]"));
    }

    #[test]
    fn test_result_ext_wraps_io_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = res.context("read payload").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "read payload: no such file");
    }
}
