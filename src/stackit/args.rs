//! Positional argument schemas.

use crate::error::{InputError, Result};

pub type ArgValidator = fn(&str) -> std::result::Result<(), String>;

#[derive(Clone, Copy)]
pub enum ArgSchema {
    NoArgs,
    SingleArg {
        name: &'static str,
        validator: Option<ArgValidator>,
    },
    MaximumNArgs(usize),
    RangeArgs(usize, usize),
}

impl ArgSchema {
    pub const fn single(name: &'static str) -> Self {
        ArgSchema::SingleArg {
            name,
            validator: None,
        }
    }

    pub const fn single_validated(name: &'static str, validator: ArgValidator) -> Self {
        ArgSchema::SingleArg {
            name,
            validator: Some(validator),
        }
    }

    pub fn accepts_args(&self) -> bool {
        !matches!(self, ArgSchema::NoArgs | ArgSchema::MaximumNArgs(0))
    }

    /// Checks `args` against the schema. `command_path` is used for the
    /// usage hint, e.g. `stackit observability instance describe`.
    pub fn validate(&self, args: &[String], command_path: &str) -> Result<()> {
        match *self {
            ArgSchema::NoArgs => {
                if let Some(first) = args.first() {
                    return Err(InputError::usage(
                        format!("unknown argument {first:?}"),
                        command_path,
                    )
                    .into());
                }
            }
            ArgSchema::SingleArg { name, validator } => {
                match args.len() {
                    0 => {
                        return Err(InputError::usage(
                            format!("missing argument {name:?}"),
                            command_path,
                        )
                        .into())
                    }
                    1 => {}
                    n => {
                        return Err(InputError::usage(
                            format!("expected 1 argument {name:?}, {n} were provided"),
                            command_path,
                        )
                        .into())
                    }
                }
                if let Some(validate) = validator {
                    validate(&args[0]).map_err(|details| InputError::arg(&args[0], details))?;
                }
            }
            ArgSchema::MaximumNArgs(max) => {
                if args.len() > max {
                    return Err(InputError::usage(
                        format!("accepts at most {max} arg(s), received {}", args.len()),
                        command_path,
                    )
                    .into());
                }
            }
            ArgSchema::RangeArgs(min, max) => {
                if args.len() < min || args.len() > max {
                    return Err(InputError::usage(
                        format!(
                            "accepts between {min} and {max} arg(s), received {}",
                            args.len()
                        ),
                        command_path,
                    )
                    .into());
                }
            }
        }
        Ok(())
    }
}
