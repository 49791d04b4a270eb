//! The printer is the single sink for everything the CLI shows to the user.
//!
//! | channel   | stream | shown at                |
//! |-----------|--------|-------------------------|
//! | `output`  | stdout | always                  |
//! | `error`   | stderr | always                  |
//! | `warn`    | stderr | default and above       |
//! | `info`    | stderr | default and above       |
//! | `verbose` | stderr | info and above          |
//! | `debug`   | stderr | debug                   |
//!
//! Prompts are written to stderr and read from the printer's input, which is
//! stdin for the real binary and an in-memory buffer in tests.

use crate::error::{CliError, Result};
use crate::styles;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::str::FromStr;

const CONFIRMATION_ATTEMPTS: usize = 3;
const REDACTED: &str = "<redacted>";
const SENSITIVE_KEY_PARTS: &[&str] = &["token", "password", "secret", "key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Silent,
    Default,
    Info,
    Debug,
}

impl Verbosity {
    pub const VALUES: &'static [&'static str] = &["silent", "default", "info", "debug"];

    pub fn as_str(self) -> &'static str {
        match self {
            Verbosity::Silent => "silent",
            Verbosity::Default => "default",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(Verbosity::Silent),
            "default" => Ok(Verbosity::Default),
            "info" => Ok(Verbosity::Info),
            "debug" => Ok(Verbosity::Debug),
            _ => Err(format!(
                "value {s:?} is not one of {}",
                Verbosity::VALUES.join(", ")
            )),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Printer {
    verbosity: Cell<Verbosity>,
    out: RefCell<Box<dyn Write>>,
    err: RefCell<Box<dyn Write>>,
    input: RefCell<Box<dyn BufRead>>,
    stdout_tty: bool,
    stdin_tty: bool,
}

impl Printer {
    /// Printer bound to the process streams.
    pub fn stdio() -> Self {
        Self {
            verbosity: Cell::new(Verbosity::Default),
            out: RefCell::new(Box::new(io::stdout())),
            err: RefCell::new(Box::new(io::stderr())),
            input: RefCell::new(Box::new(io::BufReader::new(io::stdin()))),
            stdout_tty: io::stdout().is_terminal(),
            stdin_tty: io::stdin().is_terminal(),
        }
    }

    pub fn with_streams(
        out: Box<dyn Write>,
        err: Box<dyn Write>,
        input: Box<dyn BufRead>,
    ) -> Self {
        Self {
            verbosity: Cell::new(Verbosity::Default),
            out: RefCell::new(out),
            err: RefCell::new(err),
            input: RefCell::new(input),
            stdout_tty: false,
            stdin_tty: false,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity.get()
    }

    pub fn set_verbosity(&self, verbosity: Verbosity) {
        self.verbosity.set(verbosity);
    }

    pub fn is_verbosity_debug(&self) -> bool {
        self.verbosity.get() == Verbosity::Debug
    }

    pub fn stdout_is_terminal(&self) -> bool {
        self.stdout_tty
    }

    /// Primary result. Written as-is; a trailing newline is added if missing.
    /// A closed pipe (`stackit ... | head`) is not an error; other write
    /// failures are reported on the debug channel.
    pub fn output(&self, text: &str) {
        let written = write_line(&mut **self.out.borrow_mut(), text);
        match written {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                self.debug(format!("write output: {e}"));
            }
            _ => {}
        }
    }

    pub fn info(&self, msg: impl fmt::Display) {
        if self.verbosity.get() >= Verbosity::Default {
            self.to_stderr(&msg.to_string());
        }
    }

    pub fn verbose(&self, msg: impl fmt::Display) {
        if self.verbosity.get() >= Verbosity::Info {
            self.to_stderr(&msg.to_string());
        }
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        if self.verbosity.get() >= Verbosity::Default {
            self.to_stderr(&format!("{} {msg}", styles::WARNING.apply_to("Warning:")));
        }
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        if self.verbosity.get() == Verbosity::Debug {
            self.to_stderr(&format!("{} {msg}", styles::DEBUG.apply_to("[DEBUG]")));
        }
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.to_stderr(&format!("{} {msg}", styles::ERROR.apply_to("Error:")));
    }

    fn to_stderr(&self, text: &str) {
        let mut err = self.err.borrow_mut();
        let _ = writeln!(err, "{}", text.trim_end_matches('\n'));
        let _ = err.flush();
    }

    /// Emits `parsed input values: [...]` on the debug channel.
    pub fn debug_input_model<T: Serialize>(&self, model: &T) {
        if !self.is_verbosity_debug() {
            return;
        }
        match serde_json::to_value(model) {
            Ok(value) => self.debug(format!("parsed input values: {}", build_debug_str(&value))),
            Err(e) => self.debug(format!("convert model to string for debugging: {e}")),
        }
    }

    /// Asks a yes/no question on stderr.
    ///
    /// `y`/`yes` confirm, `n`/`no`/empty decline. Unrecognized answers are
    /// asked again a few times before giving up. EOF declines.
    pub fn prompt_for_confirmation(&self, message: &str) -> Result<()> {
        for _ in 0..CONFIRMATION_ATTEMPTS {
            {
                let mut err = self.err.borrow_mut();
                write!(err, "{} [y/N] ", styles::PROMPT.apply_to(message))?;
                err.flush()?;
            }
            let mut answer = String::new();
            let read = self.input.borrow_mut().read_line(&mut answer)?;
            if read == 0 {
                self.to_stderr("");
                return Err(CliError::aborted());
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(()),
                "" | "n" | "no" => return Err(CliError::aborted()),
                _ => continue,
            }
        }
        Err(CliError::aborted())
    }

    /// Reads a secret. Echo is disabled on a terminal; piped input is read as
    /// a plain line.
    pub fn prompt_for_password(&self, label: &str) -> Result<String> {
        if self.stdin_tty {
            return dialoguer::Password::new()
                .with_prompt(label)
                .interact()
                .map_err(|e| CliError::Internal(format!("read password: {e}")));
        }
        {
            let mut err = self.err.borrow_mut();
            write!(err, "{label}: ")?;
            err.flush()?;
        }
        let mut line = String::new();
        let read = self.input.borrow_mut().read_line(&mut line)?;
        self.to_stderr("");
        if read == 0 {
            return Err(CliError::aborted());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn write_line(out: &mut dyn Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Renders a JSON value as `[key: value, ...]` with sorted keys, empty values
/// dropped and credential-like keys redacted.
pub fn build_debug_str(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .filter_map(|k| {
                    let v = &map[k];
                    if is_empty_value(v) {
                        return None;
                    }
                    if is_sensitive(k) {
                        return Some(format!("{k}: {REDACTED}"));
                    }
                    Some(format!("{k}: {}", build_debug_str(v)))
                })
                .collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(build_debug_str).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Copy of `value` with the values of credential-like keys replaced, at any
/// depth.
pub fn redact(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_sensitive(k) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// HTTP body as it may appear in a trace. JSON is redacted; anything else is
/// reduced to its length.
pub fn redacted_body(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => redact(&value).to_string(),
        Err(_) => format!("<{} bytes>", body.len()),
    }
}

fn is_empty_value(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_PARTS.iter().any(|part| key.contains(part))
}


#[cfg(test)]
mod tests {
    use super::testing::printer;
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_confirmation_accepts_yes_variants() {
        for answer in ["y\n", "Y\n", " yes \n", "YES\n"] {
            let (p, _, _) = printer(answer);
            assert!(p.prompt_for_confirmation("Continue?").is_ok(), "{answer:?}");
        }
    }

    #[test]
    fn test_confirmation_declines() {
        for answer in ["n\n", "no\n", "\n", ""] {
            let (p, _, _) = printer(answer);
            let err = p.prompt_for_confirmation("Continue?").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Cancelled, "{answer:?}");
        }
    }

    #[test]
    fn test_confirmation_retries_on_garbage() {
        let (p, _, err) = printer("maybe\ny\n");
        assert!(p.prompt_for_confirmation("Continue?").is_ok());
        assert_eq!(err.contents().matches("[y/N]").count(), 2);
    }

    #[test]
    fn test_confirmation_gives_up_after_attempts() {
        let (p, _, _) = printer("a\nb\nc\ny\n");
        assert!(p.prompt_for_confirmation("Continue?").is_err());
    }

    #[test]
    fn test_prompt_goes_to_stderr_only() {
        let (p, out, err) = printer("n\n");
        let _ = p.prompt_for_confirmation("Delete?");
        assert!(out.contents().is_empty());
        assert!(err.contents().contains("Delete?"));
    }

    #[test]
    fn test_password_from_piped_input() {
        let (p, out, err) = printer("s3cret\n");
        assert_eq!(p.prompt_for_password("Password").unwrap(), "s3cret");
        assert!(!out.contents().contains("s3cret"));
        assert!(!err.contents().contains("s3cret"));
    }

    #[test]
    fn test_channels_respect_verbosity() {
        let (p, out, err) = printer("");
        p.set_verbosity(Verbosity::Silent);
        p.info("info line");
        p.debug("debug line");
        p.output("result");
        p.error("bad");
        assert_eq!(out.contents(), "result\n");
        assert!(!err.contents().contains("info line"));
        assert!(err.contents().contains("bad"));

        p.set_verbosity(Verbosity::Debug);
        p.debug("debug line");
        p.verbose("verbose line");
        assert!(err.contents().contains("[DEBUG]"));
        assert!(err.contents().contains("debug line"));
        assert!(err.contents().contains("verbose line"));
    }

    struct FailingWriter(io::ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(self.0, "stream closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn failing_printer(kind: io::ErrorKind) -> (Printer, super::testing::Capture) {
        let err = super::testing::Capture::default();
        let p = Printer::with_streams(
            Box::new(FailingWriter(kind)),
            Box::new(err.clone()),
            Box::new(io::Cursor::new(Vec::new())),
        );
        p.set_verbosity(Verbosity::Debug);
        (p, err)
    }

    #[test]
    fn test_output_write_failure_is_reported() {
        let (p, err) = failing_printer(io::ErrorKind::Other);
        p.output("result");
        assert!(err.contents().contains("write output: stream closed"));
    }

    #[test]
    fn test_output_broken_pipe_is_silent() {
        let (p, err) = failing_printer(io::ErrorKind::BrokenPipe);
        p.output("result");
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_debug_str_sorts_drops_empty_and_redacts() {
        let value = json!({
            "zeta": "last",
            "alpha": "first",
            "empty": "",
            "missing": null,
            "accessToken": "abc.def",
            "limit": 3,
            "labels": {"b": "2", "a": "1"},
        });
        assert_eq!(
            build_debug_str(&value),
            "[accessToken: <redacted>, alpha: first, labels: [a: 1, b: 2], limit: 3, zeta: last]"
        );
    }

    #[test]
    fn test_redacted_body_hides_nested_secrets() {
        let body = r#"{"credentials": {"username": "u1", "password": "S3cretPassw0rd"}}"#;
        let traced = redacted_body(body);
        assert!(!traced.contains("S3cretPassw0rd"));
        assert!(traced.contains("u1"));
        assert!(traced.contains(REDACTED));

        let scrape = json!({"jobName": "node", "basicAuth": {"username": "u", "password": "p4ss"}});
        assert_eq!(
            redact(&scrape)["basicAuth"]["password"],
            serde_json::Value::String(REDACTED.into())
        );
        assert_eq!(redacted_body("access_token=abc"), "<16 bytes>");
        assert_eq!(redacted_body(""), "");
    }

    #[test]
    fn test_verbosity_parse() {
        assert_eq!("DEBUG".parse::<Verbosity>().unwrap(), Verbosity::Debug);
        assert!("loud".parse::<Verbosity>().is_err());
        assert!(Verbosity::Silent < Verbosity::Default);
    }
}
