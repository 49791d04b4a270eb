//! Everything a leaf needs while it runs.
//!
//! A leaf follows the same shape every time:
//!
//! ```text
//! parse input ─► debug dump ─► [label lookup] ─► [confirm] ─► request
//!             ─► [wait unless --async] ─► render / outcome line
//! ```
//!
//! The bracketed steps are helpers on [`Invocation`] so each leaf only
//! spells out its own input record, request and table.

use crate::auth;
use crate::client::http::HttpTransport;
use crate::client::{ClientFactory, Service, ServiceClient, Transport};
use crate::config::{keys, Config};
use crate::env::Environment;
use crate::error::Result;
use crate::flags::Flags;
use crate::globalflags::GlobalFlags;
use crate::output::Renderer;
use crate::print::Printer;
use crate::signal::CancelToken;
use crate::wait::{WaitHandle, Waiter};
use clap::ArgMatches;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

pub struct Invocation<'a> {
    pub printer: &'a Printer,
    pub env: &'a Environment,
    pub cancel: &'a CancelToken,
    pub globals: GlobalFlags,
    pub config: Config,
    pub config_dir: PathBuf,
    pub matches: &'a ArgMatches,
    pub args: Vec<String>,
    /// Qualified path, e.g. `stackit observability instance list`.
    pub command_path: String,
    transport: OnceCell<Rc<dyn Transport>>,
}

impl<'a> Invocation<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        printer: &'a Printer,
        env: &'a Environment,
        cancel: &'a CancelToken,
        globals: GlobalFlags,
        config: Config,
        config_dir: PathBuf,
        matches: &'a ArgMatches,
        args: Vec<String>,
        command_path: String,
    ) -> Self {
        Self {
            printer,
            env,
            cancel,
            globals,
            config,
            config_dir,
            matches,
            args,
            command_path,
            transport: OnceCell::new(),
        }
    }

    /// Uses `transport` instead of the authenticated HTTP transport.
    pub fn with_transport(self, transport: Rc<dyn Transport>) -> Self {
        let _ = self.transport.set(transport);
        self
    }

    pub fn flags(&self) -> Flags<'a> {
        Flags::new(self.matches)
    }

    /// The single positional of `SingleArg` leaves.
    pub fn arg(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    pub fn project_id(&self) -> Result<String> {
        self.globals.project_id().map(str::to_string)
    }

    pub fn debug_input<T: Serialize>(&self, model: &T) {
        self.printer.debug_input_model(model);
    }

    fn transport(&self) -> Result<Rc<dyn Transport>> {
        self.transport
            .get_or_try_init(|| {
                let tokens = auth::token_source(self.env, &self.config, &self.config_dir)?;
                let user_agent = format!("stackit-cli/{}", super::setup::version());
                let transport: Rc<dyn Transport> = Rc::new(HttpTransport::new(tokens, &user_agent)?);
                Ok(transport)
            })
            .map(Rc::clone)
    }

    pub fn client(&self, service: Service) -> Result<ServiceClient> {
        let factory = ClientFactory::new(
            &self.config,
            self.env,
            self.globals.region.clone(),
            self.transport()?,
        );
        Ok(factory.for_service(service))
    }

    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(self.printer, self.cancel, self.globals.output_format)
    }

    /// Asks before a destructive step. Skipped with `--assume-yes`.
    pub fn confirm(&self, prompt: &str) -> Result<()> {
        if self.globals.assume_yes {
            return Ok(());
        }
        self.printer.prompt_for_confirmation(prompt)
    }

    /// Display name of a project for prompts and messages.
    ///
    /// Skipped with `--assume-yes`, since no prompt will show it. A failed
    /// lookup falls back to the id.
    pub fn project_label(&self, project_id: &str) -> String {
        if self.globals.assume_yes {
            return project_id.to_string();
        }
        match self.fetch_project_name(project_id) {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => project_id.to_string(),
            Err(e) => {
                self.printer.debug(format!("get project name: {}", e));
                project_id.to_string()
            }
        }
    }

    fn fetch_project_name(&self, project_id: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Project {
            #[serde(default)]
            name: String,
        }
        let client = self.client(Service::ResourceManager)?;
        let project: Project = client.get(&format!("/v2/projects/{project_id}"))?;
        Ok(project.name)
    }

    pub fn is_async(&self) -> bool {
        self.globals.async_mode
    }

    /// Polling interval: `STACKIT_WAIT_INTERVAL_MS` when set, else `default`.
    pub fn wait_interval(&self, default: Duration) -> Duration {
        self.env
            .get(keys::WAIT_INTERVAL_ENV)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    pub fn wait<H: WaitHandle>(&self, message: &str, handle: H) -> Result<H::Output> {
        Waiter::new(self.printer, self.cancel).wait(message, handle)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::cli::{dispatch, Overrides};
    use crate::client::testing::ScriptedTransport;
    use crate::config::memory::MemoryStore;
    use crate::print::testing::{printer, Capture};

    pub const PROJECT_ID: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";

    /// In-process dispatcher with captured streams, an in-memory config and
    /// a scripted transport.
    pub struct Harness {
        pub printer: Printer,
        pub out: Capture,
        pub err: Capture,
        pub env: Environment,
        pub cancel: CancelToken,
        pub transport: Rc<ScriptedTransport>,
        pub store: MemoryStore,
    }

    impl Harness {
        pub fn new(input: &str) -> Self {
            let (printer, out, err) = printer(input);
            Self {
                printer,
                out,
                err,
                env: Environment::from_pairs([(keys::WAIT_INTERVAL_ENV, "1")]),
                cancel: CancelToken::new(),
                transport: ScriptedTransport::new(),
                store: MemoryStore::new(),
            }
        }

        /// Dispatches `argv` (without the binary name).
        pub fn run(&self, argv: &[&str]) -> Result<()> {
            let full = std::iter::once("stackit").chain(argv.iter().copied());
            let transport: Rc<dyn Transport> = self.transport.clone();
            dispatch(
                &self.printer,
                &self.env,
                &self.cancel,
                full,
                Overrides {
                    store: Some(Box::new(self.store.clone())),
                    transport: Some(transport),
                },
            )
        }

        pub fn config(&self) -> Config {
            Config::load(Box::new(self.store.clone()), None).unwrap()
        }
    }
}
