//! Waiting for asynchronous backend operations.
//!
//! A [`WaitHandle`] knows how to ask the backend whether a resource reached
//! a terminal state. The [`Waiter`] drives it: it shows a spinner on stderr,
//! polls at the handle's interval and stops on success, failure, Ctrl-C or
//! the handle's deadline. The spinner is independent of how polling works.

use crate::error::{CliError, Result};
use crate::print::{Printer, Verbosity};
use crate::signal::CancelToken;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::thread;
use std::time::{Duration, Instant};

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitState<T> {
    Pending,
    Done(T),
}

pub trait WaitHandle {
    type Output;

    /// One status check. Terminal failure states are returned as errors.
    fn poll(&mut self) -> Result<WaitState<Self::Output>>;

    fn interval(&self) -> Duration;

    fn timeout(&self) -> Duration;
}

/// A wait handle backed by a closure.
pub struct Poller<F> {
    check: F,
    interval: Duration,
    timeout: Duration,
}

impl<F> Poller<F> {
    pub fn new(check: F, interval: Duration, timeout: Duration) -> Self {
        Self {
            check,
            interval,
            timeout,
        }
    }
}

impl<T, F> WaitHandle for Poller<F>
where
    F: FnMut() -> Result<WaitState<T>>,
{
    type Output = T;

    fn poll(&mut self) -> Result<WaitState<T>> {
        (self.check)()
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub struct Waiter<'a> {
    printer: &'a Printer,
    cancel: &'a CancelToken,
}

impl<'a> Waiter<'a> {
    pub fn new(printer: &'a Printer, cancel: &'a CancelToken) -> Self {
        Self { printer, cancel }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if self.printer.verbosity() == Verbosity::Silent {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(TICK);
        spinner
    }

    pub fn wait<H: WaitHandle>(&self, message: &str, mut handle: H) -> Result<H::Output> {
        let _section = self.cancel.cooperate();
        let spinner = self.spinner(message);
        let deadline = Instant::now() + handle.timeout();

        let result = loop {
            match handle.poll() {
                Ok(WaitState::Done(value)) => break Ok(value),
                Ok(WaitState::Pending) => {}
                Err(e) => break Err(e),
            }
            if self.cancel.is_cancelled() {
                break Err(CliError::interrupted());
            }
            if Instant::now() >= deadline {
                break Err(CliError::Remote(format!(
                    "wait timed out after {}s",
                    handle.timeout().as_secs()
                )));
            }
            if !self.sleep(handle.interval()) {
                break Err(CliError::interrupted());
            }
        };

        spinner.finish_and_clear();
        result
    }

    /// Sleeps in short slices; returns false if cancelled meanwhile.
    fn sleep(&self, total: Duration) -> bool {
        let until = Instant::now() + total;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            thread::sleep(TICK.min(until - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::print::testing::printer;

    const FAST: Duration = Duration::from_millis(1);

    #[test]
    fn test_returns_when_done() {
        let (p, out, _) = printer("");
        let cancel = CancelToken::new();
        let mut polls = 0;
        let handle = Poller::new(
            || {
                polls += 1;
                Ok(if polls < 3 {
                    WaitState::Pending
                } else {
                    WaitState::Done("ready")
                })
            },
            FAST,
            Duration::from_secs(5),
        );
        let value = Waiter::new(&p, &cancel).wait("Creating", handle).unwrap();
        assert_eq!(value, "ready");
        assert!(out.contents().is_empty());
    }

    #[test]
    fn test_failure_state_surfaces_error() {
        let (p, _, _) = printer("");
        let cancel = CancelToken::new();
        let handle = Poller::new(
            || -> Result<WaitState<()>> { Err(CliError::Remote("create failed".into())) },
            FAST,
            Duration::from_secs(5),
        );
        let err = Waiter::new(&p, &cancel).wait("Creating", handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn test_cancellation_finishes_current_poll() {
        let (p, _, _) = printer("");
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let mut polls = 0;
        let handle = Poller::new(
            || -> Result<WaitState<()>> {
                polls += 1;
                trigger.cancel();
                Ok(WaitState::Pending)
            },
            Duration::from_secs(60),
            Duration::from_secs(600),
        );
        let err = Waiter::new(&p, &cancel).wait("Deleting", handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(polls, 1);
    }

    #[test]
    fn test_deadline() {
        let (p, _, _) = printer("");
        let cancel = CancelToken::new();
        let handle = Poller::new(
            || -> Result<WaitState<()>> { Ok(WaitState::Pending) },
            FAST,
            Duration::from_millis(20),
        );
        let err = Waiter::new(&p, &cancel).wait("Updating", handle).unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(err.kind(), ErrorKind::Api);
    }
}
