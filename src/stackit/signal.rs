//! Ctrl-C handling.
//!
//! Outside of a cooperative section an interrupt ends the process right away
//! with exit code 130. Inside one (waiting on an operation, feeding the pager)
//! the handler only flips the token; the section notices at its next check
//! and unwinds with a cancelled error.

use crate::error::{CliError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    sections: Arc<AtomicUsize>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Marks the current code as able to observe cancellation.
    pub fn cooperate(&self) -> Section {
        self.sections.fetch_add(1, Ordering::SeqCst);
        Section {
            sections: Arc::clone(&self.sections),
        }
    }

    fn in_section(&self) -> bool {
        self.sections.load(Ordering::SeqCst) > 0
    }

    /// Installs the process-wide SIGINT handler bound to this token.
    pub fn install_handler(&self) -> Result<()> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            if token.in_section() {
                token.cancel();
            } else {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
        .map_err(|e| CliError::Internal(format!("install signal handler: {e}")))
    }
}

/// Guard returned by [`CancelToken::cooperate`].
pub struct Section {
    sections: Arc<AtomicUsize>,
}

impl Drop for Section {
    fn drop(&mut self) {
        self.sections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_nest_and_release() {
        let token = CancelToken::new();
        assert!(!token.in_section());
        {
            let _outer = token.cooperate();
            let _inner = token.cooperate();
            assert!(token.in_section());
        }
        assert!(!token.in_section());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }
}
