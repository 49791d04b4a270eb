use super::{ConfigStore, Profiles};
use crate::error::{CliError, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory profiles store for tests.
///
/// Clones share the same document, so a test can keep a handle and inspect
/// what was saved after the [`Config`](super::Config) took ownership.
#[derive(Clone, Default)]
pub struct MemoryStore {
    doc: Rc<RefCell<Option<Profiles>>>,
    fail_writes: Rc<RefCell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<Profiles>> {
        Ok(self.doc.borrow().clone())
    }

    fn save(&self, profiles: &Profiles) -> Result<()> {
        if *self.fail_writes.borrow() {
            return Err(CliError::Config("simulated write failure".to_string()));
        }
        *self.doc.borrow_mut() = Some(profiles.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
