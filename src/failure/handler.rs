//! Thread-affine record of the failure outcome.
//!
//! Only the process entry thread (`main`, or `restartedMain` under a
//! restarter) gets a handler. The entry point reads it back to pick the
//! process exit code and to skip printing a failure that was already logged.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;

use crate::error::display_chain;

const MAIN_THREAD_NAMES: &[&str] = &["main", "restartedMain"];

thread_local! {
    static HANDLER: Rc<FailureHandler> = Rc::new(FailureHandler::default());
}

#[derive(Debug, Default)]
pub struct FailureHandler {
    exit_code: Cell<i32>,
    logged: RefCell<Vec<String>>,
}

impl FailureHandler {
    /// The handler for this thread, if this is a main thread.
    pub fn current() -> Option<Rc<FailureHandler>> {
        let current = thread::current();
        let name = current.name()?;
        if !MAIN_THREAD_NAMES.contains(&name) {
            return None;
        }
        Some(HANDLER.with(Rc::clone))
    }

    pub fn register_exit_code(&self, code: i32) {
        self.exit_code.set(code);
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.get()
    }

    pub fn register_logged(&self, error: &(dyn std::error::Error + 'static)) {
        self.logged.borrow_mut().push(display_chain(error));
    }

    pub fn is_logged(&self, error: &(dyn std::error::Error + 'static)) -> bool {
        let rendered = display_chain(error);
        self.logged.borrow().iter().any(|logged| *logged == rendered)
    }
}
