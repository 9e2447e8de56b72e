//! Scripted process runner for unit tests.

use std::cell::RefCell;
use std::io;

use crate::process::{CommandSpec, ProcessExit, ProcessRunner, RunningProcess};

type Handler = Box<dyn Fn(&CommandSpec) -> io::Result<ProcessExit>>;

/// Records every spawned command and answers with `handler`.
pub(crate) struct ScriptedRunner {
    calls: RefCell<Vec<CommandSpec>>,
    handler: Handler,
}

impl ScriptedRunner {
    pub(crate) fn new(handler: impl Fn(&CommandSpec) -> io::Result<ProcessExit> + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub(crate) fn succeeding() -> Self {
        Self::new(|_| Ok(ProcessExit::Code(0)))
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Box<dyn RunningProcess>> {
        self.calls.borrow_mut().push(spec.clone());
        let exit = (self.handler)(spec)?;
        Ok(Box::new(Finished(exit)))
    }
}

struct Finished(ProcessExit);

impl RunningProcess for Finished {
    fn id(&self) -> u32 {
        0
    }

    fn wait(self: Box<Self>) -> io::Result<ProcessExit> {
        Ok(self.0)
    }
}
