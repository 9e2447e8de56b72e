//! ProcessRunner trait: the seam between stages and the operating system.
//!
//! Stages describe what to run as a [`CommandSpec`]; a runner executes it.
//! [`SystemRunner`] spawns real child processes attached to the terminal; the
//! tests substitute a scripted runner.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::signals;

/// A fully resolved command line for one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    /// Build from a whitespace-split override such as `GT7BOOT_SERVE_COMMAND`.
    /// Returns `None` for an empty token list.
    pub fn from_tokens(tokens: &[String], cwd: &Path) -> Option<Self> {
        let (program, args) = tokens.split_first()?;
        let mut spec = Self::new(resolve_program(cwd, program), cwd);
        spec.args = args.to_vec();
        Some(spec)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: Vec<(String, String)>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Program followed by its arguments, for logs and the audit trail.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Relative program paths with a directory part are taken relative to `cwd`;
/// bare names are left for PATH lookup.
pub fn resolve_program(cwd: &Path, program: &str) -> PathBuf {
    let p = Path::new(program);
    if p.is_relative() && p.components().count() > 1 {
        cwd.join(p)
    } else {
        p.to_path_buf()
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Code(i32),
    /// Killed by the given signal number (Unix)
    Signal(i32),
}

impl ProcessExit {
    pub fn success(self) -> bool {
        matches!(self, Self::Code(0))
    }

    /// Shell-style exit code: the code itself, or 128 + signal.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Code(c) => c,
            Self::Signal(s) => 128 + s,
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(c) => write!(f, "exit status {}", c),
            Self::Signal(s) => write!(f, "signal {}", s),
        }
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Self::Signal(sig);
            }
        }
        Self::Code(1)
    }
}

/// A spawned child the caller can block on.
pub trait RunningProcess {
    fn id(&self) -> u32;

    fn wait(self: Box<Self>) -> io::Result<ProcessExit>;
}

/// Extension point for executing stage commands.
pub trait ProcessRunner {
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Box<dyn RunningProcess>>;

    /// Spawn and block until the child exits.
    fn run(&self, spec: &CommandSpec) -> io::Result<ProcessExit> {
        self.spawn(spec)?.wait()
    }
}

/// Runs commands as real child processes sharing the launcher's stdout/stderr.
///
/// On Unix each child gets its own process group so a terminal Ctrl+C reaches
/// it exactly once, through the launcher's forwarding handler. A background
/// process group that reads the terminal is stopped with SIGTTIN, so children
/// get a null stdin and never wait on a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Box<dyn RunningProcess>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        tracing::debug!(cmd = %spec, cwd = %spec.cwd.display(), "Spawning");
        let child = cmd.spawn()?;
        signals::register_child(child.id());
        Ok(Box::new(SystemProcess { child }))
    }
}

struct SystemProcess {
    child: Child,
}

impl RunningProcess for SystemProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn wait(mut self: Box<Self>) -> io::Result<ProcessExit> {
        let status = self.child.wait()?;
        Ok(status.into())
    }
}

impl Drop for SystemProcess {
    fn drop(&mut self) {
        signals::clear_child(self.child.id());
    }
}
