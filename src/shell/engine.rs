//! Execution engine: forks, wires descriptors, execs, waits.
//!
//! # Process layout
//!
//! Single commands run in one child of the shell:
//!
//! ```text
//! shell ── fork ──> child: [< input] [> output] execvp(argv)
//!   └── waitpid(child)
//! ```
//!
//! Piped commands get an intermediate pipeline supervisor that owns the pipe
//! and waits for both stages, so the shell itself never holds a pipe end:
//!
//! ```text
//! shell ── fork ──> supervisor: pipe()
//!   │                 ├── fork ──> left:  stdout=pipe.write [< input] execvp(left)
//!   │                 ├── fork ──> right: stdin=pipe.read [> output] execvp(right)
//!   │                 ├── close both pipe ends
//!   │                 └── waitpid(left), waitpid(right), exit(right status)
//!   └── waitpid(supervisor)
//! ```
//!
//! Every child applies its redirections before calling `execvp`, input before
//! output. A child that cannot redirect or exec restores what it applied and
//! exits with [`EXIT_REDIRECT_FAILED`], [`EXIT_NOT_FOUND`] or
//! [`EXIT_NOT_EXECUTABLE`].

use std::fmt;
use std::io::Write;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, getpid, pipe2, write, ForkResult, Pid};
use tracing::{debug, error, info, info_span, warn, Span};

use super::command::{ArgVector, CommandDescriptor, OutputTarget, Strategy};
use super::redirect::{self, Redirection, StdSlot};
use crate::error::{RedirectError, ShellError};

/// Generic failure inside a child (pipe creation, fork of a stage).
pub const EXIT_FAILURE: i32 = 1;
/// A redirection could not be applied; the command did not run.
pub const EXIT_REDIRECT_FAILED: i32 = 1;
/// `execvp` could not find the program on `PATH`.
pub const EXIT_NOT_FOUND: i32 = 127;
/// The program was found but could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// How a spawned command ended, as seen by the shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The child (or pipeline) exited with this status.
    Exited(i32),
    /// The child was killed by a signal.
    Signaled(Signal),
    /// No process could be created; nothing ran.
    NotSpawned,
    /// The child was created but waiting for it failed.
    Lost,
}

impl Outcome {
    pub fn success(self) -> bool {
        self == Outcome::Exited(0)
    }

    /// Exit status in the shell convention (128 + signal number for signals).
    pub fn code(self) -> Option<i32> {
        match self {
            Outcome::Exited(code) => Some(code),
            Outcome::Signaled(sig) => Some(128 + sig as i32),
            Outcome::NotSpawned | Outcome::Lost => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Exited(code) => write!(f, "exited with status {}", code),
            Outcome::Signaled(sig) => write!(f, "killed by {:?}", sig),
            Outcome::NotSpawned => write!(f, "not spawned"),
            Outcome::Lost => write!(f, "lost"),
        }
    }
}

/// Runs command descriptors as child processes.
///
/// The engine keeps no per-command state; every call to [`Engine::execute`]
/// is independent and returns only after the processes it started are gone.
/// Trace lines from the shell and all of its children are recorded inside the
/// engine's span, tagged with the shell's PID.
#[derive(Debug)]
pub struct Engine {
    span: Span,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            span: info_span!("engine", shell_pid = getpid().as_raw()),
        }
    }

    /// Executes one descriptor and blocks until it has finished.
    pub fn execute(&self, descriptor: &CommandDescriptor) -> Outcome {
        let _entered = self.span.enter();
        let strategy = descriptor.strategy();
        info!("Attempting to execute {}", strategy);

        match descriptor {
            CommandDescriptor::Single { argv } => self.run_single(Stage::new("Child", argv)),
            CommandDescriptor::SingleIn { argv, input } => {
                self.run_single(Stage::new("Child", argv).with_input(Some(input)))
            }
            CommandDescriptor::SingleOut {
                argv,
                input,
                output,
            } => self.run_single(
                Stage::new("Child", argv)
                    .with_input(input.as_deref())
                    .with_output(Some(output)),
            ),
            CommandDescriptor::Pipe { left, right } => {
                self.run_pipeline(Stage::new("cmd1", left), Stage::new("cmd2", right))
            }
            CommandDescriptor::PipeIn { left, right, input } => self.run_pipeline(
                Stage::new("cmd1", left).with_input(Some(input)),
                Stage::new("cmd2", right),
            ),
            CommandDescriptor::PipeOut {
                left,
                right,
                input,
                output,
            } => self.run_pipeline(
                Stage::new("cmd1", left).with_input(input.as_deref()),
                Stage::new("cmd2", right).with_output(Some(output)),
            ),
        }
    }

    /// Executes `descriptor` after checking it against a separately computed
    /// strategy. A mismatch is refused without spawning anything.
    pub fn execute_with(&self, descriptor: &CommandDescriptor, strategy: Strategy) -> Outcome {
        let actual = descriptor.strategy();
        if actual != strategy {
            warn!(
                "Refusing to execute: strategy {} does not match command shape {}",
                strategy, actual
            );
            return Outcome::NotSpawned;
        }
        self.execute(descriptor)
    }

    fn run_single(&self, stage: Stage<'_>) -> Outcome {
        debug!("Attempting fork()");
        flush_std_streams();
        let pid = match spawn("fork", || stage.run(None)) {
            Ok(pid) => pid,
            Err(e) => {
                report_resource_error(&e);
                return Outcome::NotSpawned;
            }
        };

        info!("Parent process is waiting. Child's PID={}", pid);
        let outcome = wait_for(pid);
        info!("Parent process has finished waiting: {}", outcome);
        outcome
    }

    fn run_pipeline(&self, left: Stage<'_>, right: Stage<'_>) -> Outcome {
        debug!("Attempting fork() of pipeline supervisor");
        flush_std_streams();
        let pid = match spawn("fork", || supervise(left, right)) {
            Ok(pid) => pid,
            Err(e) => {
                report_resource_error(&e);
                return Outcome::NotSpawned;
            }
        };

        info!("Parent process is waiting. Pipeline supervisor PID={}", pid);
        let outcome = wait_for(pid);
        info!("Parent has finished waiting: pipeline {}", outcome);
        outcome
    }
}

/// One command plus the redirections it should see.
struct Stage<'a> {
    label: &'static str,
    argv: &'a ArgVector,
    input: Option<&'a Path>,
    output: Option<&'a OutputTarget>,
}

impl<'a> Stage<'a> {
    fn new(label: &'static str, argv: &'a ArgVector) -> Self {
        Self {
            label,
            argv,
            input: None,
            output: None,
        }
    }

    fn with_input(mut self, input: Option<&'a Path>) -> Self {
        self.input = input;
        self
    }

    fn with_output(mut self, output: Option<&'a OutputTarget>) -> Self {
        self.output = output;
        self
    }

    /// Body of the forked child. Only returns if the command could not be
    /// started; the return value is the child's exit status.
    fn run(&self, pipe_end: Option<(OwnedFd, StdSlot)>) -> i32 {
        let mut applied: Vec<Redirection> = Vec::with_capacity(3);

        if let Some((fd, slot)) = pipe_end {
            let end = match slot {
                StdSlot::Output => "write",
                StdSlot::Input => "read",
            };
            match redirect::redirect_fd(fd, slot) {
                Ok(r) => {
                    info!(
                        "{}: \"{}\" connected to the {} end of the pipe",
                        self.label,
                        self.argv.program(),
                        end
                    );
                    applied.push(r);
                }
                Err(e) => return self.abandon(e, applied),
            }
        }

        if let Some(path) = self.input {
            info!("{}: applying input redirection from {}", self.label, path.display());
            match redirect::redirect_input(path) {
                Ok(r) => applied.push(r),
                Err(e) => return self.abandon(e, applied),
            }
        }

        if let Some(target) = self.output {
            info!(
                "{}: applying output redirection ({}) to {}",
                self.label,
                target.mode.operator(),
                target.path.display()
            );
            match redirect::redirect_output(target) {
                Ok(r) => applied.push(r),
                Err(e) => return self.abandon(e, applied),
            }
        }

        self.exec(applied)
    }

    fn exec(&self, applied: Vec<Redirection>) -> i32 {
        let program = self.argv.program();
        info!(
            "{}(PID={}): attempting to execute \"{}\" with execvp()",
            self.label,
            getpid(),
            self.argv
        );

        restore_default_sigpipe();

        let errno = match self.argv.to_cstrings() {
            Ok(args) => match execvp(args[0].as_c_str(), &args) {
                Ok(never) => match never {},
                Err(errno) => errno,
            },
            Err(_) => Errno::EINVAL,
        };

        let failure = ShellError::Exec {
            program: program.to_string(),
            source: errno,
        };
        if errno == Errno::ENOENT {
            warn!(
                "{}: could not find a command or program \"{}\" (not found)",
                self.label, program
            );
        } else {
            warn!("{}: {}", self.label, failure);
        }

        restore_all(self.label, applied);
        info!("{}: terminating", self.label);

        if errno == Errno::ENOENT {
            EXIT_NOT_FOUND
        } else {
            EXIT_NOT_EXECUTABLE
        }
    }

    fn abandon(&self, err: RedirectError, applied: Vec<Redirection>) -> i32 {
        let err = ShellError::from(err);
        error!("{}: {}", self.label, err);
        write_stderr(&err.to_string());
        restore_all(self.label, applied);
        info!("{}: terminating without running \"{}\"", self.label, self.argv.program());
        EXIT_REDIRECT_FAILED
    }
}

/// Body of the pipeline supervisor process.
fn supervise(left: Stage<'_>, right: Stage<'_>) -> i32 {
    info!("Pipeline supervisor (PID={}) is creating pipe", getpid());
    // Close-on-exec, so a stage's program only sees the end moved onto its slot.
    let (read_end, write_end) = match pipe2(OFlag::O_CLOEXEC) {
        Ok(ends) => ends,
        Err(source) => {
            report_resource_error(&ShellError::Resource {
                what: "pipe",
                source,
            });
            return EXIT_FAILURE;
        }
    };
    debug!(
        "Created pipe: read={} write={}",
        read_end.as_raw_fd(),
        write_end.as_raw_fd()
    );

    let left_pid = spawn("fork", || {
        // SAFETY: this child never returns to the frame owning the pipe ends,
        // so the descriptors taken over here have exactly one owner.
        let (read_end, write_end) = unsafe { adopt(&read_end, &write_end) };
        drop(read_end);
        left.run(Some((write_end, StdSlot::Output)))
    });
    let left_pid = match left_pid {
        Ok(pid) => pid,
        Err(e) => {
            report_resource_error(&e);
            return EXIT_FAILURE;
        }
    };

    let right_pid = spawn("fork", || {
        // SAFETY: as above.
        let (read_end, write_end) = unsafe { adopt(&read_end, &write_end) };
        drop(write_end);
        right.run(Some((read_end, StdSlot::Input)))
    });

    // The supervisor holds no pipe end once both stages exist; otherwise the
    // right stage would never see end of file.
    drop(read_end);
    drop(write_end);

    let right_pid = match right_pid {
        Ok(pid) => pid,
        Err(e) => {
            report_resource_error(&e);
            info!("Pipeline supervisor waiting for cmd1 (PID={}) only", left_pid);
            let left = wait_for(left_pid);
            debug!("cmd1 {}", left);
            return EXIT_FAILURE;
        }
    };

    info!(
        "Pipeline supervisor waiting for cmd1 (PID={}) and cmd2 (PID={})",
        left_pid, right_pid
    );
    let left = wait_for(left_pid);
    let right = wait_for(right_pid);
    info!("Pipeline finished: cmd1 {}, cmd2 {}", left, right);

    right.code().unwrap_or(EXIT_FAILURE)
}

/// Takes ownership of copies of the pipe ends inside a forked child.
///
/// # Safety
/// Must only be called in a child process that exits without returning to
/// the code owning `read_end` and `write_end`.
unsafe fn adopt(read_end: &OwnedFd, write_end: &OwnedFd) -> (OwnedFd, OwnedFd) {
    unsafe {
        (
            OwnedFd::from_raw_fd(read_end.as_raw_fd()),
            OwnedFd::from_raw_fd(write_end.as_raw_fd()),
        )
    }
}

/// Forks; the child runs `child` and exits with its return value.
///
/// The child must not touch the std stdout/stderr handles: their locks may
/// have been held by another thread at fork time.
fn spawn<F>(what: &'static str, child: F) -> Result<Pid, ShellError>
where
    F: FnOnce() -> i32,
{
    // SAFETY: the shell is single-threaded and the child leaves through
    // `_exit` without returning to the caller.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            let code = panic::catch_unwind(AssertUnwindSafe(child)).unwrap_or(EXIT_FAILURE);
            exit_child(code)
        }
        Ok(ForkResult::Parent { child }) => Ok(child),
        Err(source) => Err(ShellError::Resource { what, source }),
    }
}

fn exit_child(code: i32) -> ! {
    // SAFETY: `_exit` only terminates the process; it skips atexit handlers
    // that belong to the parent.
    unsafe { libc::_exit(code) }
}

/// Called by the shell before forking; buffered output would otherwise be
/// written twice, once per process.
fn flush_std_streams() {
    if let Err(e) = std::io::stdout().flush() {
        debug!("Could not flush stdout: {}", e);
    }
    if let Err(e) = std::io::stderr().flush() {
        debug!("Could not flush stderr: {}", e);
    }
}

/// Rust starts with SIGPIPE ignored, and an ignored disposition survives exec.
fn restore_default_sigpipe() {
    // SAFETY: SIG_DFL installs no handler code.
    if let Err(e) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
        warn!("Could not reset SIGPIPE disposition: {}", e);
    }
}

/// Writes one line to descriptor 2 without going through the std handle.
fn write_stderr(message: &str) {
    let line = format!("{}\n", message);
    let mut bytes = line.as_bytes();
    while !bytes.is_empty() {
        match write(std::io::stderr(), bytes) {
            Ok(0) => break,
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::EINTR) => continue,
            Err(e) => {
                debug!("Could not write to stderr: {}", e);
                break;
            }
        }
    }
}

/// Blocks until `pid` terminates.
fn wait_for(pid: Pid) -> Outcome {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Outcome::Exited(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Outcome::Signaled(sig),
            Ok(other) => debug!("Ignoring wait status {:?}", other),
            Err(Errno::EINTR) => continue,
            Err(e) => {
                error!("waitpid({}) failed: {}", pid, e);
                return Outcome::Lost;
            }
        }
    }
}

fn restore_all(label: &str, applied: Vec<Redirection>) {
    for r in applied.into_iter().rev() {
        info!("{}: restoring {}", label, r.slot().name());
        redirect::restore(r);
    }
}

fn report_resource_error(err: &ShellError) {
    error!("{}", err);
    write_stderr(&format!("myshell: {}", err));
}
