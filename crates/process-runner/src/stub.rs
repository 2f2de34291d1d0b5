//! Deterministic stand-in for the local runner
//!
//! A [`Stub`] never spawns anything. It records every invocation, then answers
//! with a canned response chosen by command:
//!
//! 1. a response registered for the exact command (`with_*_for`), else
//! 2. the default response (`with_stdout`, `with_failure`, `with_callback`), else
//! 3. empty stdout.
//!
//! Within one command, or within the defaults, a callback beats a failure and
//! a failure beats stdout. Commands are matched by [`stub_key`], so the
//! directory of the program does not matter, whether in the registered command
//! line or in the dispatched one.
//!
//! ```
//! use call_context::Context;
//! use process_runner::{background, with_stub};
//!
//! futures::executor::block_on(async {
//!     let (ctx, stub) = with_stub(&Context::background());
//!     stub.with_stdout_for("git rev-parse HEAD", "abc123")
//!         .with_failure_for("git push", "rejected");
//!
//!     let head = background(&ctx, &["/usr/bin/git", "rev-parse", "HEAD"]).await.unwrap();
//!     assert_eq!(head, "abc123");
//!
//!     let err = background(&ctx, &["git", "push"]).await.unwrap_err();
//!     assert_eq!(err.to_string(), "git push: rejected");
//!     assert_eq!(stub.to_string(), "process stub with 2 calls");
//! });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use call_context::{env, Context};
use tracing::trace;

use crate::command::{command_line, normalize_key, stub_key};
use crate::error::{BoxError, Error, ProcessError, SharedError};
use crate::runner::Runner;

/// A callback response
///
/// Receives the invocation and may write to its output sinks, set its exit
/// code, or fail. A callback that needs the stub itself should hold a
/// [`WeakStub`]; a [`Stub`] clone stored in its own callback is never freed.
pub type Callback = Arc<dyn Fn(&mut StubCommand) -> Result<(), BoxError> + Send + Sync>;

/// The response chosen for one invocation
#[derive(Clone)]
enum Response {
    Stdout(String),
    Failure(SharedError),
    Callback(Callback),
}

/// Responses registered for one command, or the defaults
///
/// Each kind has its own slot; setting one kind leaves the others alone.
#[derive(Clone, Default)]
struct ResponseSet {
    stdout: Option<String>,
    failure: Option<SharedError>,
    callback: Option<Callback>,
}

impl ResponseSet {
    fn resolve(&self) -> Option<Response> {
        if let Some(callback) = &self.callback {
            return Some(Response::Callback(Arc::clone(callback)));
        }
        if let Some(failure) = &self.failure {
            return Some(Response::Failure(Arc::clone(failure)));
        }
        self.stdout.clone().map(Response::Stdout)
    }
}

#[derive(Default)]
struct StubState {
    defaults: ResponseSet,
    responses: HashMap<String, ResponseSet>,
    calls: Vec<CallRecord>,
}

impl StubState {
    fn resolve(&self, command: &str) -> Response {
        self.responses
            .get(command)
            .and_then(ResponseSet::resolve)
            .or_else(|| self.defaults.resolve())
            .unwrap_or_else(|| Response::Stdout(String::new()))
    }

    fn slot(&mut self, command: Option<String>) -> &mut ResponseSet {
        match command {
            Some(command) => self.responses.entry(command).or_default(),
            None => &mut self.defaults,
        }
    }
}

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// The command as matched, see [`stub_key`]
    pub command: String,
    /// The full command line as dispatched
    pub command_line: String,
    /// The environment a real process would have received
    pub env: HashMap<String, String>,
}

/// The invocation handed to a [`Callback`]
#[derive(Debug)]
pub struct StubCommand {
    argv: Vec<String>,
    env: HashMap<String, String>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    /// Exit code to report; anything but 0 fails the invocation
    pub exit_code: i32,
}

impl StubCommand {
    fn new(argv: Vec<String>, env: HashMap<String, String>) -> Self {
        Self {
            argv,
            env,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: 0,
        }
    }

    /// Program followed by its arguments, as dispatched
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The program as dispatched
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// An environment variable as the process would have seen it
    pub fn env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// The full environment the process would have received
    pub fn envs(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Standard output sink
    pub fn stdout(&mut self) -> &mut Vec<u8> {
        &mut self.stdout
    }

    /// Standard error sink
    pub fn stderr(&mut self) -> &mut Vec<u8> {
        &mut self.stderr
    }

    fn into_output(self) -> (String, String, i32) {
        (
            String::from_utf8_lossy(&self.stdout).into_owned(),
            String::from_utf8_lossy(&self.stderr).into_owned(),
            self.exit_code,
        )
    }
}

/// Recording runner with canned responses
///
/// Clones share configuration and call log. Configure before invoking
/// concurrently; invocations themselves may run from any number of threads.
#[derive(Clone, Default)]
pub struct Stub {
    state: Arc<Mutex<StubState>>,
}

impl Stub {
    /// Create an empty stub answering every command with empty stdout
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        // A panicking callback never holds the lock, so the state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configure(&self, command: Option<String>, apply: impl FnOnce(&mut ResponseSet)) -> &Self {
        let command = command.as_deref().map(normalize_key);
        apply(self.state().slot(command));
        self
    }

    /// Answer every command without its own response with `stdout`
    pub fn with_stdout(&self, stdout: impl Into<String>) -> &Self {
        let stdout = stdout.into();
        self.configure(None, |set| set.stdout = Some(stdout))
    }

    /// Answer `command` with `stdout`
    pub fn with_stdout_for(&self, command: impl Into<String>, stdout: impl Into<String>) -> &Self {
        let stdout = stdout.into();
        self.configure(Some(command.into()), |set| set.stdout = Some(stdout))
    }

    /// Fail every command without its own response with `cause`
    pub fn with_failure(&self, cause: impl Into<BoxError>) -> &Self {
        let cause = SharedError::from(cause.into());
        self.configure(None, |set| set.failure = Some(cause))
    }

    /// Fail `command` with `cause`
    pub fn with_failure_for(
        &self,
        command: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> &Self {
        let cause = SharedError::from(cause.into());
        self.configure(Some(command.into()), |set| set.failure = Some(cause))
    }

    /// Answer every command without its own response by calling `callback`
    pub fn with_callback<F>(&self, callback: F) -> &Self
    where
        F: Fn(&mut StubCommand) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.configure(None, |set| set.callback = Some(callback))
    }

    /// Answer `command` by calling `callback`
    pub fn with_callback_for<F>(&self, command: impl Into<String>, callback: F) -> &Self
    where
        F: Fn(&mut StubCommand) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.configure(Some(command.into()), |set| set.callback = Some(callback))
    }

    /// A handle that does not keep the stub alive
    pub fn downgrade(&self) -> WeakStub {
        WeakStub {
            state: Arc::downgrade(&self.state),
        }
    }

    /// Number of recorded invocations
    pub fn len(&self) -> usize {
        self.state().calls.len()
    }

    /// Returns true if nothing was invoked yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded commands in invocation order
    pub fn commands(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .map(|call| call.command.clone())
            .collect()
    }

    /// Recorded invocations in order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state().calls.clone()
    }

    /// Environment a process started from `ctx` would receive
    pub fn combined_environment(&self, ctx: &Context) -> HashMap<String, String> {
        env::combined(ctx)
    }

    /// Value of `name` as a process started from `ctx` would see it
    pub fn lookup_env(&self, ctx: &Context, name: &str) -> String {
        env::get(ctx, name)
    }

    /// Record the call and pick its response in one critical section
    fn record(&self, call: CallRecord) -> Response {
        let mut state = self.state();
        state.calls.push(call);
        let command = &state.calls[state.calls.len() - 1].command;
        state.resolve(command)
    }
}

/// Non-owning handle to a [`Stub`], see [`Stub::downgrade`]
#[derive(Clone, Default)]
pub struct WeakStub {
    state: Weak<Mutex<StubState>>,
}

impl WeakStub {
    /// The stub, if it is still alive
    pub fn upgrade(&self) -> Option<Stub> {
        self.state.upgrade().map(|state| Stub { state })
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process stub with {} calls", self.len())
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("commands", &self.commands())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Runner for Stub {
    async fn run(&self, ctx: &Context, argv: &[String]) -> Result<String, BoxError> {
        let line = command_line(argv);
        let env = env::combined(ctx);
        let call = CallRecord {
            command: stub_key(argv),
            command_line: line.clone(),
            env: env.clone(),
        };
        trace!(command = %call.command, "stub invoked");

        match self.record(call) {
            Response::Stdout(stdout) => Ok(stdout),
            Response::Failure(cause) => Err(Box::new(ProcessError::from_shared(line, cause))),
            Response::Callback(callback) => {
                let mut cmd = StubCommand::new(argv.to_vec(), env);
                let outcome = callback(&mut cmd);
                let (stdout, stderr, exit_code) = cmd.into_output();
                match outcome {
                    Err(cause) => Err(Box::new(
                        ProcessError::new(line, cause).with_output(stdout, stderr),
                    )),
                    Ok(()) if exit_code != 0 => Err(Box::new(
                        ProcessError::new(line, Error::exit_code(exit_code))
                            .with_output(stdout, stderr),
                    )),
                    Ok(()) => Ok(stdout.trim().to_owned()),
                }
            }
        }
    }
}
