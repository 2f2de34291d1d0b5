//! Substitutable process execution
//!
//! Call sites run external programs through [`background`], which looks up
//! the [`Runner`] bound to the call [`Context`](call_context::Context). The
//! outermost context binds a [`LocalRunner`]; tests bind a [`Stub`] that
//! records every command and answers with canned output or failures.
//!
//! ```no_run
//! use call_context::Context;
//! use process_runner::{background, with_local};
//!
//! # futures::executor::block_on(async {
//! let ctx = with_local(&Context::background()).with_env("GIT_PAGER", "cat");
//! let branch = background(&ctx, &["git", "rev-parse", "--abbrev-ref", "HEAD"]).await?;
//! println!("on {branch}");
//! # Ok::<(), process_runner::ProcessError>(())
//! # });
//! ```

#![warn(missing_docs)]

pub mod backends;
pub mod binding;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod process;
pub mod runner;
pub mod stub;

pub use backends::LocalRunner;
pub use binding::{resolve, try_resolve, with_local, with_runner, with_stub};
pub use command::{command_line, normalize_key, stub_key, Command};
pub use config::LocalRunnerConfig;
pub use dispatch::background;
pub use error::{BoxError, Error, ProcessError, Result, SharedError};
pub use process::ExitStatus;
pub use runner::Runner;
pub use stub::{CallRecord, Callback, Stub, StubCommand, WeakStub};
