//! The entry point call sites use to run commands

use call_context::Context;
use tracing::{debug, trace};

use crate::binding::resolve;
use crate::command::command_line;
use crate::error::{BoxError, ProcessError};

/// Run `argv` with the runner bound to `ctx` and return its trimmed stdout
///
/// Every failure is a [`ProcessError`] whose message starts with the
/// space-joined command line. Errors already carrying that command line pass
/// through unchanged.
///
/// # Panics
///
/// Panics if no runner is bound to `ctx`; see [`resolve`].
pub async fn background<S: AsRef<str>>(ctx: &Context, argv: &[S]) -> Result<String, ProcessError> {
    let argv: Vec<String> = argv.iter().map(|arg| arg.as_ref().to_owned()).collect();
    let line = command_line(&argv);
    let runner = resolve(ctx);

    debug!(command = %line, "running process");
    match runner.run(ctx, &argv).await {
        Ok(stdout) => {
            trace!(command = %line, bytes = stdout.len(), "process finished");
            Ok(stdout)
        }
        Err(err) => {
            let err = into_process_error(&line, err);
            debug!(command = %line, error = %err.cause(), "process failed");
            Err(err)
        }
    }
}

fn into_process_error(line: &str, err: BoxError) -> ProcessError {
    match err.downcast::<ProcessError>() {
        Ok(process) if process.command == line => *process,
        Ok(process) => {
            let (stdout, stderr) = (process.stdout.clone(), process.stderr.clone());
            ProcessError::new(line, *process).with_output(stdout, stderr)
        }
        Err(other) => ProcessError::new(line, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{with_runner, with_stub};
    use crate::runner::Runner;
    use async_trait::async_trait;

    /// Runner failing with a plain error
    struct PlainFailure;

    #[async_trait]
    impl Runner for PlainFailure {
        async fn run(&self, _ctx: &Context, _argv: &[String]) -> Result<String, BoxError> {
            Err("boom".into())
        }
    }

    /// Runner failing with a process error for some other command line
    struct Relabelled;

    #[async_trait]
    impl Runner for Relabelled {
        async fn run(&self, _ctx: &Context, _argv: &[String]) -> Result<String, BoxError> {
            Err(Box::new(ProcessError::new("inner cmd", "bad").with_output("o", "e")))
        }
    }

    #[test]
    fn test_plain_error_gets_prefix() {
        futures::executor::block_on(async {
            let ctx = with_runner(&Context::background(), PlainFailure);
            let err = background(&ctx, &["/bin/tool", "--flag"]).await.unwrap_err();

            assert_eq!(err.to_string(), "/bin/tool --flag: boom");
            assert_eq!(err.command, "/bin/tool --flag");
            assert!(err.stdout.is_empty());
        });
    }

    #[test]
    fn test_foreign_process_error_is_wrapped() {
        futures::executor::block_on(async {
            let ctx = with_runner(&Context::background(), Relabelled);
            let err = background(&ctx, &["outer"]).await.unwrap_err();

            assert_eq!(err.to_string(), "outer: inner cmd: bad");
            assert_eq!(err.stdout, "o");
            assert_eq!(err.stderr, "e");
            assert!(err.cause().downcast_ref::<ProcessError>().is_some());
        });
    }

    #[test]
    fn test_matching_process_error_passes_through() {
        futures::executor::block_on(async {
            let (ctx, stub) = with_stub(&Context::background());
            stub.with_failure("nope");

            let err = background(&ctx, &["/bin/meeecho", "1"]).await.unwrap_err();
            assert_eq!(err.to_string(), "/bin/meeecho 1: nope");
            assert!(err.cause().downcast_ref::<ProcessError>().is_none());
        });
    }

    #[test]
    fn test_accepts_owned_and_borrowed_args() {
        futures::executor::block_on(async {
            let (ctx, stub) = with_stub(&Context::background());
            stub.with_stdout("ok");

            let owned = vec!["git".to_string(), "status".to_string()];
            assert_eq!(background(&ctx, &owned).await.unwrap(), "ok");
            assert_eq!(background(&ctx, &["git", "log"]).await.unwrap(), "ok");
            assert_eq!(stub.commands(), vec!["git status", "git log"]);
        });
    }

    #[test]
    #[should_panic(expected = "no process runner bound to context")]
    fn test_unbound_context_panics() {
        futures::executor::block_on(async {
            let _ = background(&Context::background(), &["ls"]).await;
        });
    }
}
