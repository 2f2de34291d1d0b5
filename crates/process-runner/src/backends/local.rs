//! Local process execution backend

use async_process::Stdio;
use async_trait::async_trait;
use call_context::{env, Context};
use futures::future::{self, Either};
use tracing::{debug, trace, warn};

use crate::command::{command_line, Command};
use crate::config::LocalRunnerConfig;
use crate::error::{BoxError, Error, ProcessError};
use crate::process::ExitStatus;
use crate::runner::Runner;

/// Runner that spawns real processes on this machine
#[derive(Debug, Clone, Default)]
pub struct LocalRunner {
    config: LocalRunnerConfig,
}

impl LocalRunner {
    /// Create a runner with the given configuration
    pub fn new(config: LocalRunnerConfig) -> Self {
        Self { config }
    }

    /// The runner configuration
    pub fn config(&self) -> &LocalRunnerConfig {
        &self.config
    }

    /// Build the command for `argv`, `None` if `argv` is empty
    pub fn command(&self, ctx: &Context, argv: &[String]) -> Option<Command> {
        let mut cmd = Command::from_argv(argv)?;

        if !self.config.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(env::all(ctx));

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        Some(cmd)
    }

    fn finish(&self, line: String, output: std::process::Output) -> Result<String, BoxError> {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let status = ExitStatus::from(output.status);

        if !status.success() {
            debug!(command = %line, %status, "process exited unsuccessfully");
            return Err(Box::new(
                ProcessError::new(line, Error::NonZeroExit(status)).with_output(stdout, stderr),
            ));
        }

        if self.config.trim_output {
            Ok(stdout.trim().to_owned())
        } else {
            Ok(stdout)
        }
    }
}

#[async_trait]
impl Runner for LocalRunner {
    async fn run(&self, ctx: &Context, argv: &[String]) -> Result<String, BoxError> {
        let line = command_line(argv);
        let Some(command) = self.command(ctx, argv) else {
            return Err(Box::new(ProcessError::new(line, Error::EmptyCommand)));
        };
        if let Some(reason) = ctx.err() {
            return Err(Box::new(ProcessError::new(line, Error::Cancelled(reason))));
        }

        trace!(
            command = %line,
            cwd = ?command.get_current_dir(),
            env_overrides = command.get_envs().len(),
            "spawning process"
        );
        let mut async_cmd = command.prepare();
        async_cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = async_cmd.spawn().map_err(|e| {
            let program = command.get_program().to_string_lossy();
            ProcessError::new(&line, Error::spawn_failed(program, e))
        })?;
        debug!(command = %line, pid = child.id(), "spawned process");

        let output = Box::pin(child.output());
        let done = Box::pin(ctx.done());

        match future::select(output, done).await {
            Either::Left((Ok(output), _)) => self.finish(line, output),
            Either::Left((Err(e), _)) => Err(Box::new(ProcessError::new(line, Error::Io(e)))),
            Either::Right((reason, output)) => {
                // Dropping the pending output drops the child, which kills it.
                drop(output);
                warn!(command = %line, %reason, "process cancelled");
                Err(Box::new(ProcessError::new(line, Error::Cancelled(reason))))
            }
        }
    }
}
