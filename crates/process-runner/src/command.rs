//! Command lines and the command type used to spawn them

use async_process::Command as AsyncCommand;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Join `argv` with single spaces, without quoting
///
/// This is the form used in every [`ProcessError`](crate::ProcessError) message.
pub fn command_line<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ")
}

/// The key a [`Stub`](crate::Stub) matches and records commands by
///
/// Same as [`command_line`] with the program reduced to its file name, so
/// `/usr/local/bin/git status` and `git status` are the same command.
pub fn stub_key<S: AsRef<str>>(argv: &[S]) -> String {
    let mut parts = argv.iter().map(AsRef::as_ref);
    let Some(program) = parts.next() else {
        return String::new();
    };
    std::iter::once(program_name(program))
        .chain(parts)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a registered command line to its [`stub_key`]
///
/// Only the first word is touched, so `/path/to/qux 1` and `qux 1` name the
/// same command.
pub fn normalize_key(command: &str) -> String {
    match command.split_once(' ') {
        Some((program, rest)) => format!("{} {rest}", program_name(program)),
        None => program_name(command).to_owned(),
    }
}

fn program_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(program)
}

/// A command to be executed
///
/// Unlike `async_process::Command`, this type is `Clone` and is only turned
/// into a spawnable command by [`prepare`](Self::prepare).
#[derive(Debug, Clone)]
pub struct Command {
    /// The program to execute
    program: OsString,
    /// The arguments to pass to the program
    args: Vec<OsString>,
    /// Environment variables to set
    env: HashMap<OsString, OsString>,
    /// Working directory for the command
    current_dir: Option<PathBuf>,
    /// Whether to clear the environment before setting our vars
    env_clear: bool,
}

impl Command {
    /// Create a new command for the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            env: HashMap::new(),
            current_dir: None,
            env_clear: false,
        }
    }

    /// Create a command from an argument vector, `None` if it is empty
    pub fn from_argv<S: AsRef<OsStr>>(argv: &[S]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        let mut cmd = Self::new(program);
        cmd.args(args);
        Some(cmd)
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.env
            .insert(key.as_ref().to_owned(), val.as_ref().to_owned());
        self
    }

    /// Set multiple environment variables
    pub fn envs<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, val) in vars {
            self.env(key, val);
        }
        self
    }

    /// Clear all environment variables (except those explicitly set)
    pub fn env_clear(&mut self) -> &mut Self {
        self.env_clear = true;
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Get the program name
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// Get the environment variables
    pub fn get_envs(&self) -> &HashMap<OsString, OsString> {
        &self.env
    }

    /// Get the current directory
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Convert to an `async_process::Command` ready to spawn
    pub fn prepare(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.program);
        cmd.args(&self.args);

        if self.env_clear {
            cmd.env_clear();
        }
        for (key, val) in &self.env {
            cmd.env(key, val);
        }

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}
