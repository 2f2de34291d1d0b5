//! The runner contract shared by the local runner and the stub

use std::sync::Arc;

use async_trait::async_trait;
use call_context::Context;

use crate::error::BoxError;

/// Executes a command line and returns its trimmed standard output
///
/// Implementations report failures as a [`ProcessError`](crate::ProcessError)
/// where they can; any other error is wrapped by
/// [`background`](crate::background) with the command line prefix.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Run `argv` (program followed by arguments) within `ctx`
    async fn run(&self, ctx: &Context, argv: &[String]) -> Result<String, BoxError>;
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for Arc<R> {
    async fn run(&self, ctx: &Context, argv: &[String]) -> Result<String, BoxError> {
        (**self).run(ctx, argv).await
    }
}
