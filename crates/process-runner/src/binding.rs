//! Attaching a runner to a call context
//!
//! Call sites never name a runner. The outermost context binds the local
//! runner; tests derive a child context bound to a [`Stub`] instead.

use std::sync::Arc;

use call_context::Context;

use crate::backends::LocalRunner;
use crate::runner::Runner;
use crate::stub::Stub;

/// Context value holding the bound runner
#[derive(Clone)]
struct BoundRunner(Arc<dyn Runner>);

/// Derive a context bound to `runner`
pub fn with_runner<R: Runner>(ctx: &Context, runner: R) -> Context {
    ctx.with_value(BoundRunner(Arc::new(runner)))
}

/// Derive a context bound to a [`LocalRunner`] with default configuration
pub fn with_local(ctx: &Context) -> Context {
    with_runner(ctx, LocalRunner::default())
}

/// Derive a context bound to a fresh, empty [`Stub`]
///
/// The returned handle shares state with the bound runner, so configuration
/// made through it is visible to later invocations in the child context.
pub fn with_stub(ctx: &Context) -> (Context, Stub) {
    let stub = Stub::new();
    (with_runner(ctx, stub.clone()), stub)
}

/// The bound runner, if any
pub fn try_resolve(ctx: &Context) -> Option<Arc<dyn Runner>> {
    ctx.value::<BoundRunner>().map(|bound| Arc::clone(&bound.0))
}

/// The bound runner
///
/// # Panics
///
/// Panics when no runner was bound. Binding one is the caller's
/// responsibility, so this is a programming error rather than a runtime one.
pub fn resolve(ctx: &Context) -> Arc<dyn Runner> {
    match try_resolve(ctx) {
        Some(runner) => runner,
        None => panic!(
            "no process runner bound to context: bind one with with_local, with_stub or with_runner"
        ),
    }
}
